// ABOUTME: Parser for the key=value overlay file merged into the environment.
// ABOUTME: Malformed lines are collected as skips instead of failing the load.

use std::fmt;
use std::path::{Path, PathBuf};

/// Why an overlay line was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The line has no `=` separator.
    MissingSeparator,
    /// The text before `=` is not a shell identifier.
    InvalidKey(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingSeparator => write!(f, "missing '='"),
            SkipReason::InvalidKey(key) => write!(f, "invalid variable name '{key}'"),
        }
    }
}

/// A line that was ignored while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    pub reason: SkipReason,
}

/// Parsed overlay: assignments in file order plus the lines that were skipped.
///
/// There is no quoting or escaping: everything after the first `=` is the
/// value, verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    entries: Vec<(String, String)>,
    skipped: Vec<SkippedLine>,
}

/// Failure to read an overlay file that exists.
#[derive(Debug, thiserror::Error)]
#[error("failed to read overlay file {path}: {source}")]
pub struct OverlayError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl Overlay {
    pub fn parse(content: &str) -> Self {
        let mut overlay = Overlay::default();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let skip = |reason| SkippedLine {
                line: index + 1,
                reason,
            };

            match line.split_once('=') {
                None => overlay.skipped.push(skip(SkipReason::MissingSeparator)),
                Some((key, _)) if !is_identifier(key) => overlay
                    .skipped
                    .push(skip(SkipReason::InvalidKey(key.to_string()))),
                Some((key, value)) => overlay.entries.push((key.to_string(), value.to_string())),
            }
        }

        overlay
    }

    /// Load an overlay file. A missing file is `Ok(None)`; any other read
    /// failure is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, OverlayError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(Self::parse(&content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(OverlayError {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn skipped(&self) -> &[SkippedLine] {
        &self.skipped
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments_and_ignores_comments() {
        let overlay = Overlay::parse(
            "# cache settings\n\nREDIS_HOST=cache.internal\n   # indented comment\nREDIS_PORT=6380\n",
        );
        assert_eq!(
            overlay.entries(),
            &[
                ("REDIS_HOST".to_string(), "cache.internal".to_string()),
                ("REDIS_PORT".to_string(), "6380".to_string()),
            ]
        );
        assert!(overlay.skipped().is_empty());
    }

    #[test]
    fn splits_on_first_equals_only() {
        let overlay = Overlay::parse("DATABASE_URL=postgres://u:p@h/db?sslmode=require");
        assert_eq!(
            overlay.entries()[0].1,
            "postgres://u:p@h/db?sslmode=require"
        );
    }

    #[test]
    fn values_are_taken_verbatim() {
        let overlay = Overlay::parse("GREETING=\"hello world\"\nEMPTY=");
        assert_eq!(overlay.entries()[0].1, "\"hello world\"");
        assert_eq!(overlay.entries()[1].1, "");
    }

    #[test]
    fn skips_malformed_lines_with_line_numbers() {
        let overlay = Overlay::parse("GOOD=1\nno separator here\n9LIVES=x\nexport X=1\nALSO_GOOD=2");
        assert_eq!(overlay.entries().len(), 2);
        assert_eq!(
            overlay.skipped(),
            &[
                SkippedLine {
                    line: 2,
                    reason: SkipReason::MissingSeparator
                },
                SkippedLine {
                    line: 3,
                    reason: SkipReason::InvalidKey("9LIVES".to_string())
                },
                SkippedLine {
                    line: 4,
                    reason: SkipReason::InvalidKey("export X".to_string())
                },
            ]
        );
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = Overlay::load(&dir.path().join(".env")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "QDRANT_PORT=7000\n").unwrap();

        let overlay = Overlay::load(&path).unwrap().unwrap();
        assert_eq!(overlay.entries().len(), 1);
    }

    #[test]
    fn load_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Overlay::load(dir.path()).is_err());
    }
}
