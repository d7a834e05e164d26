// ABOUTME: Container name validation.
// ABOUTME: Enforces the character set Docker and Podman accept for --name.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerNameError {
    #[error("container name cannot be empty")]
    Empty,

    #[error("container name exceeds maximum length of 128 characters")]
    TooLong,

    #[error("container name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in container name: '{0}'")]
    InvalidChar(char),
}

/// Name under which a dependency's container is created and looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn new(value: &str) -> Result<Self, ContainerNameError> {
        let mut chars = value.chars();
        let first = chars.next().ok_or(ContainerNameError::Empty)?;

        if value.len() > 128 {
            return Err(ContainerNameError::TooLong);
        }

        if !first.is_ascii_alphanumeric() {
            return Err(ContainerNameError::InvalidStart);
        }

        for c in chars {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '.' && c != '-' {
                return Err(ContainerNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a name reported by the runtime refers to this container.
    /// Docker's list endpoint prefixes names with `/`.
    pub fn matches(&self, reported: &str) -> bool {
        reported.trim_start_matches('/') == self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        assert!(ContainerName::new("alias-redis").is_ok());
        assert!(ContainerName::new("qdrant_1.local").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert_eq!(ContainerName::new(""), Err(ContainerNameError::Empty));
        assert_eq!(
            ContainerName::new("-redis"),
            Err(ContainerNameError::InvalidStart)
        );
        assert_eq!(
            ContainerName::new("redis cache"),
            Err(ContainerNameError::InvalidChar(' '))
        );
    }

    #[test]
    fn matches_runtime_reported_names() {
        let name = ContainerName::new("alias-redis").unwrap();
        assert!(name.matches("/alias-redis"));
        assert!(name.matches("alias-redis"));
        assert!(!name.matches("/alias-redis-2"));
    }
}
