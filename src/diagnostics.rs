// ABOUTME: Diagnostics accumulator for non-fatal warnings during a bootstrap run.
// ABOUTME: Collects conditions that don't block handoff but need operator follow-up.

/// Collects non-fatal warnings raised while resolving and readying dependencies.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings of one kind.
    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn overlay_missing(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::OverlayMissing,
            message: message.into(),
        }
    }

    pub fn overlay_line_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::OverlayLineSkipped,
            message: message.into(),
        }
    }

    pub fn port_occupied(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::PortOccupied,
            message: message.into(),
        }
    }

    pub fn readiness_assumed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ReadinessAssumed,
            message: message.into(),
        }
    }

    pub fn waiting_progress(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::WaitingProgress,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// No overlay file; the existing environment was used as-is.
    OverlayMissing,
    /// An overlay line was malformed and ignored.
    OverlayLineSkipped,
    /// A dependency's host port is held by something this tool doesn't manage.
    PortOccupied,
    /// A dependency was accepted on reachability alone.
    ReadinessAssumed,
    /// A dependency is still not ready after another batch of attempts.
    WaitingProgress,
}
