//! Non-fatal rendering diagnostics.
//!
//! Malformed markup never aborts a render. Each problem is reported through
//! the caller's callback and rendering continues with a best-effort result.

use std::fmt;

/// Callback invoked once per diagnostic, in source order.
pub type DiagnosticCallback<'a> = Box<dyn FnMut(&Diagnostic) + 'a>;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
        }
    }
}

/// A problem found while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diagnostic = Diagnostic::error("undefined macro: {x}: {x}");

        assert_eq!(diagnostic.to_string(), "error: undefined macro: {x}: {x}");
    }
}
