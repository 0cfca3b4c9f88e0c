use crate::error::RaptorError;
use std::fmt;

/// Severity of a message emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    Warning,
    Error,
    Fatal,
}

/// A message emitted by the engine while it processed a document.
///
/// Lines and columns start at 1. They are `None` when the engine did not know
/// where in the document the message applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub line: Option<u64>,
    pub column: Option<u64>,
}

impl Diagnostic {
    pub(crate) fn into_parse_error(self) -> RaptorError {
        RaptorError::parse(self.message, self.line, self.column)
    }

    pub(crate) fn into_serialize_error(self) -> RaptorError {
        RaptorError::serialize(self.message, self.line)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            DiagnosticLevel::Warning => f.write_str("warning: "),
            DiagnosticLevel::Error => f.write_str("error: "),
            DiagnosticLevel::Fatal => f.write_str("fatal error: "),
        }?;
        f.write_str(&self.message)?;
        if let Some(line) = self.line {
            write!(f, " on line {}", line)?;
        }
        Ok(())
    }
}

/// What the engine reported during one operation.
///
/// Warnings accumulate. Only the first error is kept: it is the one the
/// operation fails with, later ones are usually consequences of it.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub(crate) warnings: Vec<Diagnostic>,
    pub(crate) error: Option<Diagnostic>,
}

impl Diagnostics {
    /// Records a diagnostic and returns `true` if it is the first error.
    pub(crate) fn record(&mut self, diagnostic: Diagnostic) -> bool {
        if diagnostic.level == DiagnosticLevel::Warning {
            tracing::warn!(line = ?diagnostic.line, "raptor: {}", diagnostic.message);
            self.warnings.push(diagnostic);
            false
        } else if self.error.is_none() {
            tracing::debug!(line = ?diagnostic.line, "raptor: {}", diagnostic.message);
            self.error = Some(diagnostic);
            true
        } else {
            tracing::debug!(line = ?diagnostic.line, "raptor (ignored): {}", diagnostic.message);
            false
        }
    }

    pub(crate) fn take_error(&mut self) -> Option<Diagnostic> {
        self.error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(level: DiagnosticLevel, message: &str) -> Diagnostic {
        Diagnostic {
            level,
            message: message.to_owned(),
            line: Some(1),
            column: None,
        }
    }

    #[test]
    fn only_the_first_error_is_kept() {
        let mut diagnostics = Diagnostics::default();
        assert!(!diagnostics.record(diagnostic(DiagnosticLevel::Warning, "w")));
        assert!(diagnostics.record(diagnostic(DiagnosticLevel::Error, "first")));
        assert!(!diagnostics.record(diagnostic(DiagnosticLevel::Fatal, "second")));
        assert_eq!(diagnostics.warnings.len(), 1);
        assert_eq!(diagnostics.take_error().unwrap().message, "first");
        assert!(diagnostics.take_error().is_none());
    }
}
