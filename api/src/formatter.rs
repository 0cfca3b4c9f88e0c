//! Interfaces for statement formatters.

use crate::model::Statement;
use std::error::Error;

/// A formatter for [`Statement`](../model/struct.Statement.html)s.
pub trait StatementsFormatter {
    type Error: Error;

    /// Writes a statement
    fn format(&mut self, statement: &Statement) -> Result<(), Self::Error>;
}
