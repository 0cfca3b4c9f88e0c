//! The capabilities every engine backend provides to the readers and writers.

use crate::diagnostic::Diagnostic;
use crate::error::RaptorError;
use rio_raptor_api::model::Statement;
use std::collections::VecDeque;

/// Base IRI used when a document is streamed to the engine without one.
pub(crate) const STREAM_BASE_IRI: &str = "file:///dev/stdin";

/// A running parse.
pub(crate) trait StatementSource {
    /// Makes progress on the parse, appending the statements decoded so far to `queue`.
    ///
    /// Statements pushed before an error is returned are valid.
    fn step(&mut self, queue: &mut VecDeque<Statement>) -> Result<(), RaptorError>;

    fn is_end(&self) -> bool;

    fn warnings(&self) -> &[Diagnostic];

    /// Namespace declarations seen so far, in document order.
    fn prefixes(&self) -> &[(String, String)];

    /// Releases every resource, whatever the state of the parse.
    fn close(&mut self);
}

/// A running serialization into `W`.
pub(crate) trait StatementSink<W> {
    fn format(&mut self, statement: &Statement) -> Result<(), RaptorError>;

    fn flush(&mut self) -> Result<(), RaptorError>;

    /// Ends the document and returns the destination.
    fn finish(self: Box<Self>) -> Result<W, RaptorError>;

    fn warnings(&self) -> &[Diagnostic];
}
