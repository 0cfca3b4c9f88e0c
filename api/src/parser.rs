//! Interfaces for statement parsers.

use crate::model::Statement;
use std::collections::VecDeque;
use std::error::Error;

/// A parser returning owned [`Statement`](../model/struct.Statement.html)s.
pub trait StatementsParser: Sized {
    type Error: Error;

    /// Parses the complete document and calls `on_statement` each time a new statement is read.
    fn parse_all(
        &mut self,
        on_statement: &mut impl FnMut(Statement) -> Result<(), Self::Error>,
    ) -> Result<(), Self::Error> {
        while !self.is_end() {
            self.parse_step(on_statement)?;
        }
        Ok(())
    }

    /// Parses a small chunk of the document and calls `on_statement` each time a new statement is read.
    ///
    /// This method should be called as long as `is_end` returns false.
    fn parse_step(
        &mut self,
        on_statement: &mut impl FnMut(Statement) -> Result<(), Self::Error>,
    ) -> Result<(), Self::Error>;

    /// Return `true` if the complete document has been consumed by the parser.
    fn is_end(&self) -> bool;

    /// Converts the parser into a `Result<T, E>` iterator.
    ///
    /// `convert_statement` is a function converting a [`Statement`](../model/struct.Statement.html) to `T`.
    fn into_iter<T, E: From<Self::Error>, F: FnMut(Statement) -> Result<T, E>>(
        self,
        convert_statement: F,
    ) -> StatementsParserIterator<T, E, F, Self> {
        StatementsParserIterator {
            parser: self,
            buffer: VecDeque::new(),
            convert_statement,
        }
    }
}

/// Created with the method [`into_iter`](trait.StatementsParser.html#method.into_iter).
pub struct StatementsParserIterator<
    T,
    E: From<P::Error>,
    F: FnMut(Statement) -> Result<T, E>,
    P: StatementsParser,
> {
    parser: P,
    buffer: VecDeque<Result<T, E>>,
    convert_statement: F,
}

impl<T, E: From<P::Error>, F: FnMut(Statement) -> Result<T, E>, P: StatementsParser> Iterator
    for StatementsParserIterator<T, E, F, P>
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Result<T, E>> {
        loop {
            if let Some(r) = self.buffer.pop_front() {
                return Some(r);
            }
            if self.parser.is_end() {
                return None;
            }

            let buffer = &mut self.buffer;
            let convert_statement = &mut self.convert_statement;
            if let Err(e) = self.parser.parse_step(&mut |s| {
                buffer.push_back(convert_statement(s));
                Ok(())
            }) {
                return Some(Err(e.into()));
            }
        }
    }
}
