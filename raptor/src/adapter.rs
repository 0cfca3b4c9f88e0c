//! Backend independent readers and writers.

use crate::backend::{StatementSink, StatementSource};
use crate::diagnostic::Diagnostic;
use crate::engine::Backend;
use crate::error::RaptorError;
use crate::native::{NativeParser, NativeSink};
use crate::process::{PipelineSink, PipelineSource};
use crate::syntax::Syntax;
use oxiri::Iri;
use rio_raptor_api::formatter::StatementsFormatter;
use rio_raptor_api::model::Statement;
use rio_raptor_api::parser::StatementsParser;
use std::collections::VecDeque;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Where a document to parse comes from.
pub enum ParseInput {
    /// A document the engine retrieves itself.
    Iri(String),
    /// A local file, read by the engine.
    File(PathBuf),
    /// Bytes streamed to the engine.
    Reader(Box<dyn Read + Send>),
    /// Bytes already in memory.
    Buffer(Vec<u8>),
}

impl ParseInput {
    pub fn iri(iri: impl Into<String>) -> Self {
        ParseInput::Iri(iri.into())
    }

    pub fn from_reader(read: impl Read + Send + 'static) -> Self {
        ParseInput::Reader(Box::new(read))
    }
}

impl fmt::Debug for ParseInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseInput::Iri(iri) => f.debug_tuple("Iri").field(iri).finish(),
            ParseInput::File(path) => f.debug_tuple("File").field(path).finish(),
            ParseInput::Reader(_) => f.write_str("Reader"),
            ParseInput::Buffer(buffer) => write!(f, "Buffer({} bytes)", buffer.len()),
        }
    }
}

impl From<Vec<u8>> for ParseInput {
    fn from(buffer: Vec<u8>) -> Self {
        ParseInput::Buffer(buffer)
    }
}

impl From<&[u8]> for ParseInput {
    fn from(buffer: &[u8]) -> Self {
        ParseInput::Buffer(buffer.to_vec())
    }
}

impl From<PathBuf> for ParseInput {
    fn from(path: PathBuf) -> Self {
        ParseInput::File(path)
    }
}

impl From<&Path> for ParseInput {
    fn from(path: &Path) -> Self {
        ParseInput::File(path.to_owned())
    }
}

fn check_iri(iri: &str) -> Result<(), RaptorError> {
    Iri::parse(iri)
        .map(|_| ())
        .map_err(|e| RaptorError::argument(format!("invalid IRI '{}': {}", iri, e)))
}

/// A parser for one syntax, built with [`Engine::parser`](crate::Engine::parser).
#[derive(Clone)]
pub struct RaptorParser {
    backend: Backend,
    syntax: Syntax,
    base_iri: Option<String>,
}

impl RaptorParser {
    pub(crate) fn new(backend: Backend, syntax: Syntax) -> Self {
        Self {
            backend,
            syntax,
            base_iri: None,
        }
    }

    /// Sets the IRI relative IRIs of the document are resolved against.
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, RaptorError> {
        let base_iri = base_iri.into();
        check_iri(&base_iri)?;
        self.base_iri = Some(base_iri);
        Ok(self)
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Starts parsing `input`.
    ///
    /// Statements are produced lazily by the returned reader.
    pub fn parse(&self, input: impl Into<ParseInput>) -> Result<RaptorReader, RaptorError> {
        let input = input.into();
        if let ParseInput::Iri(iri) = &input {
            check_iri(iri)?;
        }
        let base_iri = self.base_iri.as_deref();
        let source: Box<dyn StatementSource> = match &self.backend {
            Backend::Native { engine, chunk_size } => Box::new(
                NativeParser::new(*engine, self.syntax, self.base_iri.clone(), *chunk_size)
                    .start(input)?,
            ),
            Backend::Cli(cli) => Box::new(PipelineSource::start(cli, self.syntax, base_iri, input)?),
        };
        tracing::debug!("parsing {} with {}", self.syntax, self.backend_name());
        Ok(RaptorReader {
            source,
            queue: VecDeque::new(),
            error: None,
            done: false,
        })
    }

    pub(crate) fn into_native(self) -> Result<NativeParser, RaptorError> {
        match self.backend {
            Backend::Native { engine, chunk_size } => {
                self.syntax.check_parse()?;
                Ok(NativeParser::new(engine, self.syntax, self.base_iri, chunk_size))
            }
            Backend::Cli(_) => Err(RaptorError::unavailable(
                "raw statements are only available with the libraptor2 backend",
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Native { .. } => "libraptor2",
            Backend::Cli(_) => "rapper",
        }
    }
}

/// The statements of a document, in the order the engine emits them.
///
/// The reader is single pass. It stops after the first error, the statements
/// parsed before it are still returned.
pub struct RaptorReader {
    source: Box<dyn StatementSource>,
    queue: VecDeque<Statement>,
    error: Option<RaptorError>,
    done: bool,
}

impl RaptorReader {
    /// Warnings the engine reported so far.
    pub fn warnings(&self) -> &[Diagnostic] {
        self.source.warnings()
    }

    /// Namespace prefixes declared by the document so far.
    ///
    /// Only `libraptor2` reports them, the `rapper` output does not carry them.
    pub fn prefixes(&self) -> &[(String, String)] {
        self.source.prefixes()
    }

    /// Stops the parse and releases its resources.
    pub fn close(&mut self) {
        self.done = true;
        self.queue.clear();
        self.source.close();
    }

    fn fill(&mut self) {
        while self.queue.is_empty() && self.error.is_none() && !self.source.is_end() {
            if let Err(error) = self.source.step(&mut self.queue) {
                self.error = Some(error);
            }
        }
    }
}

impl Iterator for RaptorReader {
    type Item = Result<Statement, RaptorError>;

    fn next(&mut self) -> Option<Result<Statement, RaptorError>> {
        if self.done {
            return None;
        }
        self.fill();
        if let Some(statement) = self.queue.pop_front() {
            return Some(Ok(statement));
        }
        let error = self.error.take();
        self.close();
        error.map(Err)
    }
}

impl StatementsParser for RaptorReader {
    type Error = RaptorError;

    fn parse_step(
        &mut self,
        on_statement: &mut impl FnMut(Statement) -> Result<(), RaptorError>,
    ) -> Result<(), RaptorError> {
        if !self.done {
            self.fill();
        }
        while let Some(statement) = self.queue.pop_front() {
            on_statement(statement)?;
        }
        if let Some(error) = self.error.take() {
            self.close();
            return Err(error);
        }
        if self.source.is_end() {
            self.done = true;
        }
        Ok(())
    }

    fn is_end(&self) -> bool {
        self.done
    }
}

/// A serializer for one syntax, built with [`Engine::serializer`](crate::Engine::serializer).
#[derive(Clone)]
pub struct RaptorSerializer {
    backend: Backend,
    syntax: Syntax,
    base_iri: Option<String>,
    prefixes: Vec<(String, String)>,
}

impl RaptorSerializer {
    pub(crate) fn new(backend: Backend, syntax: Syntax) -> Self {
        Self {
            backend,
            syntax,
            base_iri: None,
            prefixes: Vec::new(),
        }
    }

    /// Sets the IRI the output IRIs may be written relative to.
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, RaptorError> {
        let base_iri = base_iri.into();
        check_iri(&base_iri)?;
        self.base_iri = Some(base_iri);
        Ok(self)
    }

    /// Declares a namespace prefix the syntax may use to abbreviate IRIs.
    pub fn with_prefix(
        mut self,
        prefix: impl Into<String>,
        iri: impl Into<String>,
    ) -> Result<Self, RaptorError> {
        let prefix = prefix.into();
        let iri = iri.into();
        if !prefix
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(RaptorError::argument(format!("invalid prefix '{}'", prefix)));
        }
        check_iri(&iri)?;
        self.prefixes.push((prefix, iri));
        Ok(self)
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Starts a document written to `write`.
    pub fn serialize<W: Write + 'static>(&self, write: W) -> Result<RaptorWriter<W>, RaptorError> {
        let base_iri = self.base_iri.as_deref();
        let sink: Box<dyn StatementSink<W>> = match &self.backend {
            Backend::Native { engine, .. } => Box::new(NativeSink::start(
                *engine,
                self.syntax,
                base_iri,
                &self.prefixes,
                write,
            )?),
            Backend::Cli(cli) => Box::new(PipelineSink::start(
                cli,
                self.syntax,
                base_iri,
                &self.prefixes,
                write,
            )?),
        };
        Ok(RaptorWriter { sink: Some(sink) })
    }
}

/// A document being written.
///
/// [`finish`](RaptorWriter::finish) must be called to complete it: dropping the
/// writer discards what the engine did not output yet.
pub struct RaptorWriter<W: Write> {
    sink: Option<Box<dyn StatementSink<W>>>,
}

impl<W: Write> RaptorWriter<W> {
    pub fn format(&mut self, statement: &Statement) -> Result<(), RaptorError> {
        self.sink()?.format(statement)
    }

    /// Pushes what the engine already produced to the destination.
    pub fn flush(&mut self) -> Result<(), RaptorError> {
        self.sink()?.flush()
    }

    /// Ends the document and returns the destination.
    pub fn finish(mut self) -> Result<W, RaptorError> {
        match self.sink.take() {
            Some(sink) => sink.finish(),
            None => Err(closed()),
        }
    }

    /// Abandons the document and releases its resources.
    pub fn close(&mut self) {
        self.sink = None;
    }

    /// Warnings the engine reported so far.
    pub fn warnings(&self) -> &[Diagnostic] {
        match &self.sink {
            Some(sink) => sink.warnings(),
            None => &[],
        }
    }

    fn sink(&mut self) -> Result<&mut Box<dyn StatementSink<W>>, RaptorError> {
        self.sink.as_mut().ok_or_else(closed)
    }
}

impl<W: Write> StatementsFormatter for RaptorWriter<W> {
    type Error = RaptorError;

    fn format(&mut self, statement: &Statement) -> Result<(), RaptorError> {
        RaptorWriter::format(self, statement)
    }
}

fn closed() -> RaptorError {
    RaptorError::io_other("the writer is closed")
}
