use super::callbacks::{namespace_handler, statement_handler, EventHandler, Registry};
use super::ffi::*;
use super::iostream::IoStream;
use super::term::{uri_ptr, RawStatement, Uri};
use super::world::{NativeEngine, Route, WorldGuard};
use crate::adapter::ParseInput;
use crate::backend::{StatementSource, STREAM_BASE_IRI};
use crate::diagnostic::Diagnostic;
use crate::error::RaptorError;
use crate::marshal::DecodingSession;
use crate::syntax::Syntax;
use rio_raptor_api::model::Statement;
use std::collections::VecDeque;
use std::ffi::CString;
use std::io::{self, Cursor, Read};
use std::os::raw::{c_int, c_void};
use std::panic;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

/// An owned `raptor_parser` together with the registry its callbacks use.
struct ParserHandle<H: EventHandler> {
    engine: &'static NativeEngine,
    syntax: Syntax,
    ptr: NonNull<raptor_parser>,
    registry: NonNull<Registry<H>>,
}

impl<H: EventHandler> ParserHandle<H> {
    fn new(engine: &'static NativeEngine, syntax: Syntax, handler: H) -> Result<Self, RaptorError> {
        syntax.check_parse()?;
        let name = CString::new(syntax.name())
            .map_err(|_| RaptorError::argument("invalid parser name"))?;
        let guard = engine.lock();
        let api = guard.api();
        // SAFETY: the world is open and the lock is held.
        let ptr = NonNull::new(unsafe { (api.new_parser)(guard.world(), name.as_ptr()) })
            .ok_or_else(|| {
                RaptorError::argument(format!("libraptor2 has no {} parser", syntax))
            })?;
        let mut registry = Box::new(Registry::new(engine, handler));
        registry.parser = ptr.as_ptr();
        let registry = NonNull::from(Box::leak(registry));
        // SAFETY: the registry outlives the parser, see Drop.
        unsafe {
            (api.parser_set_statement_handler)(
                ptr.as_ptr(),
                registry.as_ptr() as *mut c_void,
                Some(statement_handler::<H>),
            );
            (api.parser_set_namespace_handler)(
                ptr.as_ptr(),
                registry.as_ptr() as *mut c_void,
                Some(namespace_handler::<H>),
            );
        }
        tracing::debug!("created native {} parser", syntax);
        Ok(Self {
            engine,
            syntax,
            ptr,
            registry,
        })
    }

    fn registry(&mut self) -> &mut Registry<H> {
        // SAFETY: no native call is running, so nothing else uses the registry.
        unsafe { self.registry.as_mut() }
    }

    fn registry_ref(&self) -> &Registry<H> {
        // SAFETY: same as `registry`.
        unsafe { self.registry.as_ref() }
    }

    /// Runs a native call on the parser, turning what the callbacks recorded into a result.
    fn call(
        &mut self,
        f: impl FnOnce(&WorldGuard<'_>, *mut raptor_parser) -> Result<c_int, RaptorError>,
    ) -> Result<(), RaptorError> {
        let status = {
            let guard = self.engine.lock();
            guard.route(Route {
                // SAFETY: the field address is taken without creating a reference.
                diagnostics: unsafe { ptr::addr_of_mut!((*self.registry.as_ptr()).diagnostics) },
                parser: self.ptr.as_ptr(),
            });
            f(&guard, self.ptr.as_ptr())
        };
        let syntax = self.syntax;
        let registry = self.registry();
        if let Some(payload) = registry.panic.take() {
            panic::resume_unwind(payload);
        }
        let status = status?;
        if let Some(failure) = registry.failure.take() {
            return Err(failure);
        }
        if let Some(diagnostic) = registry.diagnostics.take_error() {
            return Err(diagnostic.into_parse_error());
        }
        if status != 0 {
            return Err(RaptorError::parse(
                format!("the {} parser failed", syntax),
                None,
                None,
            ));
        }
        Ok(())
    }

    fn parse_iri(&mut self, iri: &str, base_iri: Option<&str>) -> Result<(), RaptorError> {
        self.call(|guard, parser| {
            let uri = Uri::new(guard, iri)?;
            let base = base_iri.map(|b| Uri::new(guard, b)).transpose()?;
            // SAFETY: both URIs outlive the call, the lock is held.
            Ok(unsafe { (guard.api().parser_parse_uri)(parser, uri.as_ptr(), uri_ptr(&base)) })
        })
    }

    fn parse_file(&mut self, path: &Path, base_iri: Option<&str>) -> Result<(), RaptorError> {
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a file", path.display()),
            )
            .into());
        }
        self.call(|guard, parser| {
            let uri = Uri::from_path(guard, path)?;
            let base = base_iri.map(|b| Uri::new(guard, b)).transpose()?;
            // SAFETY: both URIs outlive the call, the lock is held.
            Ok(unsafe { (guard.api().parser_parse_file)(parser, uri.as_ptr(), uri_ptr(&base)) })
        })
    }

    /// Parses a whole document pulled through a read iostream.
    fn parse_stream(&mut self, read: impl Read, base_iri: Option<&str>) -> Result<(), RaptorError> {
        let engine = self.engine;
        self.call(|guard, parser| {
            let mut stream = IoStream::reader(guard, engine, read)?;
            let base = Uri::new(guard, base_iri.unwrap_or(STREAM_BASE_IRI))?;
            // SAFETY: the stream and the base URI outlive the call, the lock is held.
            let status = unsafe {
                (guard.api().parser_parse_iostream)(parser, stream.as_ptr(), base.as_ptr())
            };
            match stream.take_error() {
                Some(error) => Err(error.into()),
                None => Ok(status),
            }
        })
    }
}

impl<H: EventHandler> Drop for ParserHandle<H> {
    fn drop(&mut self) {
        let guard = self.engine.lock();
        // SAFETY: the parser is freed first so no callback can reach the registry
        // once it is dropped. Both are owned and released once.
        unsafe {
            (guard.api().free_parser)(self.ptr.as_ptr());
            drop(Box::from_raw(self.registry.as_ptr()));
        }
    }
}

/// A parser calling `libraptor2` in process.
///
/// Values of this type and the readers they create are bound to the thread that
/// created them.
pub struct NativeParser {
    engine: &'static NativeEngine,
    syntax: Syntax,
    base_iri: Option<String>,
    chunk_size: usize,
}

impl NativeParser {
    pub(crate) fn new(
        engine: &'static NativeEngine,
        syntax: Syntax,
        base_iri: Option<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            engine,
            syntax,
            base_iri,
            chunk_size,
        }
    }

    /// Parses `input` handing each statement to `on_statement` as the engine emits it.
    ///
    /// Nothing is copied: the [`RawStatement`] borrows engine memory and cannot
    /// outlive the callback. An error returned by the callback aborts the parse
    /// and is returned. On success the warnings of the engine are returned.
    pub fn parse_raw(
        self,
        input: impl Into<ParseInput>,
        on_statement: impl FnMut(RawStatement<'_>) -> Result<(), RaptorError>,
    ) -> Result<Vec<Diagnostic>, RaptorError> {
        let mut handle = ParserHandle::new(self.engine, self.syntax, RawHandler(on_statement))?;
        let base_iri = self.base_iri.as_deref();
        match input.into() {
            ParseInput::Iri(iri) => handle.parse_iri(&iri, base_iri),
            ParseInput::File(path) => handle.parse_file(&path, base_iri),
            ParseInput::Reader(read) => handle.parse_stream(read, base_iri),
            ParseInput::Buffer(buffer) => handle.parse_stream(Cursor::new(buffer), base_iri),
        }?;
        Ok(std::mem::take(&mut handle.registry().diagnostics.warnings))
    }

    pub(crate) fn start(self, input: ParseInput) -> Result<NativeSource, RaptorError> {
        let handle = ParserHandle::new(self.engine, self.syntax, QueueHandler::default())?;
        let input = match input {
            ParseInput::Iri(iri) => NativeInput::Iri(iri),
            ParseInput::File(path) => NativeInput::File(path),
            ParseInput::Reader(read) => NativeInput::Stream(read),
            ParseInput::Buffer(buffer) => NativeInput::Stream(Box::new(Cursor::new(buffer))),
        };
        Ok(NativeSource {
            handle: Some(handle),
            input,
            base_iri: self.base_iri,
            chunk: vec![0; self.chunk_size],
            started: false,
            end: false,
        })
    }
}

struct RawHandler<F>(F);

impl<F: FnMut(RawStatement<'_>) -> Result<(), RaptorError>> EventHandler for RawHandler<F> {
    fn on_statement(&mut self, statement: RawStatement<'_>) -> Result<(), RaptorError> {
        (self.0)(statement)
    }
}

#[derive(Default)]
struct QueueHandler {
    session: DecodingSession,
    queue: VecDeque<Statement>,
    prefixes: Vec<(String, String)>,
}

impl EventHandler for QueueHandler {
    fn on_statement(&mut self, raw: RawStatement<'_>) -> Result<(), RaptorError> {
        let session = &mut self.session;
        let statement = Statement {
            subject: session.subject(raw.subject()?)?,
            predicate: session.named_node(raw.predicate()?),
            object: session.term(raw.object()?)?,
            graph_name: raw.graph_name()?.map(|g| session.graph_name(g)),
        };
        self.queue.push_back(statement);
        Ok(())
    }

    fn on_namespace(&mut self, prefix: &str, iri: &str) {
        self.prefixes.push((prefix.to_owned(), iri.to_owned()));
    }
}

enum NativeInput {
    Iri(String),
    File(PathBuf),
    Stream(Box<dyn Read + Send>),
}

/// A streaming native parse.
///
/// IRI and file inputs are parsed by a single native call on the first step.
/// Readers are pushed to the engine one chunk per step.
pub(crate) struct NativeSource {
    handle: Option<ParserHandle<QueueHandler>>,
    input: NativeInput,
    base_iri: Option<String>,
    chunk: Vec<u8>,
    started: bool,
    end: bool,
}

impl NativeSource {
    fn advance(&mut self) -> Result<(), RaptorError> {
        let handle = match &mut self.handle {
            Some(handle) => handle,
            None => {
                self.end = true;
                return Ok(());
            }
        };
        let base_iri = self.base_iri.as_deref();
        match &mut self.input {
            NativeInput::Iri(iri) => {
                self.end = true;
                handle.parse_iri(iri, base_iri)
            }
            NativeInput::File(path) => {
                self.end = true;
                handle.parse_file(path, base_iri)
            }
            NativeInput::Stream(read) => {
                if !self.started {
                    self.started = true;
                    handle.call(|guard, parser| {
                        let base = Uri::new(guard, base_iri.unwrap_or(STREAM_BASE_IRI))?;
                        // SAFETY: the parser copies the base URI, the lock is held.
                        Ok(unsafe { (guard.api().parser_parse_start)(parser, base.as_ptr()) })
                    })?;
                }
                let len = read_chunk(read, &mut self.chunk)?;
                let is_end = len == 0;
                if is_end {
                    self.end = true;
                }
                let chunk = &self.chunk[..len];
                tracing::trace!("pushing {} bytes to the native parser", len);
                handle.call(|guard, parser| {
                    // SAFETY: the chunk is only read during the call, the lock is held.
                    Ok(unsafe {
                        (guard.api().parser_parse_chunk)(
                            parser,
                            chunk.as_ptr(),
                            chunk.len(),
                            c_int::from(is_end),
                        )
                    })
                })
            }
        }
    }
}

fn read_chunk(read: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match read.read(buffer) {
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

impl StatementSource for NativeSource {
    fn step(&mut self, queue: &mut VecDeque<Statement>) -> Result<(), RaptorError> {
        if self.end {
            return Ok(());
        }
        let result = self.advance();
        if let Some(handle) = &mut self.handle {
            queue.extend(handle.registry().handler.queue.drain(..));
        }
        if result.is_err() {
            self.end = true;
        }
        result
    }

    fn is_end(&self) -> bool {
        self.end
    }

    fn warnings(&self) -> &[Diagnostic] {
        match &self.handle {
            Some(handle) => &handle.registry_ref().diagnostics.warnings,
            None => &[],
        }
    }

    fn prefixes(&self) -> &[(String, String)] {
        match &self.handle {
            Some(handle) => &handle.registry_ref().handler.prefixes,
            None => &[],
        }
    }

    fn close(&mut self) {
        self.end = true;
        self.handle = None;
    }
}
