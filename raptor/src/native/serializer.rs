use super::ffi::*;
use super::iostream::IoStream;
use super::term::{uri_ptr, TermArena, Uri};
use super::world::{NativeEngine, Route, WorldGuard};
use crate::backend::StatementSink;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::RaptorError;
use crate::syntax::Syntax;
use rio_raptor_api::model::Statement;
use std::ffi::CString;
use std::io::Write;
use std::mem::MaybeUninit;
use std::os::raw::{c_int, c_uchar};
use std::ptr::{self, NonNull};

/// A serialization through `libraptor2`, writing into `W`.
pub(crate) struct NativeSink<W: Write> {
    engine: &'static NativeEngine,
    syntax: Syntax,
    ptr: Option<NonNull<raptor_serializer>>,
    stream: Option<IoStream<W>>,
    diagnostics: Box<Diagnostics>,
}

impl<W: Write> NativeSink<W> {
    pub(crate) fn start(
        engine: &'static NativeEngine,
        syntax: Syntax,
        base_iri: Option<&str>,
        prefixes: &[(String, String)],
        write: W,
    ) -> Result<Self, RaptorError> {
        syntax.check_serialize()?;
        let name = CString::new(syntax.name())
            .map_err(|_| RaptorError::argument("invalid serializer name"))?;
        let mut sink = {
            let guard = engine.lock();
            let stream = IoStream::writer(&guard, engine, write)?;
            // SAFETY: the world is open and the lock is held.
            let ptr = NonNull::new(unsafe { (guard.api().new_serializer)(guard.world(), name.as_ptr()) })
                .ok_or_else(|| {
                    RaptorError::argument(format!("libraptor2 has no {} serializer", syntax))
                })?;
            Self {
                engine,
                syntax,
                ptr: Some(ptr),
                stream: Some(stream),
                diagnostics: Box::default(),
            }
        };
        sink.call(|guard, serializer, stream| {
            let base = base_iri.map(|b| Uri::new(guard, b)).transpose()?;
            // SAFETY: the iostream outlives the serializer, see Drop.
            Ok(unsafe {
                (guard.api().serializer_start_to_iostream)(serializer, uri_ptr(&base), stream)
            })
        })?;
        for (prefix, iri) in prefixes {
            let prefix = CString::new(prefix.as_str()).map_err(|_| {
                RaptorError::argument(format!("the prefix '{}' contains a NUL byte", prefix))
            })?;
            sink.call(|guard, serializer, _| {
                let uri = Uri::new(guard, iri)?;
                // SAFETY: the serializer copies both the URI and the prefix.
                Ok(unsafe {
                    (guard.api().serializer_set_namespace)(
                        serializer,
                        uri.as_ptr(),
                        prefix.as_ptr() as *const c_uchar,
                    )
                })
            })?;
        }
        tracing::debug!("started native {} serializer", syntax);
        Ok(sink)
    }

    fn call(
        &mut self,
        f: impl FnOnce(&WorldGuard<'_>, *mut raptor_serializer, *mut raptor_iostream) -> Result<c_int, RaptorError>,
    ) -> Result<(), RaptorError> {
        let (serializer, stream) = match (self.ptr, &mut self.stream) {
            (Some(ptr), Some(stream)) => (ptr.as_ptr(), stream),
            _ => return Err(RaptorError::io_other("the serializer is closed")),
        };
        let status = {
            let guard = self.engine.lock();
            guard.route(Route {
                diagnostics: &mut *self.diagnostics,
                parser: ptr::null_mut(),
            });
            f(&guard, serializer, stream.as_ptr())
        };
        if let Some(error) = stream.take_error() {
            return Err(error.into());
        }
        let status = status?;
        if let Some(diagnostic) = self.diagnostics.take_error() {
            return Err(diagnostic.into_serialize_error());
        }
        if status != 0 {
            return Err(RaptorError::serialize(
                format!("the {} serializer failed", self.syntax),
                None,
            ));
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            let guard = self.engine.lock();
            // SAFETY: the serializer is owned and freed once, before its iostream.
            unsafe { (guard.api().free_serializer)(ptr.as_ptr()) }
        }
        self.stream = None;
    }
}

impl<W: Write> StatementSink<W> for NativeSink<W> {
    fn format(&mut self, statement: &Statement) -> Result<(), RaptorError> {
        if statement.graph_name.is_some() && !self.syntax.supports_graphs() {
            return Err(RaptorError::argument(format!(
                "the {} syntax cannot serialize the graph name of {}",
                self.syntax, statement
            )));
        }
        self.call(|guard, serializer, _| {
            let mut arena = TermArena::new(guard);
            let mut raw = MaybeUninit::<raptor_statement>::uninit();
            // SAFETY: raptor_statement_init fully initializes the struct. The terms
            // are owned by the arena and outlive the call, the serializer copies
            // what it keeps.
            unsafe {
                (guard.api().statement_init)(raw.as_mut_ptr(), guard.world());
                let mut raw = raw.assume_init();
                raw.subject = arena.subject(&statement.subject)?;
                raw.predicate = arena.named_node(&statement.predicate)?;
                raw.object = arena.term(&statement.object)?;
                raw.graph = match &statement.graph_name {
                    Some(graph_name) => arena.graph_name(graph_name)?,
                    None => ptr::null_mut(),
                };
                Ok((guard.api().serializer_serialize_statement)(serializer, &mut raw))
            }
        })
    }

    fn flush(&mut self) -> Result<(), RaptorError> {
        self.call(|guard, serializer, _| {
            // SAFETY: the lock is held.
            Ok(unsafe { (guard.api().serializer_flush)(serializer) })
        })
    }

    fn finish(mut self: Box<Self>) -> Result<W, RaptorError> {
        self.call(|guard, serializer, _| {
            // SAFETY: the lock is held.
            Ok(unsafe { (guard.api().serializer_serialize_end)(serializer) })
        })?;
        if let Some(ptr) = self.ptr.take() {
            let guard = self.engine.lock();
            // SAFETY: the serializer is owned and freed once, before its iostream.
            unsafe { (guard.api().free_serializer)(ptr.as_ptr()) }
        }
        let stream = self
            .stream
            .take()
            .ok_or_else(|| RaptorError::io_other("the serializer is closed"))?;
        let mut write = stream.into_inner()?;
        write.flush()?;
        Ok(write)
    }

    fn warnings(&self) -> &[Diagnostic] {
        &self.diagnostics.warnings
    }
}

impl<W: Write> Drop for NativeSink<W> {
    fn drop(&mut self) {
        self.release();
    }
}
