use super::ffi::*;
use super::term::RawStatement;
use super::world::NativeEngine;
use crate::diagnostic::Diagnostics;
use crate::error::RaptorError;
use std::any::Any;
use std::os::raw::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::{slice, str};

/// What a parser does with the events the engine emits.
pub(crate) trait EventHandler {
    fn on_statement(&mut self, statement: RawStatement<'_>) -> Result<(), RaptorError>;

    fn on_namespace(&mut self, _prefix: &str, _iri: &str) {}
}

/// Everything the parser callbacks need, at a stable address for the whole parse.
pub(crate) struct Registry<H> {
    pub(crate) engine: &'static NativeEngine,
    pub(crate) handler: H,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) failure: Option<RaptorError>,
    pub(crate) panic: Option<Box<dyn Any + Send>>,
    pub(crate) parser: *mut raptor_parser,
}

impl<H> Registry<H> {
    pub(crate) fn new(engine: &'static NativeEngine, handler: H) -> Self {
        Self {
            engine,
            handler,
            diagnostics: Diagnostics::default(),
            failure: None,
            panic: None,
            parser: std::ptr::null_mut(),
        }
    }

    fn is_stopped(&self) -> bool {
        self.failure.is_some() || self.panic.is_some()
    }

    fn stop(&mut self) {
        if !self.parser.is_null() {
            // SAFETY: called from inside a parse on this parser, under the world lock.
            unsafe { (self.engine.api.parser_parse_abort)(self.parser) }
        }
    }
}

pub(crate) unsafe extern "C" fn statement_handler<H: EventHandler>(
    user_data: *mut c_void,
    statement: *mut raptor_statement,
) {
    let registry = match (user_data as *mut Registry<H>).as_mut() {
        Some(registry) => registry,
        None => return,
    };
    let statement = match statement.as_ref() {
        Some(statement) => statement,
        None => return,
    };
    if registry.is_stopped() {
        return;
    }
    let raw = RawStatement::new(&registry.engine.api, statement);
    let handler = &mut registry.handler;
    match panic::catch_unwind(AssertUnwindSafe(|| handler.on_statement(raw))) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            registry.failure = Some(error);
            registry.stop();
        }
        Err(payload) => {
            registry.panic = Some(payload);
            registry.stop();
        }
    }
}

pub(crate) unsafe extern "C" fn namespace_handler<H: EventHandler>(
    user_data: *mut c_void,
    namespace: *mut raptor_namespace,
) {
    let registry = match (user_data as *mut Registry<H>).as_mut() {
        Some(registry) => registry,
        None => return,
    };
    if namespace.is_null() || registry.is_stopped() {
        return;
    }
    let api = &registry.engine.api;
    let mut prefix_len = 0;
    let prefix = (api.namespace_get_counted_prefix)(namespace, &mut prefix_len);
    let prefix = if prefix.is_null() {
        Ok("")
    } else {
        str::from_utf8(slice::from_raw_parts(prefix, prefix_len))
    };
    let uri = (api.namespace_get_uri)(namespace);
    if uri.is_null() {
        return;
    }
    let mut iri_len = 0;
    let iri = (api.uri_as_counted_string)(uri, &mut iri_len);
    if iri.is_null() {
        return;
    }
    let iri = str::from_utf8(slice::from_raw_parts(iri, iri_len));
    if let (Ok(prefix), Ok(iri)) = (prefix, iri) {
        let handler = &mut registry.handler;
        if let Err(payload) =
            panic::catch_unwind(AssertUnwindSafe(|| handler.on_namespace(prefix, iri)))
        {
            registry.panic = Some(payload);
            registry.stop();
        }
    }
}
