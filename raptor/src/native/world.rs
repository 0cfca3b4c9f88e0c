use super::ffi::*;
use crate::config::RaptorConfig;
use crate::diagnostic::{Diagnostic, DiagnosticLevel, Diagnostics};
use crate::error::RaptorError;
use crate::syntax::Syntax;
use crate::version::Version;
use libloading::Library;
use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static ENGINE: OnceLock<NativeEngine> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());
static WORLD_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = RefCell::new(None);
    static ROUTE: Cell<Route> = Cell::new(Route::NONE);
}

/// Where the world log handler delivers messages on this thread.
#[derive(Clone, Copy)]
pub(crate) struct Route {
    pub diagnostics: *mut Diagnostics,
    /// Parser to abort on the first error, may be null.
    pub parser: *mut raptor_parser,
}

impl Route {
    pub(crate) const NONE: Route = Route {
        diagnostics: ptr::null_mut(),
        parser: ptr::null_mut(),
    };
}

/// The process-wide `libraptor2` instance.
///
/// It is loaded and opened once, then lives until the process exits.
pub struct NativeEngine {
    pub(crate) api: RaptorApi,
    world: *mut raptor_world,
    library_path: PathBuf,
    version: String,
}

// The world pointer is only dereferenced by the engine while WORLD_LOCK is held.
unsafe impl Send for NativeEngine {}
unsafe impl Sync for NativeEngine {}

/// Returns the global engine, loading it on first success.
///
/// Failures are not remembered: a later call with another configuration may
/// still succeed. Once an engine is loaded it is returned whatever the configuration says.
pub(crate) fn load(config: &RaptorConfig) -> Result<&'static NativeEngine, RaptorError> {
    if let Some(path) = config.configured_library_path() {
        if path.components().count() > 1 && !path.exists() {
            return Err(RaptorError::unavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }
    }
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }
    let _init = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }
    let engine = NativeEngine::open(config)?;
    Ok(ENGINE.get_or_init(|| engine))
}

impl NativeEngine {
    fn open(config: &RaptorConfig) -> Result<Self, RaptorError> {
        let mut failures = Vec::new();
        for candidate in config.library_candidates() {
            match Self::open_library(&candidate) {
                Ok(engine) => {
                    tracing::debug!(
                        "loaded {} version {}",
                        engine.library_path.display(),
                        engine.version
                    );
                    return Ok(engine);
                }
                Err(error) => {
                    tracing::debug!("cannot use {}: {}", candidate.display(), error);
                    failures.push(format!("{}: {}", candidate.display(), error));
                }
            }
        }
        Err(RaptorError::unavailable(failures.join("; ")))
    }

    fn open_library(path: &Path) -> Result<Self, String> {
        // SAFETY: loading runs the library initializers, we only ever load Raptor 2 builds
        // found under the names it is installed with or the path the application gave.
        let library = unsafe { Library::new(path) }.map_err(|e| e.to_string())?;
        // SAFETY: the declared signatures are the ones of the Raptor 2 public header.
        let api = unsafe { RaptorApi::load(library) }.map_err(|e| e.to_string())?;
        // SAFETY: both data symbols are immutable globals initialized by the library.
        let (version_decimal, version) = unsafe {
            let string = *api.version_string;
            let version = if string.is_null() {
                String::new()
            } else {
                CStr::from_ptr(string).to_string_lossy().into_owned()
            };
            (*api.version_decimal, version)
        };
        if version_decimal < 20000 {
            return Err(format!("Raptor {} is too old, 2.0.0 or later is required", version));
        }
        // SAFETY: plain constructor calls, the world is checked before use.
        let world = unsafe { (api.new_world_internal)(version_decimal) };
        if world.is_null() {
            return Err("raptor_new_world failed".to_owned());
        }
        unsafe {
            if (api.world_open)(world) != 0 {
                return Err("raptor_world_open failed".to_owned());
            }
            (api.world_set_log_handler)(world, ptr::null_mut(), Some(log_handler));
        }
        Ok(Self {
            api,
            world,
            library_path: path.to_owned(),
            version,
        })
    }

    /// The version string reported by the library, like `2.0.15`.
    pub fn version_string(&self) -> &str {
        &self.version
    }

    pub fn version(&self) -> Result<Version, RaptorError> {
        self.version.parse()
    }

    /// The path or name the library was loaded from.
    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    pub fn supports_parser(&self, syntax: Syntax) -> bool {
        syntax.can_parse() && self.is_name(syntax, self.api.world_is_parser_name)
    }

    pub fn supports_serializer(&self, syntax: Syntax) -> bool {
        syntax.can_serialize() && self.is_name(syntax, self.api.world_is_serializer_name)
    }

    fn is_name(
        &self,
        syntax: Syntax,
        check: unsafe extern "C" fn(*mut raptor_world, *const c_char) -> c_int,
    ) -> bool {
        let guard = self.lock();
        let name = match CString::new(syntax.name()) {
            Ok(name) => name,
            Err(_) => return false,
        };
        // SAFETY: the world is open and the lock is held.
        unsafe { check(guard.world(), name.as_ptr()) != 0 }
    }

    /// Takes the world lock. It is re-entrant on the current thread.
    pub(crate) fn lock(&self) -> WorldGuard<'_> {
        DEPTH.with(|depth| {
            if depth.get() == 0 {
                let held = WORLD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
                HELD.with(|h| *h.borrow_mut() = Some(held));
            }
            depth.set(depth.get() + 1);
        });
        WorldGuard {
            engine: self,
            saved_route: ROUTE.with(Cell::get),
            _not_send: PhantomData,
        }
    }
}

/// Proof that the current thread holds the world lock.
///
/// It also scopes where engine log messages go: the route set with
/// [`WorldGuard::route`] is restored when the guard is dropped.
pub(crate) struct WorldGuard<'e> {
    engine: &'e NativeEngine,
    saved_route: Route,
    _not_send: PhantomData<*const ()>,
}

impl<'e> WorldGuard<'e> {
    pub(crate) fn api(&self) -> &'e RaptorApi {
        &self.engine.api
    }

    pub(crate) fn world(&self) -> *mut raptor_world {
        self.engine.world
    }

    /// Delivers the engine messages emitted under this guard to `route`.
    pub(crate) fn route(&self, route: Route) {
        ROUTE.with(|r| r.set(route));
    }
}

impl Drop for WorldGuard<'_> {
    fn drop(&mut self) {
        ROUTE.with(|r| r.set(self.saved_route));
        DEPTH.with(|depth| {
            depth.set(depth.get() - 1);
            if depth.get() == 0 {
                HELD.with(|h| h.borrow_mut().take());
            }
        });
    }
}

fn line_or_column(value: c_int) -> Option<u64> {
    u64::try_from(value).ok()
}

/// Reads a log message the engine hands to the log handler.
///
/// # Safety
///
/// `message` must be valid for the duration of the call.
unsafe fn decode_message(message: &raptor_log_message) -> Diagnostic {
    let level = match message.level {
        RAPTOR_LOG_LEVEL_FATAL => DiagnosticLevel::Fatal,
        RAPTOR_LOG_LEVEL_ERROR => DiagnosticLevel::Error,
        _ => DiagnosticLevel::Warning,
    };
    let text = if message.text.is_null() {
        String::new()
    } else {
        CStr::from_ptr(message.text).to_string_lossy().into_owned()
    };
    let (line, column) = match message.locator.as_ref() {
        Some(locator) => (line_or_column(locator.line), line_or_column(locator.column)),
        None => (None, None),
    };
    Diagnostic {
        level,
        message: text,
        line,
        column: line.and(column),
    }
}

unsafe extern "C" fn log_handler(_user_data: *mut c_void, message: *mut raptor_log_message) {
    let message = match message.as_ref() {
        Some(message) => message,
        None => return,
    };
    if message.level < RAPTOR_LOG_LEVEL_WARN {
        return;
    }
    // Unwinding into C is undefined behavior, a panic here only loses the message.
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        let diagnostic = decode_message(message);
        let route = ROUTE.with(Cell::get);
        match route.diagnostics.as_mut() {
            Some(diagnostics) => {
                if diagnostics.record(diagnostic) && !route.parser.is_null() {
                    if let Some(engine) = ENGINE.get() {
                        (engine.api.parser_parse_abort)(route.parser);
                    }
                }
            }
            None => match diagnostic.level {
                DiagnosticLevel::Warning => tracing::warn!("raptor: {}", diagnostic),
                _ => tracing::error!("raptor: {}", diagnostic),
            },
        }
    }));
}
