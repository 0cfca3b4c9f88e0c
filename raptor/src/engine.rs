use crate::adapter::{RaptorParser, RaptorSerializer};
use crate::config::{BackendKind, RaptorConfig};
use crate::error::RaptorError;
use crate::native::{self, NativeEngine, NativeParser};
use crate::process::CliEngine;
use crate::syntax::Syntax;
use crate::version::Version;
use std::fmt;

/// The backend an [`Engine`] settled on.
#[derive(Clone)]
pub(crate) enum Backend {
    Native {
        engine: &'static NativeEngine,
        chunk_size: usize,
    },
    Cli(CliEngine),
}

impl Backend {
    fn native(config: &RaptorConfig) -> Result<Self, RaptorError> {
        Ok(Backend::Native {
            engine: native::load(config)?,
            chunk_size: config.get_native_chunk_size(),
        })
    }

    fn cli(config: &RaptorConfig) -> Result<Self, RaptorError> {
        Ok(Backend::Cli(CliEngine::probe(config)?))
    }
}

/// Entry point of the bridge: a selected way of reaching Raptor.
///
/// ```no_run
/// use rio_raptor::{BackendKind, Engine, RaptorConfig, Syntax};
///
/// let engine = Engine::new(&RaptorConfig::new().backend(BackendKind::Cli))?;
/// let statements = engine
///     .parser(Syntax::Turtle)
///     .parse(b"<http://example.com/s> <http://example.com/p> \"o\" .".as_ref())?
///     .collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(statements.len(), 1);
/// # Result::<_, rio_raptor::RaptorError>::Ok(())
/// ```
#[derive(Clone)]
pub struct Engine {
    backend: Backend,
}

impl Engine {
    /// Selects the backend `config` asks for.
    ///
    /// An unavailable backend is an error unless fallback is enabled, in which case
    /// the other backend is tried. [`BackendKind::Auto`] tries `libraptor2`, then `rapper`.
    pub fn new(config: &RaptorConfig) -> Result<Self, RaptorError> {
        let backend = match config.backend_kind() {
            BackendKind::Native => Backend::native(config).or_else(|error| {
                if config.is_fallback_enabled() {
                    tracing::debug!("falling back to rapper: {}", error);
                    Backend::cli(config)
                } else {
                    Err(error)
                }
            })?,
            BackendKind::Cli => Backend::cli(config).or_else(|error| {
                if config.is_fallback_enabled() {
                    tracing::debug!("falling back to libraptor2: {}", error);
                    Backend::native(config)
                } else {
                    Err(error)
                }
            })?,
            BackendKind::Auto => match Backend::native(config) {
                Ok(backend) => backend,
                Err(native_error) => Backend::cli(config).map_err(|cli_error| {
                    RaptorError::unavailable(format!(
                        "neither libraptor2 ({}) nor rapper ({}) can be used",
                        native_error, cli_error
                    ))
                })?,
            },
        };
        let engine = Self { backend };
        tracing::debug!("selected the {:?} Raptor backend", engine.backend_kind());
        Ok(engine)
    }

    /// Selects a backend using [`RaptorConfig::from_env`].
    pub fn from_env() -> Result<Self, RaptorError> {
        Self::new(&RaptorConfig::from_env()?)
    }

    /// [`BackendKind::Native`] or [`BackendKind::Cli`], never `Auto`.
    pub fn backend_kind(&self) -> BackendKind {
        match self.backend {
            Backend::Native { .. } => BackendKind::Native,
            Backend::Cli(_) => BackendKind::Cli,
        }
    }

    /// The version of the engine behind the backend.
    pub fn version(&self) -> Result<Version, RaptorError> {
        match &self.backend {
            Backend::Native { engine, .. } => engine.version(),
            Backend::Cli(cli) => cli.version(),
        }
    }

    /// Checks that the backend can still be used.
    pub fn is_available(&self) -> bool {
        match &self.backend {
            Backend::Native { .. } => true,
            Backend::Cli(cli) => cli.is_available(),
        }
    }

    pub fn supports_parser(&self, syntax: Syntax) -> bool {
        match &self.backend {
            Backend::Native { engine, .. } => engine.supports_parser(syntax),
            Backend::Cli(_) => syntax.can_parse(),
        }
    }

    pub fn supports_serializer(&self, syntax: Syntax) -> bool {
        match &self.backend {
            Backend::Native { engine, .. } => engine.supports_serializer(syntax),
            Backend::Cli(_) => syntax.can_serialize(),
        }
    }

    /// The loaded library, if the native backend is selected.
    pub fn native(&self) -> Option<&'static NativeEngine> {
        match self.backend {
            Backend::Native { engine, .. } => Some(engine),
            Backend::Cli(_) => None,
        }
    }

    pub fn parser(&self, syntax: Syntax) -> RaptorParser {
        RaptorParser::new(self.backend.clone(), syntax)
    }

    pub fn serializer(&self, syntax: Syntax) -> RaptorSerializer {
        RaptorSerializer::new(self.backend.clone(), syntax)
    }

    /// A parser giving access to the statements as `libraptor2` emits them.
    ///
    /// Fails with an unavailable engine error if the `rapper` backend is selected.
    pub fn native_parser(&self, syntax: Syntax) -> Result<NativeParser, RaptorError> {
        self.parser(syntax).into_native()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.backend {
            Backend::Native { engine, .. } => f
                .debug_struct("Engine")
                .field("library", &engine.library_path())
                .field("version", &engine.version_string())
                .finish(),
            Backend::Cli(cli) => f.debug_struct("Engine").field("rapper", &cli.rapper()).finish(),
        }
    }
}
