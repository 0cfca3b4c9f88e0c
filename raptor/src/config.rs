use crate::error::RaptorError;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub(crate) const DEFAULT_CHUNK_SIZE: usize = 4096;
pub(crate) const DEFAULT_FEEDER_CHUNK_SIZE: usize = 8192;
pub(crate) const DEFAULT_NATIVE_CHUNK_SIZE: usize = 64 * 1024;

#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libraptor2.0.dylib", "libraptor2.dylib"];
#[cfg(windows)]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["raptor2.dll", "libraptor2.dll"];
#[cfg(not(any(target_os = "macos", windows)))]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libraptor2.so.0", "libraptor2.so"];

#[cfg(windows)]
const RAPPER_EXECUTABLE: &str = "rapper.exe";
#[cfg(not(windows))]
const RAPPER_EXECUTABLE: &str = "rapper";

/// Which way of reaching the engine to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Use `libraptor2` if it can be loaded, `rapper` otherwise.
    Auto,
    /// Call `libraptor2` in process.
    Native,
    /// Run the `rapper` utility as a subprocess.
    Cli,
}

impl FromStr for BackendKind {
    type Err = RaptorError;

    fn from_str(value: &str) -> Result<Self, RaptorError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(BackendKind::Auto),
            "native" | "ffi" => Ok(BackendKind::Native),
            "cli" | "rapper" => Ok(BackendKind::Cli),
            _ => Err(RaptorError::argument(format!(
                "unknown Raptor backend '{}', expected 'auto', 'native' or 'cli'",
                value
            ))),
        }
    }
}

/// How to find and drive the Raptor engine.
///
/// ```
/// use rio_raptor::{BackendKind, RaptorConfig};
///
/// let config = RaptorConfig::new()
///     .backend(BackendKind::Cli)
///     .rapper_path("/usr/local/bin/rapper")
///     .fallback(true);
/// assert_eq!(config.backend_kind(), BackendKind::Cli);
/// ```
#[derive(Debug, Clone)]
pub struct RaptorConfig {
    backend: BackendKind,
    library_path: Option<PathBuf>,
    rapper_path: Option<PathBuf>,
    fallback: bool,
    chunk_size: usize,
    feeder_chunk_size: usize,
    native_chunk_size: usize,
}

impl Default for RaptorConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Auto,
            library_path: None,
            rapper_path: None,
            fallback: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            feeder_chunk_size: DEFAULT_FEEDER_CHUNK_SIZE,
            native_chunk_size: DEFAULT_NATIVE_CHUNK_SIZE,
        }
    }
}

impl RaptorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the `RIO_RAPTOR_BACKEND`, `RIO_RAPTOR_LIBRARY`, `RIO_RAPTOR_RAPPER`
    /// and `RIO_RAPTOR_FALLBACK` environment variables.
    pub fn from_env() -> Result<Self, RaptorError> {
        Self::from_vars(|name| env::var_os(name))
    }

    pub(crate) fn from_vars(
        var: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self, RaptorError> {
        let mut config = Self::default();
        if let Some(backend) = var("RIO_RAPTOR_BACKEND") {
            config.backend = backend.to_string_lossy().parse()?;
        }
        if let Some(path) = var("RIO_RAPTOR_LIBRARY").filter(|v| !v.is_empty()) {
            config.library_path = Some(path.into());
        }
        if let Some(path) = var("RIO_RAPTOR_RAPPER").filter(|v| !v.is_empty()) {
            config.rapper_path = Some(path.into());
        }
        if let Some(fallback) = var("RIO_RAPTOR_FALLBACK") {
            config.fallback = matches!(
                fallback.to_string_lossy().trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(config)
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Loads `libraptor2` from this exact path instead of the platform names.
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Runs this executable instead of looking `rapper` up in `PATH`.
    pub fn rapper_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rapper_path = Some(path.into());
        self
    }

    /// Allows falling back to the other backend when the requested one is unavailable.
    pub fn fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Size of the reads done on `rapper` output.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Size of the writes done by the thread feeding `rapper` input.
    pub fn feeder_chunk_size(mut self, chunk_size: usize) -> Self {
        self.feeder_chunk_size = chunk_size.max(1);
        self
    }

    /// Size of the chunks handed to `raptor_parser_parse_chunk`.
    pub fn native_chunk_size(mut self, chunk_size: usize) -> Self {
        self.native_chunk_size = chunk_size.max(1);
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend
    }

    pub fn is_fallback_enabled(&self) -> bool {
        self.fallback
    }

    pub(crate) fn configured_library_path(&self) -> Option<&Path> {
        self.library_path.as_deref()
    }

    pub(crate) fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn get_feeder_chunk_size(&self) -> usize {
        self.feeder_chunk_size
    }

    pub(crate) fn get_native_chunk_size(&self) -> usize {
        self.native_chunk_size
    }

    /// Library names or paths to try, in order.
    pub(crate) fn library_candidates(&self) -> Vec<PathBuf> {
        match &self.library_path {
            Some(path) => vec![path.clone()],
            None => DEFAULT_LIBRARY_NAMES.iter().map(PathBuf::from).collect(),
        }
    }

    /// Finds the `rapper` executable.
    pub(crate) fn resolve_rapper(&self) -> Option<PathBuf> {
        match &self.rapper_path {
            Some(path) => {
                if path.components().count() > 1 {
                    Some(path.clone()).filter(|p| p.is_file())
                } else {
                    search_path(path.as_os_str(), env::var_os("PATH"))
                }
            }
            None => search_path(OsStr::new(RAPPER_EXECUTABLE), env::var_os("PATH")),
        }
    }
}

fn search_path(executable: &OsStr, path: Option<OsString>) -> Option<PathBuf> {
    env::split_paths(&path?)
        .map(|directory| directory.join(executable))
        .find(|candidate| candidate.is_file())
}
