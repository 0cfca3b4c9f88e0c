//! Streaming RDF parsers and serializers backed by the [Raptor 2](https://librdf.org/raptor/) engine.
//!
//! The engine is reached either in process, by loading `libraptor2` at runtime,
//! or by running the `rapper` utility with N-Triples or N-Quads flowing through its pipes.
//! Both paths produce the owned statements of [`rio_raptor_api`].
//!
//! ```no_run
//! use rio_raptor::{Engine, RaptorConfig, Syntax};
//!
//! let engine = Engine::new(&RaptorConfig::from_env()?)?;
//! let mut writer = engine.serializer(Syntax::Turtle).serialize(Vec::new())?;
//! for statement in engine
//!     .parser(Syntax::RdfXml)
//!     .with_base_iri("http://example.com/")?
//!     .parse(std::path::Path::new("data.rdf"))?
//! {
//!     writer.format(&statement?)?;
//! }
//! let _turtle = writer.finish()?;
//! # Result::<_, rio_raptor::RaptorError>::Ok(())
//! ```
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_copy_implementations,
    unsafe_code,
    unused_qualifications
)]
#![doc(test(attr(deny(warnings))))]

mod adapter;
mod backend;
mod config;
mod diagnostic;
mod engine;
mod error;
mod exchange;
mod marshal;
mod native;
mod process;
mod syntax;
mod version;

pub use adapter::{ParseInput, RaptorParser, RaptorReader, RaptorSerializer, RaptorWriter};
pub use config::{BackendKind, RaptorConfig};
pub use diagnostic::{Diagnostic, DiagnosticLevel};
pub use engine::Engine;
pub use error::{RaptorError, RaptorErrorKind};
pub use native::{NativeEngine, NativeParser, RawStatement};
pub use syntax::Syntax;
pub use version::Version;
