//! This crate provides the owned RDF data model and the streaming interfaces shared by
//! every backend of the [`rio_raptor`](https://docs.rs/rio_raptor/) bridge.
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_qualifications
)]
#![doc(test(attr(deny(warnings))))]

mod error;
pub mod formatter;
pub mod model;
pub mod parser;

pub use error::{ModelError, ModelErrorKind};
