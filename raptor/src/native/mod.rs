//! In process access to `libraptor2`, loaded at runtime.
#![allow(unsafe_code)]

mod callbacks;
mod ffi;
mod iostream;
mod parser;
mod serializer;
mod term;
mod world;

pub use parser::NativeParser;
pub use term::RawStatement;
pub use world::NativeEngine;

pub(crate) use parser::NativeSource;
pub(crate) use serializer::NativeSink;
pub(crate) use world::load;
