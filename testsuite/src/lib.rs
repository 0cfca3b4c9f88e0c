//! Helpers to compare what the Raptor bridge backends produce.
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

mod dataset;
mod isomorphism;

pub use dataset::Dataset;
pub use isomorphism::are_datasets_isomorphic;
