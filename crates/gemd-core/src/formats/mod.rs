//! # Formats
//!
//! Serialization of templates, specs and runs through an injected encoder.
//! File I/O is done by the callers (registry and node dumps); encoders are
//! pure transformations.

pub mod encoder;

pub use encoder::{Depth, Encoder, JsonEncoder};
