//! Core abstractions for the stolas decompression crates.
//!
//! This crate defines the error taxonomy, the decompression trait surface,
//! and stream bookkeeping types shared by the format crates. It contains no
//! format-specific logic.

pub mod error;
pub mod stream;
pub mod traits;

pub use error::{Error, Result};
pub use stream::{StreamConfig, StreamState};
pub use traits::{Decompressor, DictionaryDecompressor, StreamingDecompressor};
