//! Huffman decoding for literal bytes.
//!
//! Literals use canonical prefix codes described by a weight per symbol.
//! The description is itself either raw 4-bit nibbles or a small
//! FSE-compressed stream. Decode tables are single-level lookups of
//! `2^max_bits` cells.
//!
//! ## References
//!
//! - [RFC 8878 Section 4.2](https://datatracker.ietf.org/doc/html/rfc8878#section-4.2)

mod decoder;
mod table;

pub use decoder::{decode_four_streams, decode_single_stream, parse_weights};
pub use table::{HuffmanCell, HuffmanTable};

/// Maximum code length for literal Huffman tables.
pub const HUF_MAX_TABLE_LOG: u8 = 11;

/// Maximum accuracy log for the FSE-compressed weight stream.
pub const WEIGHT_FSE_MAX_ACCURACY_LOG: u8 = 6;
