//! Finite State Entropy decoding.
//!
//! FSE is a tabled variant of asymmetric numeral systems. A decode table is
//! a power-of-two array of cells; decoding walks the table, emitting the
//! current cell's symbol and computing the next state from a baseline plus
//! freshly read bits.
//!
//! ## References
//!
//! - [RFC 8878 Section 4.1](https://datatracker.ietf.org/doc/html/rfc8878#section-4.1)

mod decoder;
mod table;

pub use decoder::FseDecoder;
pub use table::{
    parse_normalized_counts, FseCell, FseTable, LITERAL_LENGTH_DEFAULT_DISTRIBUTION,
    MATCH_LENGTH_DEFAULT_DISTRIBUTION, OFFSET_DEFAULT_DISTRIBUTION,
};

/// Absolute ceiling on any FSE accuracy log in this format.
pub const FSE_MAX_ACCURACY_LOG: u8 = 15;
