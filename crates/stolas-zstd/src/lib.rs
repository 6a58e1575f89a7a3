//! Streaming Zstandard (RFC 8878) decompression in pure Rust.
//!
//! Implements the full decode path: frame and block headers, FSE and
//! Huffman entropy decoding, literals and sequence sections, sequence
//! execution against the sliding window, dictionaries, and content
//! checksums.
//!
//! ## Quick Start
//!
//! ```
//! use stolas_zstd::decompress;
//!
//! // A minimal frame: single segment, one raw block carrying "abc".
//! let frame = [
//!     0x28, 0xB5, 0x2F, 0xFD, // magic
//!     0x20, 0x03,             // header: single segment, content size 3
//!     0x19, 0x00, 0x00,       // raw last block, size 3
//!     b'a', b'b', b'c',
//! ];
//! assert_eq!(decompress(&frame).unwrap(), b"abc");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! decompress / ZstdDecoder          one-shot, multi-frame
//! ZstdStreamDecoder                 incremental, chunk in / chunk out
//!        |
//!     frame::      magic, headers, block chain
//!     block::      literals, sequences, match execution
//!     fse::        normalized counts, tables, interleaved states
//!     huffman::    weights, canonical tables, 1- and 4-stream decode
//!     bits::       forward and backward bit readers
//! ```

mod bits;
mod block;
mod decode;
mod dictionary;
mod frame;
mod fse;
mod huffman;
mod streaming;

pub use decode::{DecoderOptions, ZstdDecoder};
pub use dictionary::{Dictionary, DICTIONARY_MAGIC};
pub use frame::{
    find_frame_compressed_size, frame_header_size, get_frame_content_size, is_frame, FrameInfo,
    FrameType, MAX_BLOCK_SIZE, MAX_WINDOW_SIZE,
};
pub use streaming::ZstdStreamDecoder;

pub use stolas_core::{
    Decompressor, DictionaryDecompressor, Error, Result, StreamConfig, StreamState,
    StreamingDecompressor,
};

/// Decompress all frames in `input` with default options.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    ZstdDecoder::new().decompress(input)
}

/// Decompress into a caller-supplied buffer, returning the byte count.
pub fn decompress_to(input: &[u8], output: &mut [u8]) -> Result<usize> {
    ZstdDecoder::new().decompress_to(input, output)
}
