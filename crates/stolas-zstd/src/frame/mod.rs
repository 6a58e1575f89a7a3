//! Zstandard frame format.
//!
//! ## Frame Structure
//!
//! ```text
//! +-------------------+
//! | Magic_Number      | 4 bytes (0xFD2FB528)
//! +-------------------+
//! | Frame_Header      | 2-14 bytes
//! +-------------------+
//! | Data_Block(s)     | variable
//! +-------------------+
//! | Content_Checksum  | 0-4 bytes (optional)
//! +-------------------+
//! ```
//!
//! ## References
//!
//! - [RFC 8878 Section 3.1](https://datatracker.ietf.org/doc/html/rfc8878#section-3.1)

mod block;
mod header;

pub use block::{BlockHeader, BlockType, MAX_BLOCK_SIZE};
pub use header::{
    find_frame_compressed_size, frame_header_size, get_frame_content_size, is_frame,
    FrameDescriptor, FrameHeader, FrameInfo, FrameType,
};

/// Zstd magic number (little-endian: 0xFD2FB528).
pub const ZSTD_MAGIC: u32 = 0xFD2FB528;

/// Skippable frame magic range: 0x184D2A50 to 0x184D2A5F.
pub const SKIPPABLE_MAGIC_LOW: u32 = 0x184D2A50;
pub const SKIPPABLE_MAGIC_HIGH: u32 = 0x184D2A5F;

/// Default maximum window size a decoder will accept (128 MB).
pub const MAX_WINDOW_SIZE: u64 = 1 << 27;

/// Minimum window size (1 KB).
pub const MIN_WINDOW_SIZE: u64 = 1 << 10;
