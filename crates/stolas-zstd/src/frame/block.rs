//! Block header parsing.

use stolas_core::{Error, Result};

/// Hard ceiling on a block's content, before the window cap (128 KiB).
pub const MAX_BLOCK_SIZE: u32 = 128 * 1024;

/// Block type from the 2-bit header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Uncompressed bytes, stored verbatim.
    Raw,
    /// A single byte repeated `size` times.
    Rle,
    /// Entropy-coded literals and sequences.
    Compressed,
}

impl BlockType {
    fn from_field(field: u32) -> Result<Self> {
        match field {
            0 => Ok(BlockType::Raw),
            1 => Ok(BlockType::Rle),
            2 => Ok(BlockType::Compressed),
            _ => Err(Error::corrupted("reserved block type")),
        }
    }
}

/// 3-byte little-endian block header: last-block flag, type, 21-bit size.
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    pub last_block: bool,
    pub block_type: BlockType,
    /// Regenerated size for RLE, payload size otherwise.
    pub size: u32,
}

impl BlockHeader {
    /// Encoded size of a block header.
    pub const SIZE: usize = 3;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::unexpected_eof(data.len()));
        }
        let word = u32::from_le_bytes([data[0], data[1], data[2], 0]);
        Ok(BlockHeader {
            last_block: word & 1 == 1,
            block_type: BlockType::from_field((word >> 1) & 0b11)?,
            size: word >> 3,
        })
    }

    /// Bytes of payload following this header in the input stream.
    pub fn payload_size(&self) -> usize {
        match self.block_type {
            BlockType::Rle => 1,
            _ => self.size as usize,
        }
    }
}
