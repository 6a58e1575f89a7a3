//! Frame header parsing and frame introspection.

use super::block::BlockHeader;
use super::{MIN_WINDOW_SIZE, SKIPPABLE_MAGIC_HIGH, SKIPPABLE_MAGIC_LOW, ZSTD_MAGIC};
use stolas_core::{Error, Result};

/// The frame header descriptor byte.
///
/// ```text
/// bit 7-6: Frame_Content_Size_Flag
/// bit 5:   Single_Segment_Flag
/// bit 4:   Unused
/// bit 3:   Reserved (must be zero)
/// bit 2:   Content_Checksum_Flag
/// bit 1-0: Dictionary_ID_Flag
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FrameDescriptor(pub u8);

impl FrameDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.0 & 0b0000_1000 != 0 {
            return Err(Error::corrupted("reserved frame descriptor bit set"));
        }
        Ok(())
    }

    pub fn single_segment(&self) -> bool {
        self.0 & 0b0010_0000 != 0
    }

    pub fn has_checksum(&self) -> bool {
        self.0 & 0b0000_0100 != 0
    }

    pub fn dict_id_size(&self) -> usize {
        match self.0 & 0b11 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        }
    }

    pub fn fcs_size(&self) -> usize {
        match self.0 >> 6 {
            0 => {
                if self.single_segment() {
                    1
                } else {
                    0
                }
            }
            1 => 2,
            2 => 4,
            _ => 8,
        }
    }
}

/// Parsed frame header (the bytes between magic and first block).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub window_size: u64,
    pub dict_id: u32,
    pub content_size: Option<u64>,
    pub single_segment: bool,
    pub has_checksum: bool,
    /// Header bytes consumed, descriptor included, magic excluded.
    pub header_size: usize,
}

impl FrameHeader {
    /// Parse starting at the descriptor byte (after any magic).
    pub fn parse(data: &[u8]) -> Result<Self> {
        let descriptor = FrameDescriptor(
            *data.first().ok_or_else(|| Error::unexpected_eof(0))?,
        );
        descriptor.validate()?;

        let mut offset = 1usize;

        let window_descriptor = if descriptor.single_segment() {
            None
        } else {
            let byte = *data
                .get(offset)
                .ok_or_else(|| Error::unexpected_eof(data.len()))?;
            offset += 1;
            Some(byte)
        };

        let dict_id_size = descriptor.dict_id_size();
        if data.len() < offset + dict_id_size {
            return Err(Error::unexpected_eof(data.len()));
        }
        let mut dict_id = 0u32;
        for (i, &byte) in data[offset..offset + dict_id_size].iter().enumerate() {
            dict_id |= (byte as u32) << (8 * i);
        }
        offset += dict_id_size;

        let fcs_size = descriptor.fcs_size();
        if data.len() < offset + fcs_size {
            return Err(Error::unexpected_eof(data.len()));
        }
        let content_size = match fcs_size {
            0 => None,
            _ => {
                let mut value = 0u64;
                for (i, &byte) in data[offset..offset + fcs_size].iter().enumerate() {
                    value |= (byte as u64) << (8 * i);
                }
                if fcs_size == 2 {
                    value += 256;
                }
                Some(value)
            }
        };
        offset += fcs_size;

        let window_size = match window_descriptor {
            Some(byte) => decode_window_size(byte)?,
            // Single segment: the content itself is the window.
            None => content_size.ok_or_else(|| {
                Error::corrupted("single-segment frame without content size")
            })?,
        };

        Ok(FrameHeader {
            window_size,
            dict_id,
            content_size,
            single_segment: descriptor.single_segment(),
            has_checksum: descriptor.has_checksum(),
            header_size: offset,
        })
    }
}

fn decode_window_size(byte: u8) -> Result<u64> {
    let exponent = (byte >> 3) as u64;
    let mantissa = (byte & 0b111) as u64;
    let window_log = exponent + 10;
    if window_log > 41 {
        return Err(Error::corrupted("window descriptor exponent out of range"));
    }
    let base = 1u64 << window_log;
    Ok(base + (base >> 3) * mantissa)
}

/// Frame kind discovered by `FrameInfo::parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Standard,
    Skippable,
}

/// Frame-level metadata, readable without decoding any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame_type: FrameType,
    /// Declared content size; for skippable frames, zero.
    pub content_size: Option<u64>,
    pub window_size: u64,
    pub dict_id: u32,
    pub has_checksum: bool,
    /// Bytes from the magic through the end of the header.
    pub header_size: usize,
}

impl FrameInfo {
    /// Parse frame metadata from the start of `src`. Never mutates input;
    /// repeated calls on the same bytes agree.
    pub fn parse(src: &[u8]) -> Result<Self> {
        if src.len() < 4 {
            return Err(Error::unexpected_eof(src.len()));
        }
        let magic = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        if (SKIPPABLE_MAGIC_LOW..=SKIPPABLE_MAGIC_HIGH).contains(&magic) {
            if src.len() < 8 {
                return Err(Error::unexpected_eof(src.len()));
            }
            return Ok(FrameInfo {
                frame_type: FrameType::Skippable,
                content_size: Some(0),
                window_size: 0,
                dict_id: 0,
                has_checksum: false,
                header_size: 8,
            });
        }
        if magic != ZSTD_MAGIC {
            return Err(Error::corrupted("unknown frame magic"));
        }
        let header = FrameHeader::parse(&src[4..])?;
        Ok(FrameInfo {
            frame_type: FrameType::Standard,
            content_size: header.content_size,
            window_size: header.window_size.max(MIN_WINDOW_SIZE),
            dict_id: header.dict_id,
            has_checksum: header.has_checksum,
            header_size: 4 + header.header_size,
        })
    }
}

/// True if `src` starts with a standard or skippable frame magic.
pub fn is_frame(src: &[u8]) -> bool {
    if src.len() < 4 {
        return false;
    }
    let magic = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    magic == ZSTD_MAGIC || (SKIPPABLE_MAGIC_LOW..=SKIPPABLE_MAGIC_HIGH).contains(&magic)
}

/// Declared content size of the frame at the start of `src`, if stored.
pub fn get_frame_content_size(src: &[u8]) -> Result<Option<u64>> {
    Ok(FrameInfo::parse(src)?.content_size)
}

/// Size of the frame header at the start of `src`, magic included.
pub fn frame_header_size(src: &[u8]) -> Result<usize> {
    Ok(FrameInfo::parse(src)?.header_size)
}

/// Total encoded size of the frame at the start of `src`, found by walking
/// block headers without decoding payloads.
pub fn find_frame_compressed_size(src: &[u8]) -> Result<usize> {
    if src.len() < 4 {
        return Err(Error::unexpected_eof(src.len()));
    }
    let magic = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    if (SKIPPABLE_MAGIC_LOW..=SKIPPABLE_MAGIC_HIGH).contains(&magic) {
        if src.len() < 8 {
            return Err(Error::unexpected_eof(src.len()));
        }
        let payload = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;
        let total = 8 + payload;
        if src.len() < total {
            return Err(Error::unexpected_eof(src.len()));
        }
        return Ok(total);
    }
    if magic != ZSTD_MAGIC {
        return Err(Error::corrupted("unknown frame magic"));
    }

    let header = FrameHeader::parse(&src[4..])?;
    let mut pos = 4 + header.header_size;
    loop {
        if src.len() < pos + BlockHeader::SIZE {
            return Err(Error::unexpected_eof(src.len()));
        }
        let block = BlockHeader::parse(&src[pos..])?;
        pos += BlockHeader::SIZE + block.payload_size();
        if src.len() < pos {
            return Err(Error::unexpected_eof(src.len()));
        }
        if block.last_block {
            break;
        }
    }
    if header.has_checksum {
        pos += 4;
        if src.len() < pos {
            return Err(Error::unexpected_eof(src.len()));
        }
    }
    Ok(pos)
}
