//! Literals section decoding.
//!
//! A compressed block opens with its literals: raw bytes, an RLE run, a
//! Huffman-compressed payload with a fresh table description, or a
//! "treeless" payload reusing the table of an earlier block (or of the
//! dictionary). Decoded literals land in an owned side buffer that the
//! sequence executor consumes.

use crate::frame::MAX_BLOCK_SIZE;
use crate::huffman::{decode_four_streams, decode_single_stream, parse_weights, HuffmanTable};
use stolas_core::{Error, Result};

/// Literals encoding type from the 2-bit header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralsBlockType {
    Raw,
    Rle,
    Compressed,
    Treeless,
}

impl LiteralsBlockType {
    fn from_field(field: u8) -> Self {
        match field & 0b11 {
            0 => LiteralsBlockType::Raw,
            1 => LiteralsBlockType::Rle,
            2 => LiteralsBlockType::Compressed,
            _ => LiteralsBlockType::Treeless,
        }
    }
}

/// Decoded literals plus the input bytes the section occupied.
#[derive(Debug)]
pub struct LiteralsSection {
    pub literals: Vec<u8>,
    pub consumed: usize,
}

impl LiteralsSection {
    /// Parse and decode the literals section at the start of `input`.
    ///
    /// `huffman` is the table persisted across blocks: a Compressed section
    /// replaces it, a Treeless section requires it.
    pub fn parse(input: &[u8], huffman: &mut Option<HuffmanTable>) -> Result<Self> {
        let byte0 = *input.first().ok_or_else(|| Error::unexpected_eof(0))?;
        let block_type = LiteralsBlockType::from_field(byte0);
        let size_format = (byte0 >> 2) & 0b11;

        match block_type {
            LiteralsBlockType::Raw | LiteralsBlockType::Rle => {
                let (regen_size, header_size) = match size_format {
                    // One-byte header, 5-bit size.
                    0 | 2 => ((byte0 >> 3) as usize, 1),
                    1 => {
                        let b1 = *input.get(1).ok_or_else(|| Error::unexpected_eof(1))? as usize;
                        ((byte0 >> 4) as usize + (b1 << 4), 2)
                    }
                    _ => {
                        if input.len() < 3 {
                            return Err(Error::unexpected_eof(input.len()));
                        }
                        let b1 = input[1] as usize;
                        let b2 = input[2] as usize;
                        ((byte0 >> 4) as usize + (b1 << 4) + (b2 << 12), 3)
                    }
                };
                check_regen_size(regen_size)?;
                if block_type == LiteralsBlockType::Raw {
                    if input.len() < header_size + regen_size {
                        return Err(Error::unexpected_eof(input.len()));
                    }
                    Ok(LiteralsSection {
                        literals: input[header_size..header_size + regen_size].to_vec(),
                        consumed: header_size + regen_size,
                    })
                } else {
                    let value = *input
                        .get(header_size)
                        .ok_or_else(|| Error::unexpected_eof(input.len()))?;
                    Ok(LiteralsSection {
                        literals: vec![value; regen_size],
                        consumed: header_size + 1,
                    })
                }
            }
            LiteralsBlockType::Compressed | LiteralsBlockType::Treeless => {
                let (regen_size, compressed_size, four_streams, header_size) =
                    parse_compressed_sizes(input, byte0, size_format)?;
                check_regen_size(regen_size)?;
                if input.len() < header_size + compressed_size {
                    return Err(Error::unexpected_eof(input.len()));
                }
                let mut payload = &input[header_size..header_size + compressed_size];

                if block_type == LiteralsBlockType::Compressed {
                    let (weights, weights_consumed) = parse_weights(payload)?;
                    *huffman = Some(HuffmanTable::from_weights(&weights)?);
                    payload = &payload[weights_consumed..];
                }
                let table = huffman.as_ref().ok_or_else(|| {
                    Error::corrupted("treeless literals without a previous Huffman table")
                })?;

                let literals = if four_streams {
                    decode_four_streams(table, payload, regen_size)?
                } else {
                    decode_single_stream(table, payload, regen_size)?
                };
                Ok(LiteralsSection {
                    literals,
                    consumed: header_size + compressed_size,
                })
            }
        }
    }
}

/// Size fields of a Compressed/Treeless header: regenerated size,
/// compressed size, stream count, header length.
fn parse_compressed_sizes(
    input: &[u8],
    byte0: u8,
    size_format: u8,
) -> Result<(usize, usize, bool, usize)> {
    let need = match size_format {
        0 | 1 => 3,
        2 => 4,
        _ => 5,
    };
    if input.len() < need {
        return Err(Error::unexpected_eof(input.len()));
    }
    let b1 = input[1] as usize;
    let b2 = input[2] as usize;
    match size_format {
        // 10-bit sizes; format 0 is the single-stream variant.
        0 | 1 => {
            let regen = (byte0 >> 4) as usize + ((b1 & 0x3F) << 4);
            let compressed = (b1 >> 6) + (b2 << 2);
            Ok((regen, compressed, size_format == 1, 3))
        }
        2 => {
            let b3 = input[3] as usize;
            let regen = (byte0 >> 4) as usize + (b1 << 4) + ((b2 & 0b11) << 12);
            let compressed = (b2 >> 2) + (b3 << 6);
            Ok((regen, compressed, true, 4))
        }
        _ => {
            let b3 = input[3] as usize;
            let b4 = input[4] as usize;
            let regen = (byte0 >> 4) as usize + (b1 << 4) + ((b2 & 0x3F) << 12);
            let compressed = (b2 >> 6) + (b3 << 2) + (b4 << 10);
            Ok((regen, compressed, true, 5))
        }
    }
}

fn check_regen_size(size: usize) -> Result<()> {
    if size > MAX_BLOCK_SIZE as usize {
        return Err(Error::corrupted("literals exceed maximum block size"));
    }
    Ok(())
}
