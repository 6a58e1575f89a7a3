//! One-shot frame decoding.

use crate::block::{
    decode_compressed_block, decode_raw_block, decode_rle_block, BlockContext,
};
use crate::dictionary::Dictionary;
use crate::frame::{
    BlockHeader, BlockType, FrameHeader, MAX_BLOCK_SIZE, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE,
    SKIPPABLE_MAGIC_HIGH, SKIPPABLE_MAGIC_LOW, ZSTD_MAGIC,
};
use stolas_core::{Decompressor, DictionaryDecompressor, Error, Result};
use xxhash_rust::xxh64::xxh64;

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Reject frames whose window exceeds this many bytes.
    pub max_window_size: u64,
    /// Verify the trailing content checksum when the frame carries one.
    pub verify_checksum: bool,
    /// Expect a single frame body with no magic number.
    pub magicless: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            max_window_size: MAX_WINDOW_SIZE,
            verify_checksum: true,
            magicless: false,
        }
    }
}

/// One-shot Zstandard decoder.
///
/// Stateless between calls apart from configuration and an optional
/// dictionary; each `decompress` call walks every frame in the input.
#[derive(Debug, Default)]
pub struct ZstdDecoder {
    options: DecoderOptions,
    dictionary: Option<Dictionary>,
}

impl ZstdDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        ZstdDecoder {
            options,
            dictionary: None,
        }
    }

    /// Decoder armed with an already parsed dictionary.
    pub fn with_dictionary(dictionary: Dictionary) -> Self {
        ZstdDecoder {
            options: DecoderOptions::default(),
            dictionary: Some(dictionary),
        }
    }

    /// Decode the standard frame starting after the magic at
    /// `input[pos..]`. Returns bytes consumed from `pos` on.
    fn decode_frame(&self, input: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        let header = FrameHeader::parse(input)?;
        let mut pos = header.header_size;

        let window_size = header.window_size.max(MIN_WINDOW_SIZE);
        if window_size > self.options.max_window_size {
            return Err(Error::WindowTooLarge {
                requested: window_size,
                limit: self.options.max_window_size,
            });
        }

        let dictionary = self.frame_dictionary(header.dict_id)?;
        let dict_content = dictionary.map(Dictionary::content).unwrap_or(&[]);
        let mut ctx = dictionary
            .map(Dictionary::initial_context)
            .unwrap_or_else(BlockContext::new);

        let block_max = MAX_BLOCK_SIZE.min(window_size.min(u32::MAX as u64) as u32);
        let frame_base = output.len();

        loop {
            let block = BlockHeader::parse(&input[pos..])?;
            pos += BlockHeader::SIZE;
            if block.size > block_max {
                return Err(Error::corrupted("block size exceeds block maximum"));
            }
            let payload_len = block.payload_size();
            if input.len() < pos + payload_len {
                return Err(Error::unexpected_eof(input.len()));
            }
            let payload = &input[pos..pos + payload_len];
            pos += payload_len;

            match block.block_type {
                BlockType::Raw => decode_raw_block(payload, block.size, output)?,
                BlockType::Rle => decode_rle_block(payload, block.size, output)?,
                BlockType::Compressed => decode_compressed_block(
                    payload,
                    &mut ctx,
                    output,
                    frame_base,
                    dict_content,
                    window_size,
                )?,
            }

            if block.last_block {
                break;
            }
        }

        if header.has_checksum {
            if input.len() < pos + 4 {
                return Err(Error::unexpected_eof(input.len()));
            }
            let stored =
                u32::from_le_bytes([input[pos], input[pos + 1], input[pos + 2], input[pos + 3]]);
            pos += 4;
            if self.options.verify_checksum {
                let actual = xxh64(&output[frame_base..], 0) as u32;
                if stored != actual {
                    return Err(Error::checksum_mismatch(stored, actual));
                }
            }
        }

        if let Some(expected) = header.content_size {
            let actual = (output.len() - frame_base) as u64;
            if actual != expected {
                return Err(Error::content_size_mismatch(expected, actual));
            }
        }

        Ok(pos)
    }

    /// The dictionary a frame with `dict_id` must decode against.
    fn frame_dictionary(&self, dict_id: u32) -> Result<Option<&Dictionary>> {
        match (&self.dictionary, dict_id) {
            (dict, 0) => Ok(dict.as_ref()),
            (Some(dict), id) if dict.id == id => Ok(Some(dict)),
            (Some(dict), id) => Err(Error::DictionaryMismatch {
                expected: id,
                found: dict.id,
            }),
            (None, id) => Err(Error::DictionaryMismatch {
                expected: id,
                found: 0,
            }),
        }
    }

    fn decompress_inner(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();

        if self.options.magicless {
            let consumed = self.decode_frame(input, &mut output)?;
            if consumed != input.len() {
                return Err(Error::corrupted("trailing bytes after magicless frame"));
            }
            return Ok(output);
        }

        let mut pos = 0usize;
        while pos < input.len() {
            if input.len() < pos + 4 {
                return Err(Error::unexpected_eof(input.len()));
            }
            let magic = u32::from_le_bytes([
                input[pos],
                input[pos + 1],
                input[pos + 2],
                input[pos + 3],
            ]);
            pos += 4;

            if (SKIPPABLE_MAGIC_LOW..=SKIPPABLE_MAGIC_HIGH).contains(&magic) {
                if input.len() < pos + 4 {
                    return Err(Error::unexpected_eof(input.len()));
                }
                let skip = u32::from_le_bytes([
                    input[pos],
                    input[pos + 1],
                    input[pos + 2],
                    input[pos + 3],
                ]) as usize;
                pos += 4;
                if input.len() < pos + skip {
                    return Err(Error::unexpected_eof(input.len()));
                }
                pos += skip;
                continue;
            }
            if magic != ZSTD_MAGIC {
                return Err(Error::corrupted("unknown frame magic"));
            }
            pos += self.decode_frame(&input[pos..], &mut output)?;
        }
        Ok(output)
    }
}

impl Decompressor for ZstdDecoder {
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.decompress_inner(input)
    }

    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let decoded = self.decompress_inner(input)?;
        if decoded.len() > output.len() {
            return Err(Error::buffer_too_small(decoded.len(), output.len()));
        }
        output[..decoded.len()].copy_from_slice(&decoded);
        Ok(decoded.len())
    }
}

impl DictionaryDecompressor for ZstdDecoder {
    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        self.dictionary = Some(Dictionary::parse(dictionary)?);
        Ok(())
    }

    fn clear_dictionary(&mut self) {
        self.dictionary = None;
    }
}
