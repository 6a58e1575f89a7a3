//! Incremental frame decoding.
//!
//! The streaming decoder accepts input in arbitrary chunks and emits output
//! as caller buffers allow. Input is staged in an internal buffer until a
//! complete header, block, or checksum is available; decoded bytes queue in
//! a flush buffer drained by each call.

use crate::block::{
    decode_compressed_block, decode_raw_block, decode_rle_block, BlockContext,
};
use crate::frame::{
    BlockHeader, BlockType, FrameHeader, MAX_BLOCK_SIZE, MIN_WINDOW_SIZE, SKIPPABLE_MAGIC_HIGH,
    SKIPPABLE_MAGIC_LOW, ZSTD_MAGIC,
};
use stolas_core::{Error, Result, StreamConfig, StreamState, StreamingDecompressor};
use xxhash_rust::xxh64::Xxh64;

/// Decode position within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Expecting a frame magic, or clean end of stream.
    Magic,
    /// Magic seen, frame header incomplete.
    FrameHeader,
    /// Inside the block chain.
    Block,
    /// All blocks done, trailing checksum incomplete.
    Checksum,
    /// Discarding a skippable frame's payload.
    Skippable { remaining: usize },
}

/// Streaming Zstandard decoder.
pub struct ZstdStreamDecoder {
    config: StreamConfig,
    state: StreamState,
    stage: Stage,
    input: Vec<u8>,
    /// Decoded but not yet handed to the caller.
    pending: Vec<u8>,
    /// Match history for the current frame, trimmed to the window after
    /// every block.
    history: Vec<u8>,
    ctx: BlockContext,
    header: Option<FrameHeader>,
    window_size: u64,
    /// Running checksum over the frame's full output; the history alone no
    /// longer covers it.
    hasher: Xxh64,
    /// Bytes decoded from the current frame.
    frame_written: u64,
    stalled_calls: u32,
}

impl std::fmt::Debug for ZstdStreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdStreamDecoder")
            .field("state", &self.state)
            .field("stage", &self.stage)
            .field("buffered_input", &self.input.len())
            .field("pending_output", &self.pending.len())
            .field("window_size", &self.window_size)
            .field("frame_written", &self.frame_written)
            .finish()
    }
}

impl ZstdStreamDecoder {
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default())
    }

    pub fn with_config(config: StreamConfig) -> Self {
        ZstdStreamDecoder {
            config,
            state: StreamState::Initial,
            stage: Stage::Magic,
            input: Vec::new(),
            pending: Vec::new(),
            history: Vec::new(),
            ctx: BlockContext::new(),
            header: None,
            window_size: 0,
            hasher: Xxh64::new(0),
            frame_written: 0,
            stalled_calls: 0,
        }
    }

    /// Advance through as many stages as the buffered input allows.
    fn pump(&mut self) -> Result<()> {
        loop {
            match self.stage {
                Stage::Magic => {
                    if self.input.len() < 4 {
                        return Ok(());
                    }
                    let magic =
                        u32::from_le_bytes([self.input[0], self.input[1], self.input[2], self.input[3]]);
                    if (SKIPPABLE_MAGIC_LOW..=SKIPPABLE_MAGIC_HIGH).contains(&magic) {
                        if self.input.len() < 8 {
                            return Ok(());
                        }
                        let skip = u32::from_le_bytes([
                            self.input[4],
                            self.input[5],
                            self.input[6],
                            self.input[7],
                        ]) as usize;
                        self.input.drain(..8);
                        self.stage = Stage::Skippable { remaining: skip };
                    } else if magic == ZSTD_MAGIC {
                        self.input.drain(..4);
                        self.stage = Stage::FrameHeader;
                    } else {
                        return Err(Error::corrupted("unknown frame magic"));
                    }
                }
                Stage::Skippable { remaining } => {
                    let take = remaining.min(self.input.len());
                    self.input.drain(..take);
                    if take < remaining {
                        self.stage = Stage::Skippable {
                            remaining: remaining - take,
                        };
                        return Ok(());
                    }
                    self.stage = Stage::Magic;
                }
                Stage::FrameHeader => {
                    let header = match FrameHeader::parse(&self.input) {
                        Ok(header) => header,
                        Err(e) if e.is_recoverable() => return Ok(()),
                        Err(e) => return Err(e),
                    };
                    let window_size = header.window_size.max(MIN_WINDOW_SIZE);
                    if window_size > self.config.max_window_size {
                        return Err(Error::WindowTooLarge {
                            requested: window_size,
                            limit: self.config.max_window_size,
                        });
                    }
                    if header.dict_id != 0 {
                        return Err(Error::DictionaryMismatch {
                            expected: header.dict_id,
                            found: 0,
                        });
                    }
                    self.input.drain(..header.header_size);
                    self.header = Some(header);
                    self.window_size = window_size;
                    self.history.clear();
                    self.hasher.reset(0);
                    self.frame_written = 0;
                    self.ctx = BlockContext::new();
                    self.stage = Stage::Block;
                }
                Stage::Block => {
                    if self.input.len() < BlockHeader::SIZE {
                        return Ok(());
                    }
                    let block = BlockHeader::parse(&self.input)?;
                    let block_max =
                        MAX_BLOCK_SIZE.min(self.window_size.min(u32::MAX as u64) as u32);
                    if block.size > block_max {
                        return Err(Error::corrupted("block size exceeds block maximum"));
                    }
                    let payload_len = block.payload_size();
                    if self.input.len() < BlockHeader::SIZE + payload_len {
                        return Ok(());
                    }
                    let payload =
                        &self.input[BlockHeader::SIZE..BlockHeader::SIZE + payload_len];

                    let before = self.history.len();
                    match block.block_type {
                        BlockType::Raw => decode_raw_block(payload, block.size, &mut self.history)?,
                        BlockType::Rle => decode_rle_block(payload, block.size, &mut self.history)?,
                        BlockType::Compressed => decode_compressed_block(
                            payload,
                            &mut self.ctx,
                            &mut self.history,
                            0,
                            &[],
                            self.window_size,
                        )?,
                    }
                    self.pending.extend_from_slice(&self.history[before..]);
                    self.hasher.update(&self.history[before..]);
                    self.frame_written += (self.history.len() - before) as u64;
                    self.input.drain(..BlockHeader::SIZE + payload_len);

                    // Only the window can be referenced again; older bytes
                    // would otherwise pin the whole frame in memory.
                    let window = self.window_size as usize;
                    if self.history.len() > window {
                        let excess = self.history.len() - window;
                        self.history.drain(..excess);
                    }

                    if block.last_block {
                        self.stage = Stage::Checksum;
                    }
                }
                Stage::Checksum => {
                    let header = self.header.ok_or(Error::InvalidState {
                        expected: "frame header",
                        actual: "none",
                    })?;
                    if header.has_checksum {
                        if self.input.len() < 4 {
                            return Ok(());
                        }
                        let stored = u32::from_le_bytes([
                            self.input[0],
                            self.input[1],
                            self.input[2],
                            self.input[3],
                        ]);
                        self.input.drain(..4);
                        if self.config.verify_checksum {
                            let actual = self.hasher.digest() as u32;
                            if stored != actual {
                                return Err(Error::checksum_mismatch(stored, actual));
                            }
                        }
                    }
                    if let Some(expected) = header.content_size {
                        let actual = self.frame_written;
                        if actual != expected {
                            return Err(Error::content_size_mismatch(expected, actual));
                        }
                    }
                    self.header = None;
                    self.stage = Stage::Magic;
                }
            }
        }
    }

    /// True once all buffered input is decoded, nothing awaits flushing,
    /// and the decoder sits at a frame boundary.
    fn at_clean_end(&self) -> bool {
        self.stage == Stage::Magic && self.input.is_empty() && self.pending.is_empty()
    }
}

impl Default for ZstdStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingDecompressor for ZstdStreamDecoder {
    fn begin(&mut self) -> Result<()> {
        if self.state == StreamState::Active {
            return Err(Error::InvalidState {
                expected: "initial",
                actual: "active",
            });
        }
        self.reset();
        self.state = StreamState::Active;
        Ok(())
    }

    fn decompress_chunk(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize, bool)> {
        if !self.state.can_write() {
            return Err(Error::InvalidState {
                expected: "active",
                actual: if self.state == StreamState::Finished {
                    "finished"
                } else {
                    "error"
                },
            });
        }
        self.state = StreamState::Active;

        self.input.extend_from_slice(input);
        if let Err(e) = self.pump() {
            self.state = StreamState::Error;
            return Err(e);
        }

        let written = self.pending.len().min(output.len());
        output[..written].copy_from_slice(&self.pending[..written]);
        self.pending.drain(..written);

        let finished = self.at_clean_end();
        if finished {
            self.state = StreamState::Finished;
            self.stalled_calls = 0;
        } else if input.is_empty() && written == 0 {
            self.stalled_calls += 1;
            if self.stalled_calls > self.config.max_stalled_calls {
                self.state = StreamState::Error;
                return Err(Error::NoForwardProgress {
                    calls: self.stalled_calls,
                });
            }
        } else {
            self.stalled_calls = 0;
        }

        Ok((input.len(), written, finished))
    }

    fn is_finished(&self) -> bool {
        self.state == StreamState::Finished
    }

    fn reset(&mut self) {
        self.state = StreamState::Initial;
        self.stage = Stage::Magic;
        self.input.clear();
        self.pending.clear();
        self.history.clear();
        self.ctx = BlockContext::new();
        self.header = None;
        self.window_size = 0;
        self.hasher.reset(0);
        self.frame_written = 0;
        self.stalled_calls = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xxhash_rust::xxh64::xxh64;

    fn block_header(last: bool, ty: u32, size: u32) -> [u8; 3] {
        let word = (last as u32) | (ty << 1) | (size << 3);
        [word as u8, (word >> 8) as u8, (word >> 16) as u8]
    }

    fn raw_frame(content: &[u8]) -> Vec<u8> {
        let mut frame = ZSTD_MAGIC.to_le_bytes().to_vec();
        frame.push(0x20);
        frame.push(content.len() as u8);
        frame.extend_from_slice(&block_header(true, 0, content.len() as u32));
        frame.extend_from_slice(content);
        frame
    }

    #[test]
    fn test_whole_frame_in_one_chunk() {
        let frame = raw_frame(b"streaming");
        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();

        let mut out = [0u8; 32];
        let (read, written, finished) = decoder.decompress_chunk(&frame, &mut out).unwrap();
        assert_eq!(read, frame.len());
        assert_eq!(&out[..written], b"streaming");
        assert!(finished);
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_byte_at_a_time_input() {
        let frame = raw_frame(b"drip fed");
        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();

        let mut decoded = Vec::new();
        let mut out = [0u8; 8];
        let mut finished = false;
        for &byte in &frame {
            let (_, written, done) = decoder.decompress_chunk(&[byte], &mut out).unwrap();
            decoded.extend_from_slice(&out[..written]);
            finished = done;
        }
        assert!(finished);
        assert_eq!(decoded, b"drip fed");
    }

    #[test]
    fn test_small_output_buffer_drains_over_calls() {
        let frame = raw_frame(b"abcdefgh");
        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();

        let mut out = [0u8; 3];
        let (_, written, finished) = decoder.decompress_chunk(&frame, &mut out).unwrap();
        assert_eq!(&out[..written], b"abc");
        assert!(!finished);

        let mut decoded = out[..written].to_vec();
        loop {
            let (_, written, finished) = decoder.decompress_chunk(&[], &mut out).unwrap();
            decoded.extend_from_slice(&out[..written]);
            if finished {
                break;
            }
        }
        assert_eq!(decoded, b"abcdefgh");
    }

    #[test]
    fn test_two_frames_back_to_back() {
        let mut input = raw_frame(b"first");
        input.extend_from_slice(&raw_frame(b"second"));
        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();

        let mut out = [0u8; 64];
        let (read, written, finished) = decoder.decompress_chunk(&input, &mut out).unwrap();
        assert_eq!(read, input.len());
        assert_eq!(&out[..written], b"firstsecond");
        assert!(finished);
    }

    #[test]
    fn test_skippable_frame_streamed() {
        let mut input = 0x184D2A5Fu32.to_le_bytes().to_vec();
        input.extend_from_slice(&6u32.to_le_bytes());
        input.extend_from_slice(b"ignore");
        input.extend_from_slice(&raw_frame(b"kept"));

        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();
        let mut out = [0u8; 16];
        let (_, written, finished) = decoder.decompress_chunk(&input, &mut out).unwrap();
        assert_eq!(&out[..written], b"kept");
        assert!(finished);
    }

    #[test]
    fn test_corruption_poisons_stream() {
        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();
        let mut out = [0u8; 8];
        assert!(decoder
            .decompress_chunk(&[0x11, 0x22, 0x33, 0x44], &mut out)
            .is_err());
        // Further calls fail until reset.
        let err = decoder.decompress_chunk(&[], &mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        decoder.reset();
        decoder.begin().unwrap();
        let frame = raw_frame(b"ok");
        let (_, written, _) = decoder.decompress_chunk(&frame, &mut out).unwrap();
        assert_eq!(&out[..written], b"ok");
    }

    #[test]
    fn test_stall_guard() {
        let mut decoder = ZstdStreamDecoder::with_config(StreamConfig {
            max_stalled_calls: 3,
            ..Default::default()
        });
        decoder.begin().unwrap();

        // Incomplete frame: magic only.
        let mut out = [0u8; 8];
        decoder
            .decompress_chunk(&ZSTD_MAGIC.to_le_bytes(), &mut out)
            .unwrap();
        let mut result = Ok((0, 0, false));
        for _ in 0..10 {
            result = decoder.decompress_chunk(&[], &mut out);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(Error::NoForwardProgress { .. })));
    }

    #[test]
    fn test_checksum_verified_in_stream() {
        let content = b"streamed with checksum";
        let mut frame = ZSTD_MAGIC.to_le_bytes().to_vec();
        frame.push(0x24);
        frame.push(content.len() as u8);
        frame.extend_from_slice(&block_header(true, 0, content.len() as u32));
        frame.extend_from_slice(content);
        frame.extend_from_slice(&(xxh64(content, 0) as u32).to_le_bytes());

        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();
        let mut out = [0u8; 64];
        let (_, written, finished) = decoder.decompress_chunk(&frame, &mut out).unwrap();
        assert_eq!(&out[..written], content);
        assert!(finished);

        // Same frame with a corrupted checksum byte.
        let len = frame.len();
        frame[len - 2] ^= 0x55;
        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();
        let err = decoder.decompress_chunk(&frame, &mut out).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_history_bounded_by_window() {
        // Window descriptor 0x00: 1 KiB window. The frame emits 2 KiB of
        // RLE output, then a match at distance 1000 that must still
        // resolve against the trimmed history: OF symbol 9 with extras
        // 491 gives offset value 1003, ML symbol 1 copies 4 bytes.
        let mut payload = vec![0u8 << 3];
        payload.extend_from_slice(&[1, 0b01_01_01_00, 0, 9, 1, 0xEB, 0x03]);

        let mut frame = ZSTD_MAGIC.to_le_bytes().to_vec();
        frame.push(0x00);
        frame.push(0x00);
        frame.extend_from_slice(&block_header(false, 1, 1000));
        frame.push(b'a');
        frame.extend_from_slice(&block_header(false, 1, 1000));
        frame.push(b'b');
        frame.extend_from_slice(&block_header(true, 2, payload.len() as u32));
        frame.extend_from_slice(&payload);

        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();
        let mut out = vec![0u8; 4096];
        let (_, written, finished) = decoder.decompress_chunk(&frame, &mut out).unwrap();
        assert!(finished);
        assert_eq!(written, 2004);
        assert!(out[..1000].iter().all(|&b| b == b'a'));
        assert!(out[1000..2000].iter().all(|&b| b == b'b'));
        assert_eq!(&out[2000..2004], b"bbbb");
        // Retained history never outgrows the window.
        assert_eq!(decoder.history.len(), 1024);
    }

    #[test]
    fn test_checksum_covers_trimmed_output() {
        // Content is twice the 1 KiB window; the checksum still covers
        // every decoded byte, not just the retained history.
        let mut content = vec![b'a'; 1000];
        content.extend_from_slice(&[b'b'; 1000]);

        let mut frame = ZSTD_MAGIC.to_le_bytes().to_vec();
        frame.push(0x04);
        frame.push(0x00);
        frame.extend_from_slice(&block_header(false, 1, 1000));
        frame.push(b'a');
        frame.extend_from_slice(&block_header(true, 1, 1000));
        frame.push(b'b');
        frame.extend_from_slice(&(xxh64(&content, 0) as u32).to_le_bytes());

        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();
        let mut out = vec![0u8; 4096];
        let (_, written, finished) = decoder.decompress_chunk(&frame, &mut out).unwrap();
        assert!(finished);
        assert_eq!(&out[..written], &content[..]);
    }

    #[test]
    fn test_window_ceiling_configurable() {
        // Window descriptor log 27 (exponent 17): 128 MiB, above the
        // configured ceiling.
        let mut frame = ZSTD_MAGIC.to_le_bytes().to_vec();
        frame.push(0x00);
        frame.push(17 << 3);
        frame.extend_from_slice(&block_header(true, 0, 0));

        let mut decoder = ZstdStreamDecoder::with_config(StreamConfig {
            max_window_size: 1 << 20,
            ..Default::default()
        });
        decoder.begin().unwrap();
        let mut out = [0u8; 8];
        let err = decoder.decompress_chunk(&frame, &mut out).unwrap_err();
        assert!(matches!(err, Error::WindowTooLarge { limit, .. } if limit == 1 << 20));
    }

    #[test]
    fn test_begin_while_active_rejected() {
        let mut decoder = ZstdStreamDecoder::new();
        decoder.begin().unwrap();
        let mut out = [0u8; 4];
        decoder
            .decompress_chunk(&ZSTD_MAGIC.to_le_bytes(), &mut out)
            .unwrap();
        assert!(decoder.begin().is_err());
    }
}
