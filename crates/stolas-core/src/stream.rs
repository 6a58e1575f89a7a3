//! Streaming decompression utilities.

/// Configuration for stream buffers and guards.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Input buffer size (default: 64 KB).
    pub input_buffer_size: usize,

    /// Output buffer size (default: 64 KB).
    pub output_buffer_size: usize,

    /// Enable checksum verification.
    pub verify_checksum: bool,

    /// Largest back-reference window accepted from a stream (default:
    /// 128 MB).
    pub max_window_size: u64,

    /// Consecutive zero-progress calls tolerated before erroring out.
    pub max_stalled_calls: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            input_buffer_size: 65536,
            output_buffer_size: 65536,
            verify_checksum: true,
            max_window_size: 1 << 27,
            max_stalled_calls: 16,
        }
    }
}

/// Stream state for tracking progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Stream not started.
    #[default]
    Initial,
    /// Stream in progress.
    Active,
    /// Stream finished successfully.
    Finished,
    /// Stream encountered error.
    Error,
}

impl StreamState {
    /// Check if stream is in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Finished | StreamState::Error)
    }

    /// Check if stream can accept more input.
    pub fn can_write(self) -> bool {
        matches!(self, StreamState::Initial | StreamState::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.input_buffer_size, 65536);
        assert!(cfg.verify_checksum);
        assert_eq!(cfg.max_window_size, 1 << 27);
        assert_eq!(cfg.max_stalled_calls, 16);
    }

    #[test]
    fn test_state_transitions() {
        assert!(StreamState::Initial.can_write());
        assert!(StreamState::Active.can_write());
        assert!(!StreamState::Finished.can_write());
        assert!(StreamState::Finished.is_terminal());
        assert!(StreamState::Error.is_terminal());
    }
}
