//! Boundary to the opaque emulation core.

use std::path::Path;

use crate::{input::GamepadInputs, video::VideoFrame};

/// Fault reported by the core. Fatal to the session that observed it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CoreError {
    message: String,
}

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One batch of output from [`EmulationCore::run_audio_frame`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioFrame {
    pub left: Vec<i16>,
    pub right: Vec<i16>,
    /// Present roughly once per video frame; the core decides when.
    pub video: Option<VideoFrame>,
}

impl AudioFrame {
    /// Stereo sample pairs in this batch. Extra samples on the longer side are ignored.
    pub fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the samples as interleaved little-endian `i16` pairs (`L0 R0 L1 R1 ...`).
    pub fn interleave_into(&self, out: &mut Vec<u8>) {
        out.reserve(self.len() * crate::ring::BYTES_PER_FRAME);
        for (left, right) in self.left.iter().zip(&self.right) {
            out.extend_from_slice(&left.to_le_bytes());
            out.extend_from_slice(&right.to_le_bytes());
        }
    }
}

/// The emulation core as seen by the scheduler.
///
/// Only the emulation thread calls into a running core, so implementations need
/// `Send` but not `Sync`.
pub trait EmulationCore: Send + 'static {
    /// Opaque parsed save state, produced by [`EmulationCore::load_savestate`].
    type Savestate: Send;

    /// Runs the core for `sample_count` stereo samples using `inputs`.
    fn run_audio_frame(
        &mut self,
        inputs: GamepadInputs,
        sample_count: usize,
    ) -> Result<AudioFrame, CoreError>;

    fn load_ram(&mut self, ram: &[u8]);

    fn save_ram(&self) -> Vec<u8>;

    /// Serializes the full machine state.
    fn create_savestate(&mut self) -> Result<Vec<u8>, CoreError>;

    /// Reads and validates a save state file without applying it.
    fn load_savestate(&mut self, path: &Path) -> Result<Self::Savestate, CoreError>;

    fn apply_savestate(&mut self, state: &Self::Savestate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_little_endian_pairs() {
        let frame = AudioFrame {
            left: vec![1, -1],
            right: vec![0x0203, i16::MIN],
            video: None,
        };
        let mut out = Vec::new();
        frame.interleave_into(&mut out);
        assert_eq!(out, [1, 0, 0x03, 0x02, 0xFF, 0xFF, 0x00, 0x80]);
    }

    #[test]
    fn mismatched_channels_use_shorter_length() {
        let frame = AudioFrame {
            left: vec![1, 2, 3],
            right: vec![4],
            video: None,
        };
        let mut out = Vec::new();
        frame.interleave_into(&mut out);
        assert_eq!(frame.len(), 1);
        assert_eq!(out.len(), 4);
    }
}
