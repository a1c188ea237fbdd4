//! Synthetic emulation core: a sine tone plus a scrolling test pattern.
//!
//! Held controls change what it produces so input wiring is audible: A raises
//! the tone an octave, B lowers it, and the left pad moves the pattern.

use std::{f64::consts::TAU, path::Path};

use vfriend_runtime::{
    AudioFrame, CoreError, EmulationCore, GamepadInputs, SCREEN_HEIGHT, SCREEN_WIDTH, VideoFrame,
};

/// Display refresh of the console, in Hz.
const REFRESH_HZ: f64 = 50.27;
const AMPLITUDE: f64 = 0.25 * i16::MAX as f64;
const BAR_WIDTH: usize = 24;
const SAVESTATE_MAGIC: &[u8; 4] = b"TONE";
const SAVESTATE_LEN: usize = 4 + 8 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneState {
    phase: f64,
    frames: u64,
    offset: i64,
}

impl ToneState {
    fn to_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SAVESTATE_LEN);
        bytes.extend_from_slice(SAVESTATE_MAGIC);
        bytes.extend_from_slice(&self.phase.to_le_bytes());
        bytes.extend_from_slice(&self.frames.to_le_bytes());
        bytes.extend_from_slice(&self.offset.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SAVESTATE_LEN || !bytes.starts_with(SAVESTATE_MAGIC) {
            return None;
        }
        let word = |at: usize| -> Option<[u8; 8]> { bytes.get(at..at + 8)?.try_into().ok() };
        Some(Self {
            phase: f64::from_le_bytes(word(4)?),
            frames: u64::from_le_bytes(word(12)?),
            offset: i64::from_le_bytes(word(20)?),
        })
    }
}

pub struct ToneCore {
    base_hz: f64,
    sample_rate: f64,
    samples_per_frame: f64,
    /// Samples produced since the last video frame.
    since_frame: f64,
    state: ToneState,
}

impl ToneCore {
    pub fn new(base_hz: f32, sample_rate: u32) -> Self {
        let sample_rate = f64::from(sample_rate.max(1));
        Self {
            base_hz: f64::from(base_hz),
            sample_rate,
            samples_per_frame: sample_rate / REFRESH_HZ,
            since_frame: 0.0,
            state: ToneState {
                phase: 0.0,
                frames: 0,
                offset: 0,
            },
        }
    }

    pub fn frames(&self) -> u64 {
        self.state.frames
    }

    fn frequency(&self, inputs: &GamepadInputs) -> f64 {
        let mut hz = self.base_hz;
        if inputs.a_button {
            hz *= 2.0;
        }
        if inputs.b_button {
            hz *= 0.5;
        }
        hz
    }

    fn render(&self) -> VideoFrame {
        let width = SCREEN_WIDTH as i64;
        let bar = (self.state.frames as i64 * 2 + self.state.offset).rem_euclid(width) as usize;
        let mut left = vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT];
        for (y, row) in left.chunks_exact_mut(SCREEN_WIDTH).enumerate() {
            for (x, pixel) in row.iter_mut().enumerate() {
                let in_bar = (x + SCREEN_WIDTH - bar) % SCREEN_WIDTH < BAR_WIDTH;
                *pixel = if in_bar { 0xFF } else if y % 32 == 0 { 0x40 } else { 0 };
            }
        }
        // The right eye sees the same scene; depth comes from the separation shift.
        let right = left.clone();
        VideoFrame { left, right }
    }
}

impl EmulationCore for ToneCore {
    type Savestate = ToneState;

    fn run_audio_frame(
        &mut self,
        inputs: GamepadInputs,
        sample_count: usize,
    ) -> Result<AudioFrame, CoreError> {
        let step = TAU * self.frequency(&inputs) / self.sample_rate;
        let mut left = Vec::with_capacity(sample_count);
        let mut right = Vec::with_capacity(sample_count);
        for _ in 0..sample_count {
            let sample = (self.state.phase.sin() * AMPLITUDE) as i16;
            left.push(sample);
            right.push(sample);
            self.state.phase = (self.state.phase + step) % TAU;
        }

        if inputs.left_dpad_left {
            self.state.offset -= 1;
        }
        if inputs.left_dpad_right {
            self.state.offset += 1;
        }

        self.since_frame += sample_count as f64;
        let video = if self.since_frame >= self.samples_per_frame {
            self.since_frame -= self.samples_per_frame;
            self.state.frames += 1;
            Some(self.render())
        } else {
            None
        };

        Ok(AudioFrame { left, right, video })
    }

    fn load_ram(&mut self, ram: &[u8]) {
        if let Ok(bytes) = <[u8; 8]>::try_from(ram) {
            self.state.offset = i64::from_le_bytes(bytes);
        }
    }

    fn save_ram(&self) -> Vec<u8> {
        self.state.offset.to_le_bytes().to_vec()
    }

    fn create_savestate(&mut self) -> Result<Vec<u8>, CoreError> {
        Ok(self.state.to_bytes())
    }

    fn load_savestate(&mut self, path: &Path) -> Result<ToneState, CoreError> {
        let bytes = std::fs::read(path)
            .map_err(|err| CoreError::new(format!("{}: {err}", path.display())))?;
        ToneState::from_bytes(&bytes)
            .ok_or_else(|| CoreError::new(format!("{} is not a tone save state", path.display())))
    }

    fn apply_savestate(&mut self, state: &ToneState) {
        self.state = *state;
    }
}
