#![allow(dead_code)]

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use vfriend_runtime::{
    AudioFrame, AudioMode, CoreError, EmulationCore, GamepadInputs, RuntimeConfig, VideoFrame,
    video::SCREEN_SIZE,
};

/// What the fake core has been asked to do, observable from the test thread.
#[derive(Debug, Default)]
pub struct ProbeState {
    pub calls: u64,
    pub last_inputs: GamepadInputs,
    pub loaded_ram: Option<Vec<u8>>,
    pub applied: Vec<Vec<u8>>,
    pub sample_counts: Vec<usize>,
}

pub type Probe = Arc<Mutex<ProbeState>>;

/// Deterministic stand-in for the emulation core.
///
/// Call `n` produces left samples `n` and right samples `-n`, a video pair with
/// the left eye fully lit and the right eye dark, and sets RAM to `n` as bytes.
pub struct FakeCore {
    pub probe: Probe,
    ram: Vec<u8>,
    fail_on_call: Option<u64>,
}

impl FakeCore {
    pub fn new() -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                probe: Arc::clone(&probe),
                ram: vec![0xAB; 8],
                fail_on_call: None,
            },
            probe,
        )
    }

    pub fn failing_on(call: u64) -> (Self, Probe) {
        let (mut core, probe) = Self::new();
        core.fail_on_call = Some(call);
        (core, probe)
    }
}

impl EmulationCore for FakeCore {
    type Savestate = Vec<u8>;

    fn run_audio_frame(
        &mut self,
        inputs: GamepadInputs,
        sample_count: usize,
    ) -> Result<AudioFrame, CoreError> {
        let mut probe = self.probe.lock();
        probe.calls += 1;
        probe.last_inputs = inputs;
        probe.sample_counts.push(sample_count);
        let call = probe.calls;
        drop(probe);

        if self.fail_on_call == Some(call) {
            return Err(CoreError::new(format!("bus error on call {call}")));
        }

        self.ram = call.to_le_bytes().to_vec();
        let value = call as i16;
        Ok(AudioFrame {
            left: vec![value; sample_count],
            right: vec![-value; sample_count],
            video: Some(VideoFrame {
                left: vec![255; SCREEN_SIZE],
                right: vec![0; SCREEN_SIZE],
            }),
        })
    }

    fn load_ram(&mut self, ram: &[u8]) {
        self.ram = ram.to_vec();
        self.probe.lock().loaded_ram = Some(ram.to_vec());
    }

    fn save_ram(&self) -> Vec<u8> {
        self.ram.clone()
    }

    fn create_savestate(&mut self) -> Result<Vec<u8>, CoreError> {
        Ok(format!("state@{}", self.probe.lock().calls).into_bytes())
    }

    fn load_savestate(&mut self, path: &Path) -> Result<Vec<u8>, CoreError> {
        std::fs::read(path).map_err(|err| CoreError::new(err.to_string()))
    }

    fn apply_savestate(&mut self, state: &Vec<u8>) {
        self.probe.lock().applied.push(state.clone());
    }
}

pub fn headless_config(save_dir: &Path) -> RuntimeConfig {
    RuntimeConfig {
        audio: AudioMode::Disabled,
        save_dir: save_dir.to_path_buf(),
        ..RuntimeConfig::default()
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub fn pixel(plane: &[u8], x: usize, y: usize) -> [u8; 4] {
    let offset = (y * vfriend_runtime::SCREEN_WIDTH + x) * 4;
    [
        plane[offset],
        plane[offset + 1],
        plane[offset + 2],
        plane[offset + 3],
    ]
}
