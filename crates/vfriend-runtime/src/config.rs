use std::path::PathBuf;

use crate::{
    error::RuntimeError,
    video::{ColorFormat, LedColors},
};

/// Native sample rate of the console's sound unit.
pub const CORE_SAMPLE_RATE: u32 = 41_667;
/// Samples requested from the core per scheduler tick (~9.6 ms at the native rate).
pub const SAMPLES_PER_TICK: usize = 400;
/// Audio held by the ring buffer between the emulation thread and the device.
pub const RING_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMode {
    /// Open the default output device; failing to do so is a setup fault.
    #[default]
    Auto,
    /// No device is opened. The ring buffer is still filled and its reader can
    /// be taken with [`crate::Emulator::take_audio_reader`].
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub audio: AudioMode,
    pub sample_rate: u32,
    pub samples_per_tick: usize,
    /// Root of the `Saves/` and `Savestates/` directories.
    pub save_dir: PathBuf,
    pub colors: LedColors,
    /// Horizontal eye separation in pixels.
    pub separation: f32,
    pub sound_enabled: bool,
    pub color_format: ColorFormat,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            audio: AudioMode::Auto,
            sample_rate: CORE_SAMPLE_RATE,
            samples_per_tick: SAMPLES_PER_TICK,
            save_dir: PathBuf::from("."),
            colors: LedColors::default(),
            separation: 0.0,
            sound_enabled: true,
            color_format: ColorFormat::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.sample_rate == 0 {
            return Err(RuntimeError::InvalidConfig("sample_rate must be non-zero"));
        }
        if self.samples_per_tick == 0 {
            return Err(RuntimeError::InvalidConfig(
                "samples_per_tick must be non-zero",
            ));
        }
        if !self.separation.is_finite() {
            return Err(RuntimeError::InvalidConfig("separation must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 41_667);
        assert_eq!(config.samples_per_tick, 400);
        assert!(config.sound_enabled);
    }

    #[test]
    fn rejects_zero_rates() {
        let config = RuntimeConfig {
            sample_rate: 0,
            ..RuntimeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::InvalidConfig(_))
        ));

        let config = RuntimeConfig {
            samples_per_tick: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
