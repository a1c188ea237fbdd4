use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

/// VirtualFriend headless driver
///
/// Runs the real-time pipeline against a built-in tone generator and reports
/// pacing, audio underruns and dropped frames.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 5.0)]
    pub duration: f64,

    /// Title used for save files
    #[arg(long, default_value = "Tone Test")]
    pub title: String,

    /// Directory holding `Saves/` and `Savestates/`
    #[arg(long, default_value = ".")]
    pub save_dir: PathBuf,

    /// Disable audio output; the ring buffer is drained at device pace instead
    #[arg(long)]
    pub no_audio: bool,

    /// Start muted
    #[arg(long)]
    pub mute: bool,

    /// Base tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    pub tone_hz: f32,

    /// Horizontal eye separation in pixels
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub separation: f32,

    /// Keys held for the whole run, by name (e.g. `space`, `w`)
    #[arg(long = "key")]
    pub keys: Vec<String>,

    /// Key binding overrides as KEY=BUTTON (e.g. `enter=start`)
    #[arg(long = "bind")]
    pub bindings: Vec<String>,

    /// Also read connected game controllers
    #[cfg(feature = "gamepad")]
    #[arg(long)]
    pub gamepad: bool,

    /// Write a save state before shutting down
    #[arg(long)]
    pub save_state: bool,

    /// Log level when `RUST_LOG` is not set (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: Level,
}
