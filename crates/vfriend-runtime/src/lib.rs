pub mod audio;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod emulator;
pub mod error;
pub mod host;
pub mod input;
pub mod paths;
pub mod ring;
pub mod touch;
pub mod video;

pub use bridge::{AudioFrame, CoreError, EmulationCore};
pub use channel::{Closed, FrameReceiver, FrameSender, SendOutcome, stereo_channel};
pub use config::{AudioMode, CORE_SAMPLE_RATE, RuntimeConfig, SAMPLES_PER_TICK};
pub use emulator::{Emulator, EmulatorBuilder, EmulatorStats, SessionStatus};
pub use error::RuntimeError;
pub use host::{LifecycleEvent, SessionHost};
pub use input::{Button, GamepadInputs, InputMerger, InputSource, SharedInputs};
pub use ring::{RingReader, RingWriter, audio_ring};
pub use touch::{Point, Rect, TouchController, TouchSurface};
pub use video::{
    ColorFormat, FrameTransform, LedColors, Rgb, SCREEN_HEIGHT, SCREEN_WIDTH, StereoFrame,
    VideoFrame,
};
