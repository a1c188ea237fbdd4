pub mod error;
pub mod keyboard;

#[cfg(feature = "gamepad")]
pub mod gamepad;

pub use error::SupportError as Error;
pub use keyboard::{Key, KeyBindings, KeyboardInput, parse_button};
