use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupportError {
    #[error("Gamepad error: {0}")]
    Gamepad(String),

    #[error("Unknown key name: {0:?}")]
    UnknownKey(String),

    #[error("Unknown button name: {0:?}")]
    UnknownButton(String),

    #[error("Invalid key binding {0:?}, expected KEY=BUTTON")]
    InvalidBinding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
