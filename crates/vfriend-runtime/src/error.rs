use std::{path::PathBuf, sync::Arc};

use crate::bridge::CoreError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("audio output unavailable: {reason}")]
    AudioInit { reason: String },
    #[error("emulation core fault: {0}")]
    Core(#[from] CoreError),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("emulator control channel disconnected")]
    ControlChannelDisconnected,
    #[error("emulator did not respond in time for {op}")]
    ControlTimeout { op: &'static str },
    #[error("failed to spawn emulation thread: {0}")]
    Spawn(#[source] Arc<std::io::Error>),
    #[error("session has halted")]
    SessionHalted,
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl RuntimeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
