use std::path::PathBuf;

use crossbeam_channel::Sender;

use crate::error::RuntimeError;

pub(crate) type ControlReplySender = Sender<Result<(), RuntimeError>>;

/// Requests handled on the emulation thread, the only writer of core state.
pub(crate) enum ControlMessage {
    Stop,
    SaveState(Sender<Result<PathBuf, RuntimeError>>),
    LoadState(PathBuf, ControlReplySender),
}
