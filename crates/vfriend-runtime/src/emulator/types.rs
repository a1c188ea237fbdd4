use std::time::Duration;

pub(crate) const CONTROL_REPLY_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const SAVE_STATE_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Built, core loaded, not yet started.
    Idle,
    Running,
    /// Terminal. A new [`crate::Emulator`] is needed to run again.
    Halted,
}

impl SessionStatus {
    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            SessionStatus::Idle => 0,
            SessionStatus::Running => 1,
            SessionStatus::Halted => 2,
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionStatus::Idle,
            1 => SessionStatus::Running,
            _ => SessionStatus::Halted,
        }
    }
}

/// Counters describing how the pipeline has kept up so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmulatorStats {
    /// Core batches run, including the priming tick.
    pub ticks: u64,
    /// Times the scheduler fell more than a second behind and re-anchored.
    pub resyncs: u64,
    pub frames_sent: u64,
    /// Frames that replaced one the display had not picked up yet.
    pub frames_superseded: u64,
    /// Device reads that had to be padded with silence.
    pub underruns: u64,
}
