use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering},
};

use parking_lot::Mutex;

use crate::{bridge::CoreError, video::LedColors};

use super::types::{EmulatorStats, SessionStatus};

/// State shared between the owning [`crate::Emulator`] and its emulation thread.
pub(crate) struct SessionState {
    status: AtomicU8,
    /// Shared with the audio callback.
    pub(crate) muted: Arc<AtomicBool>,
    separation_bits: AtomicU32,
    colors: Mutex<LedColors>,
    colors_epoch: AtomicU64,
    fault: Mutex<Option<CoreError>>,

    pub(crate) ticks: AtomicU64,
    pub(crate) resyncs: AtomicU64,
    pub(crate) frames_sent: AtomicU64,
    pub(crate) frames_superseded: AtomicU64,
    pub(crate) underruns: AtomicU64,
}

impl SessionState {
    pub(crate) fn new(colors: LedColors, separation: f32, sound_enabled: bool) -> Self {
        Self {
            status: AtomicU8::new(SessionStatus::Idle.to_u8()),
            muted: Arc::new(AtomicBool::new(!sound_enabled)),
            separation_bits: AtomicU32::new(separation.to_bits()),
            colors: Mutex::new(colors),
            colors_epoch: AtomicU64::new(0),
            fault: Mutex::new(None),
            ticks: AtomicU64::new(0),
            resyncs: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_superseded: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        }
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: SessionStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    pub(crate) fn separation(&self) -> f32 {
        f32::from_bits(self.separation_bits.load(Ordering::Relaxed))
    }

    pub(crate) fn set_separation(&self, separation: f32) {
        self.separation_bits
            .store(separation.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn colors(&self) -> LedColors {
        *self.colors.lock()
    }

    pub(crate) fn set_colors(&self, colors: LedColors) {
        *self.colors.lock() = colors;
        self.colors_epoch.fetch_add(1, Ordering::Release);
    }

    /// Changes whenever [`SessionState::set_colors`] is called.
    pub(crate) fn colors_epoch(&self) -> u64 {
        self.colors_epoch.load(Ordering::Acquire)
    }

    pub(crate) fn fault(&self) -> Option<CoreError> {
        self.fault.lock().clone()
    }

    pub(crate) fn record_fault(&self, error: CoreError) {
        *self.fault.lock() = Some(error);
        self.set_status(SessionStatus::Halted);
    }

    pub(crate) fn stats(&self) -> EmulatorStats {
        EmulatorStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_superseded: self.frames_superseded.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}
