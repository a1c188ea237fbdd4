use std::time::{Duration, Instant};

/// Falling further behind than this re-anchors the schedule instead of catching up.
pub(crate) const RESYNC_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    OnTime,
    /// The deadline was this far in the past and has been reset to now.
    Resynced { behind: Duration },
}

/// Absolute-deadline schedule for core ticks, paced by the audio sample clock.
///
/// Deadlines advance by a fixed interval so per-tick jitter does not accumulate.
#[derive(Debug, Clone)]
pub(crate) struct Pacer {
    interval: Duration,
    next_deadline: Instant,
}

impl Pacer {
    pub(crate) fn new(samples_per_tick: usize, sample_rate: u32, now: Instant) -> Self {
        Self {
            interval: Duration::from_secs_f64(samples_per_tick as f64 / f64::from(sample_rate)),
            next_deadline: now,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.next_deadline
    }

    /// Moves to the next tick after one has run at `now`.
    pub(crate) fn advance(&mut self, now: Instant) -> Advance {
        self.next_deadline += self.interval;
        if let Some(behind) = now.checked_duration_since(self.next_deadline)
            && behind > RESYNC_THRESHOLD
        {
            self.next_deadline = now;
            return Advance::Resynced { behind };
        }
        Advance::OnTime
    }
}
