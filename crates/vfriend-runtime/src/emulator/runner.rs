use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::bridge::EmulationCore;

use super::{
    control::ControlMessage,
    pacer::{Advance, Pacer},
    session::Session,
    state::SessionState,
    types::SessionStatus,
};

enum WaitOutcome {
    /// Runner should exit (channel disconnected or Stop received).
    Exit,
    /// A control message was handled; caller should re-check the deadline.
    ControlHandled,
    DeadlineReached,
}

// Hybrid wait tuning:
// - Sleep in small chunks until we're close to the deadline.
// - Spin for the final window for tighter pacing.
const MAX_SLEEP_CHUNK: Duration = Duration::from_millis(4);
const SPIN_THRESHOLD: Duration = Duration::from_micros(300);
const SPIN_YIELD_EVERY: u32 = 512;

pub(crate) struct Runner<C: EmulationCore> {
    session: Session<C>,
    ctrl_rx: Receiver<ControlMessage>,
    state: Arc<SessionState>,
    pacer: Pacer,
}

impl<C: EmulationCore> Runner<C> {
    pub(crate) fn new(
        session: Session<C>,
        ctrl_rx: Receiver<ControlMessage>,
        state: Arc<SessionState>,
        pacer: Pacer,
    ) -> Self {
        Self {
            session,
            ctrl_rx,
            state,
            pacer,
        }
    }

    pub(crate) fn run(mut self) {
        tracing::debug!(interval = ?self.pacer.interval(), "emulation loop started");
        self.run_loop();

        // The loop is done with the core; nothing else can touch it now.
        self.session.persist_ram();
        if self.state.status() == SessionStatus::Running {
            self.state.set_status(SessionStatus::Halted);
        }
        tracing::debug!("emulation loop exited");
    }

    fn run_loop(&mut self) {
        loop {
            while let Ok(msg) = self.ctrl_rx.try_recv() {
                if self.handle_control(msg) {
                    return;
                }
            }

            match self.wait_until_next_deadline() {
                WaitOutcome::Exit => return,
                WaitOutcome::ControlHandled => continue,
                WaitOutcome::DeadlineReached => {}
            }

            if let Err(err) = self.session.tick(&self.state) {
                tracing::error!("emulation core fault, halting session: {err}");
                self.state.record_fault(err);
                return;
            }

            if let Advance::Resynced { behind } = self.pacer.advance(Instant::now()) {
                tracing::warn!(?behind, "emulation fell behind, resynchronizing");
                self.state
                    .resyncs
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
    }

    fn wait_until_next_deadline(&mut self) -> WaitOutcome {
        loop {
            let target = self.pacer.deadline();
            let now = Instant::now();
            if now >= target {
                return WaitOutcome::DeadlineReached;
            }

            let remaining = target - now;

            // Coarse phase: sleep in chunks while still far from the deadline,
            // but always keep a final spin window.
            if remaining > SPIN_THRESHOLD {
                let sleep_for = (remaining - SPIN_THRESHOLD).min(MAX_SLEEP_CHUNK);
                match self.ctrl_rx.recv_timeout(sleep_for) {
                    Ok(msg) => {
                        if self.handle_control(msg) {
                            return WaitOutcome::Exit;
                        }
                        return WaitOutcome::ControlHandled;
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => return WaitOutcome::Exit,
                }
            }

            // Fine phase: spin until the deadline, still polling control messages.
            let mut spins: u32 = 0;
            while Instant::now() < target {
                match self.ctrl_rx.try_recv() {
                    Ok(msg) => {
                        if self.handle_control(msg) {
                            return WaitOutcome::Exit;
                        }
                        return WaitOutcome::ControlHandled;
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => return WaitOutcome::Exit,
                }

                std::hint::spin_loop();
                spins = spins.wrapping_add(1);
                if spins.is_multiple_of(SPIN_YIELD_EVERY) {
                    thread::yield_now();
                }
            }

            return WaitOutcome::DeadlineReached;
        }
    }

    /// Returns `true` when the runner should exit.
    fn handle_control(&mut self, msg: ControlMessage) -> bool {
        match msg {
            ControlMessage::Stop => return true,
            ControlMessage::SaveState(reply) => {
                let result = self.session.save_state();
                if let Err(err) = &result {
                    tracing::warn!("save state failed: {err}");
                }
                let _ = reply.send(result);
            }
            ControlMessage::LoadState(path, reply) => {
                let result = self.session.load_state(&path);
                if let Err(err) = &result {
                    tracing::warn!(path = %path.display(), "load state failed: {err}");
                }
                let _ = reply.send(result);
            }
        }

        false
    }
}
