//! Single-slot "keep latest" channel for rendered stereo frames.
//!
//! The emulation thread must never wait on the display. Sending replaces any
//! frame the consumer has not taken yet, so the consumer always receives the
//! newest image and intermediate frames are dropped.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};

use crate::video::StereoFrame;

/// The producing side hung up; no further frames will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stereo frame channel closed")]
pub struct Closed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The slot was empty.
    Delivered,
    /// A pending frame was replaced.
    Superseded,
    /// Every receiver is gone; the frame was dropped.
    Disconnected,
}

/// Creates a connected pair. Receivers may be cloned; each frame goes to one of them.
pub fn stereo_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = bounded(1);
    (
        FrameSender {
            tx,
            reclaim: rx.clone(),
        },
        FrameReceiver { rx },
    )
}

pub struct FrameSender {
    tx: Sender<StereoFrame>,
    // Lets the producer evict a stale frame without waiting for the consumer.
    reclaim: Receiver<StereoFrame>,
}

impl FrameSender {
    /// Publishes `frame`, evicting the pending one if the slot is full. Never blocks.
    pub fn send(&self, frame: StereoFrame) -> SendOutcome {
        if !self.has_receivers() {
            return SendOutcome::Disconnected;
        }
        let mut frame = frame;
        let mut superseded = false;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) if superseded => return SendOutcome::Superseded,
                Ok(()) => return SendOutcome::Delivered,
                Err(TrySendError::Full(rejected)) => {
                    superseded |= self.reclaim.try_recv().is_ok();
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return SendOutcome::Disconnected,
            }
        }
    }

    /// Whether any consumer is still attached. The sender's own reclaim handle
    /// is not counted.
    pub fn has_receivers(&self) -> bool {
        self.tx.receiver_count() > 1
    }
}

#[derive(Clone)]
pub struct FrameReceiver {
    rx: Receiver<StereoFrame>,
}

impl FrameReceiver {
    /// Blocks until a frame is available or the sender is dropped.
    pub fn recv(&self) -> Result<StereoFrame, Closed> {
        self.rx.recv().map_err(|_| Closed)
    }

    /// Returns `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<StereoFrame>, Closed> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Closed),
        }
    }

    pub fn try_recv(&self) -> Result<Option<StereoFrame>, Closed> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Closed),
        }
    }

    /// Blocking iterator that ends when the sender is dropped.
    pub fn iter(&self) -> impl Iterator<Item = StereoFrame> + '_ {
        self.rx.iter()
    }
}
