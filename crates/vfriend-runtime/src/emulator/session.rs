use std::{
    path::{Path, PathBuf},
    sync::atomic::Ordering,
    time::SystemTime,
};

use crate::{
    bridge::{CoreError, EmulationCore},
    channel::{FrameSender, SendOutcome},
    error::RuntimeError,
    input::InputSource,
    paths::SavePaths,
    ring::RingWriter,
    video::FrameTransform,
};

use super::state::SessionState;

/// Everything one tick touches. Owned by the emulator until `start`, then moved
/// onto the emulation thread.
pub(crate) struct Session<C: EmulationCore> {
    pub(crate) core: C,
    pub(crate) paths: SavePaths,
    input: Box<dyn InputSource>,
    writer: RingWriter,
    frames: FrameSender,
    transform: FrameTransform,
    colors_epoch: u64,
    samples_per_tick: usize,
    frame_seq: u64,
    scratch: Vec<u8>,
}

impl<C: EmulationCore> Session<C> {
    pub(crate) fn new(
        core: C,
        paths: SavePaths,
        input: Box<dyn InputSource>,
        writer: RingWriter,
        frames: FrameSender,
        transform: FrameTransform,
        samples_per_tick: usize,
    ) -> Self {
        Self {
            core,
            paths,
            input,
            writer,
            frames,
            transform,
            colors_epoch: 0,
            samples_per_tick,
            frame_seq: 0,
            scratch: Vec::with_capacity(samples_per_tick * crate::ring::BYTES_PER_FRAME),
        }
    }

    /// Polls input, runs one core batch and routes its audio and video.
    pub(crate) fn tick(&mut self, state: &SessionState) -> Result<(), CoreError> {
        let inputs = self.input.poll();
        let frame = self.core.run_audio_frame(inputs, self.samples_per_tick)?;

        self.scratch.clear();
        frame.interleave_into(&mut self.scratch);
        self.writer.write(&self.scratch);
        state
            .underruns
            .store(self.writer.underruns(), Ordering::Relaxed);

        if let Some(video) = &frame.video {
            let epoch = state.colors_epoch();
            if epoch != self.colors_epoch {
                self.colors_epoch = epoch;
                self.transform.set_colors(state.colors());
            }

            let stereo = self.transform.apply(video, state.separation(), self.frame_seq);
            self.frame_seq += 1;
            match self.frames.send(stereo) {
                SendOutcome::Delivered => {
                    state.frames_sent.fetch_add(1, Ordering::Relaxed);
                }
                SendOutcome::Superseded => {
                    state.frames_sent.fetch_add(1, Ordering::Relaxed);
                    state.frames_superseded.fetch_add(1, Ordering::Relaxed);
                }
                SendOutcome::Disconnected => {}
            }
        }

        state.ticks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn save_state(&mut self) -> Result<PathBuf, RuntimeError> {
        let bytes = self.core.create_savestate()?;
        let path = self.paths.write_savestate(SystemTime::now(), &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "save state written");
        Ok(path)
    }

    pub(crate) fn load_state(&mut self, path: &Path) -> Result<(), RuntimeError> {
        let savestate = self.core.load_savestate(path)?;
        self.core.apply_savestate(&savestate);
        // Audio queued from before the jump would play out of place.
        self.writer.clear();
        tracing::info!(path = %path.display(), "save state applied");
        Ok(())
    }

    /// Writes the core's RAM to the title's save file. Failure is logged only.
    pub(crate) fn persist_ram(&self) {
        let ram = self.core.save_ram();
        match self.paths.write_ram(&ram) {
            Ok(path) => {
                tracing::info!(path = %path.display(), bytes = ram.len(), "save RAM written")
            }
            Err(err) => tracing::warn!("failed to persist save RAM: {err}"),
        }
    }
}
