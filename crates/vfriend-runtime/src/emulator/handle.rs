use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Sender, bounded, unbounded};

use crate::{
    audio::AudioOutput,
    bridge::{CoreError, EmulationCore},
    channel::{FrameReceiver, stereo_channel},
    config::{AudioMode, RING_SECONDS, RuntimeConfig},
    error::RuntimeError,
    input::{InputMerger, InputSource},
    paths::{SavePaths, title_from_path},
    ring::{RingReader, audio_ring, capacity_for},
    video::{FrameTransform, LedColors},
};

use super::{
    control::ControlMessage,
    pacer::Pacer,
    runner::Runner,
    session::Session,
    state::SessionState,
    types::{CONTROL_REPLY_TIMEOUT, EmulatorStats, SAVE_STATE_REPLY_TIMEOUT, SessionStatus},
    util::try_raise_current_thread_priority,
};

const THREAD_NAME: &str = "vfriend-emu";

type ThreadBody = Box<dyn FnOnce() + Send>;

fn spawn_emulation_thread(body: ThreadBody) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(THREAD_NAME.to_string()).spawn(body)
}

/// Configures and loads one emulation session.
pub struct EmulatorBuilder<C: EmulationCore> {
    core: C,
    title: String,
    config: RuntimeConfig,
    input: InputMerger,
}

impl<C: EmulationCore> EmulatorBuilder<C> {
    /// Key for the save files. Defaults to `untitled`.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Derives the title from a ROM path, see [`title_from_path`].
    pub fn rom_path(self, path: impl AsRef<Path>) -> Self {
        let title = title_from_path(path.as_ref());
        self.title(title)
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds an input source. All sources are merged once per tick.
    pub fn input(mut self, source: impl InputSource + 'static) -> Self {
        self.input.push(source);
        self
    }

    /// Opens audio, loads saved RAM into the core and returns an idle emulator.
    ///
    /// Audio device failure in [`AudioMode::Auto`] is fatal here.
    pub fn build(self) -> Result<Emulator<C>, RuntimeError> {
        let EmulatorBuilder {
            mut core,
            title,
            config,
            input,
        } = self;
        config.validate()?;

        let state = Arc::new(SessionState::new(
            config.colors,
            config.separation,
            config.sound_enabled,
        ));

        let (writer, reader) = audio_ring(capacity_for(config.sample_rate, RING_SECONDS));
        let (audio, audio_reader) = match config.audio {
            AudioMode::Disabled => (None, Some(reader)),
            AudioMode::Auto => {
                let output =
                    AudioOutput::open(reader, config.sample_rate, Arc::clone(&state.muted))
                        .map_err(|err| RuntimeError::AudioInit {
                            reason: format!("{err:#}"),
                        })?;
                (Some(output), None)
            }
        };

        let paths = SavePaths::new(&config.save_dir, title.clone());
        match paths.read_ram() {
            Ok(Some(ram)) => {
                tracing::info!(bytes = ram.len(), title = paths.title(), "loaded save RAM");
                core.load_ram(&ram);
            }
            Ok(None) => tracing::debug!(title = paths.title(), "no save RAM found"),
            Err(err) => tracing::warn!("failed to load save RAM: {err}"),
        }

        let (frame_tx, frame_rx) = stereo_channel();
        let session = Session::new(
            core,
            paths,
            Box::new(input),
            writer,
            frame_tx,
            FrameTransform::new(config.colors, config.color_format),
            config.samples_per_tick,
        );

        Ok(Emulator {
            title,
            config,
            state,
            session: Some(session),
            audio,
            audio_reader,
            frames: frame_rx,
            ctrl_tx: None,
            join: None,
        })
    }
}

/// A real-time emulation session.
///
/// `Idle -> Running -> Halted`. [`Emulator::start`] runs one priming tick on the
/// caller's thread, then hands the core to a dedicated thread paced by the audio
/// sample clock. [`Emulator::shutdown`] (also run on drop) stops audio, stops the
/// thread and persists save RAM. A halted emulator cannot be restarted.
pub struct Emulator<C: EmulationCore> {
    title: String,
    config: RuntimeConfig,
    state: Arc<SessionState>,
    /// Present while idle; moves to the emulation thread on start.
    session: Option<Session<C>>,
    audio: Option<AudioOutput>,
    audio_reader: Option<RingReader>,
    frames: FrameReceiver,
    ctrl_tx: Option<Sender<ControlMessage>>,
    join: Option<JoinHandle<()>>,
}

impl<C: EmulationCore> Emulator<C> {
    pub fn builder(core: C) -> EmulatorBuilder<C> {
        EmulatorBuilder {
            core,
            title: "untitled".to_string(),
            config: RuntimeConfig::default(),
            input: InputMerger::new(),
        }
    }

    /// Starts emulation. A no-op when already running.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        self.start_with(spawn_emulation_thread)
    }

    fn start_with(
        &mut self,
        spawn: impl FnOnce(ThreadBody) -> io::Result<JoinHandle<()>>,
    ) -> Result<(), RuntimeError> {
        match self.state.status() {
            SessionStatus::Running => return Ok(()),
            SessionStatus::Halted => return Err(RuntimeError::SessionHalted),
            SessionStatus::Idle => {}
        }
        let Some(mut session) = self.session.take() else {
            return Err(RuntimeError::SessionHalted);
        };

        // Give the display a frame before the first scheduled tick.
        if let Err(err) = session.tick(&self.state) {
            tracing::error!("emulation core fault on first tick: {err}");
            self.state.record_fault(err.clone());
            session.persist_ram();
            return Err(err.into());
        }

        let (ctrl_tx, ctrl_rx) = unbounded::<ControlMessage>();
        // The session stays here until the thread exists.
        let (session_tx, session_rx) = bounded::<Session<C>>(1);
        let thread_state = Arc::clone(&self.state);
        let pacer = Pacer::new(
            self.config.samples_per_tick,
            self.config.sample_rate,
            Instant::now(),
        );

        let body: ThreadBody = Box::new(move || {
            let Ok(session) = session_rx.recv() else {
                return;
            };
            try_raise_current_thread_priority();
            Runner::new(session, ctrl_rx, thread_state, pacer).run();
        });
        let spawned = spawn(body);
        let join = match spawned {
            Ok(join) => join,
            Err(err) => {
                tracing::error!("failed to spawn emulation thread: {err}");
                session.persist_ram();
                self.state.set_status(SessionStatus::Halted);
                return Err(RuntimeError::Spawn(Arc::new(err)));
            }
        };

        self.state.set_status(SessionStatus::Running);
        if let Err(returned) = session_tx.send(session) {
            tracing::error!("emulation thread exited before receiving the session");
            returned.into_inner().persist_ram();
            self.state.set_status(SessionStatus::Halted);
            if join.join().is_err() {
                tracing::error!("emulation thread panicked");
            }
            return Err(RuntimeError::ControlChannelDisconnected);
        }

        self.ctrl_tx = Some(ctrl_tx);
        self.join = Some(join);

        if let Some(audio) = &mut self.audio
            && let Err(err) = audio.play()
        {
            tracing::error!("failed to start audio output: {err:#}");
        }

        tracing::info!(title = %self.title, "session started");
        Ok(())
    }

    /// Stops audio and emulation and persists save RAM. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(audio) = &mut self.audio
            && let Err(err) = audio.pause()
        {
            tracing::warn!("failed to stop audio output: {err:#}");
        }

        let was_active = self.join.is_some() || self.session.is_some();

        if let Some(ctrl_tx) = self.ctrl_tx.take() {
            let _ = ctrl_tx.send(ControlMessage::Stop);
        }
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::error!("emulation thread panicked");
        }
        // Never started: persist here instead of on the emulation thread.
        if let Some(session) = self.session.take() {
            session.persist_ram();
        }

        self.state.set_status(SessionStatus::Halted);
        if was_active {
            tracing::info!(title = %self.title, "session stopped");
        }
    }

    fn send_with_reply<T>(
        &self,
        op: &'static str,
        timeout: Duration,
        build: impl FnOnce(Sender<Result<T, RuntimeError>>) -> ControlMessage,
    ) -> Result<T, RuntimeError> {
        let ctrl_tx = self
            .ctrl_tx
            .as_ref()
            .ok_or(RuntimeError::ControlChannelDisconnected)?;
        let (reply_tx, reply_rx) = bounded::<Result<T, RuntimeError>>(1);
        ctrl_tx
            .send(build(reply_tx))
            .map_err(|_| RuntimeError::ControlChannelDisconnected)?;
        match reply_rx.recv_timeout(timeout) {
            Ok(res) => res,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                Err(RuntimeError::ControlTimeout { op })
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(RuntimeError::ControlChannelDisconnected)
            }
        }
    }

    /// Writes a timestamped save state for this title and returns its path.
    pub fn save_state(&mut self) -> Result<PathBuf, RuntimeError> {
        match self.state.status() {
            SessionStatus::Halted => Err(RuntimeError::SessionHalted),
            SessionStatus::Running => self.send_with_reply(
                "save_state",
                SAVE_STATE_REPLY_TIMEOUT,
                ControlMessage::SaveState,
            ),
            SessionStatus::Idle => self
                .session
                .as_mut()
                .ok_or(RuntimeError::SessionHalted)?
                .save_state(),
        }
    }

    /// Loads and applies a save state, dropping any queued audio.
    pub fn load_state(&mut self, path: impl Into<PathBuf>) -> Result<(), RuntimeError> {
        let path = path.into();
        match self.state.status() {
            SessionStatus::Halted => Err(RuntimeError::SessionHalted),
            SessionStatus::Running => {
                self.send_with_reply("load_state", CONTROL_REPLY_TIMEOUT, |reply| {
                    ControlMessage::LoadState(path, reply)
                })
            }
            SessionStatus::Idle => self
                .session
                .as_mut()
                .ok_or(RuntimeError::SessionHalted)?
                .load_state(&path),
        }
    }

    /// Save states for this title, newest first.
    pub fn list_savestates(&self) -> Result<Vec<PathBuf>, RuntimeError> {
        SavePaths::new(&self.config.save_dir, self.title()).list_savestates()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// A new consumer of rendered frames. All receivers share one slot, so
    /// each frame goes to exactly one of them. Receivers report closed once the
    /// session halts.
    pub fn subscribe_frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    /// The ring buffer's reader when audio is [`AudioMode::Disabled`]. Taken once.
    pub fn take_audio_reader(&mut self) -> Option<RingReader> {
        self.audio_reader.take()
    }

    pub fn set_colors(&self, colors: LedColors) {
        self.state.set_colors(colors);
    }

    pub fn colors(&self) -> LedColors {
        self.state.colors()
    }

    /// Eye separation in pixels. Non-finite values are ignored.
    pub fn set_separation(&self, separation: f32) {
        if separation.is_finite() {
            self.state.set_separation(separation);
        }
    }

    pub fn separation(&self) -> f32 {
        self.state.separation()
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.state
            .muted
            .store(!enabled, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn sound_enabled(&self) -> bool {
        !self.state.muted.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// The core error that halted this session, if any.
    pub fn fault(&self) -> Option<CoreError> {
        self.state.fault()
    }

    pub fn stats(&self) -> EmulatorStats {
        self.state.stats()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl<C: EmulationCore> Drop for Emulator<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
