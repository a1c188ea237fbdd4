mod args;
mod tone;

use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vfriend_runtime::{
    AudioMode, CORE_SAMPLE_RATE, Closed, Emulator, FrameReceiver, RingReader, RuntimeConfig,
};
use vfriend_support::{Key, KeyBindings, KeyboardInput};

use crate::{args::Args, tone::ToneCore};

const REPORT_EVERY: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if !(args.duration.is_finite() && args.duration > 0.0) {
        bail!("--duration must be a positive number of seconds");
    }

    let mut bindings = KeyBindings::default();
    for binding in &args.bindings {
        bindings
            .apply_override(binding)
            .with_context(|| format!("bad --bind {binding:?}"))?;
    }
    let mut keyboard = KeyboardInput::new(bindings);
    for name in &args.keys {
        let key: Key = name.parse()?;
        if !keyboard.key_down(key) {
            warn!("key {key} is not bound to any control");
        }
    }

    let config = RuntimeConfig {
        audio: if args.no_audio {
            AudioMode::Disabled
        } else {
            AudioMode::Auto
        },
        save_dir: args.save_dir.clone(),
        separation: args.separation,
        sound_enabled: !args.mute,
        ..RuntimeConfig::default()
    };

    let core = ToneCore::new(args.tone_hz, config.sample_rate);
    let builder = Emulator::builder(core)
        .title(args.title.clone())
        .config(config)
        .input(keyboard.source());

    #[cfg(feature = "gamepad")]
    let (builder, _gamepad) = if args.gamepad {
        let poller = vfriend_support::gamepad::GamepadPoller::spawn()
            .context("failed to start gamepad input")?;
        (builder.input(poller.source()), Some(poller))
    } else {
        (builder, None)
    };

    let mut emulator = builder.build().context("failed to set up emulator")?;
    let frames = spawn_frame_consumer(emulator.subscribe_frames())?;
    let drain = emulator.take_audio_reader().map(spawn_audio_drain).transpose()?;

    emulator.start().context("failed to start emulation")?;

    let started = Instant::now();
    let run_for = Duration::from_secs_f64(args.duration);
    while started.elapsed() < run_for {
        thread::sleep(REPORT_EVERY.min(run_for.saturating_sub(started.elapsed())));
        let stats = emulator.stats();
        info!(
            ticks = stats.ticks,
            frames = stats.frames_sent,
            superseded = stats.frames_superseded,
            underruns = stats.underruns,
            resyncs = stats.resyncs,
            "running"
        );
        if let Some(fault) = emulator.fault() {
            warn!("core halted: {fault}");
            break;
        }
    }

    if args.save_state {
        match emulator.save_state() {
            Ok(path) => info!(path = %path.display(), "save state written"),
            Err(err) => warn!("save state failed: {err}"),
        }
    }

    keyboard.release_all();
    emulator.shutdown();
    let elapsed = started.elapsed();

    let received = frames
        .join()
        .map_err(|_| anyhow::anyhow!("frame consumer panicked"))?;
    if let Some(drain) = drain {
        drain.stop();
    }

    let stats = emulator.stats();
    let expected_ticks =
        elapsed.as_secs_f64() * f64::from(CORE_SAMPLE_RATE) / emulator.config().samples_per_tick as f64;
    info!(
        elapsed = ?elapsed,
        ticks = stats.ticks,
        expected_ticks = expected_ticks.round() as u64,
        frames_sent = stats.frames_sent,
        frames_received = received,
        superseded = stats.frames_superseded,
        underruns = stats.underruns,
        resyncs = stats.resyncs,
        "session finished"
    );

    match emulator.fault() {
        Some(fault) => bail!("emulation core fault: {fault}"),
        None => Ok(()),
    }
}

/// Stands in for a display: takes frames as they come until the channel closes.
fn spawn_frame_consumer(frames: FrameReceiver) -> Result<thread::JoinHandle<u64>> {
    let handle = thread::Builder::new()
        .name("frame-consumer".into())
        .spawn(move || {
            let mut received = 0u64;
            let mut last_sequence = None;
            loop {
                match frames.recv() {
                    Ok(frame) => {
                        if let Some(last) = last_sequence
                            && frame.sequence <= last
                        {
                            warn!(frame.sequence, last, "frame arrived out of order");
                        }
                        last_sequence = Some(frame.sequence);
                        received += 1;
                    }
                    Err(Closed) => break,
                }
            }
            received
        })?;
    Ok(handle)
}

struct AudioDrain {
    stop: crossbeam_channel::Sender<()>,
    join: thread::JoinHandle<()>,
}

impl AudioDrain {
    fn stop(self) {
        let _ = self.stop.send(());
        if self.join.join().is_err() {
            warn!("audio drain panicked");
        }
    }
}

/// Reads the ring at device pace when no output device is open.
fn spawn_audio_drain(mut reader: RingReader) -> Result<AudioDrain> {
    const PERIOD: Duration = Duration::from_millis(10);
    let bytes_per_period = (CORE_SAMPLE_RATE as usize / 100) * 4;

    let (stop, stopped) = crossbeam_channel::bounded::<()>(1);
    let join = thread::Builder::new()
        .name("audio-drain".into())
        .spawn(move || {
            let mut buffer = vec![0u8; bytes_per_period];
            let mut next = Instant::now() + PERIOD;
            loop {
                match stopped.recv_deadline(next) {
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                reader.read(&mut buffer);
                next += PERIOD;
            }
        })?;
    Ok(AudioDrain { stop, join })
}
