use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use cpal::{
    FromSample, Sample, SampleFormat, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::ring::{BYTES_PER_FRAME, RingReader};

// Enough pending source audio for device callbacks of up to ~8k frames.
const PENDING_FRAMES: usize = 8192;

/// Audio output on cpal's default device, fed from the emulation ring buffer.
///
/// The device callback pulls core-rate frames from the [`RingReader`] and
/// linearly resamples them to the device rate. It never blocks or allocates; a
/// shortfall plays as silence.
pub struct AudioOutput {
    device_rate: u32,
    channels: u16,
    playing: bool,
    stream: cpal::Stream,
}

impl AudioOutput {
    /// Opens the default output device. The stream starts paused.
    pub fn open(reader: RingReader, source_rate: u32, muted: Arc<AtomicBool>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no default output device")?;

        let config = device
            .default_output_config()
            .context("no default output config")?;
        let device_rate = config.sample_rate();
        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        let channels = stream_config.channels;

        let resampler = Resampler::new(source_rate, device_rate);
        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &stream_config, reader, resampler, muted)?
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &stream_config, reader, resampler, muted)?
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &stream_config, reader, resampler, muted)?
            }
            other => anyhow::bail!("unsupported sample format {other:?}"),
        };
        stream.pause().context("failed to pause new output stream")?;

        tracing::info!(
            device_rate,
            channels,
            ?sample_format,
            source_rate,
            "audio output opened"
        );

        Ok(Self {
            device_rate,
            channels,
            playing: false,
            stream,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut reader: RingReader,
        mut resampler: Resampler,
        muted: Arc<AtomicBool>,
    ) -> Result<cpal::Stream>
    where
        T: Sample + SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let err_fn = |err| tracing::error!("audio stream error: {err}");
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _| {
                let frames = data.len() / channels.max(1);
                resampler.fill(&mut reader, frames);
                let muted = muted.load(Ordering::Relaxed);

                for frame in data.chunks_mut(channels.max(1)) {
                    let [mut l, mut r] = resampler.next_frame();
                    if muted {
                        l = 0.0;
                        r = 0.0;
                    }
                    match channels {
                        0 => {}
                        1 => {
                            frame[0] = ((l + r) * 0.5).to_sample::<T>();
                        }
                        _ => {
                            let r_conv: T = r.to_sample::<T>();
                            frame[0] = l.to_sample::<T>();
                            frame[1] = r_conv;
                            for ch in &mut frame[2..] {
                                *ch = r_conv;
                            }
                        }
                    }
                }
            },
            err_fn,
            None,
        )?;
        Ok(stream)
    }

    pub fn play(&mut self) -> Result<()> {
        if !self.playing {
            self.stream.play()?;
            self.playing = true;
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.playing {
            self.stream.pause()?;
            self.playing = false;
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Linear interpolation from the core rate to the device rate.
pub(crate) struct Resampler {
    /// Source frames advanced per output frame.
    step: f64,
    /// Position between `current` and `next`, in source frames.
    phase: f64,
    current: [f32; 2],
    next: [f32; 2],
    pending: Vec<u8>,
    pending_pos: usize,
    pending_len: usize,
}

impl Resampler {
    pub(crate) fn new(source_rate: u32, device_rate: u32) -> Self {
        Self {
            step: f64::from(source_rate) / f64::from(device_rate.max(1)),
            phase: 1.0,
            current: [0.0; 2],
            next: [0.0; 2],
            pending: vec![0; PENDING_FRAMES * BYTES_PER_FRAME],
            pending_pos: 0,
            pending_len: 0,
        }
    }

    /// Pulls enough source audio for `output_frames` device frames in one read.
    pub(crate) fn fill(&mut self, reader: &mut RingReader, output_frames: usize) {
        self.pending
            .copy_within(self.pending_pos..self.pending_len, 0);
        self.pending_len -= self.pending_pos;
        self.pending_pos = 0;

        let wanted_frames = (self.phase + output_frames as f64 * self.step).ceil() as usize;
        let wanted = (wanted_frames * BYTES_PER_FRAME).min(self.pending.len());
        if wanted > self.pending_len {
            let got = reader.read(&mut self.pending[self.pending_len..wanted]);
            self.pending_len += got - got % BYTES_PER_FRAME;
        }
    }

    pub(crate) fn next_frame(&mut self) -> [f32; 2] {
        while self.phase >= 1.0 {
            self.current = self.next;
            self.next = self.pop_source();
            self.phase -= 1.0;
        }
        let t = self.phase as f32;
        let out = [
            self.current[0] + (self.next[0] - self.current[0]) * t,
            self.current[1] + (self.next[1] - self.current[1]) * t,
        ];
        self.phase += self.step;
        out
    }

    fn pop_source(&mut self) -> [f32; 2] {
        if self.pending_len - self.pending_pos < BYTES_PER_FRAME {
            return [0.0; 2];
        }
        let bytes = &self.pending[self.pending_pos..self.pending_pos + BYTES_PER_FRAME];
        self.pending_pos += BYTES_PER_FRAME;
        [
            f32::from(i16::from_le_bytes([bytes[0], bytes[1]])) / 32768.0,
            f32::from(i16::from_le_bytes([bytes[2], bytes[3]])) / 32768.0,
        ]
    }
}
