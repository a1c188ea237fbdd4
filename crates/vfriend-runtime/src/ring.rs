//! Byte ring buffer between the emulation thread and the audio device callback.
//!
//! Exactly one [`RingWriter`] and one [`RingReader`] exist per buffer. Neither side
//! ever blocks:
//! - On overflow the writer discards the oldest unread bytes, so the newest audio
//!   always lands.
//! - On underflow the reader zero-fills the rest of the requested chunk and
//!   reports how many real bytes it copied.
//!
//! # Synchronization
//! Cursors are monotonically increasing byte positions (`u64`) and the storage is
//! indexed modulo the capacity. The writer owns `write_pos`. Both sides may move
//! `read_pos`: the reader consumes with a compare-exchange, the writer discards with
//! `fetch_max`. A reader whose bytes were overwritten mid-copy sees its
//! compare-exchange fail and simply copies again, like a seqlock reader.

use std::sync::{
    Arc,
    atomic::{AtomicU8, AtomicU64, Ordering, fence},
};

/// Interleaved stereo, 16-bit samples.
pub const BYTES_PER_FRAME: usize = 4;

/// Capacity in bytes for `seconds` of interleaved stereo 16-bit audio.
///
/// 100 ms at 41 667 Hz yields `2 * 2 * 4167 = 16668` bytes.
pub fn capacity_for(sample_rate: u32, seconds: f64) -> usize {
    let frames = (f64::from(sample_rate) * seconds).round() as usize;
    (frames * BYTES_PER_FRAME).max(1)
}

struct Inner {
    buf: Box<[AtomicU8]>,
    write_pos: AtomicU64,
    read_pos: AtomicU64,
    underruns: AtomicU64,
}

impl Inner {
    #[inline]
    fn capacity(&self) -> u64 {
        self.buf.len() as u64
    }

    #[inline]
    fn slot(&self, pos: u64) -> &AtomicU8 {
        &self.buf[(pos % self.capacity()) as usize]
    }

    fn available(&self) -> usize {
        let read = self.read_pos.load(Ordering::Acquire);
        let write = self.write_pos.load(Ordering::Acquire);
        write.saturating_sub(read).min(self.capacity()) as usize
    }
}

/// Creates a ring of `capacity` bytes (at least one) and splits it into its two ends.
pub fn audio_ring(capacity: usize) -> (RingWriter, RingReader) {
    let buf: Box<[AtomicU8]> = (0..capacity.max(1)).map(|_| AtomicU8::new(0)).collect();
    let inner = Arc::new(Inner {
        buf,
        write_pos: AtomicU64::new(0),
        read_pos: AtomicU64::new(0),
        underruns: AtomicU64::new(0),
    });

    (
        RingWriter {
            inner: Arc::clone(&inner),
        },
        RingReader { inner },
    )
}

/// Producer end, owned by the emulation thread.
pub struct RingWriter {
    inner: Arc<Inner>,
}

impl RingWriter {
    /// Appends `bytes`, discarding the oldest unread bytes to make room.
    ///
    /// Returns how many previously written (or leading input) bytes were dropped.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let inner = &*self.inner;
        let cap = inner.capacity();
        if bytes.is_empty() {
            return 0;
        }

        // Only the tail of an oversized batch can survive.
        let skipped = bytes.len().saturating_sub(cap as usize);
        let bytes = &bytes[skipped..];

        let start = inner.write_pos.load(Ordering::Relaxed);
        let end = start + bytes.len() as u64;
        let floor = end.saturating_sub(cap);
        let prev_read = inner.read_pos.fetch_max(floor, Ordering::AcqRel);
        // Orders the discard above before the overwriting stores below.
        fence(Ordering::Release);

        for (offset, byte) in bytes.iter().enumerate() {
            inner
                .slot(start + offset as u64)
                .store(*byte, Ordering::Relaxed);
        }
        inner.write_pos.store(end, Ordering::Release);

        skipped + floor.saturating_sub(prev_read) as usize
    }

    /// Drops everything currently unread.
    pub fn clear(&mut self) {
        let write = self.inner.write_pos.load(Ordering::Relaxed);
        self.inner.read_pos.fetch_max(write, Ordering::AcqRel);
    }

    pub fn available(&self) -> usize {
        self.inner.available()
    }

    pub fn capacity(&self) -> usize {
        self.inner.buf.len()
    }

    /// Number of reads that had to be padded with silence.
    pub fn underruns(&self) -> u64 {
        self.inner.underruns.load(Ordering::Relaxed)
    }
}

/// Consumer end, owned by the audio device callback.
pub struct RingReader {
    inner: Arc<Inner>,
}

impl RingReader {
    /// Fills `out` with the oldest unread bytes, zero-filling any shortfall.
    ///
    /// Returns the number of real bytes copied. Never allocates or blocks.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let inner = &*self.inner;
        loop {
            let read = inner.read_pos.load(Ordering::Acquire);
            let write = inner.write_pos.load(Ordering::Acquire);
            let available = write.saturating_sub(read).min(inner.capacity()) as usize;
            let count = available.min(out.len());

            for (offset, byte) in out[..count].iter_mut().enumerate() {
                *byte = inner.slot(read + offset as u64).load(Ordering::Relaxed);
            }
            // Pairs with the writer's release fence: if any byte above came from an
            // overwrite, the matching discard is visible to the exchange below.
            fence(Ordering::Acquire);

            if inner
                .read_pos
                .compare_exchange(
                    read,
                    read + count as u64,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                out[count..].fill(0);
                if count < out.len() {
                    inner.underruns.fetch_add(1, Ordering::Relaxed);
                }
                return count;
            }
        }
    }

    pub fn available(&self) -> usize {
        self.inner.available()
    }

    pub fn capacity(&self) -> usize {
        self.inner.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn capacity_holds_a_tenth_of_a_second() {
        assert_eq!(capacity_for(41_667, 0.1), 16_668);
    }

    #[test]
    fn cold_start_reads_silence() {
        let (_writer, mut reader) = audio_ring(capacity_for(41_667, 0.1));
        let mut out = vec![0xAAu8; 4096];
        assert_eq!(reader.read(&mut out), 0);
        assert!(out.iter().all(|b| *b == 0));
    }

    #[test]
    fn overflow_discards_oldest() {
        let (mut writer, mut reader) = audio_ring(10);
        assert_eq!(writer.write(&[1, 2, 3, 4, 5, 6, 7, 8]), 0);
        assert_eq!(writer.write(&[9, 10, 11, 12]), 2);

        let mut out = [0u8; 10];
        assert_eq!(reader.read(&mut out), 10);
        assert_eq!(out, [3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn partial_read_is_zero_filled() {
        let (mut writer, mut reader) = audio_ring(64);
        writer.write(&[7, 8, 9]);

        let mut out = [0xFFu8; 8];
        assert_eq!(reader.read(&mut out), 3);
        assert_eq!(out, [7, 8, 9, 0, 0, 0, 0, 0]);
        assert_eq!(writer.underruns(), 1);
    }

    #[test]
    fn wraps_around_capacity() {
        let (mut writer, mut reader) = audio_ring(6);
        let mut out = [0u8; 4];

        writer.write(&[1, 2, 3, 4]);
        assert_eq!(reader.read(&mut out), 4);
        writer.write(&[5, 6, 7, 8]);
        assert_eq!(reader.read(&mut out), 4);
        assert_eq!(out, [5, 6, 7, 8]);
        assert_eq!(reader.available(), 0);
    }

    #[test]
    fn oversized_write_keeps_tail() {
        let (mut writer, mut reader) = audio_ring(4);
        assert_eq!(writer.write(&[1, 2, 3, 4, 5, 6]), 2);
        let mut out = [0u8; 4];
        reader.read(&mut out);
        assert_eq!(out, [3, 4, 5, 6]);
    }

    #[test]
    fn clear_drops_unread() {
        let (mut writer, mut reader) = audio_ring(16);
        writer.write(&[1, 2, 3]);
        writer.clear();
        assert_eq!(reader.available(), 0);

        writer.write(&[4]);
        let mut out = [0u8; 2];
        assert_eq!(reader.read(&mut out), 1);
        assert_eq!(out, [4, 0]);
    }

    #[test]
    fn concurrent_reads_see_contiguous_runs() {
        let (mut writer, mut reader) = audio_ring(257);
        let producer = std::thread::spawn(move || {
            let mut next = 0u8;
            let mut chunk = [0u8; 37];
            for _ in 0..20_000 {
                for byte in &mut chunk {
                    *byte = next;
                    next = next.wrapping_add(1);
                }
                writer.write(&chunk);
            }
        });

        let mut out = [0u8; 64];
        while !producer.is_finished() {
            let count = reader.read(&mut out);
            for pair in out[..count].windows(2) {
                assert_eq!(pair[1], pair[0].wrapping_add(1), "torn read");
            }
        }
        producer.join().unwrap();
    }

    proptest! {
        #[test]
        fn keeps_last_capacity_bytes(cap in 1usize..64, extra in 0usize..64) {
            let (mut writer, mut reader) = audio_ring(cap);
            let data: Vec<u8> = (0..cap + extra).map(|i| i as u8).collect();
            for chunk in data.chunks(3) {
                writer.write(chunk);
            }

            let mut out = vec![0u8; cap];
            prop_assert_eq!(reader.read(&mut out), cap);
            prop_assert_eq!(&out[..], &data[extra..]);
        }
    }
}
