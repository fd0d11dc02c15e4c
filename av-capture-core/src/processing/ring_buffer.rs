use thiserror::Error;

use crate::models::audio_models::AudioFrame;
use crate::models::error::CaptureError;

/// Why a frame could not be published.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// The slot at the write cursor has not been drained yet.
    #[error("ring buffer full")]
    Full,

    #[error("frame has {actual} samples, slots hold {expected}")]
    FrameSizeMismatch { expected: usize, actual: usize },
}

#[derive(Debug)]
struct Slot {
    frame: Box<[f32]>,
    timestamp_ns: u64,
    filled: bool,
}

/// Fixed-capacity ring of encoder-sized audio frames.
///
/// Every slot is allocated up front; publishing copies into a slot and never
/// allocates. Overflow behavior: the newest frame is rejected and the
/// producer drops it; a filled slot is never overwritten.
///
/// Not internally synchronized. The capture session keeps it behind its
/// session lock.
#[derive(Debug)]
pub struct RingBuffer {
    slots: Vec<Slot>,
    write_index: usize,
    read_index: usize,
    filled: usize,
    frame_len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize, frame_len: usize) -> Result<Self, CaptureError> {
        if capacity == 0 || frame_len == 0 {
            return Err(CaptureError::ConfigurationFailed(format!(
                "ring buffer needs at least one slot and sample (capacity {}, frame {})",
                capacity, frame_len
            )));
        }

        let slots = (0..capacity)
            .map(|_| Slot {
                frame: vec![0.0; frame_len].into_boxed_slice(),
                timestamp_ns: 0,
                filled: false,
            })
            .collect();

        Ok(Self {
            slots,
            write_index: 0,
            read_index: 0,
            filled: 0,
            frame_len,
        })
    }

    /// Copy `frame` into the slot at the write cursor.
    ///
    /// Fails without touching any state when that slot is still filled.
    pub fn try_publish(&mut self, frame: &[f32], timestamp_ns: u64) -> Result<(), RingError> {
        if frame.len() != self.frame_len {
            return Err(RingError::FrameSizeMismatch {
                expected: self.frame_len,
                actual: frame.len(),
            });
        }

        let slot = &mut self.slots[self.write_index];
        if slot.filled {
            return Err(RingError::Full);
        }

        slot.frame.copy_from_slice(frame);
        slot.timestamp_ns = timestamp_ns;
        slot.filled = true;
        self.write_index = (self.write_index + 1) % self.slots.len();
        self.filled += 1;
        Ok(())
    }

    /// Lend the frame at the read cursor to `f`, then release the slot.
    ///
    /// Returns `None` without calling `f` when nothing is pending.
    pub fn consume_with<R>(&mut self, f: impl FnOnce(&[f32], u64) -> R) -> Option<R> {
        let slot = &mut self.slots[self.read_index];
        if !slot.filled {
            return None;
        }

        let result = f(&slot.frame, slot.timestamp_ns);
        slot.filled = false;
        self.read_index = (self.read_index + 1) % self.slots.len();
        self.filled -= 1;
        Some(result)
    }

    /// Take a copy of the frame at the read cursor.
    pub fn try_consume(&mut self) -> Option<AudioFrame> {
        self.consume_with(|samples, timestamp_ns| AudioFrame {
            samples: samples.to_vec(),
            timestamp_ns,
        })
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Samples held by every slot.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}
