//! Byte-at-a-time collection of candidate frames.
//!
//! Both session roles read the line one character at a time. The
//! accumulator ignores everything up to a start marker, then collects
//! characters until the CR LF terminator. Timing (inter-character gaps)
//! is left to the caller, which calls [`FrameAccumulator::reset`] when a
//! partial frame goes stale.

use heapless::Vec;

use crate::core::{FRAME_END, FRAME_START, MAX_FRAME_SIZE};

/// Outcome of feeding one byte to a [`FrameAccumulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Byte outside a frame, ignored.
    Noise,
    /// Start marker seen; a new frame begins.
    Started,
    /// Start marker seen inside a frame; the partial frame was dropped
    /// and a new one begins.
    Restarted,
    /// Byte stored, frame not finished.
    Pending,
    /// Terminator seen; [`FrameAccumulator::frame`] holds the frame.
    Complete,
    /// Frame exceeded the maximum size and was dropped.
    Overflow,
}

/// Collects one frame's characters, markers included.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    /// Characters of the current or last completed frame.
    buffer: Vec<u8, MAX_FRAME_SIZE>,

    /// Whether a frame is being collected.
    active: bool,
}

impl FrameAccumulator {
    /// Creates an idle accumulator.
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            active: false,
        }
    }

    /// Returns true while a started frame awaits its terminator.
    #[inline]
    pub const fn is_accumulating(&self) -> bool {
        self.active
    }

    /// Number of characters collected so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The buffered characters. After [`Feed::Complete`] this is one whole frame.
    pub fn frame(&self) -> &[u8] {
        &self.buffer
    }

    /// Drops any partial frame and returns to waiting for a start marker.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.active = false;
    }

    /// Feeds one received byte.
    pub fn push(&mut self, byte: u8) -> Feed {
        if byte == FRAME_START {
            let restarted = self.active;
            self.buffer.clear();
            // Capacity is never zero, the marker always fits.
            let _ = self.buffer.push(byte);
            self.active = true;
            return if restarted { Feed::Restarted } else { Feed::Started };
        }

        if !self.active {
            return Feed::Noise;
        }

        if self.buffer.push(byte).is_err() {
            self.reset();
            return Feed::Overflow;
        }

        if self.buffer.ends_with(&FRAME_END) {
            self.active = false;
            Feed::Complete
        } else {
            Feed::Pending
        }
    }
}
