//! LRC checksum used by ASCII frames.
//!
//! The LRC is the two's complement of the 8-bit sum of all frame bytes,
//! so that adding it to the sum yields zero.
//!
//! # Example
//!
//! ```rust
//! use asciilink::Lrc;
//!
//! let data = [0x05, 0x10, 0x48, 0x65, 0x6C, 0x6C, 0x6F];
//! let lrc = Lrc::compute(&data);
//!
//! let mut framed = data.to_vec();
//! framed.push(lrc);
//! assert!(Lrc::verify(&framed));
//! ```

/// Longitudinal redundancy check calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lrc {
    /// Running sum modulo 256.
    sum: u8,
}

impl Lrc {
    /// Creates a calculator with an empty sum.
    #[inline]
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    /// Adds `data` to the running sum.
    ///
    /// May be called repeatedly to process data in chunks.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.sum = self.sum.wrapping_add(byte);
        }
    }

    /// Returns the checksum byte for everything fed so far.
    #[inline]
    pub const fn finalize(self) -> u8 {
        self.sum.wrapping_neg()
    }

    /// Computes the LRC of `data` in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u8 {
        let mut lrc = Self::new();
        lrc.update(data);
        lrc.finalize()
    }

    /// Returns true if `data`, which ends with its checksum byte, sums to zero.
    #[inline]
    pub fn verify(data: &[u8]) -> bool {
        let mut lrc = Self::new();
        lrc.update(data);
        lrc.sum == 0
    }
}
