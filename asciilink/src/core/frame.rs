//! Frame definition and ASCII serialization.
//!
//! A frame is one addressed protocol message. On the wire every byte is
//! sent as two uppercase hex characters between a start marker and a
//! CR LF terminator.
//!
//! # Frame Format
//!
//! ```text
//! +-----+------+------+-------------+-----+-------+
//! | ':' | ADDR | FUNC | PAYLOAD ... | LRC | CR LF |
//! | 1   | 2    | 2    | 2 * N       | 2   | 2     |
//! +-----+------+------+-------------+-----+-------+
//! ```
//!
//! The LRC covers the address, function and payload bytes (not their hex
//! characters and not the markers).

use core::fmt;

use heapless::Vec;

use super::checksum::Lrc;
use crate::error::{FrameError, Result};

/// Frame start marker.
pub const FRAME_START: u8 = b':';

/// Frame terminator.
pub const FRAME_END: [u8; 2] = *b"\r\n";

/// Address reserved for broadcast requests. Broadcasts are never answered.
pub const BROADCAST_ADDRESS: u8 = 0;

/// Maximum payload size in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 252;

/// Address, function and checksum bytes surrounding the payload.
const OVERHEAD_BYTES: usize = 3;

/// Maximum raw (decoded) frame size.
const MAX_RAW_SIZE: usize = MAX_PAYLOAD_SIZE + OVERHEAD_BYTES;

/// Maximum encoded frame size in characters, markers included.
pub const MAX_FRAME_SIZE: usize = 1 + 2 * MAX_RAW_SIZE + FRAME_END.len();

/// Bounded payload storage.
pub type Payload = Vec<u8, MAX_PAYLOAD_SIZE>;

/// Bounded storage for one encoded frame.
pub type EncodedFrame = Vec<u8, MAX_FRAME_SIZE>;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A single addressed protocol message.
///
/// The checksum is not stored; it is derived from the other fields
/// whenever the frame is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Target (request) or source (response) station address.
    pub address: u8,
    /// Function code.
    pub function: u8,
    /// Application payload.
    pub payload: Payload,
}

impl Frame {
    /// Creates a frame, failing if `payload` is longer than [`MAX_PAYLOAD_SIZE`].
    pub fn new(address: u8, function: u8, payload: &[u8]) -> Result<Self> {
        let payload = Payload::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            address,
            function,
            payload,
        })
    }

    /// Creates a frame with no payload.
    pub const fn empty(address: u8, function: u8) -> Self {
        Self {
            address,
            function,
            payload: Vec::new(),
        }
    }

    /// Returns true if the frame is addressed to every station.
    pub const fn is_broadcast(&self) -> bool {
        self.address == BROADCAST_ADDRESS
    }

    /// Computes the LRC over address, function and payload.
    pub fn checksum(&self) -> u8 {
        let mut lrc = Lrc::new();
        lrc.update(&[self.address, self.function]);
        lrc.update(&self.payload);
        lrc.finalize()
    }

    /// Returns the number of characters `encode` will produce.
    pub fn encoded_len(&self) -> usize {
        1 + 2 * (self.payload.len() + OVERHEAD_BYTES) + FRAME_END.len()
    }

    /// Encodes this frame into `buffer`.
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = FRAME_START;
        let mut pos = 1;
        let head = [self.address, self.function];
        let tail = [self.checksum()];
        for &byte in head.iter().chain(self.payload.iter()).chain(tail.iter()) {
            buffer[pos] = HEX_DIGITS[usize::from(byte >> 4)];
            buffer[pos + 1] = HEX_DIGITS[usize::from(byte & 0x0F)];
            pos += 2;
        }
        buffer[pos..pos + FRAME_END.len()].copy_from_slice(&FRAME_END);

        Ok(frame_len)
    }

    /// Encodes this frame into a heapless Vec.
    pub fn encode_to_vec(&self) -> Result<EncodedFrame> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        EncodedFrame::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Decodes one complete frame, markers included.
    ///
    /// Checks run in a fixed order: markers, body parity, hex digits,
    /// length, then checksum. An odd body therefore always reports
    /// [`FrameError::OddLength`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 1 + FRAME_END.len()
            || bytes[0] != FRAME_START
            || !bytes.ends_with(&FRAME_END)
        {
            return Err(FrameError::MissingMarkers);
        }

        let body = &bytes[1..bytes.len() - FRAME_END.len()];
        if body.len() % 2 != 0 {
            return Err(FrameError::OddLength);
        }

        let mut raw: Vec<u8, MAX_RAW_SIZE> = Vec::new();
        let mut overflow = false;
        for pair in body.chunks_exact(2) {
            let byte = decode_hex_pair(pair[0], pair[1]).ok_or(FrameError::InvalidHex)?;
            if raw.push(byte).is_err() {
                overflow = true;
            }
        }

        if raw.len() < OVERHEAD_BYTES {
            return Err(FrameError::TooShort);
        }
        if overflow {
            return Err(FrameError::TooLong);
        }
        if !Lrc::verify(&raw) {
            return Err(FrameError::ChecksumMismatch);
        }

        let payload = Payload::from_slice(&raw[2..raw.len() - 1])
            .map_err(|_| FrameError::TooLong)?;
        Ok(Self {
            address: raw[0],
            function: raw[1],
            payload,
        })
    }
}

const fn decode_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

fn decode_hex_pair(high: u8, low: u8) -> Option<u8> {
    Some((decode_hex_digit(high)? << 4) | decode_hex_digit(low)?)
}

/// Displays bytes as space separated uppercase hex, for frame logging.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::string::ToString;

    use super::*;

    #[test]
    fn test_encode_known_frame() {
        let frame = Frame::new(0x05, 0x01, b"Hi").unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        // 0x05 + 0x01 + 0x48 + 0x69 = 0xB7, LRC = 0x49
        assert_eq!(&encoded[..], b":0501486949\r\n");
        assert_eq!(encoded.len(), frame.encoded_len());
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = Frame::empty(0x11, 0x02);
        let mut buffer = [0u8; 16];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(&buffer[..len], b":1102ED\r\n");
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let frame = Frame::new(0x05, 0x01, b"Hello").unwrap();
        let mut buffer = [0u8; 8];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(
            Frame::new(0x05, 0x01, &large_payload),
            Err(FrameError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_frame_roundtrip_max_payload() {
        let payload = [0xA5u8; MAX_PAYLOAD_SIZE];
        let frame = Frame::new(0xF7, 0x7F, &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        assert_eq!(encoded.len(), MAX_FRAME_SIZE);
        assert_eq!(Frame::decode(&encoded).unwrap(), frame);
    }

    #[test]
    fn test_decode_lowercase_hex() {
        let frame = Frame::decode(b":1102ED\r\n").unwrap();
        assert_eq!(Frame::decode(b":1102ed\r\n"), Ok(frame));
    }

    #[test]
    fn test_decode_missing_markers() {
        assert_eq!(Frame::decode(b"0501486949\r\n"), Err(FrameError::MissingMarkers));
        assert_eq!(Frame::decode(b":0501486949\n"), Err(FrameError::MissingMarkers));
        assert_eq!(Frame::decode(b":0501486949"), Err(FrameError::MissingMarkers));
        assert_eq!(Frame::decode(b":\r"), Err(FrameError::MissingMarkers));
        assert_eq!(Frame::decode(b""), Err(FrameError::MissingMarkers));
    }

    #[test]
    fn test_decode_odd_length() {
        assert_eq!(Frame::decode(b":050148694\r\n"), Err(FrameError::OddLength));
        // Odd wins over short bodies and bad digits.
        assert_eq!(Frame::decode(b":0\r\n"), Err(FrameError::OddLength));
        assert_eq!(Frame::decode(b":ZZZ\r\n"), Err(FrameError::OddLength));
    }

    #[test]
    fn test_decode_invalid_hex() {
        assert_eq!(Frame::decode(b":05014G6949\r\n"), Err(FrameError::InvalidHex));
        assert_eq!(Frame::decode(b":05:1486949\r\n"), Err(FrameError::InvalidHex));
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(Frame::decode(b":\r\n"), Err(FrameError::TooShort));
        assert_eq!(Frame::decode(b":05FB\r\n"), Err(FrameError::TooShort));
    }

    #[test]
    fn test_decode_too_long() {
        let mut bytes = std::vec![FRAME_START];
        bytes.extend(core::iter::repeat_n(b'0', 2 * (MAX_RAW_SIZE + 1)));
        bytes.extend_from_slice(&FRAME_END);
        assert_eq!(Frame::decode(&bytes), Err(FrameError::TooLong));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        assert_eq!(Frame::decode(b":050148694A\r\n"), Err(FrameError::ChecksumMismatch));
        assert_eq!(Frame::decode(b":0601486949\r\n"), Err(FrameError::ChecksumMismatch));
    }

    #[test]
    fn test_broadcast() {
        assert!(Frame::empty(BROADCAST_ADDRESS, 0x01).is_broadcast());
        assert!(!Frame::empty(5, 0x01).is_broadcast());
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(HexDump(b":05\r\n").to_string(), "3A 30 35 0D 0A");
        assert_eq!(HexDump(&[]).to_string(), "");
    }
}
