//! Adapter from `std::io` streams to [`Transport`].
//!
//! Device nodes have no native per-read timeout, so the read half is
//! moved onto a pump thread that forwards bytes over a channel. Per-byte
//! deadlines then become `recv_timeout` calls.

use core::time::Duration;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;

use super::Transport;
use crate::error::{TransportError, TransportResult};

/// Size of the pump thread's read buffer.
const PUMP_BUF_SIZE: usize = 256;

enum PumpEvent {
    Byte(u8),
    Closed,
    Failed,
}

/// Transport over a pair of `std::io` read and write halves.
pub struct StreamTransport<W> {
    writer: W,
    rx: Receiver<PumpEvent>,
}

impl<W: Write> StreamTransport<W> {
    /// Spawns the pump thread for `reader` and wraps `writer`.
    pub fn new<R>(reader: R, writer: W) -> TransportResult<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("asciilink-rx".into())
            .spawn(move || pump(reader, tx))
            .map_err(|e| {
                log::error!("failed to spawn port reader: {e}");
                TransportError::OpenFailed
            })?;

        Ok(Self { writer, rx })
    }

    /// Returns a mutable reference to the write half.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

fn pump<R: Read>(mut reader: R, tx: Sender<PumpEvent>) {
    let mut buf = [0u8; PUMP_BUF_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                log::debug!("port reader reached end of stream");
                let _ = tx.send(PumpEvent::Closed);
                return;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    if tx.send(PumpEvent::Byte(byte)).is_err() {
                        // Transport dropped.
                        return;
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(e) => {
                log::error!("port read failed: {e}");
                let _ = tx.send(PumpEvent::Failed);
                return;
            }
        }
    }
}

impl<W: Write> Transport for StreamTransport<W> {
    fn read_byte(&mut self, timeout: Duration) -> TransportResult<Option<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(PumpEvent::Byte(byte)) => Ok(Some(byte)),
            Ok(PumpEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                Err(TransportError::Closed)
            }
            Ok(PumpEvent::Failed) => Err(TransportError::IoFailed),
            Err(RecvTimeoutError::Timeout) => Ok(None),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> TransportResult<()> {
        self.writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush())
            .map_err(|e| {
                log::error!("port write failed: {e}");
                TransportError::IoFailed
            })
    }
}
