//! Text store application carried by the link.
//!
//! A slave keeps one text buffer. Function `0x01` replaces it and is
//! acknowledged with `OK`; function `0x02` returns it.

use log::info;

use crate::config::SessionConfig;
use crate::core::Payload;
use crate::error::{DispatchError, MasterError};
use crate::session::{Dispatcher, MasterSession, Reply, Request, EXCEPTION_ILLEGAL_DATA_VALUE};
use crate::time::Clock;
use crate::transport::Transport;

/// Replace the slave's stored text.
pub const FUNC_WRITE_TEXT: u8 = 0x01;

/// Return the slave's stored text.
pub const FUNC_READ_TEXT: u8 = 0x02;

/// Payload of a successful write acknowledgement.
pub const WRITE_ACK: &[u8] = b"OK";

/// Slave-side state: the last text written.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextStore {
    text: Payload,
}

impl TextStore {
    /// Creates a store holding no text.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored text bytes.
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Builds a dispatcher serving both text functions.
    pub fn dispatcher(self) -> Result<Dispatcher<Self>, DispatchError> {
        Dispatcher::new(self)
            .with_handler(FUNC_WRITE_TEXT, write_text)?
            .with_handler(FUNC_READ_TEXT, read_text)
    }
}

fn write_text(store: &mut TextStore, request: &Request<'_>) -> Reply {
    let Ok(text) = Payload::from_slice(request.payload) else {
        return Reply::Exception(EXCEPTION_ILLEGAL_DATA_VALUE);
    };
    store.text = text;
    info!("stored {} bytes of text", store.text.len());

    match Payload::from_slice(WRITE_ACK) {
        Ok(ack) => Reply::Payload(ack),
        Err(()) => Reply::Silent,
    }
}

fn read_text(store: &mut TextStore, request: &Request<'_>) -> Reply {
    if request.is_broadcast() {
        return Reply::Silent;
    }
    Reply::Payload(store.text.clone())
}

impl<T: Transport, C: Clock> MasterSession<T, C> {
    /// Sends `text` to `address`, or to every slave when `address` is the
    /// broadcast address.
    pub fn write_text(&mut self, address: u8, text: &str) -> Result<(), MasterError> {
        self.write(address, FUNC_WRITE_TEXT, text.as_bytes())
    }

    /// Fetches the text stored at `address`.
    pub fn read_text(&mut self, address: u8) -> Result<Payload, MasterError> {
        self.read(address, FUNC_READ_TEXT, &[])
    }
}

/// Session settings used by the command-line tools for `timeout_secs`,
/// `retries` and the inter-character gap `gap_secs`.
pub fn cli_config(timeout_secs: f64, retries: u8, gap_secs: f64) -> SessionConfig {
    SessionConfig::new()
        .with_timeout(core::time::Duration::from_secs_f64(timeout_secs))
        .with_max_retries(retries)
        .with_inter_char_timeout(core::time::Duration::from_secs_f64(gap_secs))
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use core::time::Duration;
    use std::vec::Vec;

    use super::*;
    use crate::core::BROADCAST_ADDRESS;
    use crate::error::FrameError;
    use crate::session::{SlaveEvent, SlaveSession};
    use crate::transport::{ScriptedTransport, SimClock};

    fn request(address: u8, function: u8, payload: &[u8]) -> Request<'_> {
        Request {
            address,
            function,
            payload,
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut dispatcher = TextStore::new().dispatcher().unwrap();

        let ack = dispatcher.dispatch(&request(5, FUNC_WRITE_TEXT, b"Hello IWSK"));
        assert_eq!(ack, Reply::Payload(Payload::from_slice(b"OK").unwrap()));
        assert_eq!(dispatcher.state().text(), b"Hello IWSK");

        let text = dispatcher.dispatch(&request(5, FUNC_READ_TEXT, &[]));
        assert_eq!(text, Reply::Payload(Payload::from_slice(b"Hello IWSK").unwrap()));
    }

    #[test]
    fn test_read_before_write_is_empty() {
        let mut dispatcher = TextStore::new().dispatcher().unwrap();
        assert_eq!(
            dispatcher.dispatch(&request(5, FUNC_READ_TEXT, &[])),
            Reply::Payload(Payload::new())
        );
    }

    #[test]
    fn test_broadcast_read_is_silent() {
        let mut dispatcher = TextStore::new().dispatcher().unwrap();
        assert_eq!(
            dispatcher.dispatch(&request(BROADCAST_ADDRESS, FUNC_READ_TEXT, &[])),
            Reply::Silent
        );
    }

    #[test]
    fn test_text_too_long() {
        let clock = SimClock::new();
        let transport = ScriptedTransport::new(clock.clone());
        let mut master = MasterSession::new(transport, clock, SessionConfig::new());

        let long = "x".repeat(crate::MAX_PAYLOAD_SIZE + 1);
        assert_eq!(
            master.write_text(5, &long),
            Err(MasterError::Frame(FrameError::PayloadTooLarge))
        );
        assert_eq!(master.transport().write_count(), 0);
    }

    #[test]
    fn test_master_against_scripted_slave() {
        // Slave side runs on its own clock and transport; bytes are carried
        // between them by the responder.
        let slave_clock = SimClock::new();
        let mut slave = SlaveSession::new(
            5,
            ScriptedTransport::new(slave_clock.clone()),
            slave_clock,
            TextStore::new().dispatcher().unwrap(),
            SessionConfig::new(),
        );

        let clock = SimClock::new();
        let transport = ScriptedTransport::new(clock.clone()).with_responder(move |bytes| {
            slave.transport_mut().queue(bytes);
            match slave.serve_one() {
                Ok(SlaveEvent::Dispatched { replied: true, .. }) => {
                    slave.transport().written().last().map(<[u8]>::to_vec)
                }
                _ => None,
            }
        });
        let config = SessionConfig::new().with_timeout(Duration::from_secs(1));
        let mut master = MasterSession::new(transport, clock, config);

        master.write_text(5, "Hello IWSK").unwrap();
        assert_eq!(master.read_text(5).unwrap().as_slice(), b"Hello IWSK");

        master.write_text(BROADCAST_ADDRESS, "all").unwrap();
        assert_eq!(master.read_text(5).unwrap().as_slice(), b"all");

        let sent: Vec<_> = master.transport().written().map(<[u8]>::to_vec).collect();
        assert_eq!(sent.len(), 4);
    }

    #[test]
    fn test_cli_config() {
        let config = cli_config(1.5, 3, 0.05);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.inter_char_timeout, Duration::from_millis(50));
    }
}
