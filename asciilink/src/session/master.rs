//! Requesting side of the protocol.
//!
//! A master sends one request at a time and waits for the matching
//! response, retransmitting the identical frame when the line stays
//! silent or the reply is garbled.
//!
//! ```text
//!   Idle -> Sending -> AwaitingResponse -> Success
//!              ^              |
//!              |              +-> RetryPending --+
//!              |              |                  |
//!              +--------------|------------------+
//!                             +-> Failed
//! ```

use core::time::Duration;

use log::{debug, trace, warn};

use super::dispatch::EXCEPTION_FLAG;
use crate::buffer::{Feed, FrameAccumulator};
use crate::config::SessionConfig;
use crate::core::{Frame, HexDump, Payload, BROADCAST_ADDRESS, MAX_FRAME_SIZE};
use crate::error::MasterError;
use crate::time::{deadline_after, Clock};
use crate::transport::Transport;

/// Where a master is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    /// No request has been made yet.
    Idle,
    /// Writing the request; `attempt` counts transmissions from 1.
    Sending {
        /// Current transmission number.
        attempt: u8,
    },
    /// Request written, waiting for the response.
    AwaitingResponse {
        /// Current transmission number.
        attempt: u8,
    },
    /// Attempt failed, the request is about to be resent.
    RetryPending {
        /// Transmission number that just failed.
        attempt: u8,
    },
    /// Last request completed (response received, or broadcast sent).
    Success,
    /// Last request gave up or hit a port error.
    Failed,
}

/// Statistics about master operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MasterStats {
    /// Requests started, broadcasts included.
    pub requests: u64,

    /// Broadcast requests sent.
    pub broadcasts: u64,

    /// Retransmissions after a silent or garbled attempt.
    pub retransmissions: u64,

    /// Requests that exhausted every retry.
    pub timeouts: u64,

    /// Responses that failed to decode or were cut off.
    pub corrupted_responses: u64,

    /// Well-formed frames that do not answer the outstanding request
    /// (another address, or another function code).
    pub foreign_responses: u64,

    /// Stale bytes discarded before sending a request.
    pub stale_bytes: u64,

    /// Responses accepted.
    pub responses: u64,
}

/// Result of waiting for one attempt's response.
enum Reception {
    /// Valid response from the target.
    Response(Frame),
    /// Malformed or cut-off response.
    Garbled,
    /// Nothing usable before the deadline.
    Silent,
}

/// Master role over a transport `T`, timed by clock `C`.
///
/// # Example
///
/// ```rust,ignore
/// use asciilink::{MasterSession, SessionConfig, MonotonicClock};
///
/// let config = SessionConfig::default().with_max_retries(2);
/// let mut master = MasterSession::new(transport, MonotonicClock::new(), config);
///
/// master.write_text(5, "Hello IWSK")?;
/// let text = master.read_text(5)?;
/// ```
pub struct MasterSession<T, C> {
    transport: T,
    clock: C,
    config: SessionConfig,
    state: MasterState,
    stats: MasterStats,
}

impl<T: Transport, C: Clock> MasterSession<T, C> {
    /// Creates an idle master.
    pub fn new(transport: T, clock: C, config: SessionConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            state: MasterState::Idle,
            stats: MasterStats::default(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> MasterState {
        self.state
    }

    /// Returns master statistics.
    pub fn stats(&self) -> &MasterStats {
        &self.stats
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the session, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Sends `frame` and returns the response.
    ///
    /// Broadcast frames are written once and `Ok(None)` is returned without
    /// waiting. Otherwise the request is retransmitted until a response
    /// from the target arrives or `max_retries` retransmissions have been
    /// spent.
    pub fn request(&mut self, frame: &Frame) -> Result<Option<Frame>, MasterError> {
        let encoded = frame.encode_to_vec()?;
        self.stats.requests += 1;
        self.drain()?;

        if frame.is_broadcast() {
            self.state = MasterState::Sending { attempt: 1 };
            self.send(&encoded)?;
            self.stats.broadcasts += 1;
            self.state = MasterState::Success;
            return Ok(None);
        }

        let mut retries: u8 = 0;
        loop {
            let attempt = retries.saturating_add(1);
            self.state = MasterState::Sending { attempt };
            self.send(&encoded)?;

            self.state = MasterState::AwaitingResponse { attempt };
            if let Reception::Response(response) = self.await_response(frame)? {
                self.stats.responses += 1;
                self.state = MasterState::Success;
                return Ok(Some(response));
            }

            if retries >= self.config.max_retries {
                warn!(
                    "no response from address {} to function {:#04x} after {attempt} attempt(s)",
                    frame.address, frame.function
                );
                self.stats.timeouts += 1;
                self.state = MasterState::Failed;
                return Err(MasterError::Timeout {
                    address: frame.address,
                    function: frame.function,
                    attempts: attempt,
                });
            }

            self.state = MasterState::RetryPending { attempt };
            retries += 1;
            self.stats.retransmissions += 1;
            debug!("retry {retries}/{} for address {}", self.config.max_retries, frame.address);
        }
    }

    /// Sends a request whose response only acknowledges it.
    ///
    /// Broadcast writes return as soon as the frame is sent.
    pub fn write(&mut self, address: u8, function: u8, payload: &[u8]) -> Result<(), MasterError> {
        let frame = Frame::new(address, function, payload)?;
        match self.request(&frame)? {
            Some(response) => check_exception(&frame, response).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Sends a request and returns the response payload.
    pub fn read(&mut self, address: u8, function: u8, payload: &[u8]) -> Result<Payload, MasterError> {
        if address == BROADCAST_ADDRESS {
            return Err(MasterError::BroadcastRead);
        }
        let frame = Frame::new(address, function, payload)?;
        let response = self.request(&frame)?.ok_or(MasterError::BroadcastRead)?;
        check_exception(&frame, response).map(|response| response.payload)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), MasterError> {
        debug!("TX -> {}", HexDump(bytes));
        if let Err(e) = self.transport.write_bytes(bytes) {
            self.state = MasterState::Failed;
            return Err(e.into());
        }
        Ok(())
    }

    /// Discards input already waiting on the line, such as late replies
    /// to an earlier request.
    fn drain(&mut self) -> Result<(), MasterError> {
        let mut drained = 0u64;
        // Bounded so a chattering line cannot stall the request.
        for _ in 0..MAX_FRAME_SIZE {
            match self.transport.read_byte(Duration::ZERO) {
                Ok(Some(_)) => drained += 1,
                Ok(None) => break,
                Err(e) => {
                    self.state = MasterState::Failed;
                    return Err(e.into());
                }
            }
        }
        if drained > 0 {
            debug!("discarded {drained} stale byte(s) before request");
            self.stats.stale_bytes += drained;
        }
        Ok(())
    }

    /// Waits for one attempt's response to `request`.
    fn await_response(&mut self, request: &Frame) -> Result<Reception, MasterError> {
        let deadline = deadline_after(self.clock.now(), self.config.timeout);
        let mut accumulator = FrameAccumulator::new();

        loop {
            let now = self.clock.now();
            if now >= deadline {
                if accumulator.is_accumulating() {
                    debug!("response cut off at deadline: {}", HexDump(accumulator.frame()));
                }
                return Ok(Reception::Silent);
            }

            let mut wait = deadline - now;
            if accumulator.is_accumulating() {
                wait = wait.min(self.config.inter_char_timeout);
            }

            let byte = match self.transport.read_byte(wait) {
                Ok(byte) => byte,
                Err(e) => {
                    self.state = MasterState::Failed;
                    return Err(e.into());
                }
            };

            let Some(byte) = byte else {
                if accumulator.is_accumulating() && self.clock.now() < deadline {
                    debug!(
                        "response abandoned after inter-character gap: {}",
                        HexDump(accumulator.frame())
                    );
                    self.stats.corrupted_responses += 1;
                    return Ok(Reception::Garbled);
                }
                continue;
            };

            match accumulator.push(byte) {
                Feed::Complete => {}
                Feed::Overflow => {
                    debug!("response overflowed the frame buffer");
                    self.stats.corrupted_responses += 1;
                    return Ok(Reception::Garbled);
                }
                Feed::Noise => {
                    trace!("ignoring noise byte {byte:#04x}");
                    continue;
                }
                Feed::Started | Feed::Restarted | Feed::Pending => continue,
            }

            debug!("RX <- {}", HexDump(accumulator.frame()));
            match Frame::decode(accumulator.frame()) {
                Ok(response) if answers(request, &response) => {
                    return Ok(Reception::Response(response));
                }
                Ok(response) => {
                    debug!(
                        "ignoring frame from address {} function {:#04x}",
                        response.address, response.function
                    );
                    self.stats.foreign_responses += 1;
                }
                Err(e) => {
                    debug!("malformed response: {e}");
                    self.stats.corrupted_responses += 1;
                    return Ok(Reception::Garbled);
                }
            }
        }
    }
}

/// True if `response` comes from the request's target with the request's
/// function code, plain or flagged as an exception.
fn answers(request: &Frame, response: &Frame) -> bool {
    response.address == request.address
        && (response.function == request.function
            || response.function == request.function | EXCEPTION_FLAG)
}

/// Turns an exception response into [`MasterError::Exception`].
fn check_exception(request: &Frame, response: Frame) -> Result<Frame, MasterError> {
    if request.function & EXCEPTION_FLAG == 0 && response.function == request.function | EXCEPTION_FLAG
    {
        return Err(MasterError::Exception {
            address: response.address,
            function: request.function,
            code: response.payload.first().copied().unwrap_or_default(),
        });
    }
    Ok(response)
}
