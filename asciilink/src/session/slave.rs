//! Responding side of the protocol.
//!
//! A slave listens continuously, collects frames, keeps the ones sent to
//! its own address or to broadcast, dispatches them by function code and
//! answers addressed requests. Anything malformed is dropped: a shared
//! line is expected to carry noise and collisions.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, trace};

use super::dispatch::{Dispatcher, Request};
use crate::buffer::{Feed, FrameAccumulator};
use crate::config::SessionConfig;
use crate::core::{Frame, HexDump};
use crate::error::{FrameError, TransportResult};
use crate::time::{deadline_after, Clock};
use crate::transport::Transport;

/// Where a slave is in its receive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveState {
    /// Waiting for a start marker.
    Listening,
    /// Collecting a frame.
    Accumulating,
    /// Running the handler and replying.
    Dispatching,
    /// Dropping the frame just collected.
    Discarding,
}

/// Why a frame was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Silence between two characters exceeded the inter-character timeout.
    Gap,
    /// Frame longer than the maximum frame size.
    Overflow,
    /// Frame failed to decode.
    Malformed(FrameError),
    /// Well-formed frame for another address.
    NotAddressed(u8),
}

/// Outcome of one listen cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveEvent {
    /// No frame started within the listen poll interval.
    Idle,
    /// A frame was collected and dropped.
    Discarded(DiscardReason),
    /// A request was handled.
    Dispatched {
        /// Address the request was sent to (own address or broadcast).
        address: u8,
        /// Function code.
        function: u8,
        /// Whether a response was written.
        replied: bool,
    },
}

/// Statistics about slave operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlaveStats {
    /// Complete frames collected (terminator seen).
    pub frames_received: u64,

    /// Requests passed to a handler.
    pub frames_dispatched: u64,

    /// Responses written.
    pub replies_sent: u64,

    /// Frames that failed to decode.
    pub malformed_frames: u64,

    /// Frames for other addresses.
    pub foreign_frames: u64,

    /// Partial frames dropped after a gap or overflow.
    pub abandoned_frames: u64,
}

/// Slave role at `address`, over transport `T`, timed by clock `C`,
/// serving application state `S`.
pub struct SlaveSession<T, C, S> {
    address: u8,
    transport: T,
    clock: C,
    config: SessionConfig,
    dispatcher: Dispatcher<S>,
    accumulator: FrameAccumulator,
    state: SlaveState,
    stats: SlaveStats,
}

impl<T: Transport, C: Clock, S> SlaveSession<T, C, S> {
    /// Creates a listening slave.
    pub fn new(
        address: u8,
        transport: T,
        clock: C,
        dispatcher: Dispatcher<S>,
        config: SessionConfig,
    ) -> Self {
        Self {
            address,
            transport,
            clock,
            config,
            dispatcher,
            accumulator: FrameAccumulator::new(),
            state: SlaveState::Listening,
            stats: SlaveStats::default(),
        }
    }

    /// Returns this slave's address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Returns the current state.
    pub fn state(&self) -> SlaveState {
        self.state
    }

    /// Returns slave statistics.
    pub fn stats(&self) -> &SlaveStats {
        &self.stats
    }

    /// Returns the dispatcher and its application state.
    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// Returns the dispatcher mutably.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<S> {
        &mut self.dispatcher
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Serves frames until `stop` is set.
    ///
    /// `stop` is checked between frames only, at least once per listen
    /// poll interval while the line is idle. Transport errors end the loop.
    pub fn run(&mut self, stop: &AtomicBool) -> TransportResult<()> {
        info!("slave {} listening", self.address);
        while !stop.load(Ordering::Relaxed) {
            self.serve_one()?;
        }
        info!("slave {} stopped", self.address);
        Ok(())
    }

    /// Runs one listen cycle: wait for a frame, then dispatch or drop it.
    pub fn serve_one(&mut self) -> TransportResult<SlaveEvent> {
        if !self.listen()? {
            return Ok(SlaveEvent::Idle);
        }

        self.state = SlaveState::Accumulating;
        loop {
            let Some(byte) = self.transport.read_byte(self.config.inter_char_timeout)? else {
                trace!("partial frame abandoned: {}", HexDump(self.accumulator.frame()));
                return Ok(self.abandon(DiscardReason::Gap));
            };

            match self.accumulator.push(byte) {
                Feed::Complete => break,
                Feed::Overflow => return Ok(self.abandon(DiscardReason::Overflow)),
                Feed::Restarted => trace!("start marker inside frame, restarting"),
                Feed::Noise | Feed::Started | Feed::Pending => {}
            }
        }

        self.stats.frames_received += 1;
        self.handle_frame()
    }

    /// Waits up to one poll interval for a start marker.
    fn listen(&mut self) -> TransportResult<bool> {
        self.state = SlaveState::Listening;
        self.accumulator.reset();

        let deadline = deadline_after(self.clock.now(), self.config.listen_poll_interval);
        loop {
            let now = self.clock.now();
            if now >= deadline {
                return Ok(false);
            }
            match self.transport.read_byte(deadline - now)? {
                None => return Ok(false),
                Some(byte) => {
                    if self.accumulator.push(byte) == Feed::Started {
                        return Ok(true);
                    }
                    trace!("ignoring noise byte {byte:#04x}");
                }
            }
        }
    }

    fn abandon(&mut self, reason: DiscardReason) -> SlaveEvent {
        self.accumulator.reset();
        self.stats.abandoned_frames += 1;
        self.state = SlaveState::Discarding;
        SlaveEvent::Discarded(reason)
    }

    fn discard(&mut self, reason: DiscardReason) -> SlaveEvent {
        self.state = SlaveState::Discarding;
        SlaveEvent::Discarded(reason)
    }

    fn handle_frame(&mut self) -> TransportResult<SlaveEvent> {
        let frame = match Frame::decode(self.accumulator.frame()) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("dropping malformed frame ({e}): {}", HexDump(self.accumulator.frame()));
                self.stats.malformed_frames += 1;
                return Ok(self.discard(DiscardReason::Malformed(e)));
            }
        };
        debug!("RX <- {}", HexDump(self.accumulator.frame()));

        if frame.address != self.address && !frame.is_broadcast() {
            trace!("frame for address {} ignored", frame.address);
            self.stats.foreign_frames += 1;
            return Ok(self.discard(DiscardReason::NotAddressed(frame.address)));
        }

        self.state = SlaveState::Dispatching;
        let request = Request {
            address: frame.address,
            function: frame.function,
            payload: &frame.payload,
        };
        let reply = self.dispatcher.dispatch(&request);
        self.stats.frames_dispatched += 1;

        let mut event = SlaveEvent::Dispatched {
            address: frame.address,
            function: frame.function,
            replied: false,
        };
        if frame.is_broadcast() {
            return Ok(event);
        }

        let Some(response) = reply.into_response(self.address, frame.function) else {
            return Ok(event);
        };
        let encoded = match response.encode_to_vec() {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!("cannot encode response: {e}");
                return Ok(event);
            }
        };

        debug!("TX -> {}", HexDump(&encoded));
        self.transport.write_bytes(&encoded)?;
        self.stats.replies_sent += 1;
        if let SlaveEvent::Dispatched { replied, .. } = &mut event {
            *replied = true;
        }
        Ok(event)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use core::time::Duration;
    use std::vec::Vec;

    use super::*;
    use crate::core::{Payload, BROADCAST_ADDRESS};
    use crate::error::TransportError;
    use crate::session::dispatch::{Reply, EXCEPTION_ILLEGAL_FUNCTION};
    use crate::transport::{ScriptedTransport, SimClock};

    /// Records the payload of every dispatched request and echoes it.
    fn record(seen: &mut Vec<Vec<u8>>, request: &Request<'_>) -> Reply {
        seen.push(request.payload.to_vec());
        Reply::Payload(Payload::from_slice(request.payload).unwrap())
    }

    fn silent(_seen: &mut Vec<Vec<u8>>, _request: &Request<'_>) -> Reply {
        Reply::Silent
    }

    fn encoded(frame: &Frame) -> Vec<u8> {
        frame.encode_to_vec().unwrap().to_vec()
    }

    fn slave(
        address: u8,
        transport: ScriptedTransport,
        clock: &SimClock,
    ) -> SlaveSession<ScriptedTransport, SimClock, Vec<Vec<u8>>> {
        let dispatcher = Dispatcher::new(Vec::new())
            .with_handler(0x10, record)
            .unwrap()
            .with_handler(0x11, silent)
            .unwrap();
        let config = SessionConfig::new()
            .with_inter_char_timeout(Duration::from_millis(50))
            .with_listen_poll_interval(Duration::from_millis(100));
        SlaveSession::new(address, transport, clock.clone(), dispatcher, config)
    }

    #[test]
    fn test_idle_line() {
        let clock = SimClock::new();
        let mut slave = slave(5, ScriptedTransport::new(clock.clone()), &clock);

        assert_eq!(slave.serve_one(), Ok(SlaveEvent::Idle));
        assert_eq!(clock.now(), Duration::from_millis(100));
    }

    #[test]
    fn test_addressed_request_is_answered() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.queue(&encoded(&Frame::new(5, 0x10, b"ping").unwrap()));
        let mut slave = slave(5, transport, &clock);

        assert_eq!(
            slave.serve_one(),
            Ok(SlaveEvent::Dispatched {
                address: 5,
                function: 0x10,
                replied: true
            })
        );
        let written: Vec<_> = slave.transport().written().collect();
        assert_eq!(written, [encoded(&Frame::new(5, 0x10, b"ping").unwrap()).as_slice()]);
        assert_eq!(slave.stats().replies_sent, 1);
    }

    #[test]
    fn test_address_filtering() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());
        for address in [0u8, 5, 4, 6, 255, 1] {
            transport.queue(&encoded(&Frame::new(address, 0x10, &[address]).unwrap()));
        }
        let mut slave = slave(5, transport, &clock);

        let mut events = Vec::new();
        for _ in 0..6 {
            events.push(slave.serve_one().unwrap());
        }

        assert_eq!(
            events,
            [
                SlaveEvent::Dispatched { address: 0, function: 0x10, replied: false },
                SlaveEvent::Dispatched { address: 5, function: 0x10, replied: true },
                SlaveEvent::Discarded(DiscardReason::NotAddressed(4)),
                SlaveEvent::Discarded(DiscardReason::NotAddressed(6)),
                SlaveEvent::Discarded(DiscardReason::NotAddressed(255)),
                SlaveEvent::Discarded(DiscardReason::NotAddressed(1)),
            ]
        );
        assert_eq!(slave.dispatcher().state(), &[std::vec![0u8], std::vec![5u8]]);
        assert_eq!(slave.transport().write_count(), 1);
        assert_eq!(slave.stats().foreign_frames, 4);
    }

    #[test]
    fn test_malformed_frame_dropped() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.queue(b":050148694A\r\n");
        transport.queue(b":05014\r\n");
        transport.queue(&encoded(&Frame::new(5, 0x10, b"ok").unwrap()));
        let mut slave = slave(5, transport, &clock);

        assert_eq!(
            slave.serve_one(),
            Ok(SlaveEvent::Discarded(DiscardReason::Malformed(FrameError::ChecksumMismatch)))
        );
        assert_eq!(
            slave.serve_one(),
            Ok(SlaveEvent::Discarded(DiscardReason::Malformed(FrameError::OddLength)))
        );
        assert!(matches!(slave.serve_one(), Ok(SlaveEvent::Dispatched { replied: true, .. })));
        assert_eq!(slave.stats().malformed_frames, 2);
    }

    #[test]
    fn test_gap_abandons_partial_frame() {
        let clock = SimClock::new();
        let frame = encoded(&Frame::new(5, 0x10, b"ok").unwrap());
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.queue(&frame[..6]);
        transport.queue_after(Duration::from_millis(80), &frame[6..]);
        transport.queue_after(Duration::from_millis(10), &frame);
        let mut slave = slave(5, transport, &clock);

        assert_eq!(slave.serve_one(), Ok(SlaveEvent::Discarded(DiscardReason::Gap)));
        assert_eq!(slave.state(), SlaveState::Discarding);
        // The stale tail has no start marker and is skipped as noise.
        assert!(matches!(slave.serve_one(), Ok(SlaveEvent::Dispatched { address: 5, .. })));
        assert_eq!(slave.stats().abandoned_frames, 1);
    }

    #[test]
    fn test_unknown_function_gets_exception() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.queue(&encoded(&Frame::empty(5, 0x42)));
        let mut slave = slave(5, transport, &clock);

        slave.serve_one().unwrap();

        let reply = slave.transport().written().next().unwrap().to_vec();
        assert_eq!(
            Frame::decode(&reply),
            Ok(Frame::new(5, 0xC2, &[EXCEPTION_ILLEGAL_FUNCTION]).unwrap())
        );
    }

    #[test]
    fn test_broadcast_never_answered() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.queue(&encoded(&Frame::empty(BROADCAST_ADDRESS, 0x42)));
        transport.queue(&encoded(&Frame::new(BROADCAST_ADDRESS, 0x10, b"x").unwrap()));
        let mut slave = slave(5, transport, &clock);

        slave.serve_one().unwrap();
        slave.serve_one().unwrap();

        assert_eq!(slave.transport().write_count(), 0);
        assert_eq!(slave.stats().frames_dispatched, 2);
    }

    #[test]
    fn test_silent_handler() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.queue(&encoded(&Frame::empty(5, 0x11)));
        let mut slave = slave(5, transport, &clock);

        assert_eq!(
            slave.serve_one(),
            Ok(SlaveEvent::Dispatched { address: 5, function: 0x11, replied: false })
        );
        assert_eq!(slave.transport().write_count(), 0);
    }

    #[test]
    fn test_run_stops_between_frames() {
        let clock = SimClock::new();
        let mut slave = slave(5, ScriptedTransport::new(clock.clone()), &clock);

        let stop = AtomicBool::new(true);
        assert_eq!(slave.run(&stop), Ok(()));
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_huge_poll_interval_saturates() {
        let clock = SimClock::new();
        clock.advance(Duration::from_secs(1));
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.queue_after(Duration::from_millis(10), &encoded(&Frame::empty(5, 0x11)));
        let config = SessionConfig::new().with_listen_poll_interval(Duration::MAX);
        let dispatcher = Dispatcher::new(Vec::new()).with_handler(0x11, silent).unwrap();
        let mut slave = SlaveSession::new(5, transport, clock.clone(), dispatcher, config);

        assert!(matches!(slave.serve_one(), Ok(SlaveEvent::Dispatched { function: 0x11, .. })));
    }

    #[test]
    fn test_transport_error_ends_run() {
        let clock = SimClock::new();
        let mut transport = ScriptedTransport::new(clock.clone());
        transport.fail_reads();
        let mut slave = slave(5, transport, &clock);

        let stop = AtomicBool::new(false);
        assert_eq!(slave.run(&stop), Err(TransportError::IoFailed));
    }
}
