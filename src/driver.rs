use log::{debug, error, info, warn};
use std::fmt;

use crate::codec::{self, ResponseLayout, CARD_FOUND, PAYLOAD};
use crate::config::DriverTiming;
use crate::transport::ReaderTransport;
use crate::types::{
    CardRead, CardUid, DebounceRecord, RawPayload, SanitizedIdentifier, ScannerError, PAYLOAD_LEN,
    UID_LEN,
};

/// Largest single read the driver performs
const MAX_READ_WINDOW: usize = 32;

/// Phase of the reader protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    /// Flush input and arm the card search
    IdleSearchInit,
    /// Waiting for a card-found response
    Searching,
    /// Card accepted, read request not sent yet
    RequestPayload,
    /// Waiting for the data block of the accepted card
    AwaitPayload,
    /// Identifier handed to the keyboard, cooling down before the next search
    Deliver,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolState::IdleSearchInit => "IdleSearchInit",
            ProtocolState::Searching => "Searching",
            ProtocolState::RequestPayload => "RequestPayload",
            ProtocolState::AwaitPayload => "AwaitPayload",
            ProtocolState::Deliver => "Deliver",
        };
        f.write_str(name)
    }
}

/// Non-blocking driver for the card reader module.
///
/// Every call to [`step`](Self::step) performs at most one state transition
/// and returns immediately; all waiting is done by comparing the caller's
/// timestamps, so a stalled reader can only hold a state until its timeout.
pub struct ReaderDriver<T: ReaderTransport> {
    transport: T,
    state: ProtocolState,
    state_entered_ms: u64,
    cycle_started_ms: u64,
    uid: CardUid,
    delivered_at_ms: Option<u64>,
}

impl<T: ReaderTransport> ReaderDriver<T> {
    /// Create a driver that arms the search on its first step
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ProtocolState::IdleSearchInit,
            state_entered_ms: 0,
            cycle_started_ms: 0,
            uid: CardUid::default(),
            delivered_at_ms: None,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Time spent in the current state
    pub fn state_age(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.state_entered_ms)
    }

    /// UID of the card currently being read
    pub fn current_uid(&self) -> CardUid {
        self.uid
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Abandon whatever is in progress and re-arm the search on the next step
    pub fn reset(&mut self) {
        if self.state != ProtocolState::IdleSearchInit {
            debug!("Reader reset from {}", self.state);
        }
        self.state = ProtocolState::IdleSearchInit;
        self.delivered_at_ms = None;
    }

    /// Mark the pending card as handled; the search resumes once the
    /// post-delivery pause has run out.
    pub fn delivery_finished(&mut self, now_ms: u64) {
        if self.state == ProtocolState::Deliver {
            self.delivered_at_ms = Some(now_ms);
        }
    }

    /// Advance the protocol by one step.
    ///
    /// Returns the card once its data block has been read; the driver then
    /// stays in [`ProtocolState::Deliver`] until
    /// [`delivery_finished`](Self::delivery_finished) is called.
    pub fn step(
        &mut self,
        now_ms: u64,
        debounce: &DebounceRecord,
        timing: &DriverTiming,
    ) -> Result<Option<CardRead>, ScannerError> {
        match self.state {
            ProtocolState::IdleSearchInit => {
                self.clear_input()?;
                self.send(&codec::search_enable_frame())?;
                self.cycle_started_ms = now_ms;
                self.enter(ProtocolState::Searching, now_ms);
                Ok(None)
            }
            ProtocolState::Searching => {
                if self.state_age(now_ms) < timing.search_settle_ms {
                    return Ok(None);
                }

                if let Some(bytes) = self.poll_response(&CARD_FOUND)? {
                    let mut uid = [0u8; UID_LEN];
                    uid.copy_from_slice(&bytes);
                    let uid = CardUid(uid);

                    if debounce.should_accept(&uid, now_ms, timing.debounce_cooldown_ms) {
                        info!("Card detected: {}", uid);
                        self.uid = uid;
                        self.enter(ProtocolState::RequestPayload, now_ms);
                        return Ok(None);
                    }
                    debug!("Ignoring repeat of card {}", uid);
                }

                if now_ms.saturating_sub(self.cycle_started_ms) > timing.search_refresh_ms {
                    debug!("No card within {} ms, re-arming search", timing.search_refresh_ms);
                    self.enter(ProtocolState::IdleSearchInit, now_ms);
                }
                Ok(None)
            }
            ProtocolState::RequestPayload => {
                self.clear_input()?;
                self.send(&codec::read_request_frame(&self.uid))?;
                self.enter(ProtocolState::AwaitPayload, now_ms);
                Ok(None)
            }
            ProtocolState::AwaitPayload => {
                if let Some(bytes) = self.poll_response(&PAYLOAD)? {
                    let mut payload = [0u8; PAYLOAD_LEN];
                    payload.copy_from_slice(&bytes);
                    let payload = RawPayload(payload);
                    let identifier = SanitizedIdentifier::from_payload(&payload);

                    info!("Card {} read: {:?}", self.uid, identifier.as_str());
                    self.enter(ProtocolState::Deliver, now_ms);
                    return Ok(Some(CardRead {
                        uid: self.uid,
                        payload,
                        identifier,
                    }));
                }

                if self.state_age(now_ms) > timing.payload_timeout_ms {
                    warn!(
                        "No payload from card {} within {} ms, abandoning",
                        self.uid, timing.payload_timeout_ms
                    );
                    self.enter(ProtocolState::IdleSearchInit, now_ms);
                }
                Ok(None)
            }
            ProtocolState::Deliver => {
                if let Some(at) = self.delivered_at_ms
                    && now_ms.saturating_sub(at) >= timing.post_delivery_ms
                {
                    self.enter(ProtocolState::IdleSearchInit, now_ms);
                }
                Ok(None)
            }
        }
    }

    fn enter(&mut self, state: ProtocolState, now_ms: u64) {
        debug!("Reader {} -> {}", self.state, state);
        self.state = state;
        self.state_entered_ms = now_ms;
        self.delivered_at_ms = None;
    }

    /// Read one window and return the payload of the first matching frame
    fn poll_response(&mut self, layout: &ResponseLayout) -> Result<Option<Vec<u8>>, ScannerError> {
        let available = self
            .transport
            .bytes_available()
            .map_err(|e| ScannerError::Transport(format!("{:?}", e)))?;
        if available < layout.min_available {
            return Ok(None);
        }

        let mut buffer = [0u8; MAX_READ_WINDOW];
        let window = layout.read_window.min(MAX_READ_WINDOW);
        let bytes_read = match self.transport.read(&mut buffer[..window], 0) {
            Ok(n) => n,
            Err(e) => {
                error!("Read error: {:?}", e);
                return Err(ScannerError::Transport(format!("{:?}", e)));
            }
        };
        let received = &buffer[..bytes_read];
        debug!("Received {} bytes: {:02X?}", bytes_read, received);

        Ok(codec::scan_for_response(received, layout).map(|found| {
            received[found.payload_start..found.payload_start + layout.payload_len].to_vec()
        }))
    }

    fn clear_input(&mut self) -> Result<(), ScannerError> {
        self.transport
            .clear_input()
            .map_err(|e| ScannerError::Transport(format!("{:?}", e)))
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), ScannerError> {
        debug!("Sending command: {:02X?}", frame);
        let written = self
            .transport
            .write(frame)
            .map_err(|e| ScannerError::Transport(format!("{:?}", e)))?;
        if written != frame.len() {
            warn!("Short write: {} of {} bytes", written, frame.len());
        }
        Ok(())
    }
}
