//! Types for card scanning operations

use std::fmt;

use thiserror::Error;

use crate::sanitizer;

/// Length of the UID reported by the reader during a search
pub const UID_LEN: usize = 8;

/// Length of the data block returned by a read request
pub const PAYLOAD_LEN: usize = 14;

/// Identifier of a card found during the search phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CardUid(pub [u8; UID_LEN]);

impl CardUid {
    pub fn as_bytes(&self) -> &[u8; UID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }
}

impl From<[u8; UID_LEN]> for CardUid {
    fn from(bytes: [u8; UID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Raw data block read from a card, padding included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawPayload(pub [u8; PAYLOAD_LEN]);

impl RawPayload {
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }
}

/// Printable ASCII serial extracted from a [`RawPayload`].
///
/// Holds at most [`PAYLOAD_LEN`] bytes, each in `0x20..=0x7E`, in the order
/// they appeared in the payload. This is the text typed to the host.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SanitizedIdentifier {
    bytes: [u8; PAYLOAD_LEN],
    len: usize,
}

impl SanitizedIdentifier {
    pub fn from_payload(payload: &RawPayload) -> Self {
        let mut bytes = [0u8; PAYLOAD_LEN];
        let len = sanitizer::sanitize_into(payload.as_bytes(), &mut bytes);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Every stored byte is printable ASCII and therefore valid UTF-8.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for SanitizedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SanitizedIdentifier({:?})", self.as_str())
    }
}

impl fmt::Display for SanitizedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card that made it through the read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardRead {
    pub uid: CardUid,
    pub payload: RawPayload,
    pub identifier: SanitizedIdentifier,
}

/// Last delivered card, used to suppress repeats of a card left on the reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceRecord {
    last_uid: Option<CardUid>,
    last_delivery_ms: Option<u64>,
}

impl DebounceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A detection is accepted when the card differs from the last delivered
    /// one or the cooldown since that delivery has run out.
    pub fn should_accept(&self, uid: &CardUid, now_ms: u64, cooldown_ms: u64) -> bool {
        match (self.last_uid, self.last_delivery_ms) {
            (Some(last), Some(at)) if last == *uid => now_ms.saturating_sub(at) > cooldown_ms,
            _ => true,
        }
    }

    pub fn record_delivery(&mut self, uid: CardUid, now_ms: u64) {
        self.last_uid = Some(uid);
        self.last_delivery_ms = Some(now_ms);
    }

    pub fn last_uid(&self) -> Option<CardUid> {
        self.last_uid
    }

    pub fn last_delivery_ms(&self) -> Option<u64> {
        self.last_delivery_ms
    }
}

/// Errors that can occur while scanning and delivering cards
#[derive(Debug, Error)]
pub enum ScannerError {
    /// Transport layer error (UART, serial, etc.)
    #[error("transport error: {0}")]
    Transport(String),
    /// HID keyboard backend error
    #[error("keyboard error: {0}")]
    Keyboard(String),
    /// Invalid parameter passed to a function
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Convert bytes to uppercase hex string
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
