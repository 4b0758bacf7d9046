//! Command framing and response scanning for the card reader module.
//!
//! Commands are fixed-length frames. Responses are located by their type
//! byte, which the reader places two bytes after the start of a frame; the
//! scan does not check header or checksum bytes, so a corrupted frame that
//! still shows the expected type byte is accepted.

use crate::types::{CardUid, PAYLOAD_LEN, UID_LEN};

const PREAMBLE: [u8; 2] = [0xAA, 0xBB];

/// Length of the search-enable command
pub const SEARCH_ENABLE_LEN: usize = 6;
/// Length of the read-request command
pub const READ_REQUEST_LEN: usize = 15;

const SEARCH_ENABLE_FRAME: [u8; SEARCH_ENABLE_LEN] =
    [PREAMBLE[0], PREAMBLE[1], SEARCH_ENABLE_LEN as u8, 0x10, 0x01, 0x00];

const READ_REQUEST_CMD: u8 = 0x23;
// Start offset and byte count; the checksum closes the trailer
const READ_REQUEST_PARAMS: [u8; 2] = [0x00, PAYLOAD_LEN as u8];

/// Response type byte reported when a card enters the field
pub const CARD_FOUND_TYPE: u8 = 0x11;
/// Response type byte carrying the data block of a read request
pub const PAYLOAD_TYPE: u8 = 0x23;

/// Where a response's payload sits relative to the frame start, and how
/// much the driver reads while looking for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLayout {
    pub type_byte: u8,
    /// Bytes from the frame start to the first payload byte
    pub payload_offset: usize,
    pub payload_len: usize,
    /// Bytes that must be buffered before a read is attempted
    pub min_available: usize,
    /// Upper bound on a single read
    pub read_window: usize,
}

impl ResponseLayout {
    /// Frame bytes needed from the match offset to the end of the payload
    pub const fn span(&self) -> usize {
        self.payload_offset + self.payload_len
    }
}

/// Card-found response: UID follows a 5-byte header
pub const CARD_FOUND: ResponseLayout = ResponseLayout {
    type_byte: CARD_FOUND_TYPE,
    payload_offset: 5,
    payload_len: UID_LEN,
    min_available: 5,
    read_window: 20,
};

/// Read-request response: data block follows a 4-byte header
pub const PAYLOAD: ResponseLayout = ResponseLayout {
    type_byte: PAYLOAD_TYPE,
    payload_offset: 4,
    payload_len: PAYLOAD_LEN,
    min_available: 4,
    read_window: 30,
};

/// Location of a response found in a receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMatch {
    pub offset: usize,
    pub payload_start: usize,
}

/// Command that arms the reader's card search
pub fn search_enable_frame() -> [u8; SEARCH_ENABLE_LEN] {
    SEARCH_ENABLE_FRAME
}

/// Command that reads the data block of `uid`, XOR checksum in the last byte
pub fn read_request_frame(uid: &CardUid) -> [u8; READ_REQUEST_LEN] {
    let mut frame = [0u8; READ_REQUEST_LEN];
    frame[..2].copy_from_slice(&PREAMBLE);
    frame[2] = READ_REQUEST_LEN as u8;
    frame[3] = READ_REQUEST_CMD;
    frame[4..4 + UID_LEN].copy_from_slice(uid.as_bytes());
    frame[4 + UID_LEN..READ_REQUEST_LEN - 1].copy_from_slice(&READ_REQUEST_PARAMS);
    frame[READ_REQUEST_LEN - 1] = xor_checksum(&frame[..READ_REQUEST_LEN - 1]);
    frame
}

/// Running exclusive-or of `bytes`
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Find the first frame in `buffer` whose type byte matches `layout` and
/// whose payload fits entirely inside the buffer.
pub fn scan_for_response(buffer: &[u8], layout: &ResponseLayout) -> Option<ResponseMatch> {
    let span = layout.span().max(3);
    if buffer.len() < span {
        return None;
    }
    (0..=buffer.len() - span)
        .find(|&i| buffer[i + 2] == layout.type_byte)
        .map(|offset| ResponseMatch {
            offset,
            payload_start: offset + layout.payload_offset,
        })
}
