//! Property-based tests for frame building, response scanning and payload
//! sanitizing.

use nfc_hid_scanner::codec::{self, CARD_FOUND, PAYLOAD};
use nfc_hid_scanner::sanitizer::{self, is_printable};
use nfc_hid_scanner::{CardUid, RawPayload, SanitizedIdentifier, PAYLOAD_LEN};
use proptest::prelude::*;

fn sanitize(input: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; input.len()];
    let count = sanitizer::sanitize_into(input, &mut out);
    out.truncate(count);
    out
}

/// True when `needle` can be obtained from `haystack` by deleting bytes
fn is_subsequence(needle: &[u8], haystack: &[u8]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|b| rest.any(|h| h == b))
}

proptest! {
    /// The read request always ends with the XOR of everything before it.
    #[test]
    fn prop_read_request_checksum(uid in any::<[u8; 8]>()) {
        let frame = codec::read_request_frame(&CardUid(uid));
        let expected = frame[..frame.len() - 1].iter().fold(0u8, |acc, b| acc ^ b);
        prop_assert_eq!(frame[frame.len() - 1], expected);
        prop_assert_eq!(&frame[4..12], &uid[..]);
    }

    /// Sanitizing twice changes nothing.
    #[test]
    fn prop_sanitize_idempotent(input in prop::collection::vec(any::<u8>(), 0..64)) {
        let once = sanitize(&input);
        let twice = sanitize(&once);
        prop_assert_eq!(twice, once);
    }

    /// Output keeps input order and holds exactly the printable bytes.
    #[test]
    fn prop_sanitize_keeps_printable_in_order(input in prop::collection::vec(any::<u8>(), 0..64)) {
        let output = sanitize(&input);
        prop_assert!(is_subsequence(&output, &input));
        prop_assert!(output.iter().all(|&b| is_printable(b)));
        prop_assert_eq!(output.len(), input.iter().filter(|&&b| is_printable(b)).count());
    }

    /// The fixed-size identifier agrees with the slice sanitizer.
    #[test]
    fn prop_identifier_matches_sanitizer(raw in any::<[u8; PAYLOAD_LEN]>()) {
        let identifier = SanitizedIdentifier::from_payload(&RawPayload(raw));
        let expected = sanitize(&raw);
        prop_assert_eq!(identifier.as_bytes(), expected.as_slice());
    }

    /// A payload frame planted after filler without the type byte is found.
    #[test]
    fn prop_scan_finds_planted_frame(
        offset in 0usize..12,
        filler in any::<u8>().prop_filter("not the type byte", |b| *b != PAYLOAD.type_byte),
        payload in any::<[u8; PAYLOAD_LEN]>(),
    ) {
        let mut buffer = vec![filler; offset];
        buffer.extend_from_slice(&[filler, filler, PAYLOAD.type_byte, filler]);
        buffer.extend_from_slice(&payload);

        let found = codec::scan_for_response(&buffer, &PAYLOAD);
        prop_assert!(found.is_some());
        let found = found.unwrap();
        prop_assert_eq!(found.offset, offset);
        prop_assert_eq!(&buffer[found.payload_start..found.payload_start + PAYLOAD_LEN], &payload[..]);
    }

    /// No type byte anywhere: nothing is found.
    #[test]
    fn prop_scan_without_type_byte(
        buffer in prop::collection::vec(any::<u8>().prop_filter("not the type byte", |b| *b != CARD_FOUND.type_byte), 0..40),
    ) {
        prop_assert_eq!(codec::scan_for_response(&buffer, &CARD_FOUND), None);
    }

    /// Any buffer too short to hold header and UID yields nothing.
    #[test]
    fn prop_scan_short_buffer(buffer in prop::collection::vec(any::<u8>(), 0..13)) {
        prop_assert_eq!(codec::scan_for_response(&buffer, &CARD_FOUND), None);
    }

    /// Any match returned leaves the whole payload inside the buffer.
    #[test]
    fn prop_scan_stays_in_bounds(buffer in prop::collection::vec(any::<u8>(), 0..40)) {
        if let Some(found) = codec::scan_for_response(&buffer, &PAYLOAD) {
            prop_assert_eq!(buffer[found.offset + 2], PAYLOAD.type_byte);
            prop_assert!(found.payload_start + PAYLOAD_LEN <= buffer.len());
        }
    }
}
