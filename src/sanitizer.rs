//! Printable-ASCII filter applied to card payloads

/// First printable ASCII byte (space)
pub const PRINTABLE_MIN: u8 = 0x20;
/// Last printable ASCII byte (`~`)
pub const PRINTABLE_MAX: u8 = 0x7E;

pub fn is_printable(byte: u8) -> bool {
    (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&byte)
}

/// Copy the printable bytes of `input` into `out`, keeping their order.
///
/// Returns the number of bytes written. Size `out` like `input` to never
/// lose data; copying stops once `out` is full.
pub fn sanitize_into(input: &[u8], out: &mut [u8]) -> usize {
    let mut count = 0;
    for &byte in input.iter().filter(|&&b| is_printable(b)) {
        if count == out.len() {
            break;
        }
        out[count] = byte;
        count += 1;
    }
    count
}
