//! Working-copy preparation for the engine's decode primitives.
//!
//! The engine's status decoder scans for a zeroed terminator unit rather than
//! taking a length, so the bridge must hand it a copy over-allocated by one
//! unit with that terminator written; omitting it would send the scan out of
//! bounds. World payloads arrive in an unspecified encoding, so their copy is
//! padded with enough zero bytes to terminate the widest unit any decoder
//! scans for. Both pads are contracts of the decode primitives, encoded here
//! as named constants.
//!
//! Sizes are always computed as `unit_count * unit_width`, never raw byte
//! counts, so engines whose native text unit is wider than one byte
//! round-trip exactly; a trailing partial unit in the input is dropped by the
//! flooring and ends up inside the zeroed terminator.

/// Terminator units appended to a status working copy.
pub const STATUS_TERMINATOR_UNITS: usize = 1;

/// Zero bytes appended to a world working copy; covers the widest terminator
/// unit a decoder might scan for.
pub const WORLD_PADDING_BYTES: usize = 3;

/// Builds the status working copy: floors `bytes` to whole units of
/// `unit_width`, allocates one extra unit, and zeroes everything past the
/// floored payload.
pub(crate) fn pad_status_buffer(bytes: &[u8], unit_width: usize) -> Vec<u8> {
    let width = unit_width.max(1);
    let units = bytes.len() / width;
    let mut padded = vec![0u8; (units + STATUS_TERMINATOR_UNITS) * width];
    padded[..bytes.len()].copy_from_slice(bytes);
    // clobbers a trailing partial unit along with the terminator
    padded[units * width..].fill(0);
    padded
}

/// Builds the world working copy: the payload followed by
/// [`WORLD_PADDING_BYTES`] zero bytes.
pub(crate) fn pad_world_buffer(bytes: &[u8]) -> Vec<u8> {
    let mut padded = Vec::with_capacity(bytes.len() + WORLD_PADDING_BYTES);
    padded.extend_from_slice(bytes);
    padded.extend_from_slice(&[0; WORLD_PADDING_BYTES]);
    padded
}
