use crate::byte_order::{network_to_host_u32, read_array};
use crate::error::WireError;

/// Largest length that fits the 1-byte short form.
pub const SHORT_FORM_MAX: u32 = 0x7F;

/// Largest length the 4-byte long form can carry (2^31 - 1).
pub const LONG_FORM_MAX: u32 = 0x7FFF_FFFF;

/// Top bit of the first byte; set means "long form".
const LONG_FORM_FLAG: u8 = 0x80;

/// Decode one name/value length prefix starting at `offset`.
///
/// FastCGI uses two widths, picked by the top bit of the first byte:
///
/// ```text
/// ┌───────────┬──────────────────────────────┬──────────────┐
/// │ Form      │ Bytes                        │ Range        │
/// ├───────────┼──────────────────────────────┼──────────────┤
/// │ Short     │ 0lllllll                     │ 0..=127      │
/// │ Long      │ 1lllllll llllllll x2 (BE)    │ 0..=2^31-1   │
/// └───────────┴──────────────────────────────┴──────────────┘
/// ```
///
/// A long-form prefix may encode a value below 128; it is accepted as is.
///
/// # Returns
///
/// `(length, new_offset)`, where `new_offset` is `offset + 1` for the
/// short form and `offset + 4` for the long form.
///
/// # Errors
///
/// [`WireError::TruncatedInput`] if the input ends before the first byte,
/// or before all four bytes of a long-form prefix.
pub fn read_variable_length(buf: &[u8], offset: usize) -> Result<(u32, usize), WireError> {
    let [first] = read_array::<1>(buf, offset)?;

    if first & LONG_FORM_FLAG == 0 {
        return Ok((u32::from(first), offset + 1));
    }

    let long = network_to_host_u32(read_array::<4>(buf, offset)?);
    Ok((long & LONG_FORM_MAX, offset + 4))
}
