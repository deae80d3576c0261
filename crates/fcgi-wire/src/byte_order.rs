use crate::error::WireError;

// FastCGI puts every multi-byte integer on the wire most significant byte
// first. These helpers are the only place the conversion happens, so the
// decoders never depend on host layout or alignment.

/// Convert a 2-byte big-endian field to a host `u16`.
#[must_use]
pub const fn network_to_host_u16(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Convert a 4-byte big-endian field to a host `u32`.
#[must_use]
pub const fn network_to_host_u32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Copy `N` bytes starting at `offset` out of `buf`.
///
/// # Errors
///
/// [`WireError::TruncatedInput`] if fewer than `N` bytes remain after
/// `offset` (including when `offset` is past the end).
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], WireError> {
    buf.get(offset..)
        .and_then(|rest| rest.get(..N))
        .and_then(|field| <[u8; N]>::try_from(field).ok())
        .ok_or_else(|| WireError::TruncatedInput {
            offset,
            needed: N,
            available: buf.len().saturating_sub(offset),
        })
}
