use crate::byte_order::{network_to_host_u16, read_array};
use crate::error::WireError;

/// Size of the body carried by a `BEGIN_REQUEST` record.
pub const BEGIN_REQUEST_BODY_SIZE: usize = 8;

/// The role the web server asks the application to play for a request.
///
/// Role values outside the three defined ones are kept as
/// [`Role::Unknown`]; deciding whether to serve them is the caller's job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Handle one HTTP request and produce a response.
    Responder,
    /// Decide whether a request is allowed.
    Authorizer,
    /// Like `Responder`, with an extra data stream to filter.
    Filter,
    Unknown(u16),
}

impl Role {
    #[must_use]
    pub fn from_wire_id(id: u16) -> Self {
        match id {
            1 => Self::Responder,
            2 => Self::Authorizer,
            3 => Self::Filter,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn wire_id(self) -> u16 {
        match self {
            Self::Responder => 1,
            Self::Authorizer => 2,
            Self::Filter => 3,
            Self::Unknown(id) => id,
        }
    }
}

/// `BEGIN_REQUEST` flags byte.
///
/// Bit layout:
///   bit 0 = keep the connection open after the request completes
///   bits 1-7 = reserved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BeginRequestFlags(u8);

impl BeginRequestFlags {
    pub const NONE: Self = Self(0);
    pub const KEEP_CONN: Self = Self(0b0000_0001);

    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u8 {
        self.0
    }

    /// The web server wants to reuse the connection for further requests.
    #[must_use]
    pub fn keep_connection(self) -> bool {
        self.0 & Self::KEEP_CONN.0 != 0
    }
}

/// Body of a `BEGIN_REQUEST` record.
///
/// ```text
/// ┌────────┬─────────┬───────────────────────────────┐
/// │ Offset │ Size    │ Description                   │
/// ├────────┼─────────┼───────────────────────────────┤
/// │ 0x00   │ 2 bytes │ Role, big-endian              │
/// │ 0x02   │ 1 byte  │ Flags                         │
/// │ 0x03   │ 5 bytes │ Reserved                      │
/// └────────┴─────────┴───────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeginRequestBody {
    pub role: Role,
    pub flags: BeginRequestFlags,
    pub reserved: [u8; 5],
}

impl BeginRequestBody {
    /// Decode the body from the front of `buf`. Bytes past the first 8 are
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`WireError::TruncatedInput`] if `buf` is shorter than
    /// [`BEGIN_REQUEST_BODY_SIZE`].
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        let body: [u8; BEGIN_REQUEST_BODY_SIZE] = read_array(buf, 0)?;
        let [role_hi, role_lo, flags, reserved @ ..] = body;

        Ok(Self {
            role: Role::from_wire_id(network_to_host_u16([role_hi, role_lo])),
            flags: BeginRequestFlags::from_raw(flags),
            reserved,
        })
    }
}

/// Decode a `BEGIN_REQUEST` body. See [`BeginRequestBody::read_from`].
///
/// # Errors
///
/// [`WireError::TruncatedInput`] if `buf` holds fewer than 8 bytes.
pub fn read_begin_request_body(buf: &[u8]) -> Result<BeginRequestBody, WireError> {
    BeginRequestBody::read_from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_responder_with_keep_conn() {
        let buf = [0x00, 0x01, 0x01, 0, 0, 0, 0, 0];
        let body = read_begin_request_body(&buf).unwrap();
        assert_eq!(body.role, Role::Responder);
        assert_eq!(body.role.wire_id(), 1);
        assert!(body.flags.keep_connection());
    }

    #[test]
    fn role_is_network_order() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let body = read_begin_request_body(&buf).unwrap();
        assert_eq!(body.role, Role::Unknown(0x0102));
        assert_eq!(body.flags.raw(), 0x03);
        assert_eq!(body.reserved, [0x04, 0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn known_roles() {
        assert_eq!(Role::from_wire_id(2), Role::Authorizer);
        assert_eq!(Role::from_wire_id(3), Role::Filter);
        assert_eq!(Role::from_wire_id(0), Role::Unknown(0));
    }

    #[test]
    fn flags_without_keep_conn() {
        let buf = [0x00, 0x01, 0xFE, 0, 0, 0, 0, 0];
        let body = read_begin_request_body(&buf).unwrap();
        assert!(!body.flags.keep_connection());
        assert_eq!(BeginRequestFlags::default(), BeginRequestFlags::NONE);
    }

    #[test]
    fn seven_bytes_is_truncated() {
        let buf = [0x00, 0x01, 0x00, 0, 0, 0, 0];
        assert_eq!(
            read_begin_request_body(&buf),
            Err(WireError::TruncatedInput {
                offset: 0,
                needed: BEGIN_REQUEST_BODY_SIZE,
                available: 7
            })
        );
    }

    #[test]
    fn extra_bytes_are_ignored() {
        let buf = [0x00, 0x03, 0x00, 0, 0, 0, 0, 0, 0xAA];
        assert_eq!(read_begin_request_body(&buf).unwrap().role, Role::Filter);
    }
}
