use std::fmt;

use crate::byte_order::{network_to_host_u16, read_array};
use crate::error::WireError;
use crate::peek::Peek;

/// Size of every record header on the wire.
pub const HEADER_SIZE: usize = 8;

/// The only protocol version FastCGI defines.
pub const FCGI_VERSION_1: u8 = 1;

/// Request id used by management records (`GET_VALUES` and friends).
pub const NULL_REQUEST_ID: u16 = 0;

/// Record kinds, as carried in the header's type byte.
///
/// Types this decoder does not know are preserved as [`RecordType::Other`]
/// so the caller can reject them (the protocol answers those with an
/// `UNKNOWN_TYPE` record) instead of the framer failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    BeginRequest,
    AbortRequest,
    EndRequest,
    Params,
    StdIn,
    StdOut,
    StdErr,
    Data,
    GetValues,
    GetValuesResult,
    UnknownType,
    Other(u8),
}

impl RecordType {
    #[must_use]
    pub fn from_wire_id(id: u8) -> Self {
        match id {
            1 => Self::BeginRequest,
            2 => Self::AbortRequest,
            3 => Self::EndRequest,
            4 => Self::Params,
            5 => Self::StdIn,
            6 => Self::StdOut,
            7 => Self::StdErr,
            8 => Self::Data,
            9 => Self::GetValues,
            10 => Self::GetValuesResult,
            11 => Self::UnknownType,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub fn wire_id(self) -> u8 {
        match self {
            Self::BeginRequest => 1,
            Self::AbortRequest => 2,
            Self::EndRequest => 3,
            Self::Params => 4,
            Self::StdIn => 5,
            Self::StdOut => 6,
            Self::StdErr => 7,
            Self::Data => 8,
            Self::GetValues => 9,
            Self::GetValuesResult => 10,
            Self::UnknownType => 11,
            Self::Other(id) => id,
        }
    }

    /// Management records are addressed to the application, not to a
    /// request, and always travel with [`NULL_REQUEST_ID`].
    #[must_use]
    pub fn is_management(self) -> bool {
        matches!(
            self,
            Self::GetValues | Self::GetValuesResult | Self::UnknownType
        )
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeginRequest => "BEGIN_REQUEST",
            Self::AbortRequest => "ABORT_REQUEST",
            Self::EndRequest => "END_REQUEST",
            Self::Params => "PARAMS",
            Self::StdIn => "STDIN",
            Self::StdOut => "STDOUT",
            Self::StdErr => "STDERR",
            Self::Data => "DATA",
            Self::GetValues => "GET_VALUES",
            Self::GetValuesResult => "GET_VALUES_RESULT",
            Self::UnknownType => "UNKNOWN_TYPE",
            Self::Other(id) => return write!(f, "TYPE_{id:#04X}"),
        };
        f.write_str(name)
    }
}

/// FastCGI record header, the first 8 bytes of every record.
///
/// ```text
/// ┌────────┬─────────┬───────────────────────────────────────┐
/// │ Offset │ Size    │ Description                           │
/// ├────────┼─────────┼───────────────────────────────────────┤
/// │ 0x00   │ 1 byte  │ Version (1)                           │
/// │ 0x01   │ 1 byte  │ Record type                           │
/// │ 0x02   │ 2 bytes │ Request id, big-endian                │
/// │ 0x04   │ 2 bytes │ Content length, big-endian            │
/// │ 0x06   │ 1 byte  │ Padding length                        │
/// │ 0x07   │ 1 byte  │ Reserved                              │
/// └────────┴─────────┴───────────────────────────────────────┘
/// ```
///
/// `content_length` content bytes and `padding_length` padding bytes follow
/// the header. The decoder only reports them; skipping past them is up to
/// whoever owns the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub version: u8,
    pub record_type: RecordType,
    pub request_id: u16,
    pub content_length: u16,
    pub padding_length: u8,
    pub reserved: u8,
}

impl RecordHeader {
    /// Decode a header from the first 8 bytes of `buf`.
    ///
    /// Version and type are passed through unchecked.
    ///
    /// # Errors
    ///
    /// [`WireError::InsufficientData`] if `buf` is shorter than
    /// [`HEADER_SIZE`]. Never returns a partially filled header.
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::InsufficientData {
                needed: HEADER_SIZE,
                available: buf.len(),
            });
        }

        Ok(Self {
            version: buf[0],
            record_type: RecordType::from_wire_id(buf[1]),
            request_id: network_to_host_u16(read_array(buf, 2)?),
            content_length: network_to_host_u16(read_array(buf, 4)?),
            padding_length: buf[6],
            reserved: buf[7],
        })
    }

    /// Content bytes following the header.
    #[must_use]
    pub fn content_len(&self) -> usize {
        usize::from(self.content_length)
    }

    /// Padding bytes following the content.
    #[must_use]
    pub fn padding_len(&self) -> usize {
        usize::from(self.padding_length)
    }

    /// Total size of the record on the wire: header, content and padding.
    #[must_use]
    pub fn record_len(&self) -> usize {
        HEADER_SIZE + self.content_len() + self.padding_len()
    }

    /// Whether this record is a management record (request id 0).
    #[must_use]
    pub fn is_management(&self) -> bool {
        self.request_id == NULL_REQUEST_ID
    }
}

/// Peek the next record header from `stream` without consuming anything.
///
/// This is safe to call every time new bytes arrive, however they are
/// chunked: until all 8 header bytes are buffered the answer is
/// [`WireError::InsufficientData`], and the stream is left untouched either
/// way.
///
/// # Errors
///
/// [`WireError::InsufficientData`] while fewer than [`HEADER_SIZE`] bytes
/// are available.
pub fn read_record<S: Peek + ?Sized>(stream: &S) -> Result<RecordHeader, WireError> {
    RecordHeader::read_from(stream.peek(HEADER_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_field() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let header = RecordHeader::read_from(&buf).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.record_type, RecordType::AbortRequest);
        assert_eq!(header.request_id, 0x0304);
        assert_eq!(header.content_length, 0x0506);
        assert_eq!(header.padding_length, 0x07);
        assert_eq!(header.reserved, 0x08);
    }

    #[test]
    fn multi_byte_fields_are_network_order() {
        let buf = [0x01, 0x04, 0x00, 0x01, 0x02, 0x03, 0x05, 0x00];
        let header = read_record(&buf[..]).unwrap();
        assert_eq!(header.request_id, 1);
        assert_eq!(header.content_length, 515);
        assert_eq!(header.record_len(), 8 + 515 + 5);
    }

    #[test]
    fn short_input_is_insufficient_data() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        for len in 0..HEADER_SIZE {
            let result = read_record(&buf[..len]);
            assert_eq!(
                result,
                Err(WireError::InsufficientData {
                    needed: HEADER_SIZE,
                    available: len
                }),
                "length {len}"
            );
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let buf = [0x01, 0x05, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF];
        let header = read_record(&buf[..]).unwrap();
        assert_eq!(header.record_type, RecordType::StdIn);
        assert_eq!(header.request_id, 7);
        assert_eq!(header.record_len(), HEADER_SIZE);
    }

    #[test]
    fn unknown_version_and_type_pass_through() {
        let buf = [0x09, 0xEE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let header = RecordHeader::read_from(&buf).unwrap();
        assert_eq!(header.version, 9);
        assert_eq!(header.record_type, RecordType::Other(0xEE));
        assert!(header.is_management());
    }

    #[test]
    fn record_type_ids_roundtrip() {
        for id in 0..=u8::MAX {
            assert_eq!(RecordType::from_wire_id(id).wire_id(), id);
        }
    }

    #[test]
    fn management_types() {
        assert!(RecordType::GetValues.is_management());
        assert!(RecordType::UnknownType.is_management());
        assert!(!RecordType::Params.is_management());
    }

    #[test]
    fn display_uses_protocol_names() {
        assert_eq!(RecordType::BeginRequest.to_string(), "BEGIN_REQUEST");
        assert_eq!(RecordType::Other(0x2A).to_string(), "TYPE_0x2A");
    }
}
