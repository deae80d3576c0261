use fcgi_wire::{RecordType, Role, WireError};

/// Errors raised while turning a FastCGI byte stream into events.
///
/// Everything here is fatal for the record it was raised on. Whether that
/// means dropping one request or the whole connection is up to the
/// caller; none of these should take the process down.
///
/// ```text
///   DecodeError
///   ├── UnsupportedVersion   ← header version byte is not 1 (strict mode)
///   ├── UnsupportedRole      ← BEGIN_REQUEST asks for a role we don't serve
///   ├── DuplicateRequest     ← BEGIN_REQUEST for an id that is still active
///   ├── UnknownRequest       ← stream record for an id that never began
///   ├── StreamClosed         ← data after the empty record closing a stream
///   ├── ParamsTooLarge       ← accumulated PARAMS over the configured limit
///   ├── UnexpectedEof        ← input ended inside a record
///   ├── Wire(WireError)      ← body or parameter block failed to decode
///   └── Io(std::io::Error)   ← from the underlying reader (streaming)
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
  #[error("unsupported protocol version {version} on {record_type} record")]
  UnsupportedVersion { version: u8, record_type: RecordType },

  #[error("request {request_id}: role {role:?} is not served")]
  UnsupportedRole { request_id: u16, role: Role },

  #[error("request {request_id} is already active")]
  DuplicateRequest { request_id: u16 },

  /// A per-request record arrived for an id with no `BEGIN_REQUEST`.
  #[error("{record_type} record for unknown request {request_id}")]
  UnknownRequest { request_id: u16, record_type: RecordType },

  /// A stream record arrived after that stream was already terminated by an
  /// empty record.
  #[error("request {request_id}: {record_type} stream already closed")]
  StreamClosed { request_id: u16, record_type: RecordType },

  #[error("request {request_id}: parameters exceed {limit} bytes")]
  ParamsTooLarge { request_id: u16, limit: usize },

  /// The input ended while part of a record was still buffered.
  #[error("stream ended inside a record ({buffered} bytes buffered)")]
  UnexpectedEof { buffered: usize },

  #[error(transparent)]
  Wire(#[from] WireError),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
