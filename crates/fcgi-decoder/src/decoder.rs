use crate::config::DecoderConfig;
use crate::connection::{Connection, Event};
use crate::error::DecodeError;
use crate::record::{Record, RecordBuffer};

/// Result of decoding a complete, in-memory FastCGI byte stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedStream {
  /// Every record in stream order, padding stripped.
  pub records: Vec<Record>,

  /// The events those records produced, in the same order. Records that
  /// change nothing (an abort for an inactive id) have no event.
  pub events: Vec<Event>,
}

/// Synchronous decoder for a FastCGI stream that is already fully in
/// memory, such as a capture file.
///
/// For sockets and pipes use [`StreamingDecoder`](crate::StreamingDecoder),
/// which reads incrementally.
///
/// ```text
///   bytes ─► RecordBuffer ─► Record ─► Connection ─► Event
/// ```
pub struct FcgiDecoder;

impl FcgiDecoder {
  /// Decode with [`DecoderConfig::default`].
  ///
  /// # Errors
  ///
  /// See [`decode_with_config`](Self::decode_with_config).
  pub fn decode(bytes: &[u8]) -> Result<DecodedStream, DecodeError> {
    Self::decode_with_config(bytes, DecoderConfig::default())
  }

  /// Decode every record in `bytes` and route it through a fresh
  /// [`Connection`].
  ///
  /// # Errors
  ///
  /// The first error any record raises, or
  /// [`DecodeError::UnexpectedEof`] if `bytes` ends inside a record.
  pub fn decode_with_config(
    bytes: &[u8],
    config: DecoderConfig,
  ) -> Result<DecodedStream, DecodeError> {
    let mut buffer = RecordBuffer::with_config(&config);
    let mut connection = Connection::new(config);
    let mut decoded = DecodedStream::default();

    buffer.extend(bytes);
    while let Some(record) = buffer.next_record()? {
      if let Some(event) = connection.handle(&record)? {
        decoded.events.push(event);
      }
      decoded.records.push(record);
    }

    if !buffer.is_empty() {
      return Err(DecodeError::UnexpectedEof {
        buffered: buffer.buffered(),
      });
    }

    Ok(decoded)
  }
}
