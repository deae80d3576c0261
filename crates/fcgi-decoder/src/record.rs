use bytes::{Buf, Bytes, BytesMut};
use fcgi_wire::header::FCGI_VERSION_1;
use fcgi_wire::{HEADER_SIZE, RecordHeader, read_record};

use crate::config::DecoderConfig;
use crate::error::DecodeError;

/// One complete record: its header and its content, padding removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
  pub header: RecordHeader,
  pub content: Bytes,
}

/// Receive buffer that frames whole records out of a byte stream.
///
/// Bytes are appended as they arrive, in chunks of any size. Each call to
/// [`next_record`](Self::next_record) peeks the next header and, only if
/// the whole record (header, content and padding) is buffered, removes it
/// from the buffer and hands back the content.
///
/// ```text
///   extend(..) ─► [hdr|content|pad][hdr|cont ...]
///                  └──── record_len ────┘
///   next_record() ─► Some(Record)   buffer: [hdr|cont ...]
///   next_record() ─► None           (wait for more bytes)
/// ```
#[derive(Debug)]
pub struct RecordBuffer {
  buf: BytesMut,
  strict_version: bool,
}

impl Default for RecordBuffer {
  fn default() -> Self {
    Self::new()
  }
}

impl RecordBuffer {
  /// A buffer that rejects records whose version is not 1.
  #[must_use]
  pub fn new() -> Self {
    Self {
      buf: BytesMut::with_capacity(8 * 1024),
      strict_version: true,
    }
  }

  #[must_use]
  pub fn with_config(config: &DecoderConfig) -> Self {
    Self {
      strict_version: config.strict_version,
      ..Self::new()
    }
  }

  /// Append newly received bytes.
  pub fn extend(&mut self, bytes: &[u8]) {
    self.buf.extend_from_slice(bytes);
  }

  /// Bytes received but not yet returned as part of a record.
  #[must_use]
  pub fn buffered(&self) -> usize {
    self.buf.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  /// Direct access for readers that fill the buffer in place.
  pub(crate) fn buf_mut(&mut self) -> &mut BytesMut {
    &mut self.buf
  }

  /// Take the next complete record off the front of the buffer.
  ///
  /// Returns `Ok(None)` while the header, content or padding is still
  /// incomplete; nothing is consumed in that case. On success exactly
  /// `header.record_len()` bytes are consumed.
  ///
  /// # Errors
  ///
  /// [`DecodeError::UnsupportedVersion`] in strict mode when the header's
  /// version byte is not 1. The record is left in the buffer.
  pub fn next_record(&mut self) -> Result<Option<Record>, DecodeError> {
    let header = match read_record(&self.buf) {
      Ok(header) => header,
      Err(e) if e.is_insufficient_data() => return Ok(None),
      Err(e) => return Err(e.into()),
    };

    if self.strict_version && header.version != FCGI_VERSION_1 {
      tracing::warn!(
        version = header.version,
        record_type = %header.record_type,
        "rejecting record with unsupported version"
      );
      return Err(DecodeError::UnsupportedVersion {
        version: header.version,
        record_type: header.record_type,
      });
    }

    let record_len = header.record_len();
    if self.buf.len() < record_len {
      return Ok(None);
    }

    let mut raw = self.buf.split_to(record_len);
    raw.advance(HEADER_SIZE);
    raw.truncate(header.content_len());

    tracing::trace!(
      record_type = %header.record_type,
      request_id = header.request_id,
      content_length = header.content_length,
      padding_length = header.padding_length,
      "record framed"
    );

    Ok(Some(Record {
      header,
      content: raw.freeze(),
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use fcgi_wire::RecordType;

  fn raw_record(record_type: u8, request_id: u16, content: &[u8], padding: u8) -> Vec<u8> {
    let mut buf = vec![FCGI_VERSION_1, record_type];
    buf.extend_from_slice(&request_id.to_be_bytes());
    buf.extend_from_slice(&u16::try_from(content.len()).unwrap().to_be_bytes());
    buf.push(padding);
    buf.push(0);
    buf.extend_from_slice(content);
    buf.extend(std::iter::repeat_n(0xEE, usize::from(padding)));
    buf
  }

  #[test]
  fn frames_a_whole_record() {
    let mut records = RecordBuffer::new();
    records.extend(&raw_record(5, 1, b"hello", 3));

    let record = records.next_record().unwrap().unwrap();
    assert_eq!(record.header.record_type, RecordType::StdIn);
    assert_eq!(record.header.request_id, 1);
    assert_eq!(&record.content[..], b"hello");
    assert!(records.is_empty());
    assert!(records.next_record().unwrap().is_none());
  }

  #[test]
  fn waits_for_content_and_padding() {
    let bytes = raw_record(4, 2, b"abcdef", 2);
    let mut records = RecordBuffer::new();

    // Header complete but content and padding missing.
    records.extend(&bytes[..HEADER_SIZE + 6]);
    assert!(records.next_record().unwrap().is_none());
    assert_eq!(records.buffered(), HEADER_SIZE + 6);

    records.extend(&bytes[HEADER_SIZE + 6..]);
    let record = records.next_record().unwrap().unwrap();
    assert_eq!(&record.content[..], b"abcdef");
  }

  #[test]
  fn byte_at_a_time_matches_bulk() {
    let mut stream = raw_record(1, 1, &[0, 1, 1, 0, 0, 0, 0, 0], 0);
    stream.extend(raw_record(4, 1, b"\x01\x01ab", 4));
    stream.extend(raw_record(4, 1, b"", 0));

    let mut bulk = RecordBuffer::new();
    bulk.extend(&stream);
    let mut expected = Vec::new();
    while let Some(record) = bulk.next_record().unwrap() {
      expected.push(record);
    }

    let mut trickle = RecordBuffer::new();
    let mut seen = Vec::new();
    for byte in &stream {
      trickle.extend(std::slice::from_ref(byte));
      while let Some(record) = trickle.next_record().unwrap() {
        seen.push(record);
      }
    }

    assert_eq!(expected.len(), 3);
    assert_eq!(seen, expected);
  }

  #[test]
  fn consumes_exactly_one_record() {
    let first = raw_record(5, 3, b"xyz", 5);
    let second = raw_record(5, 3, b"", 0);
    let mut records = RecordBuffer::new();
    records.extend(&first);
    records.extend(&second);

    let before = records.buffered();
    let record = records.next_record().unwrap().unwrap();
    assert_eq!(before - records.buffered(), record.header.record_len());
    assert_eq!(records.buffered(), second.len());
  }

  #[test]
  fn strict_mode_rejects_other_versions() {
    let mut bytes = raw_record(5, 1, b"", 0);
    bytes[0] = 2;
    let mut records = RecordBuffer::new();
    records.extend(&bytes);

    assert!(matches!(
      records.next_record(),
      Err(DecodeError::UnsupportedVersion { version: 2, .. })
    ));
    assert_eq!(records.buffered(), bytes.len());
  }

  #[test]
  fn lenient_mode_passes_version_through() {
    let config = DecoderConfig {
      strict_version: false,
      ..DecoderConfig::default()
    };
    let mut bytes = raw_record(5, 1, b"", 0);
    bytes[0] = 7;
    let mut records = RecordBuffer::with_config(&config);
    records.extend(&bytes);

    let record = records.next_record().unwrap().unwrap();
    assert_eq!(record.header.version, 7);
  }
}
