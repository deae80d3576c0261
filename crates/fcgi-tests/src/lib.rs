//! Byte-level builders for FastCGI test streams.
//!
//! The production crates only decode, so the suites build their input
//! here. Every builder writes exactly what a web server would put on the
//! wire: big-endian integers, one- or four-byte length prefixes and an
//! 8-byte record header in front of each record.
//!
//! ```text
//!   StreamBuilder::new()
//!     .begin(1, RESPONDER, KEEP_CONN)   ─► BEGIN_REQUEST
//!     .params(1, &[(b"A", b"x")])       ─► PARAMS (+ empty PARAMS)
//!     .stdin(1, b"")                    ─► STDIN (empty)
//!     .build()                          ─► Vec<u8>
//! ```

use bytes::{BufMut, BytesMut};

/// Largest content a single record can carry.
pub const MAX_CONTENT: usize = u16::MAX as usize;

pub const BEGIN_REQUEST: u8 = 1;
pub const ABORT_REQUEST: u8 = 2;
pub const END_REQUEST: u8 = 3;
pub const PARAMS: u8 = 4;
pub const STDIN: u8 = 5;
pub const DATA: u8 = 8;
pub const GET_VALUES: u8 = 9;

pub const RESPONDER: u16 = 1;
pub const AUTHORIZER: u16 = 2;
pub const FILTER: u16 = 3;

pub const KEEP_CONN: u8 = 1;

// ── Field encoders ────────────────────────────────────────────────────────────

/// Append a name or value length in its shortest valid form.
///
/// # Panics
///
/// Panics if `len` does not fit the 31-bit long form.
pub fn put_length(out: &mut BytesMut, len: usize) {
    if len <= 0x7F {
        out.put_u8(u8::try_from(len).unwrap());
    } else {
        let len = u32::try_from(len).unwrap();
        assert!(len <= 0x7FFF_FFFF, "length {len} exceeds 31 bits");
        out.put_u32(len | 0x8000_0000);
    }
}

/// Append a length in the four-byte form even when it would fit in one.
///
/// # Panics
///
/// Panics if `len` does not fit 31 bits.
pub fn put_long_length(out: &mut BytesMut, len: u32) {
    assert!(len <= 0x7FFF_FFFF, "length {len} exceeds 31 bits");
    out.put_u32(len | 0x8000_0000);
}

/// One encoded name/value pair.
#[must_use]
pub fn pair(name: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(8 + name.len() + value.len());
    put_length(&mut out, name.len());
    put_length(&mut out, value.len());
    out.put_slice(name);
    out.put_slice(value);
    out.to_vec()
}

/// A parameter block: the pairs back to back, nothing else.
#[must_use]
pub fn params_block(pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
    pairs.iter().flat_map(|(n, v)| pair(n, v)).collect()
}

/// The 8-byte `BEGIN_REQUEST` body.
#[must_use]
pub fn begin_request_body(role: u16, flags: u8) -> [u8; 8] {
    let [hi, lo] = role.to_be_bytes();
    [hi, lo, flags, 0, 0, 0, 0, 0]
}

/// One complete record: header, content, then `padding` zero bytes.
///
/// # Panics
///
/// Panics if `content` is longer than [`MAX_CONTENT`].
#[must_use]
pub fn record(record_type: u8, request_id: u16, content: &[u8], padding: u8) -> Vec<u8> {
    record_with_version(1, record_type, request_id, content, padding)
}

/// Like [`record`] with an explicit header version byte.
///
/// # Panics
///
/// Panics if `content` is longer than [`MAX_CONTENT`].
#[must_use]
pub fn record_with_version(
    version: u8,
    record_type: u8,
    request_id: u16,
    content: &[u8],
    padding: u8,
) -> Vec<u8> {
    let content_length = u16::try_from(content.len()).expect("content exceeds one record");
    let mut out = BytesMut::with_capacity(8 + content.len() + usize::from(padding));
    out.put_u8(version);
    out.put_u8(record_type);
    out.put_u16(request_id);
    out.put_u16(content_length);
    out.put_u8(padding);
    out.put_u8(0);
    out.put_slice(content);
    out.put_bytes(0, usize::from(padding));
    out.to_vec()
}

/// Padding that rounds `content_len` up to a multiple of eight, the way
/// most servers align records.
#[must_use]
pub fn aligned_padding(content_len: usize) -> u8 {
    u8::try_from((8 - content_len % 8) % 8).unwrap_or(0)
}

// ── Stream builder ────────────────────────────────────────────────────────────

/// Builds a whole connection's worth of records in order.
#[derive(Clone, Debug, Default)]
pub struct StreamBuilder {
    out: Vec<u8>,
}

impl StreamBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn begin(mut self, request_id: u16, role: u16, flags: u8) -> Self {
        let body = begin_request_body(role, flags);
        self.out
            .extend(record(BEGIN_REQUEST, request_id, &body, 0));
        self
    }

    #[must_use]
    pub fn abort(mut self, request_id: u16) -> Self {
        self.out.extend(record(ABORT_REQUEST, request_id, &[], 0));
        self
    }

    /// The parameter stream: the whole block in one record, then the
    /// empty record closing the stream.
    ///
    /// Each PARAMS record is decoded as a block of its own, so a pair
    /// cannot straddle two records. Larger parameter sets have to be
    /// spread over several [`stream`](Self::stream) calls on pair
    /// boundaries.
    ///
    /// # Panics
    ///
    /// Panics if the encoded block is longer than [`MAX_CONTENT`].
    #[must_use]
    pub fn params(self, request_id: u16, pairs: &[(&[u8], &[u8])]) -> Self {
        let block = params_block(pairs);
        assert!(
            block.len() <= MAX_CONTENT,
            "parameter block of {} bytes does not fit one PARAMS record",
            block.len()
        );
        self.stream(PARAMS, request_id, &block).close(PARAMS, request_id)
    }

    /// The stdin stream followed by its empty closing record.
    #[must_use]
    pub fn stdin(self, request_id: u16, data: &[u8]) -> Self {
        self.stream(STDIN, request_id, data).close(STDIN, request_id)
    }

    /// The data stream followed by its empty closing record.
    #[must_use]
    pub fn data(self, request_id: u16, data: &[u8]) -> Self {
        self.stream(DATA, request_id, data).close(DATA, request_id)
    }

    /// A management query for `names`, values left empty.
    #[must_use]
    pub fn get_values(mut self, names: &[&[u8]]) -> Self {
        let pairs: Vec<(&[u8], &[u8])> = names.iter().map(|n| (*n, &b""[..])).collect();
        self.out
            .extend(record(GET_VALUES, 0, &params_block(&pairs), 0));
        self
    }

    /// Non-empty stream records carrying `content`, aligned to eight bytes.
    /// Content over [`MAX_CONTENT`] is cut into several records at fixed
    /// offsets, which suits STDIN and DATA but not PARAMS.
    #[must_use]
    pub fn stream(mut self, record_type: u8, request_id: u16, content: &[u8]) -> Self {
        for chunk in content.chunks(MAX_CONTENT) {
            let padding = aligned_padding(chunk.len());
            self.out.extend(record(record_type, request_id, chunk, padding));
        }
        self
    }

    /// The empty record that terminates a stream.
    #[must_use]
    pub fn close(mut self, record_type: u8, request_id: u16) -> Self {
        self.out.extend(record(record_type, request_id, &[], 0));
        self
    }

    /// Append raw bytes verbatim.
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.out.extend_from_slice(bytes);
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.out
    }
}

/// A typical responder request as nginx would send it.
#[must_use]
pub fn sample_request() -> Vec<u8> {
    StreamBuilder::new()
        .begin(1, RESPONDER, KEEP_CONN)
        .params(
            1,
            &[
                (b"SCRIPT_FILENAME", b"/srv/www/index.php"),
                (b"QUERY_STRING", b""),
                (b"REQUEST_METHOD", b"POST"),
                (b"CONTENT_TYPE", b"application/x-www-form-urlencoded"),
                (b"CONTENT_LENGTH", b"11"),
                (b"SERVER_PROTOCOL", b"HTTP/1.1"),
                (b"HTTP_HOST", b"example.org"),
            ],
        )
        .stdin(1, b"name=ferris")
        .build()
}
