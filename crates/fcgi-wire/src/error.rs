/// Errors produced by the FastCGI wire decoders.
///
/// Only `InsufficientData` is recoverable: it means the stream has not yet
/// delivered a whole record header, and the caller should try again once
/// more bytes have arrived. The other two variants describe a record whose
/// content cannot be decoded, and the caller should abort that request (or
/// the connection carrying it).
///
/// ```text
/// ┌───────────────────┬──────────────────────────────────────────────┐
/// │ Variant           │ Cause                                        │
/// ├───────────────────┼──────────────────────────────────────────────┤
/// │ InsufficientData  │ fewer than 8 header bytes buffered so far    │
/// │ TruncatedInput    │ a length prefix or fixed body overruns input │
/// │ MalformedBlock    │ parameter block does not split into pairs    │
/// └───────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The record header is not fully buffered yet.
    #[error("insufficient data: need {needed} bytes, {available} available")]
    InsufficientData { needed: usize, available: usize },

    /// A length-prefixed field or fixed-size body claims more bytes than
    /// the input holds.
    ///
    /// `offset` is where the read started, `needed` how many bytes it
    /// required from there and `available` how many were actually left.
    #[error("truncated input at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A parameter block could not be decomposed into whole name/value
    /// pairs. `offset` is the start of the first pair that failed and
    /// `remaining` the number of bytes left from there to the block end.
    #[error("malformed parameter block: {remaining} bytes at offset {offset} do not form a pair")]
    MalformedBlock { offset: usize, remaining: usize },
}

impl WireError {
    /// Whether this is the retry-later outcome of the record framer rather
    /// than a protocol violation.
    #[must_use]
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
