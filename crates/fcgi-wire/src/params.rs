use std::collections::BTreeMap;
use std::iter::FusedIterator;

use crate::error::WireError;
use crate::length::read_variable_length;

/// Decoded parameters of one block, keyed by name.
///
/// Names and values are raw bytes; FastCGI does not define a charset. The
/// wire format allows a name to appear more than once, and when it does
/// the last pair wins.
pub type ParameterMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// One name/value pair, borrowed from the block it was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NameValuePair<'a> {
    pub name: &'a [u8],
    pub value: &'a [u8],
}

impl NameValuePair<'_> {
    /// Copy the pair out of the source buffer.
    #[must_use]
    pub fn to_owned_pair(&self) -> (Vec<u8>, Vec<u8>) {
        (self.name.to_vec(), self.value.to_vec())
    }
}

/// Decode a single name/value pair starting at `offset`.
///
/// Wire layout:
///
/// ```text
///   name_len (1 or 4 bytes) │ value_len (1 or 4 bytes) │ name │ value
/// ```
///
/// # Returns
///
/// The pair and the offset just past its value.
///
/// # Errors
///
/// [`WireError::TruncatedInput`] if either length prefix is cut short, or
/// if the two declared lengths together overrun the buffer.
pub fn read_name_value_pair(buf: &[u8], offset: usize) -> Result<(NameValuePair<'_>, usize), WireError> {
    let (name_len, cursor) = read_variable_length(buf, offset)?;
    let (value_len, cursor) = read_variable_length(buf, cursor)?;

    let name_len = widen(name_len);
    let value_len = widen(value_len);

    // Both prefixes decoded, so cursor <= buf.len().
    let available = buf.len() - cursor;
    let needed = name_len.saturating_add(value_len);
    if needed > available {
        return Err(WireError::TruncatedInput {
            offset: cursor,
            needed,
            available,
        });
    }

    let value_start = cursor + name_len;
    let value_end = value_start + value_len;

    Ok((
        NameValuePair {
            name: &buf[cursor..value_start],
            value: &buf[value_start..value_end],
        },
        value_end,
    ))
}

/// Decode a whole parameter block into a [`ParameterMap`].
///
/// The block must consist of whole pairs and nothing else. Leftover bytes
/// after the last whole pair mean a corrupt record, so they fail the
/// block instead of being dropped.
///
/// # Errors
///
/// [`WireError::MalformedBlock`] if any pair fails to decode. Its `offset`
/// is where that pair starts.
pub fn read_all_name_value_pairs(buf: &[u8]) -> Result<ParameterMap, WireError> {
    let mut params = ParameterMap::new();
    for pair in NameValuePairs::new(buf) {
        let (name, value) = pair?.to_owned_pair();
        params.insert(name, value);
    }
    Ok(params)
}

/// Lazy, zero-copy walk over the pairs of a parameter block.
///
/// Yields `Ok(pair)` for each whole pair. If the bytes left do not form a
/// pair, yields a single [`WireError::MalformedBlock`] and then stops. The
/// iterator ends cleanly only when the block is consumed exactly.
///
/// ```text
///   let mut pairs = NameValuePairs::new(block);
///   while let Some(pair) = pairs.next() {
///       let pair = pair?;
///       // pair.name, pair.value borrow from `block`
///   }
/// ```
#[derive(Clone, Debug)]
pub struct NameValuePairs<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> NameValuePairs<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            failed: false,
        }
    }

    /// Bytes consumed by whole pairs so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

impl<'a> Iterator for NameValuePairs<'a> {
    type Item = Result<NameValuePair<'a>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos == self.buf.len() {
            return None;
        }

        match read_name_value_pair(self.buf, self.pos) {
            Ok((pair, next)) => {
                self.pos = next;
                Some(Ok(pair))
            }
            Err(_) => {
                self.failed = true;
                Some(Err(WireError::MalformedBlock {
                    offset: self.pos,
                    remaining: self.buf.len() - self.pos,
                }))
            }
        }
    }
}

impl FusedIterator for NameValuePairs<'_> {}

/// Lengths are at most 2^31 - 1. On targets where that does not fit a
/// `usize` the saturated value makes the bounds check fail.
fn widen(len: u32) -> usize {
    usize::try_from(len).unwrap_or(usize::MAX)
}
