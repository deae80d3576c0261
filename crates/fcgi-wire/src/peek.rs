use std::io::Cursor;

use bytes::{Bytes, BytesMut};

/// A byte source that can show what it has buffered without consuming it.
///
/// The record framer only ever needs "the first N bytes, or however many
/// are here right now". Returning fewer than `len` bytes is normal and
/// means the rest has not arrived yet; it is never an error.
///
/// Consumption stays with the owner of the buffer. Once it knows a whole
/// record is present it advances by header + content + padding itself.
pub trait Peek {
    /// Return up to `len` bytes from the front of the source.
    fn peek(&self, len: usize) -> &[u8];

    /// Number of bytes currently available to peek.
    fn available(&self) -> usize;
}

impl Peek for [u8] {
    fn peek(&self, len: usize) -> &[u8] {
        &self[..len.min(self.len())]
    }

    fn available(&self) -> usize {
        self.len()
    }
}

impl Peek for Vec<u8> {
    fn peek(&self, len: usize) -> &[u8] {
        self.as_slice().peek(len)
    }

    fn available(&self) -> usize {
        self.len()
    }
}

impl Peek for Bytes {
    fn peek(&self, len: usize) -> &[u8] {
        self.as_ref().peek(len)
    }

    fn available(&self) -> usize {
        self.len()
    }
}

impl Peek for BytesMut {
    fn peek(&self, len: usize) -> &[u8] {
        self.as_ref().peek(len)
    }

    fn available(&self) -> usize {
        self.len()
    }
}

/// Peeks from the cursor's current position onwards.
impl<T: AsRef<[u8]>> Peek for Cursor<T> {
    fn peek(&self, len: usize) -> &[u8] {
        remaining(self).peek(len)
    }

    fn available(&self) -> usize {
        remaining(self).len()
    }
}

impl<P: Peek + ?Sized> Peek for &P {
    fn peek(&self, len: usize) -> &[u8] {
        (**self).peek(len)
    }

    fn available(&self) -> usize {
        (**self).available()
    }
}

fn remaining<T: AsRef<[u8]>>(cursor: &Cursor<T>) -> &[u8] {
    let data = cursor.get_ref().as_ref();
    let pos = usize::try_from(cursor.position()).map_or(data.len(), |p| p.min(data.len()));
    &data[pos..]
}
