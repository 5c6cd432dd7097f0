//! Byte sources the decode session reads compressed data from.
//!
//! A source only has to distinguish "no more bytes" (`Ok(0)`) from a read failure, which
//! [`Read`] already does. Seeking is used for a single purpose: the duration estimate
//! rereads the stream from the start of the audio data and then restores the position.
//! Sources that cannot do that report `is_seekable() == false` and the estimate is
//! skipped.

use std::fs::File;
use std::io::{Cursor, Read, Result, Seek, SeekFrom};

/// Compressed input for a [`MpegDecodeSession`](crate::decoder::MpegDecodeSession).
///
/// The session owns its source exclusively for as long as it is started; no other reader
/// may touch it concurrently.
pub trait ByteSource: Read + Seek {
    /// Whether the source can be rewound and read again.
    fn is_seekable(&self) -> bool;

    /// Total length of the source in bytes, if known.
    fn byte_len(&self) -> Option<u64>;
}

impl ByteSource for File {
    fn is_seekable(&self) -> bool {
        // pipes and character devices report a length but cannot be reread
        self.metadata().map(|m| m.is_file()).unwrap_or(false)
    }

    fn byte_len(&self) -> Option<u64> {
        self.metadata().ok().map(|m| m.len())
    }
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    #[inline]
    fn is_seekable(&self) -> bool {
        true
    }

    #[inline]
    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().as_ref().len() as u64)
    }
}

impl<B: ByteSource + ?Sized> ByteSource for Box<B> {
    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn byte_len(&self) -> Option<u64> {
        (**self).byte_len()
    }
}

/// Adapter that turns any `Read + Seek` into a [`ByteSource`] with caller supplied
/// properties.
pub struct ReadSeekSource<T: Read + Seek> {
    inner: T,
    byte_len: Option<u64>,
    is_seekable: bool,
}

impl<T: Read + Seek> ReadSeekSource<T> {
    /// Wraps `inner`. Without a byte length the source is reported as not seekable, since
    /// the duration estimate cannot use it anyway.
    #[inline]
    pub fn new(inner: T, byte_len: Option<u64>) -> Self {
        ReadSeekSource {
            inner,
            byte_len,
            is_seekable: byte_len.is_some(),
        }
    }

    /// Wraps a reader that must only ever be read forward.
    #[inline]
    pub fn forward_only(inner: T) -> Self {
        ReadSeekSource {
            inner,
            byte_len: None,
            is_seekable: false,
        }
    }

    /// Returns the wrapped reader.
    #[inline]
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> ByteSource for ReadSeekSource<T> {
    #[inline]
    fn is_seekable(&self) -> bool {
        self.is_seekable
    }

    #[inline]
    fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }
}

impl<T: Read + Seek> Read for ReadSeekSource<T> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }
}

impl<T: Read + Seek> Seek for ReadSeekSource<T> {
    #[inline]
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.inner.seek(pos)
    }
}
