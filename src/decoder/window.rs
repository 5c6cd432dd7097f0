//! Sliding window over the compressed byte stream.
//!
//! Frame boundaries rarely line up with read boundaries, so every refill first moves the
//! bytes that were not consumed yet to the front of the buffer and then tops the buffer up
//! from the source. As long as the window is larger than two frames, a frame never has to
//! span more than one refill.

use std::io::{self, ErrorKind, Read};

use crate::constants::MIN_WINDOW_CAPACITY;

/// A fixed-capacity byte buffer with carry-over of unconsumed bytes.
///
/// Invariant: `consumed <= filled <= capacity`.
#[derive(Debug)]
pub struct ByteWindow {
    buf: Box<[u8]>,
    consumed: usize,
    filled: usize,
    /// Bytes still to be discarded from the source before anything is kept.
    pending_skip: u64,
    /// Stream offset of `buf[consumed]`.
    position: u64,
    eof: bool,
}

impl ByteWindow {
    /// Creates an empty window. Capacities below [`MIN_WINDOW_CAPACITY`] are raised to it.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_WINDOW_CAPACITY);
        ByteWindow {
            buf: vec![0; capacity].into_boxed_slice(),
            consumed: 0,
            filled: 0,
            pending_skip: 0,
            position: 0,
            eof: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from the source but not handed on yet.
    #[inline]
    pub fn unconsumed(&self) -> &[u8] {
        &self.buf[self.consumed..self.filled]
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.filled - self.consumed
    }

    /// Offset of the first unconsumed byte, counted from where the window started reading.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the source reported end of stream. Nothing more will arrive.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Marks `n` unconsumed bytes as consumed.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` bytes are available.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.available(), "consumed past the filled region");
        self.consumed += n;
        self.position += n as u64;
    }

    /// Skips `n` bytes of the stream. Bytes beyond the window are discarded as they are
    /// read by the following refills.
    pub fn skip(&mut self, n: u64) {
        let here = n.min(self.available() as u64) as usize;
        self.consume(here);
        self.pending_skip += n - here as u64;
        self.position += n - here as u64;
    }

    /// Moves the unconsumed tail to the front and tops the window up from `source`.
    ///
    /// Returns the number of bytes added, which is 0 only once the source is exhausted
    /// (or if the window is already full). Read errors other than interruptions are
    /// returned unchanged.
    pub fn refill<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<usize> {
        if self.consumed > 0 {
            self.buf.copy_within(self.consumed..self.filled, 0);
            self.filled -= self.consumed;
            self.consumed = 0;
        }

        let mut added = 0;
        while !self.eof && self.filled < self.buf.len() {
            let n = match source.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            let dropped = self.pending_skip.min(n as u64) as usize;
            if dropped > 0 {
                self.buf
                    .copy_within(self.filled + dropped..self.filled + n, self.filled);
                self.pending_skip -= dropped as u64;
            }
            self.filled += n - dropped;
            added += n - dropped;
        }
        Ok(added)
    }

    /// Forgets all buffered data and the end-of-stream flag, ready for a new pass.
    pub fn reset(&mut self) {
        self.consumed = 0;
        self.filled = 0;
        self.pending_skip = 0;
        self.position = 0;
        self.eof = false;
    }
}
