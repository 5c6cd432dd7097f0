//! Frame synchronization and ID3 tag skipping.
//!
//! The synchronizer walks the [`ByteWindow`] until a structurally valid frame header sits
//! at its front. Anything that is not a frame is either an ID3 tag, which is skipped as
//! a whole, or garbage, which is skipped up to the next sync word.

use std::io::Read;

use super::engine::StreamError;
use super::header::{decode_header, is_sync_word, FrameHeader};
use super::window::ByteWindow;
use super::DecoderError;

/// ID3v1 tags are always this long.
pub const ID3V1_LEN: usize = 128;

/// Length of the ID3v2 header, and of its optional footer.
pub const ID3V2_HEADER_LEN: usize = 10;

/// ID3v2 flag: a footer follows the tag body.
const ID3V2_FOOTER_PRESENT: u8 = 0x10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Id3v1,
    Id3v2,
}

/// Location of a detected tag. A zero length means no tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct IdTagSpan {
    pub offset: u64,
    pub len: u64,
    pub kind: Option<TagKind>,
}

impl IdTagSpan {
    #[inline]
    pub fn is_tag(&self) -> bool {
        self.len > 0
    }
}

/// Result of looking for a tag at the front of some bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagProbe {
    NoTag,
    /// The bytes start like an ID3v2 header but are too short to tell.
    Incomplete,
    Tag { kind: TagKind, len: u64 },
}

/// Checks whether `data` starts with an ID3 tag and measures it.
///
/// For ID3v2 the length is the 10 byte header, the synchsafe size, the footer if flagged
/// and any zero padding directly after the tag that is already in `data`.
pub fn probe_tag(data: &[u8]) -> TagProbe {
    if data.starts_with(b"TAG") {
        return TagProbe::Tag {
            kind: TagKind::Id3v1,
            len: ID3V1_LEN as u64,
        };
    }
    if !data.starts_with(b"ID3") {
        return TagProbe::NoTag;
    }
    if data.len() < ID3V2_HEADER_LEN {
        return TagProbe::Incomplete;
    }
    if data[3] == 0xFF || data[4] == 0xFF || data[6..10].iter().any(|&b| b >= 0x80) {
        return TagProbe::NoTag;
    }

    let synchsafe = data[6..10]
        .iter()
        .fold(0usize, |size, &b| (size << 7) | b as usize);
    let mut len = ID3V2_HEADER_LEN + synchsafe;
    if data[5] & ID3V2_FOOTER_PRESENT != 0 {
        len += ID3V2_HEADER_LEN;
    }
    while len < data.len() && data[len] == 0 {
        len += 1;
    }
    TagProbe::Tag {
        kind: TagKind::Id3v2,
        len: len as u64,
    }
}

/// Locates frame headers in a [`ByteWindow`], refilling it as needed.
#[derive(Debug, Default)]
pub struct FrameSynchronizer {
    synced: bool,
    found_first: bool,
    max_scan: Option<u64>,
    scanned: u64,
    tag_bytes: u64,
    last_tag: IdTagSpan,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives up the search for the first frame after skipping `limit` bytes that are
    /// neither tags nor frames.
    pub fn with_max_scan(mut self, limit: Option<u64>) -> Self {
        self.max_scan = limit;
        self
    }

    /// Total bytes skipped as ID3 tags so far.
    #[inline]
    pub fn tag_bytes(&self) -> u64 {
        self.tag_bytes
    }

    /// The most recently skipped tag.
    #[inline]
    pub fn last_tag(&self) -> IdTagSpan {
        self.last_tag
    }

    /// Forgets the current frame alignment, as after a damaged frame. The next header
    /// has to be confirmed by its successor again.
    #[inline]
    pub fn lose_sync(&mut self) {
        self.synced = false;
    }

    /// Advances `window` to the next frame header and returns it. The frame itself is
    /// left unconsumed at the front of the window.
    ///
    /// Returns `Ok(None)` when the source ends before another frame is found, or when the
    /// scan limit for the first frame is exceeded.
    pub fn next_header<R: Read + ?Sized>(
        &mut self,
        window: &mut ByteWindow,
        source: &mut R,
    ) -> Result<Option<FrameHeader>, DecoderError> {
        loop {
            match decode_header(window.unconsumed(), self.synced, window.is_eof()) {
                Ok(header) => {
                    self.synced = true;
                    self.found_first = true;
                    return Ok(Some(header));
                }
                Err(StreamError::BufferUnderrun) => {
                    if window.refill(source)? == 0 {
                        return Ok(None);
                    }
                }
                Err(_) => {
                    self.synced = false;
                    if !self.skip_tag_or_garbage(window) && window.refill(source)? == 0 {
                        // a lone tag prefix at the very end
                        window.consume(window.available());
                        return Ok(None);
                    }
                    if self.scan_exhausted() {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(scanned = self.scanned, "giving up frame search");
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Skips a tag or garbage at the front of `window`. Returns `false` if more bytes are
    /// needed to decide.
    fn skip_tag_or_garbage(&mut self, window: &mut ByteWindow) -> bool {
        let data = window.unconsumed();
        match probe_tag(data) {
            TagProbe::Tag { kind, len } => {
                self.last_tag = IdTagSpan {
                    offset: window.position(),
                    len,
                    kind: Some(kind),
                };
                self.tag_bytes += len;
                #[cfg(feature = "tracing")]
                tracing::debug!(?kind, len, offset = window.position(), "skipping tag");
                window.skip(len);
                true
            }
            TagProbe::Incomplete if !window.is_eof() => false,
            _ => {
                // data is never empty here: decode_header only fails this way on >= 4 bytes
                let skip = data
                    .windows(2)
                    .skip(1)
                    .position(is_sync_word)
                    .map(|i| i + 1)
                    .unwrap_or_else(|| match data.last() {
                        Some(0xFF) if data.len() > 1 => data.len() - 1,
                        _ => data.len(),
                    });
                self.scanned += skip as u64;
                window.consume(skip);
                true
            }
        }
    }

    fn scan_exhausted(&self) -> bool {
        !self.found_first && self.max_scan.is_some_and(|limit| self.scanned > limit)
    }
}
