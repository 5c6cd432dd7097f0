//! Builder pattern for configuring decode sessions.
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//! use mpegstream::decoder::MpegDecodeSession;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = File::open("audio.mp3")?;
//!
//!     let mut session = MpegDecodeSession::builder()
//!         .with_window_capacity(16 * 1024) // Fewer, larger reads
//!         .with_max_sync_scan(64 * 1024)   // Give up early on non-MPEG data
//!         .build();
//!     let info = session.start(file)?;
//!
//!     println!("{} Hz, {} channels", info.sample_rate, info.channels);
//!     Ok(())
//! }
//! ```
//!
//! # Settings
//!
//! The following settings can be configured:
//!
//! - `window_capacity` - Size of the compressed byte window
//! - `estimate_duration` - Whether to scan the stream for its duration on start
//! - `cbr_probe_frames` - Constant bit rate frames to time before extrapolating
//! - `byte_len` - Total length of the input data in bytes
//! - `max_sync_scan` - Bytes to search for the first frame before giving up

use crate::constants::{DEFAULT_CBR_PROBE_FRAMES, DEFAULT_WINDOW_CAPACITY, MIN_WINDOW_CAPACITY};
use crate::source::ByteSource;

use super::duration::DurationEstimator;
use super::engine::{FrameDecoder, SymphoniaFrameDecoder};
use super::session::MpegDecodeSession;

/// Decode session configuration settings.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Capacity of the byte window in bytes. Never below two maximal frames.
    pub(crate) window_capacity: usize,

    /// Whether `start` estimates the duration when there is no Xing header.
    /// The estimate rereads the start of the stream, which costs a few reads.
    pub(crate) estimate_duration: bool,

    /// Number of frames with the same bit rate after which the stream is taken
    /// for constant bit rate and the duration is extrapolated.
    pub(crate) cbr_probe_frames: u32,

    /// The length of the stream in bytes, overriding what the source reports.
    pub(crate) byte_len: Option<u64>,

    /// Bytes that may be skipped while looking for the first frame.
    pub(crate) max_sync_scan: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            estimate_duration: true,
            cbr_probe_frames: DEFAULT_CBR_PROBE_FRAMES,
            byte_len: None,
            max_sync_scan: None,
        }
    }
}

impl Settings {
    pub(crate) fn estimator(&self) -> DurationEstimator {
        DurationEstimator::new()
            .with_probe_frames(self.cbr_probe_frames)
            .with_window_capacity(self.window_capacity)
            .with_byte_len(self.byte_len)
    }
}

/// Builder for configuring and creating a decode session.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use mpegstream::decoder::SessionBuilder;
///
/// let session = SessionBuilder::new()
///     .with_duration_estimate(false)
///     .build::<Cursor<Vec<u8>>>();
/// ```
#[derive(Clone, Debug, Default)]
pub struct SessionBuilder {
    settings: Settings,
}

impl SessionBuilder {
    /// Creates a new session builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity of the compressed byte window.
    ///
    /// Values below twice the largest possible frame (4032 bytes) are raised to that.
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.settings.window_capacity = capacity.max(MIN_WINDOW_CAPACITY);
        self
    }

    /// Enables or disables the duration scan on start. This is enabled by default.
    ///
    /// A Xing header is used either way.
    pub fn with_duration_estimate(mut self, estimate: bool) -> Self {
        self.settings.estimate_duration = estimate;
        self
    }

    /// Sets how many constant bit rate frames are timed before extrapolating.
    /// Defaults to 25. Zero is treated as one.
    pub fn with_cbr_probe_frames(mut self, frames: u32) -> Self {
        self.settings.cbr_probe_frames = frames.max(1);
        self
    }

    /// Sets the byte length of the stream.
    ///
    /// Note that this also lets the duration scan seek in sources that do not report
    /// themselves as seekable. An incorrect byte length leads to an incorrect estimate.
    pub fn with_byte_len(mut self, byte_len: u64) -> Self {
        self.settings.byte_len = Some(byte_len);
        self
    }

    /// Limits how many bytes that are neither tags nor frames may precede the first
    /// frame. Without a limit the whole source is searched.
    pub fn with_max_sync_scan(mut self, bytes: u64) -> Self {
        self.settings.max_sync_scan = Some(bytes);
        self
    }

    /// The settings configured so far.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Creates a session that decodes with symphonia.
    pub fn build<S: ByteSource>(self) -> MpegDecodeSession<S> {
        self.build_with_engine(SymphoniaFrameDecoder::new())
    }

    /// Creates a session that decodes with `engine`.
    pub fn build_with_engine<S: ByteSource, D: FrameDecoder>(
        self,
        engine: D,
    ) -> MpegDecodeSession<S, D> {
        MpegDecodeSession::with_settings(self.settings, engine)
    }
}
