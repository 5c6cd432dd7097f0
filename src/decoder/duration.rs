//! Total duration of a stream, worked out before decoding starts.
//!
//! Two strategies, tried in order:
//!
//! 1. A Xing header in the first frame states the exact number of frames.
//! 2. Otherwise the frame headers are scanned from the start of the stream. A stream that
//!    keeps a constant bit rate for the first few frames is assumed to keep it, and the
//!    measured time is extrapolated over the remaining bytes. A variable bit rate stream
//!    is scanned to its end instead.
//!
//! The second strategy rereads the source, so it needs a seekable source of known length.

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use crate::common::SampleRate;
use crate::constants::{DEFAULT_CBR_PROBE_FRAMES, DEFAULT_WINDOW_CAPACITY};
use crate::math::{duration_to_frames, scale, to_duration, zero_time};
use crate::source::ByteSource;

use super::header::FrameHeader;
use super::sync::FrameSynchronizer;
use super::window::ByteWindow;
use super::DecoderError;

/// Xing flag: the frame count field is present.
const XING_FRAMES_PRESENT: u32 = 0x0001;

/// What is known about the length of a stream before it is decoded.
///
/// The estimate is provisional. Once a session has decoded a stream to its end, the
/// counted number of frames supersedes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurationEstimate {
    /// Read from a Xing header.
    Exact { frames: u64, samples_per_frame: u32 },
    /// Measured from frame headers.
    Extrapolated {
        duration: Duration,
        /// The bit rate changed while measuring; `duration` covers the whole scan but
        /// frame boundaries were not checked against decoded audio.
        variable_bitrate: bool,
    },
    /// Estimation was skipped or failed. Does not mean the stream is empty.
    Unknown,
}

impl DurationEstimate {
    /// Samples per channel, if known.
    pub fn frame_count(&self, sample_rate: SampleRate) -> Option<u64> {
        match *self {
            DurationEstimate::Exact {
                frames,
                samples_per_frame,
            } => Some(frames * samples_per_frame as u64),
            DurationEstimate::Extrapolated { duration, .. } => {
                Some(duration_to_frames(duration, sample_rate))
            }
            DurationEstimate::Unknown => None,
        }
    }

    pub fn duration(&self, sample_rate: SampleRate) -> Option<Duration> {
        match *self {
            DurationEstimate::Exact { .. } => {
                let frames = self.frame_count(sample_rate)?;
                Some(Duration::from_secs_f64(frames as f64 / sample_rate as f64))
            }
            DurationEstimate::Extrapolated { duration, .. } => Some(duration),
            DurationEstimate::Unknown => None,
        }
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        matches!(self, DurationEstimate::Exact { .. })
    }
}

/// Reads the frame count from a Xing header in `frame`, the complete first frame.
///
/// Returns `None` if there is no Xing marker, the frame count flag is clear or the count
/// is zero.
pub fn read_xing_frame_count(header: &FrameHeader, frame: &[u8]) -> Option<u32> {
    let data = frame.get(header.ancillary_offset()..)?;
    if !data.starts_with(b"Xing") {
        return None;
    }
    let flags = u32::from_be_bytes(data.get(4..8)?.try_into().ok()?);
    if flags & XING_FRAMES_PRESENT == 0 {
        return None;
    }
    let frames = u32::from_be_bytes(data.get(8..12)?.try_into().ok()?);
    (frames > 0).then_some(frames)
}

/// Header-scanning duration estimator.
#[derive(Clone, Debug)]
pub struct DurationEstimator {
    probe_frames: u32,
    window_capacity: usize,
    byte_len: Option<u64>,
}

impl Default for DurationEstimator {
    fn default() -> Self {
        DurationEstimator {
            probe_frames: DEFAULT_CBR_PROBE_FRAMES,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            byte_len: None,
        }
    }
}

impl DurationEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of constant bit rate frames after which the scan stops and extrapolates.
    pub fn with_probe_frames(mut self, frames: u32) -> Self {
        self.probe_frames = frames.max(1);
        self
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Uses `byte_len` instead of the length the source reports, and treats the source
    /// as seekable.
    pub fn with_byte_len(mut self, byte_len: Option<u64>) -> Self {
        self.byte_len = byte_len;
        self
    }

    /// Estimates the duration of the audio starting at byte `origin` of `source`.
    ///
    /// The source position is restored afterwards. Failures while scanning only make the
    /// estimate [`DurationEstimate::Unknown`]; failing to restore the position is fatal,
    /// since decoding could not continue where it left off.
    pub fn estimate<S: ByteSource>(
        &self,
        source: &mut S,
        origin: u64,
    ) -> Result<DurationEstimate, DecoderError> {
        let byte_len = match self.byte_len {
            Some(len) => len,
            None if source.is_seekable() => match source.byte_len() {
                Some(len) => len,
                None => return Ok(DurationEstimate::Unknown),
            },
            None => return Ok(DurationEstimate::Unknown),
        };
        let Ok(resume) = source.stream_position() else {
            return Ok(DurationEstimate::Unknown);
        };

        let estimate = self.scan(source, origin, byte_len).unwrap_or_else(|_err| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "duration scan failed");
            DurationEstimate::Unknown
        });
        source.seek(SeekFrom::Start(resume))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(?estimate, "estimated duration from frame headers");
        Ok(estimate)
    }

    fn scan<R: Read + Seek>(
        &self,
        source: &mut R,
        origin: u64,
        byte_len: u64,
    ) -> Result<DurationEstimate, DecoderError> {
        source.seek(SeekFrom::Start(origin))?;
        let mut window = ByteWindow::with_capacity(self.window_capacity);
        let mut sync = FrameSynchronizer::new();

        let mut elapsed = zero_time();
        let mut frames = 0u32;
        let mut frame_bytes = 0u64;
        let mut first_bitrate = None;
        let mut variable_bitrate = false;

        while let Some(header) = sync.next_header(&mut window, source)? {
            let len = header.frame_len();
            window.consume(len);
            elapsed += header.duration();
            frames += 1;
            frame_bytes += len as u64;

            match first_bitrate {
                None => first_bitrate = Some(header.bitrate),
                Some(bitrate) if bitrate != header.bitrate => variable_bitrate = true,
                Some(_) => {}
            }

            if !variable_bitrate && frames >= self.probe_frames {
                let audio_bytes = byte_len.saturating_sub(origin + sync.tag_bytes());
                let factor = audio_bytes as f64 / frame_bytes as f64;
                return Ok(DurationEstimate::Extrapolated {
                    duration: scale(elapsed, factor),
                    variable_bitrate: false,
                });
            }
        }

        if frames == 0 {
            return Ok(DurationEstimate::Unknown);
        }
        Ok(DurationEstimate::Extrapolated {
            duration: to_duration(elapsed),
            variable_bitrate,
        })
    }
}
