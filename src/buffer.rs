//! A resizable buffer of interleaved, normalized samples.
//!
//! [`AudioBuffer`] is what [`MpegFile::load`](crate::MpegFile) and
//! [`MpegDecodeSession::decode_into`](crate::decoder::MpegDecodeSession::decode_into) write
//! into.
//!
//! # Example
//!
//! ```
//! use mpegstream::AudioBuffer;
//! let mut buffer = AudioBuffer::new(2, 44100);
//! buffer.try_resize(4).unwrap();
//! buffer.as_mut_slice().copy_from_slice(&[0.0, 0.5, -0.5, 0.25]);
//! assert_eq!(buffer.frames(), 2);
//! ```

use std::time::Duration;

use crate::common::{ChannelCount, Sample, SampleRate};
use crate::decoder::DecoderError;

/// Interleaved samples plus the stream properties needed to interpret them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    data: Vec<Sample>,
    channels: ChannelCount,
    sample_rate: SampleRate,
}

impl AudioBuffer {
    /// Builds an empty buffer.
    pub fn new(channels: ChannelCount, sample_rate: SampleRate) -> Self {
        AudioBuffer {
            data: Vec::new(),
            channels,
            sample_rate,
        }
    }

    /// Builds a buffer around existing interleaved samples.
    pub fn from_samples<D>(channels: ChannelCount, sample_rate: SampleRate, data: D) -> Self
    where
        D: Into<Vec<Sample>>,
    {
        AudioBuffer {
            data: data.into(),
            channels,
            sample_rate,
        }
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
    }

    #[inline]
    pub fn set_num_channels(&mut self, channels: ChannelCount) {
        self.channels = channels;
    }

    #[inline]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> ChannelCount {
        self.channels
    }

    /// Resizes the buffer to `len` samples. New samples are silent.
    ///
    /// If the memory cannot be reserved the buffer is reset to empty, never left partially
    /// sized, and [`DecoderError::OutOfMemory`] is returned.
    pub fn try_resize(&mut self, len: usize) -> Result<(), DecoderError> {
        if len > self.data.len() && self.data.try_reserve_exact(len - self.data.len()).is_err() {
            self.data = Vec::new();
            return Err(DecoderError::OutOfMemory { requested: len });
        }
        self.data.resize(len, 0.0);
        Ok(())
    }

    /// Shortens the buffer to `len` samples. Has no effect if it is already shorter.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Drops all samples and releases their memory.
    #[inline]
    pub fn clear(&mut self) {
        self.data = Vec::new();
    }

    /// Number of samples across all channels.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of complete frames (one sample per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels as usize
        }
    }

    /// Playing time of the buffered frames.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.frames() as u64;
        let rate = self.sample_rate as u64;
        Duration::new(
            frames / rate,
            ((frames % rate) * 1_000_000_000 / rate) as u32,
        )
    }

    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<Sample> {
        self.data
    }
}
