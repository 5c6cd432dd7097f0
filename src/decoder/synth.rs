//! Fixed-point PCM as it leaves the decode engine.
//!
//! Samples are Q4.28: [`FIXED_ONE`] represents full scale, and the engine may overshoot it
//! (the synthesis filter is not bounded). Conversion to float saturates to
//! `[-1.0, 1.0)` instead of wrapping.

use crate::common::Sample;

/// A fixed-point sample.
pub type Fixed = i32;

/// Fractional bits of [`Fixed`].
pub const FRAC_BITS: u32 = 28;

/// Full scale.
pub const FIXED_ONE: Fixed = 1 << FRAC_BITS;

/// Largest `f32` below 1.0.
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Clamps `sample` to `[-FIXED_ONE, FIXED_ONE - 1]` and divides it by [`FIXED_ONE`].
///
/// Values near the upper bound round to 1.0 in `f32`, so the result is capped just below it.
#[inline]
pub fn fixed_to_f32(sample: Fixed) -> Sample {
    let clamped = sample.clamp(-FIXED_ONE, FIXED_ONE - 1);
    (clamped as f32 / FIXED_ONE as f32).min(BELOW_ONE)
}

/// Converts a float sample to fixed point, saturating at the `i32` range. NaN maps to 0.
#[inline]
pub fn fixed_from_f32(sample: f32) -> Fixed {
    (sample * FIXED_ONE as f32) as Fixed
}

/// The PCM of one decoded frame plus a read cursor.
///
/// Storage is planar and reused between frames; after the first few frames no
/// allocation happens here.
#[derive(Clone, Debug, Default)]
pub struct SynthBlock {
    pcm: Vec<Vec<Fixed>>,
    channels: usize,
    len: usize,
    cursor: usize,
}

impl SynthBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the block for a new frame of `len` samples per channel and rewinds the
    /// cursor. Sample values are left for the engine to overwrite.
    pub fn reset(&mut self, channels: usize, len: usize) {
        if self.pcm.len() < channels {
            self.pcm.resize_with(channels, Vec::new);
        }
        for channel in &mut self.pcm[..channels] {
            channel.resize(len, 0);
        }
        self.channels = channels;
        self.len = len;
        self.cursor = 0;
    }

    /// Empties the block and releases its memory.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [Fixed] {
        &mut self.pcm[channel][..self.len]
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[Fixed] {
        &self.pcm[channel][..self.len]
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples per channel in the current frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the next frame position to extract.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Frame positions not extracted yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len - self.cursor
    }

    /// Writes as many whole frame positions as fit in `out`, channel-interleaved, and
    /// advances the cursor past them. Returns the number of samples written.
    pub fn extract(&mut self, out: &mut [Sample]) -> usize {
        if self.channels == 0 {
            return 0;
        }
        let positions = self.remaining().min(out.len() / self.channels);
        let start = self.cursor;

        for (pos, frame) in out
            .chunks_exact_mut(self.channels)
            .take(positions)
            .enumerate()
        {
            for (ch, slot) in frame.iter_mut().enumerate() {
                *slot = fixed_to_f32(self.pcm[ch][start + pos]);
            }
        }

        self.cursor += positions;
        positions * self.channels
    }
}
