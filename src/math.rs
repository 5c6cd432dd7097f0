use std::time::Duration;

use num_rational::Ratio;

use crate::common::SampleRate;

/// Exact stream time in seconds, accumulated one frame duration at a time.
pub type StreamTime = Ratio<u64>;

/// Playing time of one frame holding `samples_per_frame` samples per channel.
///
/// `sample_rate` must not be zero.
#[inline]
pub fn frame_time(samples_per_frame: u32, sample_rate: SampleRate) -> StreamTime {
    Ratio::new(samples_per_frame as u64, sample_rate as u64)
}

#[inline]
pub fn zero_time() -> StreamTime {
    Ratio::from_integer(0)
}

/// Converts exact stream time to a `Duration`, truncating below one nanosecond.
pub fn to_duration(time: StreamTime) -> Duration {
    let (numer, denom) = (*time.numer(), *time.denom());
    let secs = numer / denom;
    let nanos = ((numer % denom) as u128 * 1_000_000_000 / denom as u128) as u32;
    Duration::new(secs, nanos)
}

/// Scales `time` by a real factor. Non-finite or negative results collapse to zero.
pub fn scale(time: StreamTime, factor: f64) -> Duration {
    let secs = *time.numer() as f64 / *time.denom() as f64 * factor;
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Number of sample frames (per channel) covered by `duration`, rounded to nearest.
#[inline]
pub fn duration_to_frames(duration: Duration, sample_rate: SampleRate) -> u64 {
    (duration.as_secs_f64() * sample_rate as f64 + 0.5) as u64
}
