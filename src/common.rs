/// Stream sample rate (samples per second per channel).
pub type SampleRate = u32;

/// Number of channels in a stream.
pub type ChannelCount = u16;

/// Output sample type. Decoded audio is normalized to `[-1.0, 1.0)`.
pub type Sample = f32;
