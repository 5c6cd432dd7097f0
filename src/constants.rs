//! Stream-wide constants

/// Default size of the byte window that feeds the frame synchronizer.
pub const DEFAULT_WINDOW_CAPACITY: usize = 8192;

/// Upper bound on the length of one compressed frame, padding included.
///
/// (448000 * (1152 / 32000)) / 8, the Layer I/II worst case at the lowest MPEG-1 rate.
pub const MAX_FRAME_LEN: usize = 2016;

/// The window must hold a full frame plus the start of the next one after carry-over.
pub const MIN_WINDOW_CAPACITY: usize = 2 * MAX_FRAME_LEN;

/// Frames timed before a constant bit rate stream is extrapolated.
pub const DEFAULT_CBR_PROBE_FRAMES: u32 = 25;
