//! Streaming MPEG audio decoding.
//!
//! The pipeline turns an un-indexed stream of compressed bytes into interleaved,
//! normalized samples without ever holding the whole stream in memory:
//!
//! - [`ByteWindow`] buffers the compressed bytes and carries unconsumed bytes over refills.
//! - [`FrameSynchronizer`] finds frame headers and skips ID3 tags and garbage.
//! - [`DurationEstimator`] works out the total length once, before decoding.
//! - The sample extractor converts each decoded [`SynthBlock`] into float samples.
//! - [`MpegDecodeSession`] ties them together behind `start`, `decode` and `finish`.
//!
//! The bit-level work is done by a [`FrameDecoder`], by default [`SymphoniaFrameDecoder`].
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use mpegstream::decoder::MpegDecodeSession;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = MpegDecodeSession::new();
//!     let info = session.start(File::open("music.mp3")?)?;
//!
//!     let mut samples = vec![0.0; 4096 * info.channels as usize];
//!     loop {
//!         let written = session.decode(samples.len(), &mut samples)?;
//!         if written == 0 {
//!             break;
//!         }
//!         // use samples[..written]
//!     }
//!     Ok(())
//! }
//! ```

use std::io;
use std::sync::Arc;

mod builder;
mod duration;
mod engine;
mod extract;
mod header;
mod session;
mod stream;
mod sync;
mod synth;
mod window;

#[cfg(test)]
pub(crate) mod fixtures;

pub use builder::{SessionBuilder, Settings};
pub use duration::{read_xing_frame_count, DurationEstimate, DurationEstimator};
pub use engine::{FrameDecoder, StreamError, SymphoniaFrameDecoder};
pub use header::{decode_header, is_sync_word, ChannelMode, FrameHeader, Layer, MpegVersion};
pub use session::{MpegDecodeSession, SessionState, StreamInfo};
pub use sync::{probe_tag, FrameSynchronizer, IdTagSpan, TagKind, TagProbe};
pub use synth::{fixed_to_f32, Fixed, SynthBlock, FIXED_ONE};
pub use window::ByteWindow;

/// Errors that end a decode session.
///
/// Flow control inside the pipeline (underruns, damaged frames, tags) never shows up here.
/// Once a session has returned one of the stream errors it stays in
/// [`SessionState::Failed`].
#[derive(Debug, thiserror::Error, Clone)]
pub enum DecoderError {
    /// The byte source failed for a reason other than end of stream.
    #[error("Reading the byte source failed")]
    SourceIo(#[source] Arc<io::Error>),

    /// The source ended (or the scan limit was hit) before any frame was found.
    #[error("No valid MPEG audio frame found")]
    NoValidFrameFound,

    /// The decode engine gave up on a frame and cannot continue.
    #[error("Unrecoverable frame error: {0}")]
    UnrecoverableFrame(&'static str),

    /// The output buffer could not be grown.
    #[error("Could not allocate room for {requested} samples")]
    OutOfMemory { requested: usize },

    /// `decode` was called before `start`.
    #[error("The session has not been started")]
    NotStarted,

    /// `start` was called on a session that is already running.
    #[error("The session has already been started")]
    AlreadyStarted,

    /// The session has been closed.
    #[error("The session is closed")]
    Closed,

    /// The session failed earlier and cannot be used any more.
    #[error("The session failed earlier")]
    Failed,

    /// MPEG audio is decode only.
    #[error("MPEG audio can only be opened for reading")]
    UnsupportedMode,
}

impl From<io::Error> for DecoderError {
    fn from(err: io::Error) -> Self {
        DecoderError::SourceIo(Arc::new(err))
    }
}

/// A fatal error that interrupted `decode` after `written` samples.
///
/// The samples written before the error are valid.
#[derive(Debug, thiserror::Error, Clone)]
#[error("Decoding stopped after {written} samples")]
pub struct PartialDecode {
    pub written: usize,
    #[source]
    pub cause: DecoderError,
}

impl From<DecoderError> for PartialDecode {
    fn from(cause: DecoderError) -> Self {
        PartialDecode { written: 0, cause }
    }
}

impl From<PartialDecode> for DecoderError {
    fn from(partial: PartialDecode) -> Self {
        partial.cause
    }
}
