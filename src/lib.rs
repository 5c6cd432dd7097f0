//! Streaming MPEG audio decoding.
//!
//! This crate turns an MPEG-1/2/2.5 audio stream (MP3, and its Layer I and II siblings)
//! into interleaved `f32` samples, pulling compressed bytes from any [`ByteSource`] as
//! needed. The stream is never held in memory as a whole.
//!
//! The core is [`MpegDecodeSession`](decoder::MpegDecodeSession):
//!
//! ```no_run
//! use std::fs::File;
//! use mpegstream::decoder::MpegDecodeSession;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = MpegDecodeSession::new();
//!     let info = session.start(File::open("music.mp3")?)?;
//!     println!(
//!         "{} Hz, {} channels, about {:?} samples per channel",
//!         info.sample_rate, info.channels, info.estimated_frame_count
//!     );
//!
//!     let mut samples = vec![0.0; 8192];
//!     let written = session.decode(samples.len(), &mut samples)?;
//!     println!("decoded {written} samples");
//!     Ok(())
//! }
//! ```
//!
//! To decode a whole file at once, use [`MpegFile`] with an [`AudioBuffer`].
//!
//! # Features
//!
//! - `tracing`: log tag skips, resynchronization, duration estimation and failures
//!   through the `tracing` crate.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod buffer;
mod common;
mod constants;
mod file;
mod math;
mod source;

pub mod decoder;

pub use crate::buffer::AudioBuffer;
pub use crate::common::{ChannelCount, Sample, SampleRate};
pub use crate::constants::{DEFAULT_WINDOW_CAPACITY, MAX_FRAME_LEN, MIN_WINDOW_CAPACITY};
pub use crate::decoder::{DecoderError, MpegDecodeSession, PartialDecode};
pub use crate::file::{AudioFile, MpegFile, OpenMode};
pub use crate::math::StreamTime;
pub use crate::source::{ByteSource, ReadSeekSource};
