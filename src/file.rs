//! Whole-file access to MPEG audio.
//!
//! [`AudioFile`] is the set of operations a file format offers: open, load, store and
//! close. [`MpegFile`] implements it on top of a [`MpegDecodeSession`]. MPEG audio is
//! decode only, so `store` and opening for writing fail.

use std::fs::File;
use std::path::Path;

use crate::buffer::AudioBuffer;
use crate::decoder::{DecoderError, MpegDecodeSession, SessionBuilder, StreamInfo};

/// Frame positions decoded per step once the estimate is used up.
const LOAD_CHUNK_FRAMES: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

/// Operations on an audio file.
pub trait AudioFile {
    /// Opens the file at `path`, closing any file opened before.
    fn open(&mut self, path: &Path, mode: OpenMode) -> Result<(), DecoderError>;

    /// Decodes the whole file into `buffer`, replacing its contents.
    ///
    /// On error `buffer` is left empty.
    fn load(&mut self, buffer: &mut AudioBuffer) -> Result<(), DecoderError>;

    /// Encodes `buffer` into the file.
    fn store(&mut self, buffer: &AudioBuffer) -> Result<(), DecoderError>;

    /// Closes the file. Does nothing if no file is open.
    fn close(&mut self);
}

/// An MPEG audio file, read only.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use mpegstream::{AudioBuffer, AudioFile, MpegFile, OpenMode};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut file = MpegFile::new();
///     file.open(Path::new("music.mp3"), OpenMode::Read)?;
///
///     let mut buffer = AudioBuffer::default();
///     file.load(&mut buffer)?;
///     println!("{:?}", buffer.duration());
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct MpegFile {
    builder: SessionBuilder,
    session: Option<MpegDecodeSession<File>>,
}

impl MpegFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `builder` to configure the sessions of files opened later.
    pub fn with_builder(builder: SessionBuilder) -> Self {
        MpegFile {
            builder,
            session: None,
        }
    }

    #[inline]
    pub fn is_opened(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the open file is a regular file, which can be reread to estimate its
    /// duration. Pipes and devices are not.
    #[inline]
    pub fn is_seekable(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.is_seekable())
    }

    /// Stream properties of the open file.
    pub fn info(&self) -> Option<&StreamInfo> {
        self.session.as_ref().and_then(|session| session.info())
    }

    /// Length of the open file in seconds.
    ///
    /// Estimated until the file has been loaded, exact afterwards.
    pub fn duration_secs(&self) -> Option<f64> {
        let session = self.session.as_ref()?;
        let frames = session.estimated_frame_count()?;
        let rate = session.sample_rate()?;
        Some(frames as f64 / rate as f64)
    }

    fn load_into(
        session: &mut MpegDecodeSession<File>,
        buffer: &mut AudioBuffer,
    ) -> Result<(), DecoderError> {
        let channels = session.channels().unwrap_or(1).max(1) as usize;
        let chunk = LOAD_CHUNK_FRAMES * channels;

        let mut requested = match session.estimated_frame_count() {
            Some(frames) => usize::try_from(frames)
                .ok()
                .and_then(|frames| frames.checked_mul(channels))
                .unwrap_or(chunk),
            None => chunk,
        };
        // the estimate may be short, so keep going until a call comes back short
        while session.decode_into(requested, buffer)? == requested {
            requested = chunk;
        }
        Ok(())
    }
}

impl AudioFile for MpegFile {
    fn open(&mut self, path: &Path, mode: OpenMode) -> Result<(), DecoderError> {
        self.close();
        if mode != OpenMode::Read {
            return Err(DecoderError::UnsupportedMode);
        }

        let file = File::open(path)?;
        let mut session = self.builder.clone().build();
        session.start(file)?;
        self.session = Some(session);
        Ok(())
    }

    fn load(&mut self, buffer: &mut AudioBuffer) -> Result<(), DecoderError> {
        buffer.clear();
        let Some(session) = self.session.as_mut() else {
            return Err(DecoderError::NotStarted);
        };

        let result = Self::load_into(session, buffer);
        if let Err(_err) = &result {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "loading MPEG file failed");
            buffer.clear();
        }
        result
    }

    fn store(&mut self, _buffer: &AudioBuffer) -> Result<(), DecoderError> {
        Err(DecoderError::UnsupportedMode)
    }

    fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}
