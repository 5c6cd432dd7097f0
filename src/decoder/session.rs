use std::time::Duration;

use crate::buffer::AudioBuffer;
use crate::common::{ChannelCount, Sample, SampleRate};
use crate::math::to_duration;
use crate::source::ByteSource;

use super::builder::{SessionBuilder, Settings};
use super::duration::{read_xing_frame_count, DurationEstimate};
use super::engine::{FrameDecoder, SymphoniaFrameDecoder};
use super::extract::SampleExtractor;
use super::stream::FrameStream;
use super::sync::FrameSynchronizer;
use super::window::ByteWindow;
use super::{DecoderError, PartialDecode};

/// Lifecycle of a [`MpegDecodeSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, `start` not called yet.
    Uninitialized,
    /// Looking for the first frame.
    Synchronizing,
    /// Format known, waiting for `decode`.
    Started,
    /// Inside `decode`.
    Decoding,
    /// Released. Terminal.
    Closed,
    /// A fatal error occurred. Terminal until closed.
    Failed,
}

/// Stream properties known once a session has started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: SampleRate,
    pub channels: ChannelCount,
    /// Samples per channel according to the duration estimate.
    pub estimated_frame_count: Option<u64>,
    pub estimate: DurationEstimate,
}

/// A pull-based decoder for one MPEG audio stream.
///
/// The session owns its byte source from `start` until `finish` or `close`. It is meant to
/// be driven from one thread; nothing inside it blocks other than reads from the source.
pub struct MpegDecodeSession<S, D = SymphoniaFrameDecoder> {
    settings: Settings,
    engine: D,
    stream: Option<FrameStream<S>>,
    extractor: SampleExtractor,
    state: SessionState,
    info: Option<StreamInfo>,
    /// Samples per channel actually decoded, once the stream has ended.
    decoded_total: Option<u64>,
}

impl<S: ByteSource> MpegDecodeSession<S> {
    /// Creates a session with default settings that decodes with symphonia.
    pub fn new() -> Self {
        Self::with_settings(Settings::default(), SymphoniaFrameDecoder::new())
    }
}

impl<S: ByteSource> Default for MpegDecodeSession<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl MpegDecodeSession<std::fs::File> {
    /// Creates a builder to configure a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }
}

impl<S: ByteSource, D: FrameDecoder> MpegDecodeSession<S, D> {
    /// Creates a session with default settings around `engine`.
    pub fn with_engine(engine: D) -> Self {
        Self::with_settings(Settings::default(), engine)
    }

    pub(crate) fn with_settings(settings: Settings, engine: D) -> Self {
        MpegDecodeSession {
            settings,
            engine,
            stream: None,
            extractor: SampleExtractor::new(),
            state: SessionState::Uninitialized,
            info: None,
            decoded_total: None,
        }
    }

    /// Takes ownership of `source`, finds the first frame and estimates the duration.
    ///
    /// Decoding starts at the current position of `source`. Tags and garbage in front of
    /// the first frame are skipped.
    ///
    /// # Errors
    ///
    /// [`DecoderError::NoValidFrameFound`] if the source holds no frame, or
    /// [`DecoderError::SourceIo`] if reading fails. Both leave the session
    /// [`Failed`](SessionState::Failed). Calling `start` twice is an error that does not
    /// affect the running session.
    pub fn start(&mut self, source: S) -> Result<StreamInfo, DecoderError> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Closed => return Err(DecoderError::Closed),
            SessionState::Failed => return Err(DecoderError::Failed),
            _ => return Err(DecoderError::AlreadyStarted),
        }

        self.state = SessionState::Synchronizing;
        match self.synchronize(source) {
            Ok(info) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(?info, "session started");
                self.state = SessionState::Started;
                Ok(info)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn synchronize(&mut self, mut source: S) -> Result<StreamInfo, DecoderError> {
        let origin = if source.is_seekable() {
            source.stream_position()?
        } else {
            0
        };

        let window = ByteWindow::with_capacity(self.settings.window_capacity);
        let sync = FrameSynchronizer::new().with_max_scan(self.settings.max_sync_scan);
        let mut stream = FrameStream::new(source, window, sync);
        let header = stream
            .first_header()?
            .ok_or(DecoderError::NoValidFrameFound)?;

        let estimate = if let Some(frames) =
            read_xing_frame_count(&header, stream.current_frame(&header))
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(frames, "found Xing header");
            // an information frame, not audio
            stream.skip_frame(&header);
            DurationEstimate::Exact {
                frames: frames as u64,
                samples_per_frame: header.samples_per_frame(),
            }
        } else if self.settings.estimate_duration {
            self.settings.estimator().estimate(&mut stream.source, origin)?
        } else {
            DurationEstimate::Unknown
        };

        let info = StreamInfo {
            sample_rate: header.sample_rate,
            channels: header.channels(),
            estimated_frame_count: estimate.frame_count(header.sample_rate),
            estimate,
        };
        self.stream = Some(stream);
        self.info = Some(info);
        Ok(info)
    }

    /// Decodes up to `requested` interleaved samples into `out`.
    ///
    /// Returns the number of samples written. That is never more than `requested` or
    /// `out.len()`, always a multiple of the channel count, and less than requested only
    /// at end of stream. After the end every call returns `Ok(0)`.
    ///
    /// # Errors
    ///
    /// On a fatal error the session fails and the error carries the number of samples
    /// written before it, which are valid.
    pub fn decode(&mut self, requested: usize, out: &mut [Sample]) -> Result<usize, PartialDecode> {
        self.ensure_started()?;
        let Some(stream) = self.stream.as_mut() else {
            return Err(DecoderError::NotStarted.into());
        };

        self.state = SessionState::Decoding;
        let result = self
            .extractor
            .pull(requested, out, stream, &mut self.engine);
        if stream.ended && self.decoded_total.is_none() {
            #[cfg(feature = "tracing")]
            tracing::debug!(frames = stream.decoded_frames, "end of stream");
            self.decoded_total = Some(stream.decoded_frames);
        }

        match result {
            Ok(written) => {
                self.state = SessionState::Started;
                Ok(written)
            }
            Err(partial) => Err(PartialDecode {
                written: partial.written,
                cause: self.fail(partial.cause),
            }),
        }
    }

    /// Decodes up to `requested` samples and appends them to `buffer`, setting its sample
    /// rate and channel count.
    ///
    /// # Errors
    ///
    /// As [`decode`](Self::decode). If `buffer` cannot grow it is emptied and the session
    /// fails with [`DecoderError::OutOfMemory`].
    pub fn decode_into(
        &mut self,
        requested: usize,
        buffer: &mut AudioBuffer,
    ) -> Result<usize, PartialDecode> {
        self.ensure_started()?;
        let Some(info) = self.info else {
            return Err(DecoderError::NotStarted.into());
        };
        buffer.set_sample_rate(info.sample_rate);
        buffer.set_num_channels(info.channels);

        let start = buffer.len();
        if let Err(err) = buffer.try_resize(start.saturating_add(requested)) {
            return Err(self.fail(err).into());
        }
        let result = self.decode(requested, &mut buffer.as_mut_slice()[start..]);
        let written = match &result {
            Ok(written) => *written,
            Err(partial) => partial.written,
        };
        buffer.truncate(start + written);
        result
    }

    /// Releases the engine state and hands back the byte source.
    ///
    /// The session is closed afterwards; the frame count and stream info stay readable.
    pub fn finish(&mut self) -> Option<S> {
        self.engine.reset();
        self.extractor.clear();
        self.state = SessionState::Closed;
        self.stream.take().map(|stream| stream.source)
    }

    /// Releases everything, including the byte source. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(state = ?self.state, "closing session");
        drop(self.finish());
    }

    /// Whether the byte source of a running session can be rewound and read again.
    pub fn is_seekable(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|stream| stream.source.is_seekable())
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Stream properties, once started.
    #[inline]
    pub fn info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }

    #[inline]
    pub fn sample_rate(&self) -> Option<SampleRate> {
        self.info.map(|info| info.sample_rate)
    }

    #[inline]
    pub fn channels(&self) -> Option<ChannelCount> {
        self.info.map(|info| info.channels)
    }

    /// Samples per channel in the stream.
    ///
    /// Until the stream has been decoded to its end this is the estimate from `start`;
    /// afterwards it is the number of samples actually decoded.
    pub fn estimated_frame_count(&self) -> Option<u64> {
        self.decoded_total
            .or_else(|| self.info.and_then(|info| info.estimated_frame_count))
    }

    /// The duration estimate made by `start`.
    pub fn duration_estimate(&self) -> Option<DurationEstimate> {
        self.info.map(|info| info.estimate)
    }

    /// Playing time of the frames decoded so far.
    pub fn elapsed(&self) -> Duration {
        self.stream
            .as_ref()
            .map_or(Duration::ZERO, |stream| to_duration(stream.elapsed))
    }

    fn ensure_started(&self) -> Result<(), DecoderError> {
        match self.state {
            SessionState::Started | SessionState::Decoding => Ok(()),
            SessionState::Uninitialized | SessionState::Synchronizing => {
                Err(DecoderError::NotStarted)
            }
            SessionState::Closed => Err(DecoderError::Closed),
            SessionState::Failed => Err(DecoderError::Failed),
        }
    }

    fn fail(&mut self, err: DecoderError) -> DecoderError {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %err, state = ?self.state, "decode session failed");
        self.state = SessionState::Failed;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::fixtures::{
        cbr_frame, cbr_stream, frame, id3v2_tag, ramp_f32, xing_frame, RampEngine,
        SAMPLES_PER_FRAME, UNRECOVERABLE_MARK,
    };
    use crate::source::ReadSeekSource;
    use std::io::{self, Cursor, Read, Seek, SeekFrom};

    type TestSession = MpegDecodeSession<Cursor<Vec<u8>>, RampEngine>;

    fn session() -> TestSession {
        MpegDecodeSession::with_engine(RampEngine::default())
    }

    #[test]
    fn start_reports_format_and_estimate() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Uninitialized);

        let mut data = id3v2_tag(500, false);
        data.extend(cbr_stream(30));
        let info = session.start(Cursor::new(data)).unwrap();

        assert_eq!(session.state(), SessionState::Started);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(session.sample_rate(), Some(44100));
        assert_eq!(session.channels(), Some(2));
        let estimate = info.estimated_frame_count.unwrap() as f64;
        assert!((estimate - 30.0 * 1152.0).abs() < 30.0 * 1152.0 * 0.02);
    }

    #[test]
    fn xing_header_gives_exact_count_and_is_not_audio() {
        let mut data = xing_frame(4);
        data.extend(cbr_stream(4));
        let mut session = session();
        let info = session.start(Cursor::new(data)).unwrap();
        assert_eq!(info.estimated_frame_count, Some(4 * 1152));
        assert!(info.estimate.is_exact());

        let mut out = vec![0.0; 10 * 2 * SAMPLES_PER_FRAME];
        let written = session.decode(out.len(), &mut out).unwrap();
        assert_eq!(written, 4 * 2 * SAMPLES_PER_FRAME);
        assert_eq!(session.estimated_frame_count(), Some(4 * 1152));
    }

    #[test]
    fn decodes_whole_stream_in_pieces() {
        let mut session = session();
        session.start(Cursor::new(cbr_stream(3))).unwrap();

        let mut decoded = Vec::new();
        let mut out = vec![0.0; 1001];
        loop {
            let written = session.decode(out.len(), &mut out).unwrap();
            assert_eq!(written % 2, 0);
            if written == 0 {
                break;
            }
            decoded.extend_from_slice(&out[..written]);
        }

        assert_eq!(decoded.len(), 3 * 2 * SAMPLES_PER_FRAME);
        for (frame, chunk) in decoded.chunks(2 * SAMPLES_PER_FRAME).enumerate() {
            assert_eq!(chunk[0], ramp_f32(frame as u8, 0, 0));
            assert_eq!(chunk[1], ramp_f32(frame as u8, 1, 0));
        }
        assert!(decoded.iter().all(|s| (-1.0..1.0).contains(s)));
        assert_eq!(session.state(), SessionState::Started);
    }

    #[test]
    fn partial_result_at_end_of_stream() {
        let mut session = session();
        session.start(Cursor::new(cbr_stream(2))).unwrap();

        let mut out = vec![0.0; 5 * 2 * SAMPLES_PER_FRAME];
        let written = session.decode(out.len(), &mut out).unwrap();
        assert_eq!(written, 2 * 2 * SAMPLES_PER_FRAME);
        assert_eq!(session.decode(out.len(), &mut out).unwrap(), 0);
        assert_eq!(session.estimated_frame_count(), Some(2 * 1152));
        assert_eq!(session.elapsed(), to_duration(crate::math::frame_time(2304, 44100)));
    }

    #[test]
    fn never_writes_more_than_requested() {
        let mut session = session();
        session.start(Cursor::new(cbr_stream(2))).unwrap();

        let mut out = vec![7.0; 100];
        assert_eq!(session.decode(11, &mut out).unwrap(), 10);
        assert!(out[10..].iter().all(|&s| s == 7.0));
    }

    #[test]
    fn unrecoverable_frame_fails_with_partial_result() {
        let mut data = cbr_frame(0);
        data.extend(cbr_frame(UNRECOVERABLE_MARK));
        data.extend(cbr_frame(2));
        let mut session = session();
        session.start(Cursor::new(data)).unwrap();

        let mut out = vec![0.0; 3 * 2 * SAMPLES_PER_FRAME];
        let err = session.decode(out.len(), &mut out).unwrap_err();
        assert_eq!(err.written, 2 * SAMPLES_PER_FRAME);
        assert!(matches!(err.cause, DecoderError::UnrecoverableFrame(_)));
        assert_eq!(session.state(), SessionState::Failed);

        let err = session.decode(out.len(), &mut out).unwrap_err();
        assert!(matches!(err.cause, DecoderError::Failed));
    }

    #[test]
    fn frames_of_another_format_are_skipped() {
        let mut data = cbr_stream(2);
        // 48 kHz
        data.extend(frame([0xFF, 0xFB, 0x94, 0x00], 9));
        data.extend(cbr_frame(3));
        let mut session = session();
        session.start(Cursor::new(data)).unwrap();

        let mut out = vec![0.0; 10 * 2 * SAMPLES_PER_FRAME];
        let written = session.decode(out.len(), &mut out).unwrap();
        assert_eq!(written, 3 * 2 * SAMPLES_PER_FRAME);
        assert_eq!(out[2 * 2 * SAMPLES_PER_FRAME], ramp_f32(3, 0, 0));
    }

    #[test]
    fn no_frame_fails_start() {
        let mut session = session();
        let err = session.start(Cursor::new(vec![0u8; 10_000])).unwrap_err();
        assert!(matches!(err, DecoderError::NoValidFrameFound));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(
            session.start(Cursor::new(cbr_stream(2))),
            Err(DecoderError::Failed)
        ));
    }

    #[test]
    fn lifecycle_misuse() {
        let mut session = session();
        let mut out = [0.0; 4];
        assert!(matches!(
            session.decode(4, &mut out).unwrap_err().cause,
            DecoderError::NotStarted
        ));

        session.start(Cursor::new(cbr_stream(2))).unwrap();
        assert!(matches!(
            session.start(Cursor::new(cbr_stream(2))),
            Err(DecoderError::AlreadyStarted)
        ));
        assert_eq!(session.state(), SessionState::Started);

        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.decode(4, &mut out).unwrap_err().cause,
            DecoderError::Closed
        ));
    }

    #[test]
    fn finish_hands_back_the_source() {
        let mut session = session();
        session.start(Cursor::new(cbr_stream(2))).unwrap();
        let mut out = vec![0.0; 2 * SAMPLES_PER_FRAME];
        session.decode(out.len(), &mut out).unwrap();

        let source = session.finish().unwrap();
        assert_eq!(source.get_ref().len(), 2 * 417);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.sample_rate(), Some(44100));
        assert!(session.finish().is_none());
        assert_eq!(session.engine.resets, 2);

        session.close();
        assert_eq!(session.engine.resets, 2);
    }

    #[test]
    fn seekability_follows_the_source() {
        let mut session = session();
        assert!(!session.is_seekable());
        session.start(Cursor::new(cbr_stream(2))).unwrap();
        assert!(session.is_seekable());
        session.close();
        assert!(!session.is_seekable());

        let mut session = MpegDecodeSession::with_engine(RampEngine::default());
        session
            .start(ReadSeekSource::forward_only(Cursor::new(cbr_stream(2))))
            .unwrap();
        assert!(!session.is_seekable());
    }

    #[test]
    fn decode_into_appends() {
        let mut session = session();
        session.start(Cursor::new(cbr_stream(2))).unwrap();

        let mut buffer = AudioBuffer::new(1, 8000);
        assert_eq!(session.decode_into(1000, &mut buffer).unwrap(), 1000);
        assert_eq!(session.decode_into(10_000, &mut buffer).unwrap(), 4 * 1152 - 1000);
        assert_eq!(buffer.len(), 4 * 1152);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.sample_rate(), 44100);
    }

    #[test]
    fn out_of_memory_empties_buffer_and_fails() {
        let mut session = session();
        session.start(Cursor::new(cbr_stream(2))).unwrap();

        let mut buffer = AudioBuffer::from_samples(2, 44100, vec![0.5; 8]);
        let err = session.decode_into(usize::MAX / 2, &mut buffer).unwrap_err();
        assert!(matches!(err.cause, DecoderError::OutOfMemory { .. }));
        assert!(buffer.is_empty());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn estimation_can_be_disabled() {
        let mut session: TestSession = SessionBuilder::new()
            .with_duration_estimate(false)
            .build_with_engine(RampEngine::default());
        let info = session.start(Cursor::new(cbr_stream(30))).unwrap();
        assert_eq!(info.estimate, DurationEstimate::Unknown);
        assert_eq!(session.estimated_frame_count(), None);
    }

    /// Fails every read after the first `good` bytes.
    struct FailAfter {
        inner: Cursor<Vec<u8>>,
        good: u64,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= self.good {
                return Err(io::Error::new(io::ErrorKind::Other, "medium error"));
            }
            let left = (self.good - self.inner.position()) as usize;
            let n = buf.len().min(left);
            self.inner.read(&mut buf[..n])
        }
    }

    impl Seek for FailAfter {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn source_failure_during_start_is_fatal() {
        let source = ReadSeekSource::forward_only(FailAfter {
            inner: Cursor::new(cbr_stream(10)),
            good: 0,
        });
        let mut session = MpegDecodeSession::with_engine(RampEngine::default());
        let err = session.start(source).unwrap_err();
        assert!(matches!(err, DecoderError::SourceIo(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.info().is_none());

        let mut out = [0.0; 4];
        assert!(matches!(
            session.decode(out.len(), &mut out).unwrap_err().cause,
            DecoderError::Failed
        ));
    }

    #[test]
    fn source_failure_is_fatal() {
        let source = ReadSeekSource::forward_only(FailAfter {
            inner: Cursor::new(cbr_stream(40)),
            good: 9000,
        });
        let mut session = MpegDecodeSession::with_engine(RampEngine::default());
        session.start(source).unwrap();

        let mut out = vec![0.0; 100 * 2 * SAMPLES_PER_FRAME];
        let err = session.decode(out.len(), &mut out).unwrap_err();
        assert!(matches!(err.cause, DecoderError::SourceIo(_)));
        assert_eq!(err.written % (2 * SAMPLES_PER_FRAME), 0);
        assert!(err.written > 0);
        assert_eq!(session.state(), SessionState::Failed);
    }
}
