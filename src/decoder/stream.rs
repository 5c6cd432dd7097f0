use crate::common::{ChannelCount, SampleRate};
use crate::math::{zero_time, StreamTime};
use crate::source::ByteSource;

use super::engine::{FrameDecoder, StreamError};
use super::header::FrameHeader;
use super::synth::SynthBlock;
use super::sync::FrameSynchronizer;
use super::window::ByteWindow;
use super::DecoderError;

/// The compressed side of a session: the byte source, its window and the synchronizer.
///
/// Produces one [`SynthBlock`] per successfully decoded frame and hides underruns,
/// tags and damaged frames from its caller.
pub(crate) struct FrameStream<S> {
    pub(crate) source: S,
    pub(crate) window: ByteWindow,
    pub(crate) sync: FrameSynchronizer,
    /// Format of the first frame. Frames that disagree are taken for false syncs.
    format: Option<(SampleRate, ChannelCount)>,
    /// Playing time of all frames decoded so far.
    pub(crate) elapsed: StreamTime,
    /// Samples per channel of all frames decoded so far.
    pub(crate) decoded_frames: u64,
    pub(crate) ended: bool,
}

impl<S: ByteSource> FrameStream<S> {
    pub(crate) fn new(source: S, window: ByteWindow, sync: FrameSynchronizer) -> Self {
        FrameStream {
            source,
            window,
            sync,
            format: None,
            elapsed: zero_time(),
            decoded_frames: 0,
            ended: false,
        }
    }

    /// Finds the first frame and fixes the stream format from its header. The frame is
    /// left in the window.
    pub(crate) fn first_header(&mut self) -> Result<Option<FrameHeader>, DecoderError> {
        let header = self.sync.next_header(&mut self.window, &mut self.source)?;
        if let Some(header) = header {
            self.format = Some((header.sample_rate, header.channels()));
        }
        Ok(header)
    }

    /// The bytes of the frame at the front of the window.
    pub(crate) fn current_frame(&self, header: &FrameHeader) -> &[u8] {
        &self.window.unconsumed()[..header.frame_len()]
    }

    /// Drops the frame at the front of the window without decoding it.
    pub(crate) fn skip_frame(&mut self, header: &FrameHeader) {
        self.window.consume(header.frame_len());
    }

    /// Decodes the next frame into `block`. Returns `false` at end of stream.
    pub(crate) fn next_block<D: FrameDecoder>(
        &mut self,
        engine: &mut D,
        block: &mut SynthBlock,
    ) -> Result<bool, DecoderError> {
        if self.ended {
            return Ok(false);
        }
        loop {
            let Some(header) = self.sync.next_header(&mut self.window, &mut self.source)? else {
                self.ended = true;
                return Ok(false);
            };

            if self
                .format
                .is_some_and(|format| format != (header.sample_rate, header.channels()))
            {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    offset = self.window.position(),
                    "frame format differs from stream, resynchronizing"
                );
                self.sync.lose_sync();
                self.window.consume(1);
                continue;
            }

            let len = header.frame_len();
            match engine.decode_frame(&header, &self.window.unconsumed()[..len]) {
                Ok(()) => {
                    self.window.consume(len);
                    engine.synth_frame(block);
                    self.elapsed += header.duration();
                    self.decoded_frames += block.len() as u64;
                    return Ok(true);
                }
                Err(StreamError::BufferUnderrun) => {
                    if self.window.refill(&mut self.source)? == 0 {
                        self.ended = true;
                        return Ok(false);
                    }
                }
                Err(StreamError::Unrecoverable(reason)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(reason, offset = self.window.position(), "unrecoverable frame");
                    return Err(DecoderError::UnrecoverableFrame(reason));
                }
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(error = ?_err, offset = self.window.position(), "skipping damaged frame");
                    self.window.consume(len);
                    self.sync.lose_sync();
                }
            }
        }
    }
}
