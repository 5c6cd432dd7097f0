//! The decode engine seam.
//!
//! Everything bit-level (Huffman decoding, requantization, the synthesis filterbank) is
//! delegated to a [`FrameDecoder`]. The pipeline hands it one complete compressed frame at
//! a time and collects the synthesized, still fixed-point PCM in a [`SynthBlock`].
//!
//! [`SymphoniaFrameDecoder`] is the production engine. It feeds each frame to symphonia's
//! MPEG audio codec as a single packet, so the codec keeps its bit reservoir across
//! frames exactly as it would behind symphonia's own demuxer.

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{
    CodecParameters, CodecType, Decoder, DecoderOptions, CODEC_TYPE_MP1, CODEC_TYPE_MP2,
    CODEC_TYPE_MP3,
};
use symphonia::core::errors::Error;
use symphonia::core::formats::Packet;

use super::header::{FrameHeader, Layer};
use super::synth::{fixed_from_f32, SynthBlock};

/// Status reported by the header and frame primitives.
///
/// These are flow control, not failures: only [`StreamError::Unrecoverable`] ever reaches
/// the caller, as [`DecoderError::UnrecoverableFrame`](super::DecoderError). The type is
/// `Copy` and carries static messages only, so the per-frame loop never allocates for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamError {
    /// Not enough bytes in the window to go on. Refill and retry.
    BufferUnderrun,
    /// No frame header at the current position.
    LostSync,
    /// Something looked like a frame header but holds reserved or unsupported values.
    BadHeader(&'static str),
    /// The frame is damaged. Skip it and resynchronize.
    Recoverable(&'static str),
    /// Decoding cannot go on.
    Unrecoverable(&'static str),
}

/// Reconstructs PCM from complete compressed frames.
///
/// Implementations keep whatever state spans frames (such as the Layer III bit
/// reservoir) and must accept frames in stream order.
pub trait FrameDecoder {
    /// Decodes `frame`, which holds exactly `header.frame_len()` bytes starting with the
    /// header.
    fn decode_frame(&mut self, header: &FrameHeader, frame: &[u8]) -> Result<(), StreamError>;

    /// Writes the PCM of the last successfully decoded frame into `block` and rewinds the
    /// block's cursor.
    fn synth_frame(&mut self, block: &mut SynthBlock);

    /// Drops all inter-frame state.
    fn reset(&mut self);
}

/// [`FrameDecoder`] backed by symphonia's MPEG-1/2/2.5 audio codec.
#[derive(Default)]
pub struct SymphoniaFrameDecoder {
    codec: Option<(Layer, Box<dyn Decoder>)>,
    /// Interleaved output of the last decoded frame.
    pcm: Option<SampleBuffer<f32>>,
    channels: usize,
    ts: u64,
}

impl SymphoniaFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameDecoder for SymphoniaFrameDecoder {
    fn decode_frame(&mut self, header: &FrameHeader, frame: &[u8]) -> Result<(), StreamError> {
        let Self {
            codec,
            pcm,
            channels,
            ts,
        } = self;
        let decoder = codec_for(codec, header.layer)?;

        let packet = Packet::new_from_slice(0, *ts, header.samples_per_frame() as u64, frame);
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let frames = decoded.frames();
                *channels = spec.channels.count();
                let needed = frames * *channels;
                if !matches!(pcm, Some(buffer) if buffer.capacity() >= needed) {
                    *pcm = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buffer) = pcm.as_mut() {
                    buffer.copy_interleaved_ref(decoded);
                }
                *ts += frames as u64;
                Ok(())
            }
            Err(e) => {
                *pcm = None;
                Err(classify(e, decoder))
            }
        }
    }

    fn synth_frame(&mut self, block: &mut SynthBlock) {
        let channels = self.channels;
        let Some(pcm) = self.pcm.as_ref().filter(|_| channels > 0) else {
            block.reset(0, 0);
            return;
        };
        let samples = pcm.samples();
        block.reset(channels, samples.len() / channels);
        for ch in 0..channels {
            let interleaved = samples.iter().skip(ch).step_by(channels);
            for (dst, &src) in block.channel_mut(ch).iter_mut().zip(interleaved) {
                *dst = fixed_from_f32(src);
            }
        }
    }

    fn reset(&mut self) {
        self.codec = None;
        self.pcm = None;
        self.channels = 0;
        self.ts = 0;
    }
}

/// Returns the codec for `layer`, creating it on first use or when the layer changes.
fn codec_for(
    codec: &mut Option<(Layer, Box<dyn Decoder>)>,
    layer: Layer,
) -> Result<&mut Box<dyn Decoder>, StreamError> {
    if !matches!(codec, Some((current, _)) if *current == layer) {
        let codec_type: CodecType = match layer {
            Layer::I => CODEC_TYPE_MP1,
            Layer::II => CODEC_TYPE_MP2,
            Layer::III => CODEC_TYPE_MP3,
        };
        let mut params = CodecParameters::new();
        params.for_codec(codec_type);
        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|_| StreamError::Unrecoverable("no codec for this MPEG audio layer"))?;
        *codec = Some((layer, decoder));
    }
    match codec {
        Some((_, decoder)) => Ok(decoder),
        None => Err(StreamError::Unrecoverable("no codec for this MPEG audio layer")),
    }
}

fn classify(error: Error, decoder: &mut Box<dyn Decoder>) -> StreamError {
    match error {
        Error::DecodeError(msg) => StreamError::Recoverable(msg),
        // a packet that ends early is a damaged frame, not a failing source
        Error::IoError(_) => StreamError::Recoverable("truncated frame data"),
        Error::ResetRequired => {
            decoder.reset();
            StreamError::Recoverable("decoder reset")
        }
        Error::Unsupported(msg) | Error::LimitError(msg) => StreamError::Unrecoverable(msg),
        Error::SeekError(_) => StreamError::Unrecoverable("unexpected seek error"),
    }
}
