//! Synthetic streams and a deterministic engine for the unit tests.

use super::engine::{FrameDecoder, StreamError};
use super::header::FrameHeader;
use super::synth::{fixed_to_f32, Fixed, SynthBlock, FIXED_ONE};
use crate::common::Sample;

/// MPEG-1 Layer III, 128 kb/s, 44.1 kHz, stereo, no CRC, no padding.
pub(crate) const CBR_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
pub(crate) const FRAME_LEN: usize = 417;
pub(crate) const SAMPLES_PER_FRAME: usize = 1152;

/// Last byte of a frame that makes [`RampEngine`] report a damaged frame.
pub(crate) const RECOVERABLE_MARK: u8 = 0x7E;
/// Last byte of a frame that makes [`RampEngine`] give up.
pub(crate) const UNRECOVERABLE_MARK: u8 = 0x7D;

/// A silent frame with `header`, tagged with `seed` in its last byte.
pub(crate) fn frame(header: [u8; 4], seed: u8) -> Vec<u8> {
    let len = FrameHeader::parse(header).unwrap().frame_len();
    let mut frame = vec![0; len];
    frame[..4].copy_from_slice(&header);
    frame[len - 1] = seed;
    frame
}

pub(crate) fn cbr_frame(seed: u8) -> Vec<u8> {
    frame(CBR_HEADER, seed)
}

pub(crate) fn cbr_stream(frames: u8) -> Vec<u8> {
    (0..frames).flat_map(cbr_frame).collect()
}

/// A CBR frame whose ancillary data holds a Xing header announcing `frames` frames.
pub(crate) fn xing_frame(frames: u32) -> Vec<u8> {
    let mut frame = cbr_frame(0);
    let at = FrameHeader::parse(CBR_HEADER).unwrap().ancillary_offset();
    frame[at..at + 4].copy_from_slice(b"Xing");
    frame[at + 4..at + 8].copy_from_slice(&1u32.to_be_bytes());
    frame[at + 8..at + 12].copy_from_slice(&frames.to_be_bytes());
    frame
}

/// An ID3v2.4 tag with a `size` byte body and an optional footer.
pub(crate) fn id3v2_tag(size: usize, footer: bool) -> Vec<u8> {
    let synchsafe = [
        (size >> 21) as u8 & 0x7F,
        (size >> 14) as u8 & 0x7F,
        (size >> 7) as u8 & 0x7F,
        size as u8 & 0x7F,
    ];
    let flags = if footer { 0x10 } else { 0 };

    let mut tag = vec![b'I', b'D', b'3', 4, 0, flags];
    tag.extend_from_slice(&synchsafe);
    tag.resize(10 + size, b'a');
    if footer {
        tag.extend_from_slice(&[b'3', b'D', b'I', 4, 0, flags]);
        tag.extend_from_slice(&synchsafe);
    }
    tag
}

/// The sample [`RampEngine`] produces at position `i` of `channel` in a frame seeded
/// with `seed`. The ramp overshoots full scale at both ends.
pub(crate) fn ramp(seed: u8, channel: usize, i: usize) -> Fixed {
    let base = (i as i64 - 576) * FIXED_ONE as i64 / 400 + seed as i64 * 4096;
    let value = if channel == 0 { base } else { -base };
    value as Fixed
}

pub(crate) fn ramp_f32(seed: u8, channel: usize, i: usize) -> Sample {
    fixed_to_f32(ramp(seed, channel, i))
}

/// Engine that synthesizes a ramp from the frame's seed byte instead of decoding.
#[derive(Default)]
pub(crate) struct RampEngine {
    last: Option<(usize, usize, u8)>,
    pub(crate) decoded: usize,
    pub(crate) resets: usize,
}

impl FrameDecoder for RampEngine {
    fn decode_frame(&mut self, header: &FrameHeader, frame: &[u8]) -> Result<(), StreamError> {
        assert_eq!(frame.len(), header.frame_len());
        match frame[frame.len() - 1] {
            RECOVERABLE_MARK => Err(StreamError::Recoverable("marked as damaged")),
            UNRECOVERABLE_MARK => Err(StreamError::Unrecoverable("marked as fatal")),
            seed => {
                self.last = Some((
                    header.channels() as usize,
                    header.samples_per_frame() as usize,
                    seed,
                ));
                self.decoded += 1;
                Ok(())
            }
        }
    }

    fn synth_frame(&mut self, block: &mut SynthBlock) {
        let Some((channels, len, seed)) = self.last else {
            block.reset(0, 0);
            return;
        };
        block.reset(channels, len);
        for ch in 0..channels {
            for (i, sample) in block.channel_mut(ch).iter_mut().enumerate() {
                *sample = ramp(seed, ch, i);
            }
        }
    }

    fn reset(&mut self) {
        self.last = None;
        self.resets += 1;
    }
}
