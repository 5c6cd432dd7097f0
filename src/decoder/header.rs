//! MPEG audio frame headers.
//!
//! The 32-bit header carries everything needed to find the next frame and to time the
//! stream without decoding any audio: version, layer, bit rate, sample rate, padding and
//! channel mode.

use crate::common::{ChannelCount, SampleRate};
use crate::math::{frame_time, StreamTime};

use super::engine::StreamError;

/// Size of the fixed part of a frame header.
pub const HEADER_LEN: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    I,
    II,
    III,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

impl ChannelMode {
    #[inline]
    pub fn channels(self) -> ChannelCount {
        match self {
            ChannelMode::SingleChannel => 1,
            _ => 2,
        }
    }
}

/// Bit rates in kb/s, indexed by the 4-bit field. Index 0 is free format, 15 is invalid.
const BITRATES_V1: [[u32; 15]; 3] = [
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
];
const BITRATES_V2_LAYER1: [u32; 15] =
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_LAYER23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

const SAMPLE_RATES_V1: [SampleRate; 3] = [44100, 48000, 32000];

/// A parsed frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// A 16-bit CRC follows the header.
    pub protected: bool,
    /// Bits per second.
    pub bitrate: u32,
    pub sample_rate: SampleRate,
    pub padding: bool,
    pub mode: ChannelMode,
}

impl FrameHeader {
    /// Parses the four header bytes. The sync word must already have been checked.
    pub fn parse(bytes: [u8; 4]) -> Result<FrameHeader, StreamError> {
        let version = match (bytes[1] >> 3) & 0b11 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return Err(StreamError::BadHeader("reserved version")),
        };
        let layer = match (bytes[1] >> 1) & 0b11 {
            0b01 => Layer::III,
            0b10 => Layer::II,
            0b11 => Layer::I,
            _ => return Err(StreamError::BadHeader("reserved layer")),
        };
        if version == MpegVersion::Mpeg25 && layer != Layer::III {
            return Err(StreamError::BadHeader("MPEG 2.5 only defines layer III"));
        }
        let protected = bytes[1] & 1 == 0;

        let bitrate_index = (bytes[2] >> 4) as usize;
        if bitrate_index == 0 {
            return Err(StreamError::BadHeader("free format bit rate"));
        }
        if bitrate_index == 15 {
            return Err(StreamError::BadHeader("invalid bit rate"));
        }
        let kbps = match (version, layer) {
            (MpegVersion::Mpeg1, Layer::I) => BITRATES_V1[0][bitrate_index],
            (MpegVersion::Mpeg1, Layer::II) => BITRATES_V1[1][bitrate_index],
            (MpegVersion::Mpeg1, Layer::III) => BITRATES_V1[2][bitrate_index],
            (_, Layer::I) => BITRATES_V2_LAYER1[bitrate_index],
            (_, _) => BITRATES_V2_LAYER23[bitrate_index],
        };

        let rate_index = ((bytes[2] >> 2) & 0b11) as usize;
        if rate_index == 3 {
            return Err(StreamError::BadHeader("reserved sample rate"));
        }
        let sample_rate = match version {
            MpegVersion::Mpeg1 => SAMPLE_RATES_V1[rate_index],
            MpegVersion::Mpeg2 => SAMPLE_RATES_V1[rate_index] / 2,
            MpegVersion::Mpeg25 => SAMPLE_RATES_V1[rate_index] / 4,
        };

        let mode = match bytes[3] >> 6 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        };
        if bytes[3] & 0b11 == 0b10 {
            return Err(StreamError::BadHeader("reserved emphasis"));
        }

        Ok(FrameHeader {
            version,
            layer,
            protected,
            bitrate: kbps * 1000,
            sample_rate,
            padding: (bytes[2] >> 1) & 1 == 1,
            mode,
        })
    }

    #[inline]
    pub fn channels(&self) -> ChannelCount {
        self.mode.channels()
    }

    /// Samples per channel produced by this frame.
    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::I, _) => 384,
            (Layer::II, _) | (Layer::III, MpegVersion::Mpeg1) => 1152,
            (Layer::III, _) => 576,
        }
    }

    /// Length of the whole frame in bytes, header and padding included.
    pub fn frame_len(&self) -> usize {
        let bitrate = self.bitrate as usize;
        let sample_rate = self.sample_rate as usize;
        match self.layer {
            Layer::I => (12 * bitrate / sample_rate + self.padding as usize) * 4,
            _ => {
                let slots = self.samples_per_frame() as usize / 8;
                slots * bitrate / sample_rate + self.padding as usize
            }
        }
    }

    /// Length of the Layer III side information block. Zero for the other layers.
    pub fn side_info_len(&self) -> usize {
        match (self.layer, self.version, self.mode) {
            (Layer::III, MpegVersion::Mpeg1, ChannelMode::SingleChannel) => 17,
            (Layer::III, MpegVersion::Mpeg1, _) => 32,
            (Layer::III, _, ChannelMode::SingleChannel) => 9,
            (Layer::III, _, _) => 17,
            _ => 0,
        }
    }

    /// Offset of the first byte after the header, CRC and side information. Info tags
    /// such as Xing live here, in place of the first frame's audio data.
    #[inline]
    pub fn ancillary_offset(&self) -> usize {
        HEADER_LEN + if self.protected { 2 } else { 0 } + self.side_info_len()
    }

    /// Playing time of this frame.
    #[inline]
    pub fn duration(&self) -> StreamTime {
        frame_time(self.samples_per_frame(), self.sample_rate)
    }
}

/// Whether `bytes` starts with the 11-bit frame sync pattern.
#[inline]
pub fn is_sync_word(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0
}

/// Decodes the header at the start of `data`.
///
/// The whole frame must be present, otherwise [`StreamError::BufferUnderrun`] asks for a
/// refill. When the decoder is not yet `synced`, the header must also be followed by
/// another sync word, so that random `0xFFE` patterns inside tags or garbage are not
/// taken for frames. At end of stream the follow-up check is waived.
pub fn decode_header(data: &[u8], synced: bool, at_eof: bool) -> Result<FrameHeader, StreamError> {
    if data.len() < HEADER_LEN {
        return Err(StreamError::BufferUnderrun);
    }
    if !is_sync_word(data) {
        return Err(StreamError::LostSync);
    }

    let header = FrameHeader::parse([data[0], data[1], data[2], data[3]])?;
    let len = header.frame_len();
    if data.len() < len {
        return Err(StreamError::BufferUnderrun);
    }

    if !synced {
        match data.get(len..len + 2) {
            Some(next) if !is_sync_word(next) => return Err(StreamError::LostSync),
            None if !at_eof => return Err(StreamError::BufferUnderrun),
            _ => {}
        }
    }
    Ok(header)
}
