#![allow(dead_code)]
/// in separate folder so its not ran as integration test
///
/// Builders for synthetic MPEG audio streams. All frames are silent: zeroed side
/// information and main data decode to digital silence in any Layer III decoder.
use std::path::PathBuf;

/// MPEG-1 Layer III, 128 kb/s, 44.1 kHz, stereo.
pub const MPEG1_STEREO_44K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
/// Same, with the padding bit set.
pub const MPEG1_STEREO_44K_PADDED: [u8; 4] = [0xFF, 0xFB, 0x92, 0x00];
/// MPEG-1 Layer III, 128 kb/s, 48 kHz, mono.
pub const MPEG1_MONO_48K: [u8; 4] = [0xFF, 0xFB, 0x94, 0xC0];
/// MPEG-2 Layer III, 64 kb/s, 24 kHz, mono.
pub const MPEG2_MONO_24K: [u8; 4] = [0xFF, 0xF3, 0x84, 0xC4];

/// Length in bytes of a frame with `header`.
pub fn frame_len(header: [u8; 4]) -> usize {
    let mpeg1 = header[1] & 0x08 != 0;
    let bitrate_index = (header[2] >> 4) as usize;
    let kbps = if mpeg1 {
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320][bitrate_index]
    } else {
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160][bitrate_index]
    };
    let rate = [44100, 48000, 32000][((header[2] >> 2) & 0b11) as usize] / if mpeg1 { 1 } else { 2 };
    let slots = if mpeg1 { 144 } else { 72 };
    slots * kbps * 1000 / rate + ((header[2] >> 1) & 1) as usize
}

pub fn silent_frame(header: [u8; 4]) -> Vec<u8> {
    let mut frame = vec![0; frame_len(header)];
    frame[..4].copy_from_slice(&header);
    frame
}

pub fn stream_of(header: [u8; 4], frames: usize) -> Vec<u8> {
    (0..frames).flat_map(|_| silent_frame(header)).collect()
}

pub fn cbr_stream(frames: usize) -> Vec<u8> {
    stream_of(MPEG1_STEREO_44K, frames)
}

/// A silent MPEG-1 stereo frame carrying a Xing header that announces `frames` frames.
pub fn xing_frame(frames: u32) -> Vec<u8> {
    let mut frame = silent_frame(MPEG1_STEREO_44K);
    // header plus 32 bytes of stereo side information
    let at = 4 + 32;
    frame[at..at + 4].copy_from_slice(b"Xing");
    frame[at + 4..at + 8].copy_from_slice(&1u32.to_be_bytes());
    frame[at + 8..at + 12].copy_from_slice(&frames.to_be_bytes());
    frame
}

pub fn id3v1_tag() -> Vec<u8> {
    let mut tag = b"TAGSilence".to_vec();
    tag.resize(128, b' ');
    tag
}

/// An ID3v2.4 tag with a `size` byte body and an optional footer.
pub fn id3v2_tag(size: usize, footer: bool) -> Vec<u8> {
    let synchsafe = [
        (size >> 21) as u8 & 0x7F,
        (size >> 14) as u8 & 0x7F,
        (size >> 7) as u8 & 0x7F,
        size as u8 & 0x7F,
    ];
    let flags = if footer { 0x10 } else { 0 };
    let mut tag = vec![b'I', b'D', b'3', 4, 0, flags];
    tag.extend_from_slice(&synchsafe);
    tag.resize(10 + size, b'x');
    if footer {
        tag.extend_from_slice(&[b'3', b'D', b'I', 4, 0, flags]);
        tag.extend_from_slice(&synchsafe);
    }
    tag
}

/// Writes `data` to a file in the temporary directory that is removed on drop.
pub struct TempFile(PathBuf);

impl TempFile {
    pub fn new(name: &str, data: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("mpegstream-{}-{name}", std::process::id()));
        std::fs::write(&path, data).unwrap();
        TempFile(path)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
