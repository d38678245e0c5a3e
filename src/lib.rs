//! # riffavi
//!
//! AVI (Audio Video Interleave) container support. AVI is built on the
//! RIFF structure: a tree of length-prefixed chunks with a `hdrl` header
//! list, a `movi` media list, and a terminal `idx1` index whose entries
//! drive random-access packet reads.
//!
//! ## Features
//!
//! - Two-pass muxing: placeholder sizes up front, three in-place patches
//!   at close (`RIFF` size, `movi` size, `avih.totalFrames`)
//! - Index-driven demuxing with per-stream presentation clocks
//! - Codec bridge for H.264, H.265, AAC, and G.711 µ-law/A-law streams,
//!   extradata carried through `strf`
//! - Buffering adapter for muxing to forward-only sinks
//!
//! ## Example: writing an AVI file
//!
//! ```no_run
//! use std::fs::File;
//! use riffavi::{AviMuxer, Packet, VideoParameters};
//!
//! let file = File::create("output.avi").unwrap();
//! let mut muxer = AviMuxer::new(file);
//!
//! let video = VideoParameters::h264(1280, 720, 25.0, avcc_bytes());
//! muxer.write_header(&[video.into()]).unwrap();
//!
//! for (data, keyframe) in frames() {
//!     muxer.write_packet(&Packet::new(0, keyframe, data)).unwrap();
//! }
//!
//! muxer.write_trailer().unwrap();
//! # fn avcc_bytes() -> Vec<u8> { Vec::new() }
//! # fn frames() -> Vec<(Vec<u8>, bool)> { Vec::new() }
//! ```
//!
//! ## Example: reading an AVI file
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use riffavi::AviDemuxer;
//!
//! let file = File::open("input.avi").unwrap();
//! let mut demuxer = AviDemuxer::new(BufReader::new(file));
//!
//! for stream in demuxer.streams().unwrap() {
//!     println!("stream: {}", stream.params.codec_id());
//! }
//!
//! while let Some(packet) = demuxer.read_packet().unwrap() {
//!     println!("packet: stream={} time={:?} size={}",
//!              packet.stream_index, packet.time, packet.data.len());
//! }
//! ```
//!
//! ## File structure
//!
//! ```text
//! RIFF 'AVI '
//! ├── LIST 'hdrl'
//! │   ├── avih            main header (56 bytes)
//! │   └── LIST 'strl'     one per stream
//! │       ├── strh        stream header (56 bytes)
//! │       └── strf        BITMAPINFOHEADER / WAVEFORMATEX + extradata
//! ├── LIST 'movi'
//! │   └── 00dc / 01wb ... stream chunks, 2-byte aligned
//! └── idx1                16-byte entries, offsets relative to movi data
//! ```

mod chunks;
mod codec;
mod demuxer;
mod error;
mod muxer;
mod sink;
mod types;

pub use chunks::{
    align2, chunk_ids, decode_stream_chunk, encode_stream_chunk, ChunkKind, FourCC, IndexEntry,
};
pub use codec::{
    AudioCodecId, AudioParameters, AudioSpecificConfig, CodecId, CodecParameters, VideoCodecId,
    VideoParameters,
};
pub use demuxer::{AviDemuxer, AviStream};
pub use error::{AviError, Result};
pub use muxer::{AviMuxer, MuxerConfig};
pub use sink::BufferedWriteSeeker;
pub use types::{
    BitmapInfoHeader, MainAviHeader, Packet, Rect, StreamHeader, StreamKind, WaveFormatEx,
};

use std::io::{Read, Seek, Write};

/// Check whether a byte prefix carries the AVI signature: `RIFF` at the
/// start and `AVI ` at offset 8.
pub fn probe(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"AVI "
}

/// Registration surface for a format-dispatch engine: the file extension,
/// the probe function, the supported codec set, and muxer/demuxer
/// factories.
#[derive(Debug, Clone, Copy)]
pub struct FormatHandler {
    /// File extension, dot included.
    pub extension: &'static str,
    /// Signature probe over a byte prefix.
    pub probe: fn(&[u8]) -> bool,
    /// Codec kinds this container profile carries.
    pub codecs: &'static [CodecId],
}

impl FormatHandler {
    /// Demuxer over a seekable source.
    pub fn open_demuxer<R: Read + Seek>(&self, reader: R) -> AviDemuxer<R> {
        AviDemuxer::new(reader)
    }

    /// Muxer over a seekable sink.
    pub fn create_muxer<W: Write + Seek>(&self, writer: W) -> AviMuxer<W> {
        AviMuxer::new(writer)
    }

    /// Muxer over a forward-only sink, buffered in memory and flushed to
    /// the sink when the trailer is written.
    pub fn create_buffered_muxer<W: Write>(&self, writer: W) -> AviMuxer<BufferedWriteSeeker<W>> {
        AviMuxer::new(BufferedWriteSeeker::new(writer))
    }
}

/// The AVI format registration.
pub fn handler() -> FormatHandler {
    FormatHandler {
        extension: ".avi",
        probe,
        codecs: &[
            CodecId::H264,
            CodecId::H265,
            CodecId::Aac,
            CodecId::PcmMulaw,
            CodecId::PcmAlaw,
        ],
    }
}
