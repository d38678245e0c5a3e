//! AVI muxer.
//!
//! RIFF chunk sizes are length-prefixed, and the `movi` payload size and
//! total frame count are unknown until every packet has been written. The
//! writer therefore emits placeholder size fields up front and patches
//! exactly three of them at close: the outer `RIFF` size, the `movi` LIST
//! size, and `avih.totalFrames`. Everything inside `hdrl` is serialized to
//! an in-memory buffer first so its size is final when its LIST header goes
//! out.

use crate::chunks::{self, chunk_ids, encode_stream_chunk, ChunkKind, FourCC, IndexEntry};
use crate::codec::CodecParameters;
use crate::error::{AviError, Result};
use crate::types::{MainAviHeader, Packet, Rect, StreamHeader, StreamKind};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Seek, SeekFrom, Write};

/// Muxer tunables.
#[derive(Debug, Clone)]
pub struct MuxerConfig {
    /// Suggested decode buffer size advertised for video streams.
    pub video_buffer_size: u32,
    /// Suggested decode buffer size advertised for audio streams.
    pub audio_buffer_size: u32,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        MuxerConfig {
            video_buffer_size: 1_048_576,
            audio_buffer_size: 65_536,
        }
    }
}

/// Two-pass AVI writer over a seekable sink.
pub struct AviMuxer<W: Write + Seek> {
    writer: W,
    config: MuxerConfig,
    /// Descriptor-list positions of the recognized streams.
    video_stream: Option<u32>,
    audio_stream: Option<u32>,
    stream_count: u32,
    fps: f64,
    width: u32,
    height: u32,
    audio_sample_rate: u32,
    /// Byte offset of the outer `RIFF` chunk; normally 0 but not assumed.
    header_pos: u64,
    /// Byte offset of the `totalFrames` field inside the emitted `avih`.
    total_frames_pos: u64,
    /// Byte offset of the size field of the `movi` LIST.
    movi_list_size_pos: u64,
    /// Byte offset of the first byte after the `movi` FourCC: the index
    /// origin.
    movi_data_pos: u64,
    frame_count: u32,
    /// Bytes inside `movi`, chunk headers and pads included.
    data_size: u32,
    index_entries: Vec<IndexEntry>,
    header_written: bool,
    finalized: bool,
}

impl<W: Write + Seek> AviMuxer<W> {
    /// Create a muxer with default configuration.
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, MuxerConfig::default())
    }

    /// Create a muxer with explicit configuration.
    pub fn with_config(writer: W, config: MuxerConfig) -> Self {
        AviMuxer {
            writer,
            config,
            video_stream: None,
            audio_stream: None,
            stream_count: 0,
            fps: 0.0,
            width: 0,
            height: 0,
            audio_sample_rate: 0,
            header_pos: 0,
            total_frames_pos: 0,
            movi_list_size_pos: 0,
            movi_data_pos: 0,
            frame_count: 0,
            data_size: 0,
            index_entries: Vec::new(),
            header_written: false,
            finalized: false,
        }
    }

    /// Write the file headers for the given streams and open `movi`.
    ///
    /// One video and one audio stream are recognized for packet routing;
    /// further streams of a kind already taken are declared in `hdrl` but
    /// receive no packets. A list with neither video nor audio is rejected.
    pub fn write_header(&mut self, streams: &[CodecParameters]) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        for (index, params) in streams.iter().enumerate() {
            match params {
                CodecParameters::Video(video) => {
                    if self.video_stream.is_some() {
                        log::warn!("Ignoring extra video stream at index {}", index);
                        continue;
                    }
                    self.video_stream = Some(index as u32);
                    self.width = video.width;
                    self.height = video.height;
                    self.fps = video.frame_rate.unwrap_or(0.0);
                }
                CodecParameters::Audio(audio) => {
                    if self.audio_stream.is_some() {
                        log::warn!("Ignoring extra audio stream at index {}", index);
                        continue;
                    }
                    self.audio_stream = Some(index as u32);
                    self.audio_sample_rate = audio.sample_rate;
                }
            }
        }

        if self.video_stream.is_none() && self.audio_stream.is_none() {
            return Err(AviError::NoStreams);
        }
        if self.fps <= 0.0 {
            self.fps = 25.0;
        }
        self.stream_count = streams.len() as u32;

        // Assemble the whole hdrl subtree in memory; its LIST size is final
        // when the header is emitted and is never patched.
        let mut hdrl = Vec::new();
        let total_frames_offset = self.append_avih(&mut hdrl)?;
        for params in streams {
            self.append_strl(&mut hdrl, params)?;
        }

        self.header_pos = self.writer.stream_position()?;

        chunks::write_chunk_header(&mut self.writer, chunk_ids::RIFF, 0)?;
        self.writer.write_all(chunk_ids::AVI.as_bytes())?;

        chunks::write_chunk_header(&mut self.writer, chunk_ids::LIST, hdrl.len() as u32 + 4)?;
        self.writer.write_all(chunk_ids::HDRL.as_bytes())?;
        let hdrl_payload_pos = self.writer.stream_position()?;
        self.total_frames_pos = hdrl_payload_pos + total_frames_offset;
        self.writer.write_all(&hdrl)?;

        let movi_pos = self.writer.stream_position()?;
        chunks::write_chunk_header(&mut self.writer, chunk_ids::LIST, 0)?;
        self.writer.write_all(chunk_ids::MOVI.as_bytes())?;
        self.movi_list_size_pos = movi_pos + 4;
        self.movi_data_pos = movi_pos + 12;

        self.header_written = true;
        log::debug!(
            "Header written: {} streams, movi data at {}",
            self.stream_count,
            self.movi_data_pos
        );
        Ok(())
    }

    /// Serialize the `avih` chunk into `hdrl`, returning the offset of the
    /// `totalFrames` field within the buffer.
    fn append_avih(&self, hdrl: &mut Vec<u8>) -> Result<u64> {
        let header = MainAviHeader {
            micro_sec_per_frame: (1_000_000.0 / self.fps) as u32,
            max_bytes_per_sec: 0,
            padding_granularity: 0,
            flags: MainAviHeader::HAS_INDEX,
            total_frames: 0,
            initial_frames: 0,
            streams: self.stream_count,
            suggested_buffer_size: self.config.video_buffer_size,
            width: self.width,
            height: self.height,
        };

        chunks::write_chunk_header(hdrl, chunk_ids::AVIH, MainAviHeader::SIZE as u32)?;
        let total_frames_offset = hdrl.len() as u64 + 16;
        header.write_to(hdrl)?;
        Ok(total_frames_offset)
    }

    /// Serialize one `strl` LIST (strh + strf) into `hdrl`.
    fn append_strl(&self, hdrl: &mut Vec<u8>, params: &CodecParameters) -> Result<()> {
        let (stream_header, strf) = match params {
            CodecParameters::Video(video) => {
                let header = StreamHeader {
                    stream_type: StreamKind::Video.to_fourcc(),
                    handler: video.codec.compression(),
                    scale: 1,
                    rate: self.fps as u32,
                    suggested_buffer_size: self.config.video_buffer_size,
                    quality: 10_000,
                    sample_size: 0,
                    frame: Rect {
                        left: 0,
                        top: 0,
                        right: video.width as u16,
                        bottom: video.height as u16,
                    },
                    ..Default::default()
                };
                (header, video.to_strf_payload()?)
            }
            CodecParameters::Audio(audio) => {
                let header = StreamHeader {
                    stream_type: StreamKind::Audio.to_fourcc(),
                    handler: FourCC([0; 4]),
                    scale: 1,
                    rate: audio.sample_rate,
                    suggested_buffer_size: self.config.audio_buffer_size,
                    quality: 10_000,
                    sample_size: 0,
                    ..Default::default()
                };
                (header, audio.to_strf_payload()?)
            }
        };

        let mut strl = Vec::new();
        chunks::write_chunk_header(&mut strl, chunk_ids::STRH, StreamHeader::SIZE as u32)?;
        stream_header.write_to(&mut strl)?;
        chunks::write_chunk(&mut strl, chunk_ids::STRF, &strf)?;

        chunks::write_chunk_header(hdrl, chunk_ids::LIST, strl.len() as u32 + 4)?;
        hdrl.extend_from_slice(chunk_ids::STRL.as_bytes());
        hdrl.extend_from_slice(&strl);
        Ok(())
    }

    /// Append one packet to `movi` and record its index entry.
    ///
    /// Video always gets the `dc` suffix; compressed-vs-uncompressed is
    /// what the suffix distinguishes, the keyframe bit lives in the index
    /// entry.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let kind = if Some(packet.stream_index) == self.video_stream {
            ChunkKind::VideoCompressed
        } else if Some(packet.stream_index) == self.audio_stream {
            ChunkKind::Audio
        } else {
            return Err(AviError::StreamOutOfRange(packet.stream_index));
        };
        let chunk_id = encode_stream_chunk(packet.stream_index, kind);

        let chunk_pos = self.writer.stream_position()?;
        self.index_entries.push(IndexEntry {
            chunk_id,
            flags: if packet.is_keyframe {
                IndexEntry::KEYFRAME
            } else {
                0
            },
            offset: (chunk_pos - self.movi_data_pos) as u32,
            size: packet.data.len() as u32,
        });

        chunks::write_chunk(&mut self.writer, chunk_id, &packet.data)?;

        self.data_size += 8 + packet.data.len() as u32;
        if packet.data.len() % 2 != 0 {
            self.data_size += 1;
        }
        if Some(packet.stream_index) == self.video_stream {
            self.frame_count += 1;
        }
        Ok(())
    }

    /// Write the `idx1` index and patch the three deferred size fields.
    ///
    /// Also flushes the sink, completing the hand-off when the sink is a
    /// [`BufferedWriteSeeker`](crate::BufferedWriteSeeker).
    pub fn write_trailer(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        if !self.header_written {
            return Err(AviError::NoStreams);
        }

        chunks::write_chunk_header(
            &mut self.writer,
            chunk_ids::IDX1,
            (self.index_entries.len() * IndexEntry::SIZE) as u32,
        )?;
        for entry in &self.index_entries {
            entry.write_to(&mut self.writer)?;
        }

        let end_pos = self.writer.stream_position()?;
        let riff_size = (end_pos - self.header_pos - 8) as u32;
        self.patch_u32(self.header_pos + 4, riff_size)?;
        self.patch_u32(self.movi_list_size_pos, self.data_size + 4)?;
        self.patch_u32(self.total_frames_pos, self.frame_count)?;
        self.writer.seek(SeekFrom::Start(end_pos))?;
        self.writer.flush()?;

        self.finalized = true;
        log::debug!(
            "Trailer written: {} index entries, {} video frames, {} bytes",
            self.index_entries.len(),
            self.frame_count,
            end_pos - self.header_pos
        );
        Ok(())
    }

    /// Overwrite a u32 at an absolute sink offset.
    fn patch_u32(&mut self, offset: u64, value: u32) -> Result<()> {
        self.writer
            .seek(SeekFrom::Start(offset))
            .map_err(|e| AviError::SinkNotSeekable(e.to_string()))?;
        self.writer.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Video frames written so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Bytes accumulated inside `movi`.
    pub fn bytes_written(&self) -> u32 {
        self.data_size
    }

    /// Consume the muxer and return the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
