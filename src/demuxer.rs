//! AVI demuxer.
//!
//! Parsing is index-driven: the header walk records where `movi` starts,
//! loads the `idx1` table, and every `read_packet` call seeks straight to
//! the indexed offset. Presentation times come from per-stream frame
//! counters, so interleaved video and audio chunks each keep their own
//! clock.

use crate::chunks::{
    self, chunk_ids, decode_stream_chunk, ChunkKind, FourCC, IndexEntry,
};
use crate::codec::{AudioParameters, CodecParameters, VideoParameters};
use crate::error::{AviError, Result};
use crate::types::{MainAviHeader, Packet, StreamHeader, StreamKind};
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

/// One resolved stream: its codec descriptor plus the `strh` record it was
/// declared with.
#[derive(Debug, Clone)]
pub struct AviStream {
    /// Codec descriptor recovered from `strf`.
    pub params: CodecParameters,
    /// Raw stream header; `rate / scale` is the media clock.
    pub header: StreamHeader,
}

impl AviStream {
    /// Check if this is a video stream.
    pub fn is_video(&self) -> bool {
        self.params.kind() == StreamKind::Video
    }

    /// Check if this is an audio stream.
    pub fn is_audio(&self) -> bool {
        self.params.kind() == StreamKind::Audio
    }

    /// Media clock in Hz.
    pub fn media_rate(&self) -> f64 {
        self.header.media_rate()
    }
}

/// Index-driven AVI reader over a seekable source.
pub struct AviDemuxer<R: Read + Seek> {
    reader: R,
    main_header: MainAviHeader,
    streams: Vec<AviStream>,
    /// `hdrl` declaration order to resolved-stream index; `None` marks a
    /// dropped stream.
    stream_map: Vec<Option<usize>>,
    index_entries: Vec<IndexEntry>,
    /// First byte after the `movi` FourCC: the index origin.
    movi_data_pos: u64,
    /// Position of the next `idx1` entry to serve.
    cursor: usize,
    /// Packets dispatched so far, per resolved stream.
    frame_counters: Vec<u64>,
    parsed: bool,
}

impl<R: Read + Seek> AviDemuxer<R> {
    /// Create a demuxer. The source is not touched until
    /// [`streams`](Self::streams) is called.
    pub fn new(reader: R) -> Self {
        AviDemuxer {
            reader,
            main_header: MainAviHeader::default(),
            streams: Vec::new(),
            stream_map: Vec::new(),
            index_entries: Vec::new(),
            movi_data_pos: 0,
            cursor: 0,
            frame_counters: Vec::new(),
            parsed: false,
        }
    }

    /// Parse the container headers and return the resolved streams.
    ///
    /// Idempotent after the first success; streams whose codec is outside
    /// the supported profile are dropped with a warning.
    pub fn streams(&mut self) -> Result<&[AviStream]> {
        if !self.parsed {
            self.parse()?;
            self.parsed = true;
        }
        Ok(&self.streams)
    }

    /// The main AVI header. Meaningful once `streams` has succeeded.
    pub fn main_header(&self) -> &MainAviHeader {
        &self.main_header
    }

    /// Number of resolved streams.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Loaded `idx1` entries.
    pub fn index(&self) -> &[IndexEntry] {
        &self.index_entries
    }

    fn parse(&mut self) -> Result<()> {
        let (riff, _riff_size) = chunks::read_chunk_header(&mut self.reader)?;
        if riff != chunk_ids::RIFF {
            return Err(AviError::NotAvi);
        }
        if self.read_fourcc()? != chunk_ids::AVI {
            return Err(AviError::NotAvi);
        }

        loop {
            let (id, size) = chunks::read_chunk_header(&mut self.reader)?;
            match id {
                id if id == chunk_ids::LIST => {
                    let list_type = self.read_fourcc()?;
                    if list_type == chunk_ids::HDRL {
                        self.parse_hdrl(size.saturating_sub(4))?;
                    } else if list_type == chunk_ids::MOVI {
                        self.movi_data_pos = self.reader.stream_position()?;
                        self.skip(size.saturating_sub(4) as i64)?;
                        log::debug!("movi data at {}", self.movi_data_pos);
                    } else {
                        self.skip(size.saturating_sub(4) as i64)?;
                    }
                }
                id if id == chunk_ids::IDX1 => {
                    self.parse_index(size)?;
                    log::debug!("Loaded {} index entries", self.index_entries.len());
                    return Ok(());
                }
                _ => {
                    self.skip(size as i64)?;
                }
            }
            if size % 2 != 0 {
                self.skip(1)?;
            }
        }
    }

    /// Walk the chunks of `hdrl`: one `avih`, then `strl` LISTs.
    fn parse_hdrl(&mut self, size: u32) -> Result<()> {
        let mut bytes_read = 0u32;
        while bytes_read < size {
            let (id, chunk_size) = chunks::read_chunk_header(&mut self.reader)?;
            bytes_read += 8;
            match id {
                id if id == chunk_ids::AVIH => {
                    let payload = self.read_payload(chunk_size)?;
                    self.main_header = MainAviHeader::read_from(&payload)?;
                }
                id if id == chunk_ids::LIST => {
                    let list_type = self.read_fourcc()?;
                    if list_type == chunk_ids::STRL {
                        self.parse_strl(chunk_size.saturating_sub(4))?;
                    } else {
                        self.skip(chunk_size.saturating_sub(4) as i64)?;
                    }
                }
                _ => {
                    self.skip(chunk_size as i64)?;
                }
            }
            bytes_read += chunk_size;
            if chunk_size % 2 != 0 {
                self.skip(1)?;
                bytes_read += 1;
            }
        }
        Ok(())
    }

    /// Walk one `strl` LIST and resolve its codec descriptor.
    fn parse_strl(&mut self, size: u32) -> Result<()> {
        let declared_index = self.stream_map.len();
        let mut header: Option<StreamHeader> = None;
        let mut params: Option<CodecParameters> = None;

        let mut bytes_read = 0u32;
        while bytes_read < size {
            let (id, chunk_size) = chunks::read_chunk_header(&mut self.reader)?;
            bytes_read += 8;
            match id {
                id if id == chunk_ids::STRH => {
                    let payload = self.read_payload(chunk_size)?;
                    header = Some(StreamHeader::read_from(&payload)?);
                }
                id if id == chunk_ids::STRF => {
                    let payload = self.read_payload(chunk_size)?;
                    let kind = header
                        .as_ref()
                        .and_then(|h| StreamKind::from_fourcc(h.stream_type));
                    params = match kind {
                        Some(StreamKind::Video) => {
                            VideoParameters::from_strf_payload(&payload)?
                                .map(CodecParameters::Video)
                        }
                        Some(StreamKind::Audio) => {
                            AudioParameters::from_strf_payload(&payload)?
                                .map(CodecParameters::Audio)
                        }
                        None => None,
                    };
                }
                _ => {
                    self.skip(chunk_size as i64)?;
                }
            }
            bytes_read += chunk_size;
            if chunk_size % 2 != 0 {
                self.skip(1)?;
                bytes_read += 1;
            }
        }

        match (header, params) {
            (Some(header), Some(mut params)) => {
                if let CodecParameters::Video(ref mut video) = params {
                    let rate = header.media_rate();
                    if rate > 0.0 {
                        video.frame_rate = Some(rate);
                    }
                }
                self.stream_map.push(Some(self.streams.len()));
                self.streams.push(AviStream { params, header });
            }
            _ => {
                log::warn!("Dropping stream {}: unsupported codec", declared_index);
                self.stream_map.push(None);
            }
        }
        Ok(())
    }

    /// Load the `idx1` table.
    fn parse_index(&mut self, size: u32) -> Result<()> {
        let count = size as usize / IndexEntry::SIZE;
        self.index_entries.reserve(count);
        let mut record = [0u8; IndexEntry::SIZE];
        for _ in 0..count {
            self.reader
                .read_exact(&mut record)
                .map_err(AviError::from_read)?;
            self.index_entries.push(IndexEntry::read_from(&record)?);
        }
        self.frame_counters = vec![0; self.streams.len()];
        Ok(())
    }

    /// Serve the next indexed packet, or `None` at end of stream.
    ///
    /// Entries whose stream number maps to no resolved stream, or whose
    /// payload kind disagrees with that stream's kind, are skipped.
    pub fn read_packet(&mut self) -> Result<Option<Packet>> {
        self.streams()?;

        loop {
            let Some(entry) = self.index_entries.get(self.cursor).copied() else {
                return Ok(None);
            };
            self.cursor += 1;

            let (declared_index, kind) = decode_stream_chunk(entry.chunk_id)?;
            let Some(&Some(stream_index)) = self.stream_map.get(declared_index as usize)
            else {
                continue;
            };
            let stream = &self.streams[stream_index];
            let stream_kind = stream.params.kind();
            let (scale, rate) = (stream.header.scale, stream.header.rate);
            let kind_matches = match stream_kind {
                StreamKind::Video => kind.is_video(),
                StreamKind::Audio => kind == ChunkKind::Audio,
            };
            if !kind_matches {
                continue;
            }

            let chunk_pos = self.movi_data_pos + entry.offset as u64;
            self.reader.seek(SeekFrom::Start(chunk_pos))?;
            let (found_id, read_size) = chunks::read_chunk_header(&mut self.reader)?;
            if found_id != entry.chunk_id {
                return Err(AviError::IndexMismatch {
                    expected: entry.chunk_id,
                    found: found_id,
                    offset: chunk_pos,
                });
            }
            let data = self.read_payload(read_size)?;

            let frame = self.frame_counters[stream_index];
            self.frame_counters[stream_index] += 1;
            let time = packet_time(stream_kind, scale, rate, frame);

            return Ok(Some(Packet {
                stream_index: stream_index as u32,
                is_keyframe: entry.is_keyframe(),
                time,
                data,
            }));
        }
    }

    /// Rewind to the first packet.
    pub fn reset(&mut self) {
        self.cursor = 0;
        for counter in &mut self.frame_counters {
            *counter = 0;
        }
    }

    /// Position the cursor on the nearest keyframe of `stream_index` at or
    /// before `frame`, rebuilding the per-stream counters to match.
    pub fn seek_to_frame(&mut self, stream_index: usize, frame: u64) -> Result<()> {
        let mut best = 0usize;
        let mut seen = 0u64;
        for (position, entry) in self.index_entries.iter().enumerate() {
            let Some(resolved) = self.resolve_entry(entry) else {
                continue;
            };
            if resolved == stream_index {
                if seen <= frame && entry.is_keyframe() {
                    best = position;
                }
                seen += 1;
                if seen > frame {
                    break;
                }
            }
        }

        self.cursor = best;
        for counter in &mut self.frame_counters {
            *counter = 0;
        }
        for entry in &self.index_entries[..best] {
            if let Some(resolved) = self.resolve_entry(entry) {
                self.frame_counters[resolved] += 1;
            }
        }
        Ok(())
    }

    fn resolve_entry(&self, entry: &IndexEntry) -> Option<usize> {
        let (declared_index, _) = decode_stream_chunk(entry.chunk_id).ok()?;
        self.stream_map.get(declared_index as usize).copied()?
    }

    fn read_fourcc(&mut self) -> Result<FourCC> {
        let mut bytes = [0u8; 4];
        self.reader
            .read_exact(&mut bytes)
            .map_err(AviError::from_read)?;
        Ok(FourCC(bytes))
    }

    fn read_payload(&mut self, size: u32) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; size as usize];
        self.reader
            .read_exact(&mut payload)
            .map_err(AviError::from_read)?;
        Ok(payload)
    }

    fn skip(&mut self, bytes: i64) -> Result<()> {
        self.reader.seek(SeekFrom::Current(bytes))?;
        Ok(())
    }
}

/// Presentation time of the `frame`-th packet of a stream.
fn packet_time(kind: StreamKind, scale: u32, rate: u32, frame: u64) -> Duration {
    match kind {
        StreamKind::Video => {
            if rate > 0 && scale > 0 {
                Duration::from_secs_f64(frame as f64 * scale as f64 / rate as f64)
            } else {
                Duration::ZERO
            }
        }
        StreamKind::Audio => {
            if rate > 0 {
                Duration::from_secs_f64(frame as f64 / rate as f64)
            } else {
                Duration::ZERO
            }
        }
    }
}
