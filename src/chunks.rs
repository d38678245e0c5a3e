//! RIFF chunk primitives: FourCC codes, chunk headers, stream chunk IDs,
//! and `idx1` index entries.

use crate::error::{AviError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// FourCC (Four Character Code) identifier.
///
/// Carried on disk as a little-endian u32; in memory as the 4 raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create from bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }

    /// Unpack from the little-endian u32 wire form.
    pub fn from_u32(value: u32) -> Self {
        FourCC(value.to_le_bytes())
    }

    /// Pack into the little-endian u32 wire form.
    pub fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FourCC(\"{}\")", self)
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }
}

/// Well-known chunk IDs.
pub mod chunk_ids {
    use super::FourCC;

    pub const RIFF: FourCC = FourCC(*b"RIFF");
    pub const AVI: FourCC = FourCC(*b"AVI ");
    pub const LIST: FourCC = FourCC(*b"LIST");
    pub const HDRL: FourCC = FourCC(*b"hdrl");
    pub const AVIH: FourCC = FourCC(*b"avih");
    pub const STRL: FourCC = FourCC(*b"strl");
    pub const STRH: FourCC = FourCC(*b"strh");
    pub const STRF: FourCC = FourCC(*b"strf");
    pub const MOVI: FourCC = FourCC(*b"movi");
    pub const IDX1: FourCC = FourCC(*b"idx1");
    pub const VIDS: FourCC = FourCC(*b"vids");
    pub const AUDS: FourCC = FourCC(*b"auds");
    pub const JUNK: FourCC = FourCC(*b"JUNK");
}

/// Round `n` up to the next 2-byte boundary.
pub fn align2(n: usize) -> usize {
    (n + 1) & !1
}

/// Read an 8-byte chunk header (id + payload size).
pub fn read_chunk_header<R: Read>(reader: &mut R) -> Result<(FourCC, u32)> {
    let mut id = [0u8; 4];
    reader.read_exact(&mut id).map_err(AviError::from_read)?;
    let size = reader
        .read_u32::<LittleEndian>()
        .map_err(AviError::from_read)?;
    Ok((FourCC(id), size))
}

/// Write an 8-byte chunk header (id + payload size).
pub fn write_chunk_header<W: Write>(writer: &mut W, id: FourCC, size: u32) -> Result<()> {
    writer.write_all(id.as_bytes())?;
    writer.write_u32::<LittleEndian>(size)?;
    Ok(())
}

/// Write a complete chunk: header, payload, and the pad byte that keeps the
/// next chunk 2-byte aligned.
pub fn write_chunk<W: Write>(writer: &mut W, id: FourCC, payload: &[u8]) -> Result<()> {
    write_chunk_header(writer, id, payload.len() as u32)?;
    writer.write_all(payload)?;
    if payload.len() % 2 != 0 {
        writer.write_all(&[0])?;
    }
    Ok(())
}

/// Payload kind carried by a stream chunk, named by the two-letter suffix
/// of its chunk ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Compressed video frame (`dc`).
    VideoCompressed,
    /// Uncompressed video frame (`db`).
    VideoUncompressed,
    /// Audio data (`wb`).
    Audio,
}

impl ChunkKind {
    fn suffix(self) -> [u8; 2] {
        match self {
            ChunkKind::VideoCompressed => *b"dc",
            ChunkKind::VideoUncompressed => *b"db",
            ChunkKind::Audio => *b"wb",
        }
    }

    /// True for either video kind.
    pub fn is_video(self) -> bool {
        matches!(self, ChunkKind::VideoCompressed | ChunkKind::VideoUncompressed)
    }
}

/// Build the `SSkk` chunk ID for a stream: two ASCII decimal digits of the
/// stream index followed by the kind suffix.
///
/// The two-digit scheme bounds the stream count at 100.
pub fn encode_stream_chunk(stream_index: u32, kind: ChunkKind) -> FourCC {
    debug_assert!(stream_index < 100);
    let suffix = kind.suffix();
    FourCC([
        b'0' + (stream_index / 10) as u8,
        b'0' + (stream_index % 10) as u8,
        suffix[0],
        suffix[1],
    ])
}

/// Recover the stream index and payload kind from a stream chunk ID.
pub fn decode_stream_chunk(id: FourCC) -> Result<(u32, ChunkKind)> {
    let bytes = id.as_bytes();
    if !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return Err(AviError::UnrecognizedChunkId(*bytes));
    }
    let stream_index = ((bytes[0] - b'0') as u32) * 10 + (bytes[1] - b'0') as u32;
    let kind = match &bytes[2..4] {
        b"dc" => ChunkKind::VideoCompressed,
        b"db" => ChunkKind::VideoUncompressed,
        b"wb" => ChunkKind::Audio,
        _ => return Err(AviError::UnrecognizedChunkId(*bytes)),
    };
    Ok((stream_index, kind))
}

/// One 16-byte `idx1` record mapping a chunk to its position inside `movi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Stream chunk ID.
    pub chunk_id: FourCC,
    /// Entry flags.
    pub flags: u32,
    /// Offset from the first byte after the `movi` FourCC.
    pub offset: u32,
    /// Chunk payload size, pad excluded.
    pub size: u32,
}

impl IndexEntry {
    /// Flag bit marking a keyframe.
    pub const KEYFRAME: u32 = 0x10;

    /// On-disk size of one entry.
    pub const SIZE: usize = 16;

    /// Parse one entry from the front of `data`.
    pub fn read_from(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(AviError::TruncatedRecord {
                needed: Self::SIZE,
                available: data.len(),
            });
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&data[0..4]);
        Ok(IndexEntry {
            chunk_id: FourCC(id),
            flags: u32::from_le_bytes(data[4..8].try_into().unwrap()),
            offset: u32::from_le_bytes(data[8..12].try_into().unwrap()),
            size: u32::from_le_bytes(data[12..16].try_into().unwrap()),
        })
    }

    /// Serialize this entry.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.chunk_id.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    /// Check the keyframe flag.
    pub fn is_keyframe(&self) -> bool {
        (self.flags & Self::KEYFRAME) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fourcc_u32_roundtrip() {
        let fourcc = FourCC(*b"H264");
        assert_eq!(FourCC::from_u32(fourcc.as_u32()), fourcc);
        assert_eq!(fourcc.to_string(), "H264");
    }

    #[test]
    fn test_align2() {
        assert_eq!(align2(0), 0);
        assert_eq!(align2(1), 2);
        assert_eq!(align2(2), 2);
        assert_eq!(align2(3), 4);
    }

    #[test]
    fn test_chunk_header_roundtrip() {
        let mut buffer = Vec::new();
        write_chunk_header(&mut buffer, chunk_ids::AVIH, 56).unwrap();
        assert_eq!(buffer.len(), 8);

        let (id, size) = read_chunk_header(&mut Cursor::new(&buffer)).unwrap();
        assert_eq!(id, chunk_ids::AVIH);
        assert_eq!(size, 56);
    }

    #[test]
    fn test_chunk_header_short_read() {
        let result = read_chunk_header(&mut Cursor::new(&b"avi"[..]));
        assert!(matches!(result, Err(AviError::UnexpectedEof)));
    }

    #[test]
    fn test_write_chunk_pads_odd_payload() {
        let mut buffer = Vec::new();
        write_chunk(&mut buffer, FourCC(*b"test"), &[1, 2, 3]).unwrap();
        // header + 3 payload bytes + 1 pad
        assert_eq!(buffer.len(), 12);
        assert_eq!(buffer[11], 0);

        let mut even = Vec::new();
        write_chunk(&mut even, FourCC(*b"test"), &[1, 2, 3, 4]).unwrap();
        assert_eq!(even.len(), 12);
    }

    #[test]
    fn test_stream_chunk_encode() {
        assert_eq!(
            encode_stream_chunk(0, ChunkKind::VideoCompressed).as_bytes(),
            b"00dc"
        );
        assert_eq!(encode_stream_chunk(5, ChunkKind::Audio).as_bytes(), b"05wb");
        assert_eq!(
            encode_stream_chunk(42, ChunkKind::VideoUncompressed).as_bytes(),
            b"42db"
        );
    }

    #[test]
    fn test_stream_chunk_decode() {
        let (index, kind) = decode_stream_chunk(FourCC(*b"01wb")).unwrap();
        assert_eq!(index, 1);
        assert_eq!(kind, ChunkKind::Audio);

        let (index, kind) = decode_stream_chunk(FourCC(*b"99dc")).unwrap();
        assert_eq!(index, 99);
        assert_eq!(kind, ChunkKind::VideoCompressed);
    }

    #[test]
    fn test_stream_chunk_decode_rejects() {
        assert!(matches!(
            decode_stream_chunk(FourCC(*b"avih")),
            Err(AviError::UnrecognizedChunkId(_))
        ));
        assert!(matches!(
            decode_stream_chunk(FourCC(*b"00xx")),
            Err(AviError::UnrecognizedChunkId(_))
        ));
        assert!(matches!(
            decode_stream_chunk(FourCC(*b"0Adc")),
            Err(AviError::UnrecognizedChunkId(_))
        ));
    }

    #[test]
    fn test_index_entry_roundtrip() {
        let entry = IndexEntry {
            chunk_id: FourCC(*b"00dc"),
            flags: IndexEntry::KEYFRAME,
            offset: 1000,
            size: 5000,
        };
        assert!(entry.is_keyframe());

        let mut buffer = Vec::new();
        entry.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), IndexEntry::SIZE);

        let parsed = IndexEntry::read_from(&buffer).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_index_entry_truncated() {
        let result = IndexEntry::read_from(&[0u8; 10]);
        assert!(matches!(
            result,
            Err(AviError::TruncatedRecord {
                needed: 16,
                available: 10
            })
        ));
    }
}
