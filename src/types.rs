//! AVI record types and their fixed little-endian layouts.

use crate::chunks::{chunk_ids, FourCC};
use crate::error::{AviError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;
use std::time::Duration;

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(data[offset..offset + 2].try_into().unwrap())
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Main AVI header (`avih` chunk payload, 56 bytes).
#[derive(Debug, Clone, Default)]
pub struct MainAviHeader {
    /// Microseconds per video frame.
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    /// Header flags; bit 4 marks the presence of an `idx1` index.
    pub flags: u32,
    /// Total video frames, patched at close.
    pub total_frames: u32,
    pub initial_frames: u32,
    /// Number of streams declared in `hdrl`.
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
}

impl MainAviHeader {
    /// Flag bit: the file carries an `idx1` index.
    pub const HAS_INDEX: u32 = 0x10;

    /// On-disk size.
    pub const SIZE: usize = 56;

    /// Video frame rate derived from the frame interval.
    pub fn frame_rate(&self) -> f64 {
        if self.micro_sec_per_frame > 0 {
            1_000_000.0 / self.micro_sec_per_frame as f64
        } else {
            0.0
        }
    }

    /// Parse from an `avih` payload.
    pub fn read_from(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(AviError::TruncatedRecord {
                needed: Self::SIZE,
                available: data.len(),
            });
        }
        Ok(MainAviHeader {
            micro_sec_per_frame: read_u32(data, 0),
            max_bytes_per_sec: read_u32(data, 4),
            padding_granularity: read_u32(data, 8),
            flags: read_u32(data, 12),
            total_frames: read_u32(data, 16),
            initial_frames: read_u32(data, 20),
            streams: read_u32(data, 24),
            suggested_buffer_size: read_u32(data, 28),
            width: read_u32(data, 32),
            height: read_u32(data, 36),
        })
    }

    /// Serialize the 56-byte layout, reserved words included.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.micro_sec_per_frame)?;
        writer.write_u32::<LittleEndian>(self.max_bytes_per_sec)?;
        writer.write_u32::<LittleEndian>(self.padding_granularity)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.total_frames)?;
        writer.write_u32::<LittleEndian>(self.initial_frames)?;
        writer.write_u32::<LittleEndian>(self.streams)?;
        writer.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        writer.write_u32::<LittleEndian>(self.width)?;
        writer.write_u32::<LittleEndian>(self.height)?;
        writer.write_all(&[0u8; 16])?;
        Ok(())
    }
}

/// Stream kind named by the `strh` type FourCC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    /// Map `vids`/`auds`; anything else is unhandled.
    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        if fourcc == chunk_ids::VIDS {
            Some(StreamKind::Video)
        } else if fourcc == chunk_ids::AUDS {
            Some(StreamKind::Audio)
        } else {
            None
        }
    }

    pub fn to_fourcc(self) -> FourCC {
        match self {
            StreamKind::Video => chunk_ids::VIDS,
            StreamKind::Audio => chunk_ids::AUDS,
        }
    }
}

/// Frame rectangle inside `strh` (left, top, right, bottom).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

/// Stream header (`strh` chunk payload, 56 bytes).
///
/// `rate / scale` is the media clock in Hz: frames per second for video,
/// samples per second for audio.
#[derive(Debug, Clone)]
pub struct StreamHeader {
    /// Stream type FourCC (`vids` or `auds`).
    pub stream_type: FourCC,
    /// Codec handler FourCC.
    pub handler: FourCC,
    pub flags: u32,
    pub priority: u16,
    pub language: u16,
    pub initial_frames: u32,
    pub scale: u32,
    pub rate: u32,
    pub start: u32,
    pub length: u32,
    pub suggested_buffer_size: u32,
    pub quality: u32,
    pub sample_size: u32,
    pub frame: Rect,
}

impl Default for StreamHeader {
    fn default() -> Self {
        StreamHeader {
            stream_type: chunk_ids::VIDS,
            handler: FourCC([0; 4]),
            flags: 0,
            priority: 0,
            language: 0,
            initial_frames: 0,
            scale: 1,
            rate: 25,
            start: 0,
            length: 0,
            suggested_buffer_size: 0,
            quality: 0,
            sample_size: 0,
            frame: Rect::default(),
        }
    }
}

impl StreamHeader {
    /// On-disk size.
    pub const SIZE: usize = 56;

    /// Media clock in Hz, zero when either term is zero.
    pub fn media_rate(&self) -> f64 {
        if self.rate > 0 && self.scale > 0 {
            self.rate as f64 / self.scale as f64
        } else {
            0.0
        }
    }

    /// Parse from an `strh` payload.
    pub fn read_from(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(AviError::TruncatedRecord {
                needed: Self::SIZE,
                available: data.len(),
            });
        }
        let mut stream_type = [0u8; 4];
        stream_type.copy_from_slice(&data[0..4]);
        let mut handler = [0u8; 4];
        handler.copy_from_slice(&data[4..8]);
        Ok(StreamHeader {
            stream_type: FourCC(stream_type),
            handler: FourCC(handler),
            flags: read_u32(data, 8),
            priority: read_u16(data, 12),
            language: read_u16(data, 14),
            initial_frames: read_u32(data, 16),
            scale: read_u32(data, 20),
            rate: read_u32(data, 24),
            start: read_u32(data, 28),
            length: read_u32(data, 32),
            suggested_buffer_size: read_u32(data, 36),
            quality: read_u32(data, 40),
            sample_size: read_u32(data, 44),
            frame: Rect {
                left: read_u16(data, 48),
                top: read_u16(data, 50),
                right: read_u16(data, 52),
                bottom: read_u16(data, 54),
            },
        })
    }

    /// Serialize the 56-byte layout.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.stream_type.as_bytes())?;
        writer.write_all(self.handler.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.priority)?;
        writer.write_u16::<LittleEndian>(self.language)?;
        writer.write_u32::<LittleEndian>(self.initial_frames)?;
        writer.write_u32::<LittleEndian>(self.scale)?;
        writer.write_u32::<LittleEndian>(self.rate)?;
        writer.write_u32::<LittleEndian>(self.start)?;
        writer.write_u32::<LittleEndian>(self.length)?;
        writer.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        writer.write_u32::<LittleEndian>(self.quality)?;
        writer.write_u32::<LittleEndian>(self.sample_size)?;
        writer.write_u16::<LittleEndian>(self.frame.left)?;
        writer.write_u16::<LittleEndian>(self.frame.top)?;
        writer.write_u16::<LittleEndian>(self.frame.right)?;
        writer.write_u16::<LittleEndian>(self.frame.bottom)?;
        Ok(())
    }
}

/// Video format record (`BITMAPINFOHEADER`, 40 bytes at the head of a video
/// `strf` chunk). Bytes past 40 are codec extradata.
#[derive(Debug, Clone)]
pub struct BitmapInfoHeader {
    pub size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    /// Compression FourCC naming the codec.
    pub compression: FourCC,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

impl BitmapInfoHeader {
    /// On-disk size.
    pub const SIZE: usize = 40;

    pub fn read_from(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(AviError::TruncatedRecord {
                needed: Self::SIZE,
                available: data.len(),
            });
        }
        let mut compression = [0u8; 4];
        compression.copy_from_slice(&data[16..20]);
        Ok(BitmapInfoHeader {
            size: read_u32(data, 0),
            width: read_i32(data, 4),
            height: read_i32(data, 8),
            planes: read_u16(data, 12),
            bit_count: read_u16(data, 14),
            compression: FourCC(compression),
            size_image: read_u32(data, 20),
            x_pels_per_meter: read_i32(data, 24),
            y_pels_per_meter: read_i32(data, 28),
            clr_used: read_u32(data, 32),
            clr_important: read_u32(data, 36),
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_i32::<LittleEndian>(self.width)?;
        writer.write_i32::<LittleEndian>(self.height)?;
        writer.write_u16::<LittleEndian>(self.planes)?;
        writer.write_u16::<LittleEndian>(self.bit_count)?;
        writer.write_all(self.compression.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.size_image)?;
        writer.write_i32::<LittleEndian>(self.x_pels_per_meter)?;
        writer.write_i32::<LittleEndian>(self.y_pels_per_meter)?;
        writer.write_u32::<LittleEndian>(self.clr_used)?;
        writer.write_u32::<LittleEndian>(self.clr_important)?;
        Ok(())
    }
}

/// Audio format record (`WAVEFORMATEX`, 18 bytes at the head of an audio
/// `strf` chunk). `cb_size` names the extradata bytes that follow.
#[derive(Debug, Clone, Default)]
pub struct WaveFormatEx {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub cb_size: u16,
}

impl WaveFormatEx {
    /// On-disk size, extradata excluded.
    pub const SIZE: usize = 18;

    pub fn read_from(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(AviError::TruncatedRecord {
                needed: Self::SIZE,
                available: data.len(),
            });
        }
        Ok(WaveFormatEx {
            format_tag: read_u16(data, 0),
            channels: read_u16(data, 2),
            samples_per_sec: read_u32(data, 4),
            avg_bytes_per_sec: read_u32(data, 8),
            block_align: read_u16(data, 12),
            bits_per_sample: read_u16(data, 14),
            cb_size: read_u16(data, 16),
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(self.format_tag)?;
        writer.write_u16::<LittleEndian>(self.channels)?;
        writer.write_u32::<LittleEndian>(self.samples_per_sec)?;
        writer.write_u32::<LittleEndian>(self.avg_bytes_per_sec)?;
        writer.write_u16::<LittleEndian>(self.block_align)?;
        writer.write_u16::<LittleEndian>(self.bits_per_sample)?;
        writer.write_u16::<LittleEndian>(self.cb_size)?;
        Ok(())
    }
}

/// One compressed access unit moving through the muxer or demuxer.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Index into the stream list this packet belongs to.
    pub stream_index: u32,
    /// Whether the frame decodes without reference to prior frames.
    pub is_keyframe: bool,
    /// Presentation time from the start of the stream.
    pub time: Duration,
    /// Encoded payload.
    pub data: Vec<u8>,
}

impl Packet {
    /// Create a packet with zero time, suitable for writing.
    pub fn new(stream_index: u32, is_keyframe: bool, data: Vec<u8>) -> Self {
        Packet {
            stream_index,
            is_keyframe,
            time: Duration::ZERO,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_header_roundtrip() {
        let header = MainAviHeader {
            micro_sec_per_frame: 40_000,
            max_bytes_per_sec: 0,
            padding_granularity: 0,
            flags: MainAviHeader::HAS_INDEX,
            total_frames: 250,
            initial_frames: 0,
            streams: 2,
            suggested_buffer_size: 1_048_576,
            width: 640,
            height: 480,
        };

        let mut buffer = Vec::new();
        header.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), MainAviHeader::SIZE);

        let parsed = MainAviHeader::read_from(&buffer).unwrap();
        assert_eq!(parsed.micro_sec_per_frame, 40_000);
        assert_eq!(parsed.total_frames, 250);
        assert_eq!(parsed.width, 640);
        assert_eq!(parsed.height, 480);
        assert!((parsed.frame_rate() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_main_header_truncated() {
        assert!(matches!(
            MainAviHeader::read_from(&[0u8; 20]),
            Err(AviError::TruncatedRecord { needed: 56, .. })
        ));
    }

    #[test]
    fn test_stream_header_roundtrip() {
        let header = StreamHeader {
            stream_type: chunk_ids::VIDS,
            handler: FourCC(*b"H264"),
            scale: 1,
            rate: 30,
            length: 300,
            quality: 10_000,
            frame: Rect {
                left: 0,
                top: 0,
                right: 640,
                bottom: 480,
            },
            ..Default::default()
        };

        let mut buffer = Vec::new();
        header.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), StreamHeader::SIZE);

        let parsed = StreamHeader::read_from(&buffer).unwrap();
        assert_eq!(parsed.stream_type, chunk_ids::VIDS);
        assert_eq!(parsed.handler, FourCC(*b"H264"));
        assert_eq!(parsed.media_rate(), 30.0);
        assert_eq!(parsed.frame.right, 640);
    }

    #[test]
    fn test_stream_kind() {
        assert_eq!(
            StreamKind::from_fourcc(chunk_ids::VIDS),
            Some(StreamKind::Video)
        );
        assert_eq!(
            StreamKind::from_fourcc(chunk_ids::AUDS),
            Some(StreamKind::Audio)
        );
        assert_eq!(StreamKind::from_fourcc(FourCC(*b"txts")), None);
        assert_eq!(StreamKind::Audio.to_fourcc(), chunk_ids::AUDS);
    }

    #[test]
    fn test_bitmap_info_roundtrip() {
        let bih = BitmapInfoHeader {
            size: 40,
            width: 1280,
            height: 720,
            planes: 1,
            bit_count: 24,
            compression: FourCC(*b"H264"),
            size_image: 1280 * 720 * 3,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            clr_used: 0,
            clr_important: 0,
        };

        let mut buffer = Vec::new();
        bih.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), BitmapInfoHeader::SIZE);

        let parsed = BitmapInfoHeader::read_from(&buffer).unwrap();
        assert_eq!(parsed.width, 1280);
        assert_eq!(parsed.height, 720);
        assert_eq!(parsed.compression, FourCC(*b"H264"));
        assert_eq!(parsed.size_image, 1280 * 720 * 3);
    }

    #[test]
    fn test_wave_format_roundtrip() {
        let wfx = WaveFormatEx {
            format_tag: 0x00FF,
            channels: 2,
            samples_per_sec: 48_000,
            avg_bytes_per_sec: 192_000,
            block_align: 4,
            bits_per_sample: 16,
            cb_size: 2,
        };

        let mut buffer = Vec::new();
        wfx.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), WaveFormatEx::SIZE);

        let parsed = WaveFormatEx::read_from(&buffer).unwrap();
        assert_eq!(parsed.format_tag, 0x00FF);
        assert_eq!(parsed.samples_per_sec, 48_000);
        assert_eq!(parsed.cb_size, 2);
    }
}
