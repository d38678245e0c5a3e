//! Codec parameter descriptors and the `strf` bridge.
//!
//! The container core never parses codec bitstreams; it moves opaque
//! descriptors between the generic form used by callers and the
//! `BITMAPINFOHEADER`/`WAVEFORMATEX` records AVI stores, plus the trailing
//! codec extradata.

use crate::chunks::FourCC;
use crate::error::{AviError, Result};
use crate::types::{BitmapInfoHeader, StreamKind, WaveFormatEx};

/// Codec kinds this container profile can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    H264,
    H265,
    Aac,
    PcmMulaw,
    PcmAlaw,
}

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::H264 => write!(f, "H.264/AVC"),
            Self::H265 => write!(f, "H.265/HEVC"),
            Self::Aac => write!(f, "AAC"),
            Self::PcmMulaw => write!(f, "G.711 \u{3bc}-law"),
            Self::PcmAlaw => write!(f, "G.711 A-law"),
        }
    }
}

/// Video codec kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodecId {
    H264,
    H265,
}

impl VideoCodecId {
    /// Compression FourCC written into `BITMAPINFOHEADER`.
    pub fn compression(self) -> FourCC {
        match self {
            Self::H264 => FourCC(*b"H264"),
            Self::H265 => FourCC(*b"H265"),
        }
    }

    /// Map a compression FourCC back to a codec, case-insensitively.
    pub fn from_compression(compression: FourCC) -> Option<Self> {
        let mut upper = *compression.as_bytes();
        upper.make_ascii_uppercase();
        match &upper {
            b"H264" | b"AVC1" => Some(Self::H264),
            b"H265" | b"HVC1" | b"HEVC" => Some(Self::H265),
            _ => None,
        }
    }
}

/// Audio codec kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodecId {
    Aac,
    PcmMulaw,
    PcmAlaw,
}

impl AudioCodecId {
    /// `WAVEFORMATEX.wFormatTag` value.
    pub fn format_tag(self) -> u16 {
        match self {
            Self::Aac => 0x00FF,
            Self::PcmMulaw => 0x0007,
            Self::PcmAlaw => 0x0006,
        }
    }

    /// Sample width written into the wave format record.
    pub fn bits_per_sample(self) -> u16 {
        match self {
            Self::Aac => 16,
            Self::PcmMulaw | Self::PcmAlaw => 8,
        }
    }

    /// Map a wave format tag back to a codec.
    pub fn from_format_tag(tag: u16) -> Option<Self> {
        match tag {
            0x00FF => Some(Self::Aac),
            0x0007 => Some(Self::PcmMulaw),
            0x0006 => Some(Self::PcmAlaw),
            _ => None,
        }
    }
}

/// MPEG-4 AudioSpecificConfig header, the AAC extradata payload.
///
/// Only the leading fields the bridge needs: object type, sampling
/// frequency (index 15 carries an explicit 24-bit rate), and channel
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// Audio object type (2 = AAC-LC).
    pub object_type: u8,
    /// Decoded sample rate in Hz.
    pub sample_rate: u32,
    /// Channel configuration.
    pub channels: u8,
    /// Raw config bytes as carried in the container.
    pub raw: Vec<u8>,
}

impl AudioSpecificConfig {
    /// Standard sampling-frequency-index table.
    pub const SAMPLE_RATES: [u32; 13] = [
        96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
    ];

    /// Build an AAC-LC config for the given rate and channel count.
    pub fn aac_lc(sample_rate: u32, channels: u8) -> Self {
        Self::new(2, sample_rate, channels)
    }

    /// Build a config for an arbitrary object type.
    pub fn new(object_type: u8, sample_rate: u32, channels: u8) -> Self {
        let index = Self::SAMPLE_RATES
            .iter()
            .position(|&r| r == sample_rate)
            .map(|i| i as u8)
            .unwrap_or(15);

        let mut raw = Vec::with_capacity(5);
        raw.push((object_type << 3) | (index >> 1));
        if index == 15 {
            // Explicit 24-bit sample rate follows the index.
            raw.push(((index & 0x01) << 7) | ((sample_rate >> 17) & 0x7F) as u8);
            raw.push(((sample_rate >> 9) & 0xFF) as u8);
            raw.push(((sample_rate >> 1) & 0xFF) as u8);
            raw.push((((sample_rate & 0x01) as u8) << 7) | ((channels & 0x0F) << 3));
        } else {
            raw.push(((index & 0x01) << 7) | ((channels & 0x0F) << 3));
        }

        AudioSpecificConfig {
            object_type,
            sample_rate,
            channels,
            raw,
        }
    }

    /// Parse the header of a raw AudioSpecificConfig.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(AviError::TruncatedRecord {
                needed: 2,
                available: data.len(),
            });
        }

        let object_type = (data[0] >> 3) & 0x1F;
        let index = ((data[0] & 0x07) << 1) | ((data[1] >> 7) & 0x01);

        let (sample_rate, channels) = if index == 15 {
            if data.len() < 5 {
                return Err(AviError::TruncatedRecord {
                    needed: 5,
                    available: data.len(),
                });
            }
            let rate = ((data[1] as u32 & 0x7F) << 17)
                | ((data[2] as u32) << 9)
                | ((data[3] as u32) << 1)
                | ((data[4] as u32) >> 7);
            (rate, (data[4] >> 3) & 0x0F)
        } else {
            let Some(&rate) = Self::SAMPLE_RATES.get(index as usize) else {
                return Err(AviError::UnsupportedCodec(format!(
                    "AAC sampling frequency index {}",
                    index
                )));
            };
            (rate, (data[1] >> 3) & 0x0F)
        };

        Ok(AudioSpecificConfig {
            object_type,
            sample_rate,
            channels,
            raw: data.to_vec(),
        })
    }
}

/// Video stream descriptor.
#[derive(Debug, Clone)]
pub struct VideoParameters {
    /// Codec kind.
    pub codec: VideoCodecId,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second, when known.
    pub frame_rate: Option<f64>,
    /// Codec configuration bytes (e.g. an AVCDecoderConfigurationRecord).
    pub extradata: Vec<u8>,
}

impl VideoParameters {
    /// H.264 descriptor.
    pub fn h264(width: u32, height: u32, frame_rate: f64, extradata: Vec<u8>) -> Self {
        VideoParameters {
            codec: VideoCodecId::H264,
            width,
            height,
            frame_rate: Some(frame_rate),
            extradata,
        }
    }

    /// H.265 descriptor.
    pub fn h265(width: u32, height: u32, frame_rate: f64, extradata: Vec<u8>) -> Self {
        VideoParameters {
            codec: VideoCodecId::H265,
            width,
            height,
            frame_rate: Some(frame_rate),
            extradata,
        }
    }

    /// Build the video `strf` payload: a 40-byte `BITMAPINFOHEADER`
    /// followed by the extradata.
    ///
    /// A descriptor without geometry is rejected, never defaulted.
    pub fn to_strf_payload(&self) -> Result<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            return Err(AviError::MissingGeometry);
        }
        let bih = BitmapInfoHeader {
            size: BitmapInfoHeader::SIZE as u32,
            width: self.width as i32,
            height: self.height as i32,
            planes: 1,
            bit_count: 24,
            compression: self.codec.compression(),
            size_image: self.width * self.height * 3,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            clr_used: 0,
            clr_important: 0,
        };
        let mut payload = Vec::with_capacity(BitmapInfoHeader::SIZE + self.extradata.len());
        bih.write_to(&mut payload)?;
        payload.extend_from_slice(&self.extradata);
        Ok(payload)
    }

    /// Recover a descriptor from a video `strf` payload. Returns `None`
    /// for compression codes outside this profile; the caller drops the
    /// stream.
    pub fn from_strf_payload(data: &[u8]) -> Result<Option<Self>> {
        let bih = BitmapInfoHeader::read_from(data)?;
        let Some(codec) = VideoCodecId::from_compression(bih.compression) else {
            return Ok(None);
        };
        Ok(Some(VideoParameters {
            codec,
            width: bih.width.unsigned_abs(),
            height: bih.height.unsigned_abs(),
            frame_rate: None,
            extradata: data[BitmapInfoHeader::SIZE..].to_vec(),
        }))
    }
}

/// Audio stream descriptor.
#[derive(Debug, Clone)]
pub struct AudioParameters {
    /// Codec kind.
    pub codec: AudioCodecId,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Codec configuration bytes (e.g. an MPEG-4 AudioSpecificConfig).
    pub extradata: Vec<u8>,
}

impl AudioParameters {
    /// AAC descriptor; the extradata is a synthesized AAC-LC
    /// AudioSpecificConfig for the given rate and channel count.
    pub fn aac(sample_rate: u32, channels: u16) -> Self {
        let config = AudioSpecificConfig::aac_lc(sample_rate, channels as u8);
        AudioParameters {
            codec: AudioCodecId::Aac,
            sample_rate,
            channels,
            extradata: config.raw,
        }
    }

    /// AAC descriptor from existing AudioSpecificConfig bytes; rate and
    /// channel count come from the config itself.
    pub fn aac_with_config(extradata: Vec<u8>) -> Result<Self> {
        let config = AudioSpecificConfig::parse(&extradata)?;
        Ok(AudioParameters {
            codec: AudioCodecId::Aac,
            sample_rate: config.sample_rate,
            channels: config.channels as u16,
            extradata,
        })
    }

    /// G.711 µ-law descriptor: mono, 8 kHz.
    pub fn pcm_mulaw() -> Self {
        AudioParameters {
            codec: AudioCodecId::PcmMulaw,
            sample_rate: 8000,
            channels: 1,
            extradata: Vec::new(),
        }
    }

    /// G.711 A-law descriptor: mono, 8 kHz.
    pub fn pcm_alaw() -> Self {
        AudioParameters {
            codec: AudioCodecId::PcmAlaw,
            sample_rate: 8000,
            channels: 1,
            extradata: Vec::new(),
        }
    }

    /// Build the audio `strf` payload: an 18-byte `WAVEFORMATEX` followed
    /// by `cb_size` extradata bytes.
    pub fn to_strf_payload(&self) -> Result<Vec<u8>> {
        let bits_per_sample = self.codec.bits_per_sample();
        let block_align = self.channels * bits_per_sample / 8;
        let wfx = WaveFormatEx {
            format_tag: self.codec.format_tag(),
            channels: self.channels,
            samples_per_sec: self.sample_rate,
            avg_bytes_per_sec: self.sample_rate * block_align as u32,
            block_align,
            bits_per_sample,
            cb_size: self.extradata.len() as u16,
        };
        let mut payload = Vec::with_capacity(WaveFormatEx::SIZE + self.extradata.len());
        wfx.write_to(&mut payload)?;
        payload.extend_from_slice(&self.extradata);
        Ok(payload)
    }

    /// Recover a descriptor from an audio `strf` payload. Returns `None`
    /// for format tags outside this profile.
    ///
    /// For AAC, a present and parseable AudioSpecificConfig wins; otherwise
    /// the descriptor is synthesized as stereo AAC-LC at the record's
    /// sample rate.
    pub fn from_strf_payload(data: &[u8]) -> Result<Option<Self>> {
        let wfx = WaveFormatEx::read_from(data)?;
        let Some(codec) = AudioCodecId::from_format_tag(wfx.format_tag) else {
            return Ok(None);
        };

        let extradata = if wfx.cb_size > 0 && data.len() >= WaveFormatEx::SIZE {
            let available = data.len() - WaveFormatEx::SIZE;
            let take = (wfx.cb_size as usize).min(available);
            data[WaveFormatEx::SIZE..WaveFormatEx::SIZE + take].to_vec()
        } else {
            Vec::new()
        };

        if codec == AudioCodecId::Aac {
            if let Ok(params) = Self::aac_with_config(extradata.clone()) {
                return Ok(Some(params));
            }
            return Ok(Some(AudioParameters::aac(wfx.samples_per_sec, 2)));
        }

        Ok(Some(AudioParameters {
            codec,
            sample_rate: wfx.samples_per_sec,
            channels: wfx.channels,
            extradata,
        }))
    }
}

/// Generic stream descriptor: a tagged variant rather than a behavioral
/// trait, because the bridge needs concrete field access.
#[derive(Debug, Clone)]
pub enum CodecParameters {
    Video(VideoParameters),
    Audio(AudioParameters),
}

impl CodecParameters {
    /// The stream kind this descriptor belongs to.
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Video(_) => StreamKind::Video,
            Self::Audio(_) => StreamKind::Audio,
        }
    }

    /// Unified codec identifier.
    pub fn codec_id(&self) -> CodecId {
        match self {
            Self::Video(v) => match v.codec {
                VideoCodecId::H264 => CodecId::H264,
                VideoCodecId::H265 => CodecId::H265,
            },
            Self::Audio(a) => match a.codec {
                AudioCodecId::Aac => CodecId::Aac,
                AudioCodecId::PcmMulaw => CodecId::PcmMulaw,
                AudioCodecId::PcmAlaw => CodecId::PcmAlaw,
            },
        }
    }

    /// Codec configuration bytes.
    pub fn extradata(&self) -> &[u8] {
        match self {
            Self::Video(v) => &v.extradata,
            Self::Audio(a) => &a.extradata,
        }
    }

    /// Video view, if this is a video descriptor.
    pub fn as_video(&self) -> Option<&VideoParameters> {
        match self {
            Self::Video(v) => Some(v),
            Self::Audio(_) => None,
        }
    }

    /// Audio view, if this is an audio descriptor.
    pub fn as_audio(&self) -> Option<&AudioParameters> {
        match self {
            Self::Audio(a) => Some(a),
            Self::Video(_) => None,
        }
    }
}

impl From<VideoParameters> for CodecParameters {
    fn from(params: VideoParameters) -> Self {
        CodecParameters::Video(params)
    }
}

impl From<AudioParameters> for CodecParameters {
    fn from(params: AudioParameters) -> Self {
        CodecParameters::Audio(params)
    }
}
