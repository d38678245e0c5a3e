//! AVI-specific error types.

use crate::chunks::FourCC;
use thiserror::Error;

/// Errors produced while reading or writing AVI containers.
#[derive(Error, Debug)]
pub enum AviError {
    /// A fixed-layout record was shorter than its defined size.
    #[error("Truncated record: need {needed} bytes, have {available}")]
    TruncatedRecord {
        /// Bytes the record layout requires.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// The outer signature is not `RIFF` + `AVI `.
    #[error("Not an AVI file")]
    NotAvi,

    /// The input ended in the middle of a chunk or index entry.
    #[error("Unexpected end of file")]
    UnexpectedEof,

    /// An `idx1` entry disagrees with the chunk actually present at the
    /// indexed offset.
    #[error("Index mismatch at offset {offset}: index names '{expected}', file has '{found}'")]
    IndexMismatch {
        /// Chunk ID recorded in the index entry.
        expected: FourCC,
        /// Chunk ID found in the file.
        found: FourCC,
        /// Absolute byte offset of the chunk header.
        offset: u64,
    },

    /// A stream chunk ID had non-digit stream bytes or an unknown kind
    /// suffix.
    #[error("Unrecognized chunk ID: {:?}", String::from_utf8_lossy(.0))]
    UnrecognizedChunkId([u8; 4]),

    /// The muxer received a packet for a stream index not declared in the
    /// header.
    #[error("Stream index {0} matches no declared stream")]
    StreamOutOfRange(u32),

    /// The sink rejected a seek required to patch header fields.
    #[error("Sink is not seekable: {0}")]
    SinkNotSeekable(String),

    /// No mapping exists between this codec and an AVI compression FourCC
    /// or wave format tag.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// A video descriptor carried no usable width/height.
    #[error("Video descriptor has no geometry")]
    MissingGeometry,

    /// The descriptor list contained neither a video nor an audio stream.
    #[error("No audio or video streams to write")]
    NoStreams,

    /// I/O error from the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for AVI operations.
pub type Result<T> = std::result::Result<T, AviError>;

impl AviError {
    /// Classify a read error: an `UnexpectedEof` kind means the file was
    /// truncated mid-record, everything else stays an I/O error.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            AviError::UnexpectedEof
        } else {
            AviError::Io(err)
        }
    }
}
