pub mod lz5;
pub mod pcx;
pub mod rle8;
pub mod sff;
pub mod sff_v1;
pub mod sff_v2;
pub mod sff_writer;

use std::fmt;
use std::io;

/// Error type for SFF archive reading
#[derive(Debug)]
pub enum SffError {
    /// Buffer shorter than the minimum archive header
    FileTooSmall,
    /// Signature bytes at the start of the archive do not match
    InvalidSignature,
    /// Version byte names a revision no reader handles
    UnsupportedVersion(u8),
    /// No decodable sprite exists for the requested group/image pair
    SpriteNotFound(u16, u16),
    /// Structural damage: counts, offsets or payloads out of range
    CorruptedData(String),
    /// Pixel data could not be decoded
    DecodingFailed(String),
    /// Sprite dimensions outside the permitted range
    InvalidDimensions(u16, u16),
}

impl From<io::Error> for SffError {
    fn from(err: io::Error) -> Self {
        SffError::CorruptedData(err.to_string())
    }
}

impl fmt::Display for SffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SffError::FileTooSmall => write!(f, "File too small to be an SFF archive"),
            SffError::InvalidSignature => write!(f, "Not an SFF archive (bad signature)"),
            SffError::UnsupportedVersion(version) => {
                write!(f, "Unsupported SFF version: {}", version)
            }
            SffError::SpriteNotFound(group, image) => {
                write!(f, "Sprite {},{} not found", group, image)
            }
            SffError::CorruptedData(msg) => write!(f, "Corrupted SFF data: {}", msg),
            SffError::DecodingFailed(msg) => write!(f, "Sprite decoding failed: {}", msg),
            SffError::InvalidDimensions(width, height) => {
                write!(f, "Invalid sprite dimensions: {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for SffError {}

/// Error type for SFF archive synthesis
#[derive(Debug)]
pub enum SffWriteError {
    /// Sprite payload could not be encoded
    ImageEncode(String),
    /// Writing the archive file failed
    Io(io::Error),
}

impl From<io::Error> for SffWriteError {
    fn from(err: io::Error) -> Self {
        SffWriteError::Io(err)
    }
}

impl fmt::Display for SffWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SffWriteError::ImageEncode(msg) => write!(f, "Image encoding failed: {}", msg),
            SffWriteError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for SffWriteError {}
