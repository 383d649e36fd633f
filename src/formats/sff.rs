//! SFF sprite archive container handling
//!
//! Two incompatible major revisions exist: v1 stores a forward-linked
//! chain of PCX subfiles, v2 stores fixed-size sprite and palette node
//! tables over two shared data sections. The entry points here validate
//! the container signature and dispatch to the matching reader.

use image::RgbaImage;
use serde::Serialize;

use crate::formats::{sff_v1, sff_v2, SffError};

pub const SFF_SIGNATURE: &[u8; 12] = b"ElecbyteSpr\0";
pub const SFF_MIN_HEADER_SIZE: usize = 32;
pub const SFF_VERSION_OFFSET: usize = 15;

/// One sprite table entry, reported without decoding pixel data
#[derive(Debug, Clone, Serialize)]
pub struct SpriteInfo {
    pub group: u16,
    pub image: u16,
    pub width: u16,
    pub height: u16,
    pub axis_x: i16,
    pub axis_y: i16,
    pub linked: bool,
    pub format: &'static str,
}

/// Validate the container signature and return the version byte
pub(crate) fn archive_version(data: &[u8]) -> Result<u8, SffError> {
    if data.len() < SFF_MIN_HEADER_SIZE {
        return Err(SffError::FileTooSmall);
    }
    if !data.starts_with(SFF_SIGNATURE) {
        return Err(SffError::InvalidSignature);
    }
    match data[SFF_VERSION_OFFSET] {
        0 => Err(SffError::UnsupportedVersion(0)),
        version => Ok(version),
    }
}

/// Extract the character select portrait from an archive buffer
pub fn extract_portrait(data: &[u8]) -> Result<RgbaImage, SffError> {
    if archive_version(data)? >= 2 {
        sff_v2::extract_portrait(data)
    } else {
        sff_v1::extract_portrait(data)
    }
}

/// Extract the stage preview thumbnail from an archive buffer
pub fn extract_stage_preview(data: &[u8]) -> Result<RgbaImage, SffError> {
    if archive_version(data)? >= 2 {
        sff_v2::extract_stage_preview(data)
    } else {
        sff_v1::extract_stage_preview(data)
    }
}

/// Extract one sprite by its group/image pair; the first occurrence in
/// table order wins and linked records are skipped
pub fn extract_sprite(data: &[u8], group: u16, image: u16) -> Result<RgbaImage, SffError> {
    if archive_version(data)? >= 2 {
        sff_v2::extract_sprite(data, group, image)
    } else {
        sff_v1::extract_sprite(data, group, image)
    }
}

/// Enumerate every sprite record in the archive without decoding pixels
pub fn list_sprites(data: &[u8]) -> Result<Vec<SpriteInfo>, SffError> {
    if archive_version(data)? >= 2 {
        sff_v2::list_sprites(data)
    } else {
        sff_v1::list_sprites(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_buffers_are_rejected_by_every_entry_point() {
        let data = vec![0u8; SFF_MIN_HEADER_SIZE - 1];

        assert!(matches!(
            extract_portrait(&data),
            Err(SffError::FileTooSmall)
        ));
        assert!(matches!(
            extract_stage_preview(&data),
            Err(SffError::FileTooSmall)
        ));
        assert!(matches!(
            extract_sprite(&data, 9000, 0),
            Err(SffError::FileTooSmall)
        ));
        assert!(matches!(list_sprites(&data), Err(SffError::FileTooSmall)));
    }

    #[test]
    fn wrong_signature_is_rejected_by_every_entry_point() {
        let mut data = vec![0u8; 64];
        data[..12].copy_from_slice(b"NotAnArchive");
        data[15] = 2;

        assert!(matches!(
            extract_portrait(&data),
            Err(SffError::InvalidSignature)
        ));
        assert!(matches!(
            extract_stage_preview(&data),
            Err(SffError::InvalidSignature)
        ));
        assert!(matches!(
            extract_sprite(&data, 0, 0),
            Err(SffError::InvalidSignature)
        ));
        assert!(matches!(
            list_sprites(&data),
            Err(SffError::InvalidSignature)
        ));
    }

    #[test]
    fn case_sensitive_signature_match() {
        let mut data = vec![0u8; 64];
        data[..12].copy_from_slice(b"ELECBYTESPR\0");
        data[15] = 1;

        assert!(matches!(
            extract_portrait(&data),
            Err(SffError::InvalidSignature)
        ));
    }

    #[test]
    fn version_zero_is_unsupported() {
        let mut data = vec![0u8; 64];
        data[..12].copy_from_slice(SFF_SIGNATURE);
        data[15] = 0;

        assert!(matches!(
            extract_portrait(&data),
            Err(SffError::UnsupportedVersion(0))
        ));
    }
}
