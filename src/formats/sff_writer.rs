use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;

use crate::binary_utils::{write_u16, write_u32};
use crate::formats::sff::SFF_SIGNATURE;
use crate::formats::sff_v2::{PALETTE_NODE_SIZE, SPRITE_NODE_SIZE};
use crate::formats::SffWriteError;

// Synthesises a minimal v2 archive: the header region, the sprite node
// table, a single dummy palette node and a literal data section holding
// the palette payload plus each sprite's embedded image bytes.

pub const WRITER_HEADER_SIZE: usize = 68;
pub const STAGE_THUMB_MAX_DIM: u32 = 320;

const FORMAT_PNG32: u8 = 12;
const MAX_WRITABLE_DIM: u32 = 4000;
const DUMMY_PALETTE_SIZE: usize = 4;

/// One sprite to place in a synthesised archive
#[derive(Debug, Clone)]
pub struct SpriteEntry {
    pub group: u16,
    pub image: u16,
    pub width: u16,
    pub height: u16,
    pub png_data: Vec<u8>,
}

impl SpriteEntry {
    pub fn from_image(group: u16, image_no: u16, image: &RgbaImage) -> Result<Self, SffWriteError> {
        if image.width() == 0
            || image.height() == 0
            || image.width() >= MAX_WRITABLE_DIM
            || image.height() >= MAX_WRITABLE_DIM
        {
            return Err(SffWriteError::ImageEncode(format!(
                "sprite dimensions {}x{} outside the supported range",
                image.width(),
                image.height()
            )));
        }

        Ok(SpriteEntry {
            group,
            image: image_no,
            width: image.width() as u16,
            height: image.height() as u16,
            png_data: encode_png(image)?,
        })
    }
}

/// Encode an RGBA bitmap as an in-memory PNG payload
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SffWriteError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageOutputFormat::Png)
        .map_err(|e| SffWriteError::ImageEncode(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Assemble the archive bytes for the given sprites
pub fn build_archive(sprites: &[SpriteEntry]) -> Vec<u8> {
    let sprite_table_offset = WRITER_HEADER_SIZE;
    let palette_table_offset = sprite_table_offset + sprites.len() * SPRITE_NODE_SIZE;
    let ldata_offset = palette_table_offset + PALETTE_NODE_SIZE;

    // Literal data starts with one fully transparent palette colour so
    // every 8-bit decode path has a palette to reference.
    let mut ldata = vec![0u8; DUMMY_PALETTE_SIZE];
    let mut payload_offsets = Vec::with_capacity(sprites.len());
    for sprite in sprites {
        payload_offsets.push(ldata.len() as u32);
        let mut hint = [0u8; 4];
        write_u32(
            &mut hint,
            sprite.width as u32 * sprite.height as u32 * 4,
            0,
        );
        ldata.extend_from_slice(&hint);
        ldata.extend_from_slice(&sprite.png_data);
    }

    let mut out = vec![0u8; ldata_offset];
    out[..SFF_SIGNATURE.len()].copy_from_slice(SFF_SIGNATURE);
    out[15] = 2; // version byte
    write_u32(&mut out, sprite_table_offset as u32, 36);
    write_u32(&mut out, sprites.len() as u32, 40);
    write_u32(&mut out, palette_table_offset as u32, 44);
    write_u32(&mut out, 1, 48);
    write_u32(&mut out, ldata_offset as u32, 52);
    write_u32(&mut out, ldata.len() as u32, 56);
    // The secondary data section stays empty; offsets 60/64 remain zero

    for (i, sprite) in sprites.iter().enumerate() {
        let base = sprite_table_offset + i * SPRITE_NODE_SIZE;
        write_u16(&mut out, sprite.group, base);
        write_u16(&mut out, sprite.image, base + 2);
        write_u16(&mut out, sprite.width, base + 4);
        write_u16(&mut out, sprite.height, base + 6);
        // Axes at 8/10 and the link index at 12 stay zero
        out[base + 14] = FORMAT_PNG32;
        out[base + 15] = 32;
        write_u32(&mut out, payload_offsets[i], base + 16);
        write_u32(&mut out, 4 + sprite.png_data.len() as u32, base + 20);
        // Palette index at 24 and flags at 26 stay zero
    }

    // Dummy palette node: one colour stored at the start of literal data
    write_u16(&mut out, 1, palette_table_offset + 4);
    write_u32(&mut out, DUMMY_PALETTE_SIZE as u32, palette_table_offset + 12);

    out.extend_from_slice(&ldata);
    out
}

/// Write an archive for the given sprites, never leaving a partial file
/// at the destination
pub fn write_archive(sprites: &[SpriteEntry], path: &Path) -> Result<(), SffWriteError> {
    write_bytes(&build_archive(sprites), path)
}

/// Assemble a stage archive: the full background as sprite 0,0 and a
/// proportionally downscaled preview thumbnail as sprite 9000,0
pub fn build_stage_archive(image: &RgbaImage) -> Result<Vec<u8>, SffWriteError> {
    let background = SpriteEntry::from_image(0, 0, image)?;

    let (thumb_width, thumb_height) =
        thumbnail_dimensions(image.width(), image.height(), STAGE_THUMB_MAX_DIM);
    let thumbnail = image::imageops::resize(image, thumb_width, thumb_height, FilterType::Triangle);
    let preview = SpriteEntry::from_image(9000, 0, &thumbnail)?;

    Ok(build_archive(&[background, preview]))
}

pub fn write_stage_background(image: &RgbaImage, path: &Path) -> Result<(), SffWriteError> {
    write_bytes(&build_stage_archive(image)?, path)
}

fn write_bytes(archive: &[u8], path: &Path) -> Result<(), SffWriteError> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, archive)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

fn thumbnail_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dim {
        return (width, height);
    }
    let scale = max_dim as f32 / longest as f32;
    (
        ((width as f32 * scale) as u32).max(1),
        ((height as f32 * scale) as u32).max(1),
    )
}
