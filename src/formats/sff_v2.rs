use std::io::Cursor;

use image::RgbaImage;

use crate::binary_utils::{read_i16_le, read_u16_le, read_u32_le, read_u8, seek_to};
use crate::formats::sff::SpriteInfo;
use crate::formats::{lz5, rle8, SffError};

// v2 archives replace the v1 chain with two randomly addressable node
// tables. Sprite payloads live in one of two shared data sections and
// palettes are cross-referenced by index, possibly through links.

pub const SPRITE_NODE_SIZE: usize = 28;
pub const PALETTE_NODE_SIZE: usize = 16;
pub const MAX_SPRITE_DIM: u16 = 4000;

const V2_HEADER_FIELDS_OFFSET: u64 = 36;
const MAX_TABLE_SCAN: usize = 5000;
const MAX_PALETTE_LINK_DEPTH: usize = 16;

const PORTRAIT_GROUP: u16 = 9000;
const PORTRAIT_MIN_DIM: u16 = 50;
const FALLBACK_MIN_DIM: u16 = 30;

/// Pixel storage formats a v2 sprite node can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Raw,
    Rle8,
    Rle5,
    Lz5,
    Png8,
    Png24,
    Png32,
}

impl PixelFormat {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(PixelFormat::Raw),
            2 => Some(PixelFormat::Rle8),
            3 => Some(PixelFormat::Rle5),
            4 => Some(PixelFormat::Lz5),
            10 => Some(PixelFormat::Png8),
            11 => Some(PixelFormat::Png24),
            12 => Some(PixelFormat::Png32),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Raw => "raw",
            PixelFormat::Rle8 => "rle8",
            PixelFormat::Rle5 => "rle5",
            PixelFormat::Lz5 => "lz5",
            PixelFormat::Png8 => "png8",
            PixelFormat::Png24 => "png24",
            PixelFormat::Png32 => "png32",
        }
    }
}

#[derive(Debug)]
struct V2Header {
    sprite_offset: u32,
    sprite_count: u32,
    palette_offset: u32,
    palette_count: u32,
    ldata_offset: u32,
    ldata_length: u32,
    tdata_offset: u32,
    tdata_length: u32,
}

#[derive(Debug, Clone)]
struct SpriteNode {
    group: u16,
    image: u16,
    width: u16,
    height: u16,
    axis_x: i16,
    axis_y: i16,
    link: u16,
    format: u8,
    depth: u8,
    data_offset: u32,
    data_length: u32,
    palette_index: u16,
    flags: u16,
}

#[derive(Debug)]
struct PaletteNode {
    color_count: u16,
    link: u16,
    data_offset: u32,
    data_length: u32,
}

fn read_header(data: &[u8]) -> Result<V2Header, SffError> {
    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, V2_HEADER_FIELDS_OFFSET)?;
    Ok(V2Header {
        sprite_offset: read_u32_le(&mut cursor)?,
        sprite_count: read_u32_le(&mut cursor)?,
        palette_offset: read_u32_le(&mut cursor)?,
        palette_count: read_u32_le(&mut cursor)?,
        ldata_offset: read_u32_le(&mut cursor)?,
        ldata_length: read_u32_le(&mut cursor)?,
        tdata_offset: read_u32_le(&mut cursor)?,
        tdata_length: read_u32_le(&mut cursor)?,
    })
}

fn read_sprite_node(data: &[u8], header: &V2Header, index: usize) -> Result<SpriteNode, SffError> {
    let offset = header.sprite_offset as u64 + (index * SPRITE_NODE_SIZE) as u64;
    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, offset)?;
    Ok(SpriteNode {
        group: read_u16_le(&mut cursor)?,
        image: read_u16_le(&mut cursor)?,
        width: read_u16_le(&mut cursor)?,
        height: read_u16_le(&mut cursor)?,
        axis_x: read_i16_le(&mut cursor)?,
        axis_y: read_i16_le(&mut cursor)?,
        link: read_u16_le(&mut cursor)?,
        format: read_u8(&mut cursor)?,
        depth: read_u8(&mut cursor)?,
        data_offset: read_u32_le(&mut cursor)?,
        data_length: read_u32_le(&mut cursor)?,
        palette_index: read_u16_le(&mut cursor)?,
        flags: read_u16_le(&mut cursor)?,
    })
}

fn read_palette_node(data: &[u8], header: &V2Header, index: usize) -> Result<PaletteNode, SffError> {
    let offset = header.palette_offset as u64 + (index * PALETTE_NODE_SIZE) as u64 + 4;
    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, offset)?;
    Ok(PaletteNode {
        color_count: read_u16_le(&mut cursor)?,
        link: read_u16_le(&mut cursor)?,
        data_offset: read_u32_le(&mut cursor)?,
        data_length: read_u32_le(&mut cursor)?,
    })
}

/// Resolve a palette table entry to 256 RGBA colours, following links
/// from empty entries to their targets. Traversal depth is capped so a
/// cyclic link chain cannot loop forever.
fn resolve_palette(
    data: &[u8],
    header: &V2Header,
    index: usize,
    depth: usize,
) -> Result<[[u8; 4]; 256], SffError> {
    if depth >= MAX_PALETTE_LINK_DEPTH {
        return Err(SffError::CorruptedData(
            "palette link chain too deep".to_string(),
        ));
    }
    if index >= header.palette_count as usize {
        return Err(SffError::CorruptedData(format!(
            "palette index {} out of range ({} palettes)",
            index, header.palette_count
        )));
    }

    let node = read_palette_node(data, header, index)?;
    if node.data_length == 0 {
        let link = node.link as usize;
        if node.link != 0 && link != index {
            return resolve_palette(data, header, link, depth + 1);
        }
        return Err(SffError::CorruptedData(format!(
            "palette {} declares no data and no usable link",
            index
        )));
    }

    let start = header.ldata_offset as u64 + node.data_offset as u64;
    let stop = start + node.data_length as u64;
    if node.data_offset as u64 + node.data_length as u64 > header.ldata_length as u64
        || stop > data.len() as u64
    {
        return Err(SffError::CorruptedData(format!(
            "palette {} payload out of range",
            index
        )));
    }

    let payload = &data[start as usize..stop as usize];
    let mut palette = [[0u8; 4]; 256];
    let colours = (node.color_count as usize).min(256).min(payload.len() / 4);
    for (i, colour) in palette.iter_mut().take(colours).enumerate() {
        let offset = i * 4;
        *colour = [
            payload[offset],
            payload[offset + 1],
            payload[offset + 2],
            payload[offset + 3],
        ];
    }
    Ok(palette)
}

/// Map 8-bit indices to RGBA; index 0 is always fully transparent
fn apply_palette(indices: &[u8], palette: &[[u8; 4]; 256]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(indices.len() * 4);
    for &index in indices {
        match index as usize {
            0 => pixels.extend_from_slice(&[0, 0, 0, 0]),
            i => pixels.extend_from_slice(&palette[i]),
        }
    }
    pixels
}

/// Locate a sprite's payload in its data section, rejecting any record
/// whose declared range leaves the section or the buffer
fn sprite_payload<'a>(
    data: &'a [u8],
    header: &V2Header,
    node: &SpriteNode,
) -> Result<&'a [u8], SffError> {
    let (section_offset, section_length) = if node.flags & 1 == 0 {
        (header.ldata_offset, header.ldata_length)
    } else {
        (header.tdata_offset, header.tdata_length)
    };

    if node.data_offset as u64 + node.data_length as u64 > section_length as u64 {
        return Err(SffError::CorruptedData(format!(
            "sprite payload {}+{} exceeds its {} byte data section",
            node.data_offset, node.data_length, section_length
        )));
    }

    let start = section_offset as u64 + node.data_offset as u64;
    let stop = start + node.data_length as u64;
    if stop > data.len() as u64 {
        return Err(SffError::CorruptedData(
            "sprite payload runs past the end of the archive".to_string(),
        ));
    }

    Ok(&data[start as usize..stop as usize])
}

fn decode_indexed_png(payload: &[u8]) -> Result<Vec<u8>, SffError> {
    // The raw index bytes are wanted here, not colours expanded through
    // the image's own internal palette
    let mut decoder = png::Decoder::new(payload);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder
        .read_info()
        .map_err(|e| SffError::DecodingFailed(format!("embedded image decode failed: {}", e)))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| SffError::DecodingFailed(format!("embedded image decode failed: {}", e)))?;

    if info.color_type != png::ColorType::Indexed || info.bit_depth != png::BitDepth::Eight {
        return Err(SffError::DecodingFailed(
            "expected an 8-bit indexed embedded image".to_string(),
        ));
    }

    buf.truncate(info.buffer_size());
    Ok(buf)
}

fn decode_sprite(data: &[u8], header: &V2Header, node: &SpriteNode) -> Result<RgbaImage, SffError> {
    if node.width == 0
        || node.height == 0
        || node.width >= MAX_SPRITE_DIM
        || node.height >= MAX_SPRITE_DIM
    {
        return Err(SffError::InvalidDimensions(node.width, node.height));
    }

    let payload = sprite_payload(data, header, node)?;
    let pixel_count = node.width as usize * node.height as usize;
    let format = PixelFormat::from_tag(node.format).ok_or_else(|| {
        SffError::DecodingFailed(format!("unknown pixel format tag {}", node.format))
    })?;

    let rgba = match format {
        PixelFormat::Raw => match node.depth {
            8 => {
                let palette = resolve_palette(data, header, node.palette_index as usize, 0)?;
                let mut indices = payload.to_vec();
                indices.resize(pixel_count, 0);
                apply_palette(&indices, &palette)
            }
            32 => {
                let mut pixels = payload.to_vec();
                pixels.resize(pixel_count * 4, 0);
                pixels
            }
            other => {
                return Err(SffError::DecodingFailed(format!(
                    "unsupported colour depth {} for raw pixel data",
                    other
                )))
            }
        },
        PixelFormat::Rle8 => {
            let palette = resolve_palette(data, header, node.palette_index as usize, 0)?;
            let mut indices = rle8::decode(payload, pixel_count);
            indices.resize(pixel_count, 0);
            apply_palette(&indices, &palette)
        }
        PixelFormat::Rle5 => {
            return Err(SffError::DecodingFailed(
                "RLE5 pixel data is not supported".to_string(),
            ))
        }
        PixelFormat::Lz5 => {
            let palette = resolve_palette(data, header, node.palette_index as usize, 0)?;
            let mut indices = lz5::decode(payload, pixel_count);
            indices.resize(pixel_count, 0);
            apply_palette(&indices, &palette)
        }
        PixelFormat::Png8 => {
            let palette = resolve_palette(data, header, node.palette_index as usize, 0)?;
            let mut indices = decode_indexed_png(payload)?;
            indices.resize(pixel_count, 0);
            apply_palette(&indices, &palette)
        }
        PixelFormat::Png24 | PixelFormat::Png32 => {
            // A 4 byte uncompressed-size hint precedes the image data
            if payload.len() < 4 {
                return Err(SffError::DecodingFailed(
                    "embedded image payload too short".to_string(),
                ));
            }
            let decoded = image::load_from_memory(&payload[4..]).map_err(|e| {
                SffError::DecodingFailed(format!("embedded image decode failed: {}", e))
            })?;
            return Ok(decoded.to_rgba8());
        }
    };

    RgbaImage::from_raw(node.width as u32, node.height as u32, rgba).ok_or_else(|| {
        SffError::DecodingFailed("pixel buffer does not match sprite dimensions".to_string())
    })
}

fn scan_limit(header: &V2Header) -> usize {
    (header.sprite_count as usize).min(MAX_TABLE_SCAN)
}

pub fn extract_portrait(data: &[u8]) -> Result<RgbaImage, SffError> {
    let header = read_header(data)?;

    // One pass over the table: the best portrait-group candidate wins,
    // preferring the first one larger than the icon threshold, with a
    // large enough group 0 entry kept as a fallback.
    let mut portrait: Option<SpriteNode> = None;
    let mut portrait_large = false;
    let mut fallback: Option<SpriteNode> = None;
    for index in 0..scan_limit(&header) {
        let node = read_sprite_node(data, &header, index)?;
        if node.link != 0 {
            continue;
        }
        if node.group == PORTRAIT_GROUP {
            let large = node.width > PORTRAIT_MIN_DIM && node.height > PORTRAIT_MIN_DIM;
            if portrait.is_none() || (large && !portrait_large) {
                portrait_large = large;
                portrait = Some(node);
            }
        } else if node.group == 0
            && node.image == 0
            && node.width > FALLBACK_MIN_DIM
            && node.height > FALLBACK_MIN_DIM
            && fallback.is_none()
        {
            fallback = Some(node);
        }
    }

    decode_first(data, &header, portrait, fallback)
}

pub fn extract_stage_preview(data: &[u8]) -> Result<RgbaImage, SffError> {
    let header = read_header(data)?;

    let mut preview: Option<SpriteNode> = None;
    let mut fallback: Option<SpriteNode> = None;
    for index in 0..scan_limit(&header) {
        let node = read_sprite_node(data, &header, index)?;
        if node.link != 0 {
            continue;
        }
        if node.group == PORTRAIT_GROUP {
            if preview.is_none() {
                preview = Some(node);
            }
        } else if node.group == 0 && node.image == 0 && fallback.is_none() {
            fallback = Some(node);
        }
    }

    decode_first(data, &header, preview, fallback)
}

fn decode_first(
    data: &[u8],
    header: &V2Header,
    primary: Option<SpriteNode>,
    fallback: Option<SpriteNode>,
) -> Result<RgbaImage, SffError> {
    let mut last_error = None;
    for node in [primary, fallback].into_iter().flatten() {
        match decode_sprite(data, header, &node) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or(SffError::SpriteNotFound(PORTRAIT_GROUP, 0)))
}

pub fn extract_sprite(data: &[u8], group: u16, image: u16) -> Result<RgbaImage, SffError> {
    let header = read_header(data)?;

    for index in 0..scan_limit(&header) {
        let node = read_sprite_node(data, &header, index)?;
        if node.group != group || node.image != image {
            continue;
        }
        if node.link != 0 {
            continue;
        }
        return decode_sprite(data, &header, &node);
    }

    Err(SffError::SpriteNotFound(group, image))
}

pub fn list_sprites(data: &[u8]) -> Result<Vec<SpriteInfo>, SffError> {
    let header = read_header(data)?;

    let mut sprites = Vec::with_capacity(scan_limit(&header));
    for index in 0..scan_limit(&header) {
        let node = read_sprite_node(data, &header, index)?;
        sprites.push(SpriteInfo {
            group: node.group,
            image: node.image,
            width: node.width,
            height: node.height,
            axis_x: node.axis_x,
            axis_y: node.axis_y,
            linked: node.link != 0,
            format: PixelFormat::from_tag(node.format)
                .map(PixelFormat::name)
                .unwrap_or("unknown"),
        });
    }

    Ok(sprites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary_utils::{write_u16, write_u32};
    use crate::formats::{sff, sff_writer};

    struct TestNode {
        group: u16,
        image: u16,
        width: u16,
        height: u16,
        link: u16,
        format: u8,
        depth: u8,
        palette_index: u16,
        data: Vec<u8>,
        data_length: Option<u32>, // overrides the real payload length
    }

    impl TestNode {
        fn indexed(group: u16, image: u16, width: u16, height: u16, data: Vec<u8>) -> Self {
            TestNode {
                group,
                image,
                width,
                height,
                link: 0,
                format: 0,
                depth: 8,
                palette_index: 0,
                data,
                data_length: None,
            }
        }
    }

    struct TestPalette {
        link: u16,
        data: Vec<u8>,
    }

    fn rgba_palette(colours: &[[u8; 4]]) -> TestPalette {
        TestPalette {
            link: 0,
            data: colours.iter().flatten().copied().collect(),
        }
    }

    fn build_v2_archive(nodes: &[TestNode], palettes: &[TestPalette]) -> Vec<u8> {
        let sprite_offset = 68usize;
        let palette_offset = sprite_offset + nodes.len() * SPRITE_NODE_SIZE;
        let ldata_offset = palette_offset + palettes.len() * PALETTE_NODE_SIZE;

        let mut ldata = Vec::new();
        let mut palette_offsets = Vec::new();
        for palette in palettes {
            palette_offsets.push(ldata.len() as u32);
            ldata.extend_from_slice(&palette.data);
        }
        let mut node_offsets = Vec::new();
        for node in nodes {
            node_offsets.push(ldata.len() as u32);
            ldata.extend_from_slice(&node.data);
        }

        let mut data = vec![0u8; ldata_offset];
        data[..12].copy_from_slice(sff::SFF_SIGNATURE);
        data[15] = 2;
        write_u32(&mut data, sprite_offset as u32, 36);
        write_u32(&mut data, nodes.len() as u32, 40);
        write_u32(&mut data, palette_offset as u32, 44);
        write_u32(&mut data, palettes.len() as u32, 48);
        write_u32(&mut data, ldata_offset as u32, 52);
        write_u32(&mut data, ldata.len() as u32, 56);

        for (i, node) in nodes.iter().enumerate() {
            let base = sprite_offset + i * SPRITE_NODE_SIZE;
            write_u16(&mut data, node.group, base);
            write_u16(&mut data, node.image, base + 2);
            write_u16(&mut data, node.width, base + 4);
            write_u16(&mut data, node.height, base + 6);
            write_u16(&mut data, node.link, base + 12);
            data[base + 14] = node.format;
            data[base + 15] = node.depth;
            write_u32(&mut data, node_offsets[i], base + 16);
            let length = node.data_length.unwrap_or(node.data.len() as u32);
            write_u32(&mut data, length, base + 20);
            write_u16(&mut data, node.palette_index, base + 24);
        }

        for (i, palette) in palettes.iter().enumerate() {
            let base = palette_offset + i * PALETTE_NODE_SIZE;
            write_u16(&mut data, (palette.data.len() / 4) as u16, base + 4);
            write_u16(&mut data, palette.link, base + 6);
            write_u32(&mut data, palette_offsets[i], base + 8);
            write_u32(&mut data, palette.data.len() as u32, base + 12);
        }

        data.extend_from_slice(&ldata);
        data
    }

    fn test_palette() -> TestPalette {
        rgba_palette(&[
            [0, 0, 0, 255],
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
        ])
    }

    #[test]
    fn decodes_a_raw_indexed_sprite() {
        let node = TestNode::indexed(9000, 0, 2, 2, vec![0, 1, 2, 3]);
        let data = build_v2_archive(&[node], &[test_palette()]);

        let portrait = extract_portrait(&data).unwrap();
        assert_eq!((portrait.width(), portrait.height()), (2, 2));
        assert_eq!(portrait.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(portrait.get_pixel(1, 0).0, [255, 0, 0, 255]);
        assert_eq!(portrait.get_pixel(0, 1).0, [0, 255, 0, 255]);
        assert_eq!(portrait.get_pixel(1, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn rle8_sprites_decode_through_the_palette() {
        let mut node = TestNode::indexed(9000, 0, 2, 2, vec![0x44, 2]); // run of four twos
        node.format = 2;
        let data = build_v2_archive(&[node], &[test_palette()]);

        let portrait = extract_portrait(&data).unwrap();
        assert_eq!(portrait.get_pixel(1, 1).0, [0, 255, 0, 255]);
    }

    #[test]
    fn lz5_sprites_decode_through_the_palette() {
        // Hint, one literal-control byte, four literal indices
        let mut node = TestNode::indexed(9000, 0, 2, 2, vec![0, 0, 0, 0, 0, 1, 1, 3, 3]);
        node.format = 4;
        let data = build_v2_archive(&[node], &[test_palette()]);

        let portrait = extract_portrait(&data).unwrap();
        assert_eq!(portrait.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(portrait.get_pixel(1, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn rle5_sprites_are_a_decode_failure() {
        let mut node = TestNode::indexed(9000, 0, 2, 2, vec![0, 0, 0, 0]);
        node.format = 3;
        let data = build_v2_archive(&[node], &[test_palette()]);

        assert!(matches!(
            extract_sprite(&data, 9000, 0),
            Err(SffError::DecodingFailed(_))
        ));
    }

    #[test]
    fn payload_overruns_are_corrupted_data() {
        let mut node = TestNode::indexed(9000, 0, 2, 2, vec![0, 1, 2, 3]);
        node.data_length = Some(100_000);
        let data = build_v2_archive(&[node], &[test_palette()]);

        assert!(matches!(
            extract_sprite(&data, 9000, 0),
            Err(SffError::CorruptedData(_))
        ));
    }

    #[test]
    fn linked_sprites_are_skipped() {
        let mut node = TestNode::indexed(9000, 0, 2, 2, Vec::new());
        node.link = 1;
        let data = build_v2_archive(&[node], &[test_palette()]);

        assert!(matches!(
            extract_portrait(&data),
            Err(SffError::SpriteNotFound(9000, 0))
        ));
    }

    #[test]
    fn invalid_dimensions_are_rejected() {
        let node = TestNode::indexed(9000, 0, 0, 2, vec![0, 1]);
        let data = build_v2_archive(&[node], &[test_palette()]);

        assert!(matches!(
            extract_sprite(&data, 9000, 0),
            Err(SffError::InvalidDimensions(0, 2))
        ));
    }

    #[test]
    fn palette_links_resolve_to_their_target() {
        let mut node = TestNode::indexed(9000, 0, 2, 2, vec![1, 1, 1, 1]);
        node.palette_index = 1;

        // Palette 1 declares no data and links to palette 2
        let data = build_v2_archive(
            &[node],
            &[
                rgba_palette(&[[9, 9, 9, 255], [1, 2, 3, 255]]),
                TestPalette {
                    link: 2,
                    data: Vec::new(),
                },
                test_palette(),
            ],
        );

        let portrait = extract_portrait(&data).unwrap();
        assert_eq!(portrait.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn cyclic_palette_links_are_corrupted_data() {
        let mut node = TestNode::indexed(9000, 0, 2, 2, vec![1, 1, 1, 1]);
        node.palette_index = 1;
        let data = build_v2_archive(
            &[node],
            &[
                test_palette(),
                TestPalette {
                    link: 2,
                    data: Vec::new(),
                },
                TestPalette {
                    link: 1,
                    data: Vec::new(),
                },
            ],
        );

        assert!(matches!(
            extract_sprite(&data, 9000, 0),
            Err(SffError::CorruptedData(_))
        ));
    }

    fn encode_indexed_png(width: u32, height: u32, indices: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            // The internal palette is mandatory for the colour type but
            // the reader ignores it in favour of the archive's palette
            encoder.set_palette(vec![0u8; 12]);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(indices).unwrap();
        }
        out
    }

    #[test]
    fn embedded_indexed_png_maps_through_the_archive_palette() {
        let mut node = TestNode::indexed(9000, 0, 2, 2, encode_indexed_png(2, 2, &[0, 1, 2, 3]));
        node.format = 10;
        let data = build_v2_archive(&[node], &[test_palette()]);

        let portrait = extract_portrait(&data).unwrap();
        assert_eq!(portrait.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(portrait.get_pixel(1, 0).0, [255, 0, 0, 255]);
        assert_eq!(portrait.get_pixel(1, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn embedded_png_sprites_decode_at_their_declared_size() {
        let source = RgbaImage::from_fn(100, 100, |x, y| {
            image::Rgba([x as u8, y as u8, 0, 255])
        });
        let png = sff_writer::encode_png(&source).unwrap();
        let mut payload = vec![0u8; 4];
        write_u32(&mut payload, 100 * 100 * 4, 0);
        payload.extend_from_slice(&png);

        let mut node = TestNode::indexed(9000, 0, 100, 100, payload);
        node.format = 12;
        node.depth = 32;
        let data = build_v2_archive(&[node], &[test_palette()]);

        let portrait = extract_portrait(&data).unwrap();
        assert_eq!((portrait.width(), portrait.height()), (100, 100));
        assert_eq!(portrait.get_pixel(30, 40).0, [30, 40, 0, 255]);
    }

    #[test]
    fn small_portraits_lose_to_larger_group_9000_entries() {
        let small = TestNode::indexed(9000, 0, 2, 2, vec![1, 1, 1, 1]);
        let large_data = vec![2u8; 60 * 60];
        let large = TestNode::indexed(9000, 1, 60, 60, large_data);
        let data = build_v2_archive(&[small, large], &[test_palette()]);

        let portrait = extract_portrait(&data).unwrap();
        assert_eq!((portrait.width(), portrait.height()), (60, 60));
    }

    #[test]
    fn stage_preview_ignores_size_thresholds() {
        let node = TestNode::indexed(9000, 0, 2, 2, vec![1, 1, 1, 1]);
        let data = build_v2_archive(&[node], &[test_palette()]);

        let preview = extract_stage_preview(&data).unwrap();
        assert_eq!((preview.width(), preview.height()), (2, 2));
    }

    #[test]
    fn group_zero_fallback_needs_the_minimum_size() {
        let tiny = TestNode::indexed(0, 0, 8, 8, vec![1; 64]);
        let data = build_v2_archive(&[tiny], &[test_palette()]);

        // Too small for the portrait fallback, fine for a stage preview
        assert!(matches!(
            extract_portrait(&data),
            Err(SffError::SpriteNotFound(9000, 0))
        ));
        assert!(extract_stage_preview(&data).is_ok());
    }

    #[test]
    fn lists_nodes_with_format_names() {
        let raw = TestNode::indexed(0, 0, 2, 2, vec![0, 1, 2, 3]);
        let mut linked = TestNode::indexed(9000, 0, 2, 2, Vec::new());
        linked.link = 1;
        let data = build_v2_archive(&[raw, linked], &[test_palette()]);

        let sprites = list_sprites(&data).unwrap();
        assert_eq!(sprites.len(), 2);
        assert_eq!(sprites[0].format, "raw");
        assert!(!sprites[0].linked);
        assert!(sprites[1].linked);
    }
}
