use std::io::Cursor;

use image::RgbaImage;

use crate::binary_utils::{read_i16_le, read_u16_le, read_u32_le, read_u8, seek_to};
use crate::formats::pcx::{self, PcxImage};
use crate::formats::sff::SpriteInfo;
use crate::formats::SffError;

// v1 archives chain 32 byte subfile headers together through absolute
// "next" offsets, each followed by an inline PCX payload.

pub const V1_RECORD_HEADER_SIZE: usize = 32;
const V1_HEADER_FIELDS_OFFSET: u64 = 16;
const MAX_CHAIN_WALK: usize = 5000;

const PORTRAIT_TARGETS: [(u16, u16); 3] = [(9000, 0), (9000, 1), (0, 0)];
const STAGE_TARGETS: [(u16, u16); 2] = [(9000, 0), (0, 0)];

#[derive(Debug)]
struct V1Header {
    _group_count: u32,
    image_count: u32,
    first_offset: u32,
}

#[derive(Debug)]
struct V1Record {
    group: u16,
    image: u16,
    axis_x: i16,
    axis_y: i16,
    link: u16,
    same_palette: bool,
    payload_start: usize,
    payload_len: usize,
}

fn read_header(data: &[u8]) -> Result<V1Header, SffError> {
    let mut cursor = Cursor::new(data);
    seek_to(&mut cursor, V1_HEADER_FIELDS_OFFSET)?;
    let group_count = read_u32_le(&mut cursor)?;
    let image_count = read_u32_le(&mut cursor)?;
    let first_offset = read_u32_le(&mut cursor)?;
    let record_size = read_u32_le(&mut cursor)?;

    if record_size != V1_RECORD_HEADER_SIZE as u32 {
        return Err(SffError::CorruptedData(format!(
            "unexpected subfile header size {}",
            record_size
        )));
    }

    Ok(V1Header {
        _group_count: group_count,
        image_count,
        first_offset,
    })
}

/// Walk the subfile chain, stopping on a zero or non-increasing next
/// offset and never visiting more than the declared image count
fn collect_records(data: &[u8], header: &V1Header) -> Result<Vec<V1Record>, SffError> {
    let mut records = Vec::new();
    if header.image_count == 0 {
        return Ok(records);
    }

    let mut offset = header.first_offset as usize;
    if offset == 0 || offset >= data.len() {
        return Err(SffError::CorruptedData(format!(
            "first subfile offset {} out of range",
            offset
        )));
    }

    let walk_limit = (header.image_count as usize).min(MAX_CHAIN_WALK);
    for _ in 0..walk_limit {
        let mut cursor = Cursor::new(data);
        seek_to(&mut cursor, offset as u64)?;
        let next_offset = read_u32_le(&mut cursor)? as usize;
        let payload_len = read_u32_le(&mut cursor)? as usize;
        let axis_x = read_i16_le(&mut cursor)?;
        let axis_y = read_i16_le(&mut cursor)?;
        let group = read_u16_le(&mut cursor)?;
        let image = read_u16_le(&mut cursor)?;
        let link = read_u16_le(&mut cursor)?;
        let same_palette = read_u8(&mut cursor)? != 0;

        let payload_start = offset + V1_RECORD_HEADER_SIZE;
        if payload_start + payload_len > data.len() {
            return Err(SffError::CorruptedData(format!(
                "subfile payload at {} runs past the end of the archive",
                payload_start
            )));
        }

        records.push(V1Record {
            group,
            image,
            axis_x,
            axis_y,
            link,
            same_palette,
            payload_start,
            payload_len,
        });

        if next_offset == 0 || next_offset <= offset {
            break;
        }
        offset = next_offset;
    }

    Ok(records)
}

fn is_linked(record: &V1Record, image_count: u32) -> bool {
    record.link != 0 && (record.link as u32) < image_count
}

fn payload<'a>(data: &'a [u8], record: &V1Record) -> &'a [u8] {
    &data[record.payload_start..record.payload_start + record.payload_len]
}

/// The first subfile's palette doubles as the shared palette for later
/// records flagged as reusing it
fn shared_palette(data: &[u8], records: &[V1Record]) -> Option<Vec<[u8; 3]>> {
    records
        .first()
        .and_then(|record| pcx::trailing_palette(payload(data, record)))
}

fn decode_record(
    data: &[u8],
    record: &V1Record,
    shared: Option<&[[u8; 3]]>,
) -> Result<RgbaImage, SffError> {
    let image = PcxImage::from_bytes(payload(data, record))?;
    let fallback = if record.same_palette { shared } else { None };
    image.to_rgba(fallback)
}

pub fn extract_sprite(data: &[u8], group: u16, image: u16) -> Result<RgbaImage, SffError> {
    let header = read_header(data)?;
    let records = collect_records(data, &header)?;
    let shared = shared_palette(data, &records);

    for record in &records {
        if record.group == group && record.image == image {
            if is_linked(record, header.image_count) {
                continue;
            }
            return decode_record(data, record, shared.as_deref());
        }
    }

    Err(SffError::SpriteNotFound(group, image))
}

pub fn extract_portrait(data: &[u8]) -> Result<RgbaImage, SffError> {
    extract_first_of(data, &PORTRAIT_TARGETS)
}

pub fn extract_stage_preview(data: &[u8]) -> Result<RgbaImage, SffError> {
    extract_first_of(data, &STAGE_TARGETS)
}

/// Try each conventional group/image pair in turn, returning the first
/// sprite that decodes successfully
fn extract_first_of(data: &[u8], targets: &[(u16, u16)]) -> Result<RgbaImage, SffError> {
    let header = read_header(data)?;
    let records = collect_records(data, &header)?;
    let shared = shared_palette(data, &records);

    for &(group, image) in targets {
        for record in &records {
            if record.group != group || record.image != image {
                continue;
            }
            if is_linked(record, header.image_count) {
                continue;
            }
            if let Ok(decoded) = decode_record(data, record, shared.as_deref()) {
                return Ok(decoded);
            }
        }
    }

    Err(SffError::SpriteNotFound(targets[0].0, targets[0].1))
}

pub fn list_sprites(data: &[u8]) -> Result<Vec<SpriteInfo>, SffError> {
    let header = read_header(data)?;
    let records = collect_records(data, &header)?;

    let mut sprites = Vec::with_capacity(records.len());
    for record in &records {
        let linked = is_linked(record, header.image_count);
        let (width, height) = if linked || record.payload_len == 0 {
            (0, 0)
        } else {
            pcx::read_dimensions(payload(data, record)).unwrap_or((0, 0))
        };

        sprites.push(SpriteInfo {
            group: record.group,
            image: record.image,
            width,
            height,
            axis_x: record.axis_x,
            axis_y: record.axis_y,
            linked,
            format: "pcx",
        });
    }

    Ok(sprites)
}
