//! PNG encoding for indexed frame images.
//!
//! Frames always carry at most 256 colors (the palette ramp plus reserved
//! overlay/transparent slots), so everything is written as indexed PNG
//! (color type 3): 1 byte per pixel, PLTE for colors, tRNS for the
//! transparent slot, and one `tEXt` chunk per metadata entry.

use crate::error::RenderError;
use std::io::Write;

/// A `keyword: value` pair written as a PNG `tEXt` chunk.
///
/// Keywords follow the PNG convention: 1-79 Latin-1 characters, no NUL.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub keyword: String,
    pub value: String,
}

impl TextChunk {
    pub fn new(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
        }
    }
}

/// Encode an indexed PNG (color type 3) from palette and indices.
///
/// # Arguments
/// - `width`, `height`: image dimensions in pixels
/// - `palette`: RGBA palette entries; alpha < 255 entries go into tRNS
/// - `indices`: one palette index per pixel, row-major
/// - `texts`: metadata chunks (frame title etc.), written before IDAT
pub fn encode_indexed(
    width: usize,
    height: usize,
    palette: &[(u8, u8, u8, u8)],
    indices: &[u8],
    texts: &[TextChunk],
) -> Result<Vec<u8>, RenderError> {
    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth (8 bits per palette index)
    ihdr_data.push(3); // color type 3 = indexed
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    // PLTE chunk (palette)
    let mut plte_data = Vec::with_capacity(palette.len() * 3);
    for (r, g, b, _) in palette {
        plte_data.push(*r);
        plte_data.push(*g);
        plte_data.push(*b);
    }
    write_chunk(&mut png, b"PLTE", &plte_data);

    // tRNS chunk (transparency), only if any entry has alpha < 255
    let has_transparency = palette.iter().any(|(_, _, _, a)| *a < 255);
    if has_transparency {
        let trns_data: Vec<u8> = palette.iter().map(|(_, _, _, a)| *a).collect();
        write_chunk(&mut png, b"tRNS", &trns_data);
    }

    // tEXt chunks (frame metadata)
    for text in texts {
        let data = encode_text_chunk(text)?;
        write_chunk(&mut png, b"tEXt", &data);
    }

    // IDAT chunk (image data)
    let idat_data = deflate_idat_indexed(indices, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    // IEND chunk
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Serialize a tEXt payload: keyword, NUL separator, text.
fn encode_text_chunk(text: &TextChunk) -> Result<Vec<u8>, RenderError> {
    let keyword = text.keyword.as_bytes();
    if keyword.is_empty() || keyword.len() > 79 || keyword.contains(&0) {
        return Err(RenderError::InvalidTextKeyword(text.keyword.clone()));
    }

    let mut data = Vec::with_capacity(keyword.len() + 1 + text.value.len());
    data.extend_from_slice(keyword);
    data.push(0);
    // tEXt is Latin-1; non-ASCII is mapped to '?' rather than emitting
    // invalid bytes.
    data.extend(
        text.value
            .chars()
            .map(|c| if c.is_ascii() && c != '\0' { c as u8 } else { b'?' }),
    );
    Ok(data)
}

/// Deflate indexed image data for the IDAT chunk.
fn deflate_idat_indexed(indices: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    // Each scanline is a filter byte (0 = none) plus width index bytes.
    let mut uncompressed = Vec::with_capacity(height * (1 + width));

    for y in 0..height {
        uncompressed.push(0); // filter type: none
        let row_start = y * width;
        let row_end = row_start + width;
        uncompressed.extend_from_slice(&indices[row_start..row_end]);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

/// Write a PNG chunk: length, type, data, CRC over type+data.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let crc_data = [chunk_type.as_slice(), data].concat();
    let crc = crc32fast::hash(&crc_data);
    png.extend_from_slice(&crc.to_be_bytes());
}
