use crate::errors::CodecError;
use png::{BitDepth, ColorType, Transformations};
use std::io::Cursor;

/// A palette-based raster. `pixels` holds the packed scanlines exactly as PNG
/// stores them at `depth` bits per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub depth: BitDepth,
    /// RGBA, with alpha taken from `tRNS` (opaque when absent).
    pub palette: Vec<[u8; 4]>,
    pub pixels: Vec<u8>,
}

/// Entries below this index are control colours and never substituted.
pub const RESERVED_COLORS: usize = 2;

impl IndexedImage {
    /// Returns a copy of `self` whose colour table takes every non-reserved
    /// entry from `palette`, as far as both tables reach.
    pub fn with_palette_from(&self, palette: &IndexedImage) -> IndexedImage {
        let mut result = self.clone();
        let end = result.palette.len().min(palette.palette.len());
        if end > RESERVED_COLORS {
            result.palette[RESERVED_COLORS..end]
                .copy_from_slice(&palette.palette[RESERVED_COLORS..end]);
        }
        result
    }
}

/// Decodes a PNG. Returns `Ok(None)` for images that are not palette-based.
pub fn decode(data: &[u8]) -> Result<Option<IndexedImage>, CodecError> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    if reader.info().color_type != ColorType::Indexed {
        return Ok(None);
    }

    let mut pixels = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut pixels)?;
    pixels.truncate(frame.buffer_size());

    let info = reader.info();
    let rgb = info.palette.as_deref().ok_or(CodecError::MissingPalette)?;
    let trns = info.trns.as_deref().unwrap_or(&[]);
    let palette = rgb
        .chunks_exact(3)
        .enumerate()
        .map(|(i, c)| [c[0], c[1], c[2], trns.get(i).copied().unwrap_or(0xff)])
        .collect();

    Ok(Some(IndexedImage {
        width: frame.width,
        height: frame.height,
        depth: frame.bit_depth,
        palette,
        pixels,
    }))
}

pub fn encode(image: &IndexedImage) -> Result<Vec<u8>, CodecError> {
    let rgb: Vec<u8> = image.palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    // tRNS only needs to reach the last translucent entry.
    let trns_len = image
        .palette
        .iter()
        .rposition(|c| c[3] != 0xff)
        .map_or(0, |i| i + 1);
    let trns: Vec<u8> = image.palette[..trns_len].iter().map(|c| c[3]).collect();

    let mut out = Vec::with_capacity(image.pixels.len() + rgb.len() + 64);
    let mut encoder = png::Encoder::new(&mut out, image.width, image.height);
    encoder.set_color(ColorType::Indexed);
    encoder.set_depth(image.depth);
    encoder.set_palette(rgb);
    if !trns.is_empty() {
        encoder.set_trns(trns);
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.pixels)?;
    writer.finish()?;
    Ok(out)
}
