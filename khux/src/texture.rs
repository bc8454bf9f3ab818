use std::io::Read;

use byteorder::{ReadBytesExt, LE};

use crate::compression::Inflate;
use crate::ext::ReadExt;
use crate::Error;

pub const MAGIC: [u8; 4] = *b"\x89BTF";

#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display, strum::FromRepr)]
pub enum ImageFormat {
    /// Tightly packed RGBA8.
    Direct = 0x080000,
    /// RGBA8 palette followed by one index byte per pixel.
    Indexed = 0x090000,
}

/// Where the image sits inside the frame the game draws it in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u16,
    pub height: u16,
    pub offset_x: u16,
    pub offset_y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureHeader {
    pub unknown1: u32,
    pub unknown2: u32,
    pub format: ImageFormat,
    pub unknown4: u32,
    pub canvas: Canvas,
    pub width: u16,
    pub height: u16,
    /// Always 0 for [`ImageFormat::Direct`].
    pub palette_size: u16,
    pub compressed_size: u32,
}

impl TextureHeader {
    /// Reads the header that follows the file magic.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        reader.read_u16::<LE>()?;
        let unknown1 = reader.read_u32::<LE>()?;
        let unknown2 = reader.read_u32::<LE>()?;
        let raw_format = reader.read_u32::<LE>()?;
        let format =
            ImageFormat::from_repr(raw_format).ok_or(Error::UnsupportedImageFormat(raw_format))?;
        let unknown4 = reader.read_u32::<LE>()?;
        let canvas = Canvas {
            width: reader.read_u16::<LE>()?,
            height: reader.read_u16::<LE>()?,
            offset_x: reader.read_u16::<LE>()?,
            offset_y: reader.read_u16::<LE>()?,
        };
        let width = reader.read_u16::<LE>()?;
        let height = reader.read_u16::<LE>()?;
        let palette_size = match format {
            ImageFormat::Indexed => reader.read_u16::<LE>()?,
            ImageFormat::Direct => 0,
        };
        let compressed_size = reader.read_u32::<LE>()?;
        Ok(Self {
            unknown1,
            unknown2,
            format,
            unknown4,
            canvas,
            width,
            height,
            palette_size,
            compressed_size,
        })
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of the decompressed payload this header describes.
    pub fn payload_size(&self) -> usize {
        match self.format {
            ImageFormat::Direct => self.pixel_count() * 4,
            ImageFormat::Indexed => self.palette_size as usize * 4 + self.pixel_count(),
        }
    }
}

/// RGBA8 image, row major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// Placement on the canvas. `None` once the image has been composited.
    pub canvas: Option<Canvas>,
}

impl DecodedImage {
    /// Pastes the image onto a transparent canvas at its offset, clipping
    /// whatever falls outside. Without a placement this is a plain copy.
    pub fn composite(&self) -> DecodedImage {
        let Some(canvas) = self.canvas else {
            return self.clone();
        };
        let (canvas_w, canvas_h) = (canvas.width as usize, canvas.height as usize);
        let (x, y) = (canvas.offset_x as usize, canvas.offset_y as usize);
        let width = self.width as usize;
        let mut pixels = vec![0; canvas_w * canvas_h * 4];

        let row_len = width.min(canvas_w.saturating_sub(x)) * 4;
        let rows = (self.height as usize).min(canvas_h.saturating_sub(y));
        if row_len > 0 {
            for row in 0..rows {
                let src = row * width * 4;
                let dst = ((y + row) * canvas_w + x) * 4;
                pixels[dst..dst + row_len].copy_from_slice(&self.pixels[src..src + row_len]);
            }
        }

        DecodedImage {
            width: canvas.width as u32,
            height: canvas.height as u32,
            pixels,
            canvas: None,
        }
    }
}

/// Decodes a texture whose magic has already been consumed.
pub(crate) fn decode<R: Read>(
    reader: &mut R,
    inflater: &dyn Inflate,
    composite: bool,
) -> Result<DecodedImage, Error> {
    let header = TextureHeader::read(reader)?;
    tracing::debug!(?header, "texture header");
    if header.format == ImageFormat::Indexed && header.palette_size == 0 {
        return Err(Error::InvalidPalette);
    }

    // a short payload is left for the inflater to reject as a broken stream
    let compressed = reader.read_up_to(header.compressed_size as usize)?;
    let raw = inflater.inflate(&compressed, header.payload_size())?;
    if raw.len() < header.payload_size() {
        return Err(Error::PixelData {
            expected: header.payload_size(),
            actual: raw.len(),
        });
    }

    let pixels = match header.format {
        ImageFormat::Direct => {
            let mut raw = raw;
            raw.truncate(header.pixel_count() * 4);
            raw
        }
        ImageFormat::Indexed => {
            let (palette, indices) = raw.split_at(header.palette_size as usize * 4);
            resolve_palette(palette, &indices[..header.pixel_count()])
        }
    };

    let image = DecodedImage {
        width: header.width as u32,
        height: header.height as u32,
        pixels,
        canvas: Some(header.canvas),
    };
    Ok(if composite { image.composite() } else { image })
}

fn resolve_palette(palette: &[u8], indices: &[u8]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(indices.len() * 4);
    let mut out_of_range = 0usize;
    for &index in indices {
        match palette.chunks_exact(4).nth(index as usize) {
            Some(color) => pixels.extend_from_slice(color),
            None => {
                out_of_range += 1;
                pixels.extend_from_slice(&[0; 4]);
            }
        }
    }
    if out_of_range > 0 {
        tracing::warn!(
            out_of_range,
            palette_size = palette.len() / 4,
            "palette indices out of range, using transparent black"
        );
    }
    pixels
}
