use std::fmt;
use std::io::{Read, Seek};

use crate::compression::{Inflate, Zlib};
use crate::container::{self, Container, Sink};
use crate::texture::{self, DecodedImage};
use crate::{Error, FileType};

/// Output of [`Extractor::extract`], one variant per supported file type.
#[derive(Debug)]
pub enum Extracted {
    Container(Container),
    Texture(DecodedImage),
}

pub struct Extractor {
    inflater: Box<dyn Inflate + Send + Sync>,
    strict: bool,
    canvas: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("strict", &self.strict)
            .field("canvas", &self.canvas)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            inflater: Box::new(Zlib),
            strict: false,
            canvas: false,
        }
    }
    /// Replace the zlib inflater used for compressed payloads and textures
    pub fn inflater(mut self, inflater: impl Inflate + Send + Sync + 'static) -> Self {
        self.inflater = Box::new(inflater);
        self
    }
    /// Treat a cut off or garbled container tail as an error instead of the
    /// end of the container, and check decompressed sizes against headers
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
    /// Composite decoded textures onto their canvas
    pub fn canvas(mut self, canvas: bool) -> Self {
        self.canvas = canvas;
        self
    }

    /// Scans a BGAD container from the reader's current position, handing
    /// each entry to `sink` as soon as it is decoded.
    pub fn scan<R, S>(&self, reader: &mut R, sink: &mut S) -> Result<Container, Error>
    where
        R: Read + Seek,
        S: Sink + ?Sized,
    {
        container::scan(reader, sink, self.inflater.as_ref(), self.strict)
    }

    /// Decodes a BTF texture. The reader must be positioned just past the
    /// magic.
    pub fn decode_texture<R: Read>(&self, reader: &mut R) -> Result<DecodedImage, Error> {
        texture::decode(reader, self.inflater.as_ref(), self.canvas)
    }

    /// Detects the file type from its magic and extracts accordingly.
    /// Container entries go to `sink`; textures are returned.
    pub fn extract<R, S>(&self, reader: &mut R, sink: &mut S) -> Result<Extracted, Error>
    where
        R: Read + Seek,
        S: Sink + ?Sized,
    {
        match FileType::read(reader)? {
            FileType::Container => self.scan(reader, sink).map(Extracted::Container),
            FileType::Texture => self.decode_texture(reader).map(Extracted::Texture),
            file_type @ FileType::Lwf => Err(Error::UnsupportedFileType(file_type)),
        }
    }
}
