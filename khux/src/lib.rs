pub mod cipher;
mod compression;
pub mod container;
mod error;
mod ext;
mod extractor;
pub mod texture;

use std::io::{self, Read, Seek};

pub use {
    cipher::{decrypt, Mode},
    compression::{inflate, Inflate, Zlib},
    container::{Container, EntryPath, EntryRecord, Sink},
    error::*,
    extractor::*,
    texture::{Canvas, DecodedImage, ImageFormat},
};

pub const LWF_MAGIC: [u8; 4] = *b"LWF\0";

/// File type identified by the first four bytes of a file.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum FileType {
    #[strum(serialize = "BGAD")]
    Container,
    #[strum(serialize = "BTF")]
    Texture,
    #[strum(serialize = "LWF")]
    Lwf,
}

impl FileType {
    pub fn from_magic(magic: [u8; 4]) -> Result<Self, Error> {
        match magic {
            container::MAGIC => Ok(Self::Container),
            texture::MAGIC => Ok(Self::Texture),
            LWF_MAGIC => Ok(Self::Lwf),
            _ => Err(Error::UnknownMagic(magic)),
        }
    }

    /// Reads the magic and leaves the reader where the matching decoder
    /// expects it: containers start at their own magic, textures right after.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, Error> {
        let mut magic = [0; 4];
        reader.read_exact(&mut magic)?;
        let file_type = Self::from_magic(magic)?;
        if file_type == Self::Container {
            reader.seek(io::SeekFrom::Current(-4))?;
        }
        Ok(file_type)
    }
}

/// Scans a container with the default [`Extractor`].
pub fn scan<R, S>(reader: &mut R, sink: &mut S) -> Result<Container, Error>
where
    R: Read + Seek,
    S: Sink + ?Sized,
{
    Extractor::new().scan(reader, sink)
}

/// Decodes a texture (magic already consumed) with the default [`Extractor`].
pub fn decode_texture<R: Read>(reader: &mut R, composite: bool) -> Result<DecodedImage, Error> {
    Extractor::new().canvas(composite).decode_texture(reader)
}
