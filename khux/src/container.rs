use std::fmt;
use std::io::{Read, Seek};
use std::path::PathBuf;

use byteorder::{ReadBytesExt, LE};

use crate::cipher;
use crate::compression::Inflate;
use crate::ext::ReadExt;
use crate::Error;

pub const MAGIC: [u8; 4] = *b"BGAD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 4],
    pub encryption_mode: u16,
    pub unknown: u16,
    pub header_size: u16,
    pub name_length: u16,
    pub data_type: u16,
    pub compression_flag: u16,
    pub data_size: u32,
    pub decompressed_size: u32,
}

/// Result of trying to read an entry header. Running into something that is
/// not a header is how a container ends, so it is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRead {
    Entry(Header),
    EndOfStream(EndReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// No bytes left.
    Exhausted,
    /// Fewer bytes left than a header needs.
    Short(usize),
    /// A full header's worth of bytes without the magic.
    Magic([u8; 4]),
}

impl Header {
    pub const SIZE: usize = 24;

    pub fn read<R: Read>(reader: &mut R) -> Result<HeaderRead, Error> {
        let buf = reader.read_up_to(Self::SIZE)?;
        if buf.is_empty() {
            return Ok(HeaderRead::EndOfStream(EndReason::Exhausted));
        }
        if buf.len() < Self::SIZE {
            return Ok(HeaderRead::EndOfStream(EndReason::Short(buf.len())));
        }
        let mut buf = &buf[..];
        let magic = buf.read_magic()?;
        if magic != MAGIC {
            return Ok(HeaderRead::EndOfStream(EndReason::Magic(magic)));
        }
        Ok(HeaderRead::Entry(Self {
            magic,
            encryption_mode: buf.read_u16::<LE>()?,
            unknown: buf.read_u16::<LE>()?,
            header_size: buf.read_u16::<LE>()?,
            name_length: buf.read_u16::<LE>()?,
            data_type: buf.read_u16::<LE>()?,
            compression_flag: buf.read_u16::<LE>()?,
            data_size: buf.read_u32::<LE>()?,
            decompressed_size: buf.read_u32::<LE>()?,
        }))
    }

    pub fn is_compressed(&self) -> bool {
        self.compression_flag != 0
    }
}

/// Relative output location derived from an entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPath {
    pub dir: String,
    pub file: String,
}

impl EntryPath {
    /// Splits a name into directory and file. Names that end in a separator
    /// name a directory, which becomes a file called `@<dir name>` inside it
    /// (`@root` for `/`), so it can't collide with the directory's children.
    pub fn from_name(name: &str) -> Self {
        let (head, file) = match name.rfind('/') {
            Some(i) => (&name[..i + 1], &name[i + 1..]),
            None => ("", name),
        };
        let is_root = !head.is_empty() && head.bytes().all(|b| b == b'/');
        let dir = head.trim_end_matches('/');

        let (dir, file) = if !file.is_empty() {
            (dir, file.to_owned())
        } else if is_root {
            ("", "@root".to_owned())
        } else {
            let base = dir.rsplit('/').next().unwrap_or_default();
            (dir, format!("@{base}"))
        };

        Self {
            dir: dir.trim_start_matches('/').to_owned(),
            file,
        }
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.dir
            .split('/')
            .filter(|c| !c.is_empty())
            .chain(std::iter::once(self.file.as_str()))
            .collect()
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}/{}", self.dir, self.file)
        }
    }
}

/// Receives entries as the scan resolves them.
pub trait Sink {
    fn accept(&mut self, path: &EntryPath, data: Vec<u8>) -> Result<(), Error>;
}

impl<F> Sink for F
where
    F: FnMut(&EntryPath, Vec<u8>) -> Result<(), Error>,
{
    fn accept(&mut self, path: &EntryPath, data: Vec<u8>) -> Result<(), Error> {
        self(path, data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub offset: u64,
    pub name: String,
}

/// Entries of a scanned container in file order.
#[derive(Debug, Default, Clone)]
pub struct Container {
    entries: Vec<EntryRecord>,
}

impl Container {
    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<EntryRecord> {
        self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn scan<R, S>(
    reader: &mut R,
    sink: &mut S,
    inflater: &dyn Inflate,
    strict: bool,
) -> Result<Container, Error>
where
    R: Read + Seek,
    S: Sink + ?Sized,
{
    let mut container = Container::default();
    loop {
        let offset = reader.stream_position()?;
        let header = match Header::read(reader)? {
            HeaderRead::Entry(header) => header,
            HeaderRead::EndOfStream(reason) => {
                if strict {
                    match reason {
                        EndReason::Exhausted => {}
                        EndReason::Short(actual) => {
                            return Err(Error::Truncated {
                                offset,
                                expected: Header::SIZE,
                                actual,
                            })
                        }
                        EndReason::Magic(magic) => return Err(Error::Magic(magic)),
                    }
                }
                tracing::debug!(offset, ?reason, "end of container");
                break;
            }
        };
        let Some((name, data)) = read_entry(reader, &header, offset, inflater, strict)? else {
            break;
        };

        tracing::debug!(
            offset,
            name = %name,
            mode = header.encryption_mode,
            compressed = header.is_compressed(),
            size = data.len(),
            "entry"
        );
        sink.accept(&EntryPath::from_name(&name), data)?;
        container.entries.push(EntryRecord { offset, name });
    }
    Ok(container)
}

/// Reads, decrypts and decompresses the name and payload that follow
/// `header`. `None` means the entry was cut short and the scan is over.
fn read_entry<R: Read>(
    reader: &mut R,
    header: &Header,
    offset: u64,
    inflater: &dyn Inflate,
    strict: bool,
) -> Result<Option<(String, Vec<u8>)>, Error> {
    let truncated = |expected: usize, actual: usize| {
        if strict {
            Err(Error::Truncated {
                offset,
                expected,
                actual,
            })
        } else {
            tracing::debug!(offset, expected, actual, "entry cut short");
            Ok(None)
        }
    };

    // the name is keyed by the payload size and the payload by the name length
    let name_len = header.name_length as usize;
    let name = reader.read_up_to(name_len)?;
    if name.len() != name_len {
        return truncated(name_len, name.len());
    }
    let name = cipher::decrypt(
        &mut &name[..],
        header.data_size,
        header.encryption_mode,
        name_len,
    )?;
    let name = String::from_utf8(name)?.trim_end_matches('\0').to_owned();

    let data_len = header.data_size as usize;
    let data = reader.read_up_to(data_len)?;
    if data.len() != data_len {
        return truncated(data_len, data.len());
    }
    let mut data = cipher::decrypt(
        &mut &data[..],
        header.name_length as u32,
        header.encryption_mode,
        data_len,
    )?;

    if header.is_compressed() {
        data = inflater.inflate(&data, header.decompressed_size as usize)?;
        if strict && data.len() != header.decompressed_size as usize {
            return Err(Error::SizeMismatch {
                name,
                expected: header.decompressed_size as usize,
                actual: data.len(),
            });
        }
    }
    Ok(Some((name, data)))
}
