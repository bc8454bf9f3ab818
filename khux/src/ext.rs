use std::io::Read;

pub trait ReadExt {
    fn read_magic(&mut self) -> Result<[u8; 4], super::Error>;
    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>, super::Error>;
}

impl<R: Read> ReadExt for R {
    fn read_magic(&mut self) -> Result<[u8; 4], super::Error> {
        let mut magic = [0; 4];
        self.read_exact(&mut magic)?;
        Ok(magic)
    }

    /// Reads until `len` bytes or end of stream, whichever comes first. The
    /// buffer only grows as bytes arrive so a bogus length can't force a
    /// large allocation.
    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>, super::Error> {
        let mut buf = Vec::with_capacity(len.min(0x10000));
        Read::take(&mut *self, len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}
