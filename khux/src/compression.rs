use flate2::{Decompress, FlushDecompress, Status};

use crate::Error;

/// Upper bound on how much of a header's size hint is trusted for the
/// initial allocation.
const MAX_SIZE_HINT: usize = 64 << 20;
const CHUNK: usize = 0x8000;

/// Inflate primitive for zlib-wrapped DEFLATE payloads.
///
/// `size_hint` is the expected output length if the caller knows it; it only
/// sizes the initial buffer and implementations must not rely on it.
pub trait Inflate {
    fn inflate(&self, compressed: &[u8], size_hint: usize) -> Result<Vec<u8>, Error>;
}

impl<F> Inflate for F
where
    F: Fn(&[u8], usize) -> Result<Vec<u8>, Error>,
{
    fn inflate(&self, compressed: &[u8], size_hint: usize) -> Result<Vec<u8>, Error> {
        self(compressed, size_hint)
    }
}

/// Default inflater backed by flate2. Rejects truncated streams and streams
/// followed by trailing bytes.
#[derive(Default, Clone, Copy, Debug)]
pub struct Zlib;

impl Inflate for Zlib {
    fn inflate(&self, compressed: &[u8], size_hint: usize) -> Result<Vec<u8>, Error> {
        let mut decompress = Decompress::new(true);
        let mut out = Vec::with_capacity(size_hint.min(MAX_SIZE_HINT).max(CHUNK));
        loop {
            if out.len() == out.capacity() {
                out.reserve(out.capacity().max(CHUNK));
            }
            let (total_in, total_out) = (decompress.total_in(), decompress.total_out());
            let status = decompress
                .decompress_vec(
                    &compressed[total_in as usize..],
                    &mut out,
                    FlushDecompress::None,
                )
                .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
            match status {
                Status::StreamEnd => break,
                _ if decompress.total_in() == total_in && decompress.total_out() == total_out => {
                    return Err(Error::DecompressionFailed(format!(
                        "stream truncated after {total_in} bytes"
                    )));
                }
                _ => {}
            }
        }

        let consumed = decompress.total_in() as usize;
        if consumed != compressed.len() {
            return Err(Error::DecompressionFailed(format!(
                "{} trailing bytes after end of stream",
                compressed.len() - consumed
            )));
        }
        Ok(out)
    }
}

/// Inflates `compressed` with the default [`Zlib`] inflater.
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>, Error> {
    Zlib.inflate(compressed, 0)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_inflate() {
        let data = b"zeros and more zeros ".repeat(100);
        assert_eq!(inflate(&compress(&data)).unwrap(), data);
    }

    #[test]
    fn test_inflate_larger_than_chunk() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i * 7 % 251) as u8).collect();
        assert_eq!(Zlib.inflate(&compress(&data), 16).unwrap(), data);
    }

    #[test]
    fn test_inflate_truncated() {
        let compressed = compress(&b"some text that compresses".repeat(20));
        assert!(matches!(
            inflate(&compressed[..compressed.len() - 6]),
            Err(Error::DecompressionFailed(_))
        ));
    }

    #[test]
    fn test_inflate_trailing_data() {
        let mut compressed = compress(b"payload");
        compressed.extend_from_slice(b"junk");
        assert!(matches!(
            inflate(&compressed),
            Err(Error::DecompressionFailed(_))
        ));
    }

    #[test]
    fn test_inflate_garbage() {
        assert!(matches!(
            inflate(b"definitely not zlib"),
            Err(Error::DecompressionFailed(_))
        ));
    }

    #[test]
    fn test_closure_inflater() {
        let identity = |data: &[u8], _: usize| -> Result<Vec<u8>, Error> { Ok(data.to_vec()) };
        assert_eq!(identity.inflate(b"abc", 3).unwrap(), b"abc");
    }
}
