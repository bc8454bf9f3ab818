//! Keyed XOR stream cipher used for BGAD entry names and payloads.
//!
//! The keystream comes from a 32-bit linear congruential generator. The seed
//! is stepped once before its first use, so the raw key never touches data.

use std::io::Read;

use crate::ext::ReadExt;
use crate::Error;

const MULTIPLIER: u32 = 0x19660D;
const INCREMENT: u32 = 0x3C6EF35F;

/// Keystream layout, as stored in the BGAD header's encryption mode field.
#[repr(u16)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display, strum::FromRepr)]
pub enum Mode {
    /// One generator step per byte, XOR with the low 8 bits.
    Byte = 1,
    /// One generator step per little-endian 32-bit word.
    Word = 2,
}

impl TryFrom<u16> for Mode {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Mode::from_repr(value).ok_or(Error::UnsupportedMode(value))
    }
}

/// Infinite keystream for a seed. Yields the stepped state, never the seed.
#[derive(Clone, Debug)]
pub struct Keystream {
    state: u32,
}

impl Keystream {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }
}

impl Iterator for Keystream {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        Some(self.state)
    }
}

/// XORs the keystream for `seed` over `bytes`. Applying it twice restores the
/// input, so this is both the decryption and the encryption primitive.
pub fn decrypt_in_place(bytes: &mut [u8], seed: u32, mode: Mode) {
    let mut keystream = Keystream::new(seed);
    match mode {
        Mode::Byte => {
            for (b, k) in bytes.iter_mut().zip(keystream) {
                *b ^= k as u8;
            }
        }
        Mode::Word => {
            for chunk in bytes.chunks_mut(4) {
                // a trailing partial word is xored as if zero padded, only
                // the bytes that exist are written back
                let key = keystream.next().unwrap_or_default().to_le_bytes();
                for (b, k) in chunk.iter_mut().zip(key) {
                    *b ^= k;
                }
            }
        }
    }
}

/// Reads at most `len` bytes from `reader` and decrypts them.
///
/// The output is always exactly `len` bytes long. When the reader runs dry
/// early the remainder stays zeroed.
pub fn decrypt<R: Read>(
    reader: &mut R,
    seed: u32,
    mode: u16,
    len: usize,
) -> Result<Vec<u8>, Error> {
    let mode = Mode::try_from(mode)?;
    let mut buf = reader.read_up_to(len)?;
    tracing::trace!(seed, %mode, len, read = buf.len(), "decrypting");
    decrypt_in_place(&mut buf, seed, mode);
    buf.resize(len, 0);
    Ok(buf)
}
