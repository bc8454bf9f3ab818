use crate::FileType;

#[derive(thiserror::Error)]
pub enum Error {
    // std errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("utf8 conversion: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    // crate errors
    #[error("unsupported encryption mode {0}")]
    UnsupportedMode(u16),

    #[error("zlib decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("indexed texture has an empty palette")]
    InvalidPalette,

    #[error("pixel data too short: expected {expected} bytes, got {actual}")]
    PixelData { expected: usize, actual: usize },

    #[error("unsupported image format {0:#08x}")]
    UnsupportedImageFormat(u32),

    #[error("{0} files are not supported")]
    UnsupportedFileType(FileType),

    #[error("unknown file magic {0:02x?}")]
    UnknownMagic([u8; 4]),

    #[error(
        "found magic of {0:02x?} instead of {expected:02x?}",
        expected = crate::container::MAGIC
    )]
    Magic([u8; 4]),

    #[error("entry at {offset:#x} is truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("\"{name}\" decompressed to {actual} bytes but header says {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Attempted to write to \"{0}\" which outside of output directory")]
    WriteOutsideOutput(String),

    #[error("{0}")]
    Other(&'static str),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
