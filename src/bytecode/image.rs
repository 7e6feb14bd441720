use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Leading bytes of every encoded image.
pub const MAGIC: [u8; 4] = *b"SVMI";

/// Bumped whenever the opcode table or operand encoding changes.
pub const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image encoding failed: {0}")]
    Encode(#[source] postcard::Error),

    #[error("not a program image: {0}")]
    Decode(#[source] postcard::Error),

    #[error("not a program image: bad magic {found:02X?}")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported image version {found} (expected {expected})", expected = FORMAT_VERSION)]
    UnsupportedVersion { found: u16 },
}

/// An assembled program, ready to be written to disk or executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramImage {
    magic: [u8; 4],
    version: u16,

    /// The instruction stream.
    pub code: Vec<u8>,
}

impl ProgramImage {
    pub fn new(code: Vec<u8>) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            code,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        postcard::to_allocvec(self).map_err(ImageError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let image: ProgramImage = postcard::from_bytes(bytes).map_err(ImageError::Decode)?;

        if image.magic != MAGIC {
            return Err(ImageError::BadMagic { found: image.magic });
        }
        if image.version != FORMAT_VERSION {
            return Err(ImageError::UnsupportedVersion {
                found: image.version,
            });
        }

        Ok(image)
    }
}
