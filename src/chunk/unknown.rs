//! Chunks this library does not interpret

use crate::error::Result;
use crate::util::FourCC;
use std::io::Write;

/// A chunk with an unrecognized id.
///
/// Top-level unknown chunks retain their raw payload so a file can be
/// round-tripped without loss. Inside `LIST` walks only the id is kept and
/// the payload is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChunk {
    id: FourCC,
    data: Vec<u8>,
}

impl UnknownChunk {
    pub fn new(id: FourCC, data: Vec<u8>) -> Self {
        UnknownChunk { id, data }
    }

    /// Placeholder for a skipped sub-chunk; the payload is not retained
    pub fn skipped(id: FourCC) -> Self {
        UnknownChunk {
            id,
            data: Vec::new(),
        }
    }

    pub fn id(&self) -> FourCC {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }
}
