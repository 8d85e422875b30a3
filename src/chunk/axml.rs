//! The `axml` chunk: opaque Audio Definition Model XML payload

use crate::error::Result;
use std::io::Write;

/// The `axml` chunk. The payload is treated as raw bytes; null bytes are
/// preserved exactly and no XML validation is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxmlChunk {
    data: Vec<u8>,
}

impl AxmlChunk {
    pub fn new(data: Vec<u8>) -> Self {
        AxmlChunk { data }
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

impl From<String> for AxmlChunk {
    fn from(data: String) -> Self {
        AxmlChunk::new(data.into_bytes())
    }
}
