//! The `LIST` chunk: a typed container of sub-chunks

use crate::chunk::Chunk;
use crate::error::Result;
use crate::util::FourCC;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// A `LIST` chunk. When the list type is `adtl`, `labl` sub-chunks carry
/// marker labels.
#[derive(Debug, Clone)]
pub struct ListChunk {
    list_type: FourCC,
    sub_chunks: Vec<Chunk>,
}

impl ListChunk {
    pub fn new(list_type: FourCC, sub_chunks: Vec<Chunk>) -> Self {
        ListChunk {
            list_type,
            sub_chunks,
        }
    }

    pub fn list_type(&self) -> FourCC {
        self.list_type
    }

    pub fn sub_chunks(&self) -> &[Chunk] {
        &self.sub_chunks
    }

    pub fn add_sub_chunk(&mut self, chunk: Chunk) {
        self.sub_chunks.push(chunk);
    }

    pub fn clear_sub_chunks_of_type(&mut self, id: FourCC) {
        self.sub_chunks.retain(|chunk| chunk.id() != id);
    }

    pub fn clear_sub_chunks(&mut self) {
        self.sub_chunks.clear();
    }

    pub fn size(&self) -> u64 {
        // list type, then each sub-chunk with header and pad
        let mut size = 4;
        for chunk in &self.sub_chunks {
            size += 8 + crate::util::padded_size(chunk.size());
        }
        size
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.list_type.as_u32())?;
        for chunk in &self.sub_chunks {
            writer.write_u32::<LittleEndian>(chunk.id().as_u32())?;
            writer.write_u32::<LittleEndian>(chunk.size() as u32)?;
            chunk.write(writer)?;
            if chunk.size() % 2 == 1 {
                writer.write_u8(0)?;
            }
        }
        Ok(())
    }
}
