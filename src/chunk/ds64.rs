//! The `ds64` chunk: 64-bit sizes for the outer container, the data chunk
//! and any other oversized chunk

use crate::error::Result;
use crate::util::FourCC;
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::Write;

/// Fixed part of the chunk: bw64Size + dataSize + dummySize + tableLength
pub const DS64_HEADER_SIZE: u64 = 28;
/// Bytes per table entry: FourCC + u64 size
pub const DS64_TABLE_ENTRY_SIZE: u64 = 12;

/// The `ds64` side-table of a BW64/RF64 file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSize64Chunk {
    bw64_size: u64,
    data_size: u64,
    dummy_size: u64,
    table: BTreeMap<FourCC, u64>,
}

impl DataSize64Chunk {
    pub fn new(bw64_size: u64, data_size: u64, table: BTreeMap<FourCC, u64>) -> Self {
        DataSize64Chunk {
            bw64_size,
            data_size,
            dummy_size: 0,
            table,
        }
    }

    /// Size of the outer RIFF chunk (file size minus 8)
    pub fn bw64_size(&self) -> u64 {
        self.bw64_size
    }

    pub fn set_bw64_size(&mut self, size: u64) {
        self.bw64_size = size;
    }

    /// True size of the `data` chunk
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn set_data_size(&mut self, size: u64) {
        self.data_size = size;
    }

    pub fn dummy_size(&self) -> u64 {
        self.dummy_size
    }

    pub fn table_length(&self) -> u32 {
        self.table.len() as u32
    }

    /// Record the true size of an oversized chunk
    pub fn set_chunk_size(&mut self, id: FourCC, size: u64) {
        self.table.insert(id, size);
    }

    pub fn has_chunk_size(&self, id: FourCC) -> bool {
        self.table.contains_key(&id)
    }

    pub fn chunk_size(&self, id: FourCC) -> Option<u64> {
        self.table.get(&id).copied()
    }

    pub fn size(&self) -> u64 {
        DS64_HEADER_SIZE + self.table.len() as u64 * DS64_TABLE_ENTRY_SIZE
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.bw64_size)?;
        writer.write_u64::<LittleEndian>(self.data_size)?;
        writer.write_u64::<LittleEndian>(self.dummy_size)?;
        writer.write_u32::<LittleEndian>(self.table.len() as u32)?;
        for (id, size) in &self.table {
            writer.write_u32::<LittleEndian>(id.as_u32())?;
            writer.write_u64::<LittleEndian>(*size)?;
        }
        Ok(())
    }
}
