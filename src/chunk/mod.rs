//! Chunk model for the BW64/RF64 container
//!
//! Every piece of a wave file other than the outer 12-byte header is a chunk:
//! a four-character id, a 32-bit stored size (64-bit sizes are resolved
//! through the `ds64` side-table) and a payload padded to an even length.
//! The closed set of chunk kinds this library understands is modeled as the
//! [`Chunk`] enum; anything else is retained verbatim as [`UnknownChunk`].

pub mod axml;
pub mod chna;
pub mod cue;
pub mod ds64;
pub mod format;
pub mod label;
pub mod list;
pub mod unknown;

pub use axml::AxmlChunk;
pub use chna::{AudioId, ChnaChunk};
pub use cue::{CueChunk, CuePoint};
pub use ds64::DataSize64Chunk;
pub use format::{ExtraData, FormatInfoChunk, Guid};
pub use label::LabelChunk;
pub use list::ListChunk;
pub use unknown::UnknownChunk;

use crate::error::Result;
use crate::util::FourCC;
use std::io::Write;

/// Well-known four-character codes
pub mod ids {
    use crate::util::FourCC;

    pub const RIFF: FourCC = FourCC::new(b"RIFF");
    pub const BW64: FourCC = FourCC::new(b"BW64");
    pub const RF64: FourCC = FourCC::new(b"RF64");
    pub const WAVE: FourCC = FourCC::new(b"WAVE");
    pub const JUNK: FourCC = FourCC::new(b"JUNK");
    pub const DS64: FourCC = FourCC::new(b"ds64");
    pub const FMT: FourCC = FourCC::new(b"fmt ");
    pub const DATA: FourCC = FourCC::new(b"data");
    pub const CHNA: FourCC = FourCC::new(b"chna");
    pub const AXML: FourCC = FourCC::new(b"axml");
    pub const CUE: FourCC = FourCC::new(b"cue ");
    pub const LABL: FourCC = FourCC::new(b"labl");
    pub const LIST: FourCC = FourCC::new(b"LIST");
    pub const ADTL: FourCC = FourCC::new(b"adtl");
}

/// Location and true size of a chunk within the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk id
    pub id: FourCC,
    /// Payload size in bytes, excluding the 8-byte header and any pad byte.
    /// Already resolved through the ds64 table where applicable.
    pub size: u64,
    /// Byte offset of the chunk header within the file
    pub position: u64,
}

impl ChunkHeader {
    pub fn new(id: FourCC, size: u64, position: u64) -> Self {
        ChunkHeader { id, size, position }
    }
}

/// The payload of the `data` chunk is streamed, never buffered; only its
/// byte count is tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataChunk {
    size: u64,
}

impl DataChunk {
    pub fn new(size: u64) -> Self {
        DataChunk { size }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }
}

/// A chunk of any kind known to this library
#[derive(Debug, Clone)]
pub enum Chunk {
    Format(FormatInfoChunk),
    Data(DataChunk),
    DataSize64(DataSize64Chunk),
    Chna(ChnaChunk),
    Axml(AxmlChunk),
    Cue(CueChunk),
    Label(LabelChunk),
    List(ListChunk),
    Unknown(UnknownChunk),
}

impl Chunk {
    /// The chunk's four-character id
    pub fn id(&self) -> FourCC {
        match self {
            Chunk::Format(_) => ids::FMT,
            Chunk::Data(_) => ids::DATA,
            Chunk::DataSize64(_) => ids::DS64,
            Chunk::Chna(_) => ids::CHNA,
            Chunk::Axml(_) => ids::AXML,
            Chunk::Cue(_) => ids::CUE,
            Chunk::Label(_) => ids::LABL,
            Chunk::List(_) => ids::LIST,
            Chunk::Unknown(chunk) => chunk.id(),
        }
    }

    /// Payload size in bytes, excluding the 8-byte header
    pub fn size(&self) -> u64 {
        match self {
            Chunk::Format(chunk) => chunk.size(),
            Chunk::Data(chunk) => chunk.size(),
            Chunk::DataSize64(chunk) => chunk.size(),
            Chunk::Chna(chunk) => chunk.size(),
            Chunk::Axml(chunk) => chunk.size(),
            Chunk::Cue(chunk) => chunk.size(),
            Chunk::Label(chunk) => chunk.size(),
            Chunk::List(chunk) => chunk.size(),
            Chunk::Unknown(chunk) => chunk.size(),
        }
    }

    /// Serialize the chunk payload. The 8-byte header and the trailing pad
    /// byte are the container's concern, not the chunk's.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            // the data payload is streamed by the writer, not serialized here
            Chunk::Data(_) => Ok(()),
            Chunk::Format(chunk) => chunk.write(writer),
            Chunk::DataSize64(chunk) => chunk.write(writer),
            Chunk::Chna(chunk) => chunk.write(writer),
            Chunk::Axml(chunk) => chunk.write(writer),
            Chunk::Cue(chunk) => chunk.write(writer),
            Chunk::Label(chunk) => chunk.write(writer),
            Chunk::List(chunk) => chunk.write(writer),
            Chunk::Unknown(chunk) => chunk.write(writer),
        }
    }
}

impl From<FormatInfoChunk> for Chunk {
    fn from(chunk: FormatInfoChunk) -> Self {
        Chunk::Format(chunk)
    }
}

impl From<DataChunk> for Chunk {
    fn from(chunk: DataChunk) -> Self {
        Chunk::Data(chunk)
    }
}

impl From<DataSize64Chunk> for Chunk {
    fn from(chunk: DataSize64Chunk) -> Self {
        Chunk::DataSize64(chunk)
    }
}

impl From<ChnaChunk> for Chunk {
    fn from(chunk: ChnaChunk) -> Self {
        Chunk::Chna(chunk)
    }
}

impl From<AxmlChunk> for Chunk {
    fn from(chunk: AxmlChunk) -> Self {
        Chunk::Axml(chunk)
    }
}

impl From<CueChunk> for Chunk {
    fn from(chunk: CueChunk) -> Self {
        Chunk::Cue(chunk)
    }
}

impl From<LabelChunk> for Chunk {
    fn from(chunk: LabelChunk) -> Self {
        Chunk::Label(chunk)
    }
}

impl From<ListChunk> for Chunk {
    fn from(chunk: ListChunk) -> Self {
        Chunk::List(chunk)
    }
}

impl From<UnknownChunk> for Chunk {
    fn from(chunk: UnknownChunk) -> Self {
        Chunk::Unknown(chunk)
    }
}
