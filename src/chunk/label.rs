//! The `labl` chunk: a human-readable label for one cue point

use crate::error::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// A `labl` sub-chunk of a `LIST/adtl` chunk.
///
/// On disk: the cue point id followed by a null-terminated ASCII string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelChunk {
    cue_point_id: u32,
    label: String,
}

impl LabelChunk {
    pub fn new<S: Into<String>>(cue_point_id: u32, label: S) -> Self {
        LabelChunk {
            cue_point_id,
            label: label.into(),
        }
    }

    pub fn cue_point_id(&self) -> u32 {
        self.cue_point_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> u64 {
        // cue point id + label + null terminator
        4 + self.label.len() as u64 + 1
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.cue_point_id)?;
        writer.write_all(self.label.as_bytes())?;
        writer.write_u8(0)?;
        Ok(())
    }
}
