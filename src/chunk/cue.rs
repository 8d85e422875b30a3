//! The `cue ` chunk: time-domain markers

use crate::chunk::ids;
use crate::error::{Error, Result};
use crate::util::FourCC;
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::Write;

/// On-disk size of one cue point record
pub const CUE_POINT_SIZE: u64 = 24;

/// One marker within the data chunk.
///
/// The label is an in-memory convenience only; on disk it lives in a `labl`
/// sub-chunk of a `LIST/adtl` chunk keyed by the cue point id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CuePoint {
    pub id: u32,
    pub position: u32,
    pub data_chunk_id: FourCC,
    pub chunk_start: u32,
    pub block_start: u32,
    pub sample_offset: u32,
    pub label: String,
}

impl CuePoint {
    /// Create a marker at a sample position pointing into the `data` chunk
    pub fn new<S: Into<String>>(id: u32, position: u32, label: S) -> Self {
        CuePoint {
            id,
            position,
            data_chunk_id: ids::DATA,
            chunk_start: 0,
            block_start: 0,
            sample_offset: position,
            label: label.into(),
        }
    }
}

/// The `cue ` chunk: an ordered list of cue points.
///
/// Points are kept sorted by position and ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueChunk {
    cue_points: Vec<CuePoint>,
}

impl CueChunk {
    pub fn new(mut cue_points: Vec<CuePoint>) -> Self {
        cue_points.sort_by_key(|point| point.position);
        CueChunk { cue_points }
    }

    pub fn cue_points(&self) -> &[CuePoint] {
        &self.cue_points
    }

    pub(crate) fn cue_points_mut(&mut self) -> &mut [CuePoint] {
        &mut self.cue_points
    }

    /// Add a marker by id, position and optional label
    pub fn add<S: Into<String>>(&mut self, id: u32, position: u32, label: S) -> Result<()> {
        self.add_cue_point(CuePoint::new(id, position, label))
    }

    /// Add an existing cue point, keeping the list position-sorted
    pub fn add_cue_point(&mut self, cue_point: CuePoint) -> Result<()> {
        if self.cue_points.iter().any(|point| point.id == cue_point.id) {
            return Err(Error::invalid_argument(format!(
                "cue point id {} already exists",
                cue_point.id
            )));
        }
        self.cue_points.push(cue_point);
        self.cue_points.sort_by_key(|point| point.position);
        Ok(())
    }

    /// Set the label of an existing cue point; returns false when the id is
    /// unknown
    pub fn set_label<S: Into<String>>(&mut self, id: u32, label: S) -> bool {
        match self.cue_points.iter_mut().find(|point| point.id == id) {
            Some(point) => {
                point.label = label.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_cue_point(&mut self, id: u32) {
        self.cue_points.retain(|point| point.id != id);
    }

    pub fn clear_cue_points(&mut self) {
        self.cue_points.clear();
    }

    /// Non-empty labels keyed by cue point id, for `LIST/adtl` synthesis
    pub fn labels(&self) -> BTreeMap<u32, String> {
        self.cue_points
            .iter()
            .filter(|point| !point.label.is_empty())
            .map(|point| (point.id, point.label.clone()))
            .collect()
    }

    pub fn size(&self) -> u64 {
        4 + self.cue_points.len() as u64 * CUE_POINT_SIZE
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.cue_points.len() as u32)?;
        for point in &self.cue_points {
            writer.write_u32::<LittleEndian>(point.id)?;
            writer.write_u32::<LittleEndian>(point.position)?;
            writer.write_u32::<LittleEndian>(point.data_chunk_id.as_u32())?;
            writer.write_u32::<LittleEndian>(point.chunk_start)?;
            writer.write_u32::<LittleEndian>(point.block_start)?;
            writer.write_u32::<LittleEndian>(point.sample_offset)?;
        }
        Ok(())
    }
}
