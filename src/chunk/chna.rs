//! The `chna` chunk: track index to audio object/track/pack reference mapping

use crate::error::{Error, Result};
use crate::util::write_fixed_ascii;
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeSet;
use std::io::Write;

/// On-disk size of one AudioId record, including the pad byte
pub const AUDIO_ID_SIZE: u64 = 40;

/// One track UID record of a `chna` chunk.
///
/// The three reference strings are fixed-width ASCII fields; they are stored
/// on disk without termination at exactly 12, 14 and 11 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioId {
    track_index: u16,
    uid: String,
    track_ref: String,
    pack_ref: String,
}

impl AudioId {
    pub fn new<S: Into<String>>(track_index: u16, uid: S, track_ref: S, pack_ref: S) -> Result<Self> {
        let audio_id = AudioId {
            track_index,
            uid: uid.into(),
            track_ref: track_ref.into(),
            pack_ref: pack_ref.into(),
        };
        for (value, width, name) in [
            (&audio_id.uid, 12, "uid"),
            (&audio_id.track_ref, 14, "track reference"),
            (&audio_id.pack_ref, 11, "pack reference"),
        ] {
            if value.len() != width || !value.is_ascii() {
                return Err(Error::invalid_argument(format!(
                    "{} '{}' must be exactly {} ASCII bytes",
                    name, value, width
                )));
            }
        }
        Ok(audio_id)
    }

    pub fn track_index(&self) -> u16 {
        self.track_index
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn track_ref(&self) -> &str {
        &self.track_ref
    }

    pub fn pack_ref(&self) -> &str {
        &self.pack_ref
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.track_index == 0 {
            return Err(Error::invalid_argument(
                "track index must be greater than 0 when serialized",
            ));
        }
        writer.write_u16::<LittleEndian>(self.track_index)?;
        write_fixed_ascii(writer, &self.uid, 12)?;
        write_fixed_ascii(writer, &self.track_ref, 14)?;
        write_fixed_ascii(writer, &self.pack_ref, 11)?;
        writer.write_u8(0)?;
        Ok(())
    }
}

/// The `chna` chunk: a sequence of AudioId records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChnaChunk {
    audio_ids: Vec<AudioId>,
}

impl ChnaChunk {
    pub fn new(audio_ids: Vec<AudioId>) -> Self {
        ChnaChunk { audio_ids }
    }

    pub fn add_audio_id(&mut self, audio_id: AudioId) {
        self.audio_ids.push(audio_id);
    }

    pub fn audio_ids(&self) -> &[AudioId] {
        &self.audio_ids
    }

    /// Number of UID records
    pub fn num_uids(&self) -> u16 {
        self.audio_ids.len() as u16
    }

    /// Number of distinct track indices among all UIDs
    pub fn num_tracks(&self) -> u16 {
        self.audio_ids
            .iter()
            .map(AudioId::track_index)
            .collect::<BTreeSet<_>>()
            .len() as u16
    }

    pub fn size(&self) -> u64 {
        4 + self.audio_ids.len() as u64 * AUDIO_ID_SIZE
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(self.num_tracks())?;
        writer.write_u16::<LittleEndian>(self.num_uids())?;
        for audio_id in &self.audio_ids {
            audio_id.write(writer)?;
        }
        Ok(())
    }
}
