//! Per-chunk parsers constructing chunk objects from a stream
//!
//! Every parser takes a stream positioned at the first byte of the chunk
//! payload plus the already-resolved 64-bit size, validates the payload
//! against the chunk grammar and returns the typed chunk. Any inconsistency
//! is fatal for the file.

use crate::chunk::{
    ids, AudioId, AxmlChunk, ChnaChunk, Chunk, ChunkHeader, CueChunk, CuePoint, DataChunk,
    DataSize64Chunk, ExtraData, FormatInfoChunk, Guid, LabelChunk, ListChunk, UnknownChunk,
};
use crate::chunk::ds64::{DS64_HEADER_SIZE, DS64_TABLE_ENTRY_SIZE};
use crate::chunk::format::{WAVE_FORMAT_EXTENSIBLE, WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM};
use crate::error::{Error, Result};
use crate::util::{read_fixed_ascii, FourCC};
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

fn check_id(id: FourCC, expected: FourCC) -> Result<()> {
    if id != expected {
        return Err(Error::format(format!(
            "chunk id '{}' != '{}'",
            id, expected
        )));
    }
    Ok(())
}

/// Parse the 22 bytes of extensible extra data
pub fn parse_extra_data<R: Read>(reader: &mut R) -> Result<ExtraData> {
    let valid_bits_per_sample = reader.read_u16::<LittleEndian>()?;
    let channel_mask = reader.read_u32::<LittleEndian>()?;
    let sub_format = Guid {
        data1: reader.read_u32::<LittleEndian>()?,
        data2: reader.read_u16::<LittleEndian>()?,
        data3: reader.read_u16::<LittleEndian>()?,
        data4: {
            let mut data4 = [0u8; 8];
            reader.read_exact(&mut data4)?;
            data4
        },
    };
    Ok(ExtraData::new(valid_bits_per_sample, channel_mask, sub_format))
}

/// Parse a `fmt ` chunk
pub fn parse_format_info_chunk<R: Read>(
    reader: &mut R,
    id: FourCC,
    size: u64,
) -> Result<FormatInfoChunk> {
    check_id(id, ids::FMT)?;
    if size < 16 {
        return Err(Error::format("'fmt ' chunk is too small"));
    }

    let format_tag = reader.read_u16::<LittleEndian>()?;
    let channel_count = reader.read_u16::<LittleEndian>()?;
    let sample_rate = reader.read_u32::<LittleEndian>()?;
    let bytes_per_second = reader.read_u32::<LittleEndian>()?;
    let block_alignment = reader.read_u16::<LittleEndian>()?;
    let bits_per_sample = reader.read_u16::<LittleEndian>()?;

    let cb_size = if size >= 18 {
        let cb_size = reader.read_u16::<LittleEndian>()?;
        if size != 18 + cb_size as u64 {
            return Err(Error::format("'fmt ' chunk is not as specified in cbSize"));
        }
        cb_size
    } else {
        if size != 16 {
            return Err(Error::format("'fmt ' chunk without cbSize should be 16 bytes"));
        }
        0
    };

    let extra_data = match format_tag {
        WAVE_FORMAT_PCM | WAVE_FORMAT_IEEE_FLOAT => {
            if cb_size != 0 {
                return Err(Error::format(
                    "PCM and IEEE float 'fmt ' chunks should not have extra data",
                ));
            }
            None
        }
        WAVE_FORMAT_EXTENSIBLE => {
            if cb_size != 22 {
                return Err(Error::format(format!(
                    "extensible 'fmt ' chunk must have 22 bytes of extra data, but has {}",
                    cb_size
                )));
            }
            let extra = parse_extra_data(reader)?;
            let data1 = extra.sub_format().data1;
            if data1 != WAVE_FORMAT_PCM as u32 && data1 != WAVE_FORMAT_IEEE_FLOAT as u32 {
                return Err(Error::format(format!("sub-format unsupported: {:#x}", data1)));
            }
            Some(extra)
        }
        tag => return Err(Error::format(format!("format unsupported: {}", tag))),
    };

    // constructor failures here are file-content problems, not caller mistakes
    let chunk = FormatInfoChunk::new(channel_count, sample_rate, bits_per_sample, extra_data, format_tag)
        .map_err(|err| match err {
            Error::InvalidArgument(msg) => Error::Format(msg),
            err => err,
        })?;

    if chunk.block_alignment() != block_alignment {
        return Err(Error::format(format!(
            "sanity check failed: blockAlignment is {} but should be {}",
            block_alignment,
            chunk.block_alignment()
        )));
    }
    if chunk.bytes_per_second() != bytes_per_second {
        return Err(Error::format(format!(
            "sanity check failed: bytesPerSecond is {} but should be {}",
            bytes_per_second,
            chunk.bytes_per_second()
        )));
    }

    Ok(chunk)
}

/// Parse an `axml` chunk
pub fn parse_axml_chunk<R: Read>(reader: &mut R, id: FourCC, size: u64) -> Result<AxmlChunk> {
    check_id(id, ids::AXML)?;
    let mut data = vec![0u8; size as usize];
    reader.read_exact(&mut data)?;
    Ok(AxmlChunk::new(data))
}

/// Parse one AudioId record, including its pad byte
pub fn parse_audio_id<R: Read>(reader: &mut R) -> Result<AudioId> {
    let track_index = reader.read_u16::<LittleEndian>()?;
    let uid = read_fixed_ascii(reader, 12)?;
    let track_ref = read_fixed_ascii(reader, 14)?;
    let pack_ref = read_fixed_ascii(reader, 11)?;
    reader.read_u8()?; // padding

    AudioId::new(track_index, uid, track_ref, pack_ref).map_err(|err| match err {
        Error::InvalidArgument(msg) => Error::Format(msg),
        err => err,
    })
}

/// Parse a `chna` chunk
pub fn parse_chna_chunk<R: Read>(reader: &mut R, id: FourCC, size: u64) -> Result<ChnaChunk> {
    check_id(id, ids::CHNA)?;
    if size < 4 {
        return Err(Error::format("illegal 'chna' chunk size"));
    }

    let num_tracks = reader.read_u16::<LittleEndian>()?;
    let num_uids = reader.read_u16::<LittleEndian>()?;
    let mut chunk = ChnaChunk::default();
    for _ in 0..num_uids {
        chunk.add_audio_id(parse_audio_id(reader)?);
    }

    if chunk.num_uids() != num_uids {
        return Err(Error::format(format!("numUids != {}", chunk.num_uids())));
    }
    if chunk.num_tracks() != num_tracks {
        return Err(Error::format(format!("numTracks != {}", chunk.num_tracks())));
    }
    Ok(chunk)
}

/// Parse a `ds64` chunk
pub fn parse_data_size64_chunk<R: Read + Seek>(
    reader: &mut R,
    id: FourCC,
    size: u64,
) -> Result<DataSize64Chunk> {
    check_id(id, ids::DS64)?;

    // fixed-size header, tableLength table entries, optionally some junk
    if size < DS64_HEADER_SIZE {
        return Err(Error::format("illegal 'ds64' chunk size"));
    }

    let bw64_size = reader.read_u64::<LittleEndian>()?;
    let data_size = reader.read_u64::<LittleEndian>()?;
    let _dummy_size = reader.read_u64::<LittleEndian>()?;
    let table_length = reader.read_u32::<LittleEndian>()?;

    let min_size = DS64_HEADER_SIZE + table_length as u64 * DS64_TABLE_ENTRY_SIZE;
    if size < min_size {
        return Err(Error::format("'ds64' chunk too short to hold table entries"));
    }

    let mut table = BTreeMap::new();
    for _ in 0..table_length {
        let entry_id = FourCC::from_u32(reader.read_u32::<LittleEndian>()?);
        let entry_size = reader.read_u64::<LittleEndian>()?;
        table.insert(entry_id, entry_size);
    }
    // skip junk data
    reader.seek(SeekFrom::Current((size - min_size) as i64))?;

    Ok(DataSize64Chunk::new(bw64_size, data_size, table))
}

/// Record the size of a `data` chunk; the payload itself is streamed, never
/// parsed
pub fn parse_data_chunk(id: FourCC, size: u64) -> Result<DataChunk> {
    check_id(id, ids::DATA)?;
    Ok(DataChunk::new(size))
}

/// Parse a `cue ` chunk
pub fn parse_cue_chunk<R: Read>(reader: &mut R, id: FourCC, size: u64) -> Result<CueChunk> {
    check_id(id, ids::CUE)?;
    if size < 4 {
        return Err(Error::format("'cue ' chunk too small"));
    }

    let num_cue_points = reader.read_u32::<LittleEndian>()?;
    if size != 4 + num_cue_points as u64 * 24 {
        return Err(Error::format("incorrect 'cue ' chunk size"));
    }

    let mut cue_points = Vec::with_capacity(num_cue_points as usize);
    for _ in 0..num_cue_points {
        cue_points.push(CuePoint {
            id: reader.read_u32::<LittleEndian>()?,
            position: reader.read_u32::<LittleEndian>()?,
            data_chunk_id: FourCC::from_u32(reader.read_u32::<LittleEndian>()?),
            chunk_start: reader.read_u32::<LittleEndian>()?,
            block_start: reader.read_u32::<LittleEndian>()?,
            sample_offset: reader.read_u32::<LittleEndian>()?,
            label: String::new(),
        });
    }

    Ok(CueChunk::new(cue_points))
}

/// Parse a `labl` chunk
pub fn parse_label_chunk<R: Read>(reader: &mut R, id: FourCC, size: u64) -> Result<LabelChunk> {
    check_id(id, ids::LABL)?;
    // at least the cue point id plus a null terminator
    if size < 5 {
        return Err(Error::format("'labl' chunk too small"));
    }

    let cue_point_id = reader.read_u32::<LittleEndian>()?;
    let mut bytes = vec![0u8; (size - 4) as usize];
    reader.read_exact(&mut bytes)?;

    // truncate at the first null; anything after it is padding
    if let Some(null_pos) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(null_pos);
    }
    let label = bytes.iter().map(|&b| b as char).collect::<String>();

    Ok(LabelChunk::new(cue_point_id, label))
}

/// Parse a `LIST` chunk, walking its sub-chunks
pub fn parse_list_chunk<R: Read + Seek>(reader: &mut R, id: FourCC, size: u64) -> Result<ListChunk> {
    check_id(id, ids::LIST)?;
    if size < 4 {
        return Err(Error::format("'LIST' chunk too small"));
    }

    let list_type = FourCC::from_u32(reader.read_u32::<LittleEndian>()?);

    let mut sub_chunks = Vec::new();
    let mut bytes_read: u64 = 4;

    while bytes_read < size {
        let sub_id = FourCC::from_u32(reader.read_u32::<LittleEndian>()?);
        let sub_size = reader.read_u32::<LittleEndian>()? as u64;
        bytes_read += 8;

        if bytes_read + sub_size > size {
            return Err(Error::format(
                "'LIST' sub-chunk extends past the end of the list",
            ));
        }

        let sub_chunk = if sub_id == ids::LABL {
            Chunk::Label(parse_label_chunk(reader, sub_id, sub_size)?)
        } else {
            reader.seek(SeekFrom::Current(sub_size as i64))?;
            Chunk::Unknown(UnknownChunk::skipped(sub_id))
        };
        bytes_read += sub_size;
        sub_chunks.push(sub_chunk);

        if sub_size % 2 == 1 {
            reader.seek(SeekFrom::Current(1))?;
            bytes_read += 1;
        }
    }

    Ok(ListChunk::new(list_type, sub_chunks))
}

/// Seek to a chunk's payload and parse it according to its id
pub fn parse_chunk<R: Read + Seek>(reader: &mut R, header: &ChunkHeader) -> Result<Chunk> {
    reader.seek(SeekFrom::Start(header.position + 8))?;

    match header.id {
        id if id == ids::DS64 => Ok(Chunk::DataSize64(parse_data_size64_chunk(
            reader,
            header.id,
            header.size,
        )?)),
        id if id == ids::FMT => Ok(Chunk::Format(parse_format_info_chunk(
            reader,
            header.id,
            header.size,
        )?)),
        id if id == ids::AXML => Ok(Chunk::Axml(parse_axml_chunk(reader, header.id, header.size)?)),
        id if id == ids::CHNA => Ok(Chunk::Chna(parse_chna_chunk(reader, header.id, header.size)?)),
        id if id == ids::DATA => Ok(Chunk::Data(parse_data_chunk(header.id, header.size)?)),
        id if id == ids::CUE => Ok(Chunk::Cue(parse_cue_chunk(reader, header.id, header.size)?)),
        id if id == ids::LIST => Ok(Chunk::List(parse_list_chunk(reader, header.id, header.size)?)),
        _ => {
            let mut data = vec![0u8; header.size as usize];
            reader.read_exact(&mut data)?;
            Ok(Chunk::Unknown(UnknownChunk::new(header.id, data)))
        }
    }
}
