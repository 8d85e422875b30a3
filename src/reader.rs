//! Reading BW64/RF64 files

use crate::chunk::{
    ids, AxmlChunk, ChnaChunk, Chunk, ChunkHeader, CueChunk, CuePoint, DataChunk, DataSize64Chunk,
    FormatInfoChunk, ListChunk,
};
use crate::codec::{decode_float_samples, decode_pcm_samples, Sample};
use crate::error::{Error, Result};
use crate::parser;
use crate::util::FourCC;
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Reader for a BW64/RF64 file.
///
/// Opening parses the whole chunk directory, materializes every known chunk
/// and leaves the stream positioned at the first audio frame. Audio samples
/// themselves stay on disk; [`read`](Bw64Reader::read) decodes them on
/// demand through the sample codec.
#[derive(Debug)]
pub struct Bw64Reader<R: Read + Seek> {
    reader: R,
    file_format: FourCC,
    file_size: u32,
    format: FormatInfoChunk,
    chunks: Vec<Chunk>,
    chunk_headers: Vec<ChunkHeader>,
    data_size: u64,
    data_start: u64,
    raw_buffer: Vec<u8>,
}

/// Resolve a chunk's true 64-bit size through the ds64 table
fn chunk_size64(ds64: Option<&DataSize64Chunk>, id: FourCC, stored_size: u32) -> u64 {
    if let Some(ds64) = ds64 {
        if id == ids::DATA {
            return ds64.data_size();
        }
        if let Some(size) = ds64.chunk_size(id) {
            return size;
        }
    }
    stored_size as u64
}

/// Read one 8-byte chunk header at the current position
fn parse_header<R: Read + Seek>(
    reader: &mut R,
    ds64: Option<&DataSize64Chunk>,
) -> Result<ChunkHeader> {
    let position = reader.stream_position()?;
    let id = FourCC::from_u32(reader.read_u32::<LittleEndian>()?);
    let stored_size = reader.read_u32::<LittleEndian>()?;
    let size = chunk_size64(ds64, id, stored_size);
    Ok(ChunkHeader::new(id, size, position))
}

/// Walk the chunk directory from the current position to end of file
fn parse_chunk_headers<R: Read + Seek>(
    reader: &mut R,
    ds64: Option<&DataSize64Chunk>,
    chunk_headers: &mut Vec<ChunkHeader>,
) -> Result<()> {
    let start = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(start))?;

    while reader.stream_position()? + 8 <= end {
        let header = parse_header(reader, ds64)?;

        let payload_start = reader.stream_position()?;
        let chunk_end = payload_start
            .checked_add(header.size)
            .ok_or_else(|| Error::format("chunk size overflows the file offset"))?;
        if chunk_end > end {
            return Err(Error::format("chunk ends after end of file"));
        }

        chunk_headers.push(header);

        // skip a pad byte unless this is the final chunk
        let mut skip = header.size;
        if chunk_end < end && skip % 2 == 1 {
            skip += 1;
        }
        reader.seek(SeekFrom::Current(skip as i64))?;
    }
    Ok(())
}

impl Bw64Reader<BufReader<File>> {
    /// Open a BW64 file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Bw64Reader::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> Bw64Reader<R> {
    /// Read a BW64 file from a stream.
    ///
    /// Parses the outer header and the full chunk directory. For BW64/RF64
    /// files the first chunk must be `ds64`; it is parsed up front so the
    /// sizes of all later chunks can be resolved.
    pub fn new(mut reader: R) -> Result<Self> {
        let file_format = FourCC::from_u32(reader.read_u32::<LittleEndian>()?);
        let file_size = reader.read_u32::<LittleEndian>()?;
        let riff_type = FourCC::from_u32(reader.read_u32::<LittleEndian>()?);

        if file_format != ids::RIFF && file_format != ids::BW64 && file_format != ids::RF64 {
            return Err(Error::format("file is not a RIFF, BW64 or RF64 file"));
        }
        if riff_type != ids::WAVE {
            return Err(Error::format("file is not a WAVE file"));
        }

        let mut chunk_headers = Vec::new();
        let mut ds64 = None;
        if file_format == ids::BW64 || file_format == ids::RF64 {
            let header = parse_header(&mut reader, None)?;
            if header.id != ids::DS64 {
                return Err(Error::MissingChunk(ids::DS64));
            }
            ds64 = Some(parser::parse_data_size64_chunk(
                &mut reader,
                header.id,
                header.size,
            )?);
            chunk_headers.push(header);
        }
        parse_chunk_headers(&mut reader, ds64.as_ref(), &mut chunk_headers)?;

        let mut chunks: Vec<Chunk> = ds64.map(Chunk::DataSize64).into_iter().collect();
        for header in &chunk_headers {
            if header.id != ids::DS64 {
                chunks.push(parser::parse_chunk(&mut reader, header)?);
            }
        }

        let format = chunks
            .iter()
            .find_map(|chunk| match chunk {
                Chunk::Format(format) => Some(format.clone()),
                _ => None,
            })
            .ok_or(Error::MissingChunk(ids::FMT))?;

        let data_header = chunk_headers
            .iter()
            .find(|header| header.id == ids::DATA)
            .copied()
            .ok_or(Error::MissingChunk(ids::DATA))?;

        debug!(
            chunks = chunk_headers.len(),
            format = %file_format,
            "parsed chunk directory"
        );

        let mut bw64 = Bw64Reader {
            reader,
            file_format,
            file_size,
            format,
            chunks,
            chunk_headers,
            data_size: data_header.size,
            data_start: data_header.position + 8,
            raw_buffer: Vec::new(),
        };
        bw64.associate_cue_labels();
        bw64.seek(SeekFrom::Start(0))?;
        Ok(bw64)
    }

    /// File format id: RIFF, BW64 or RF64
    pub fn file_format(&self) -> FourCC {
        self.file_format
    }

    /// The 32-bit size stored in the outer header (`0xFFFFFFFF` for long-form
    /// files)
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    /// Format tag of the `fmt ` chunk
    pub fn format_tag(&self) -> u16 {
        self.format.format_tag()
    }

    /// Number of channels
    pub fn channels(&self) -> u16 {
        self.format.channel_count()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate()
    }

    /// Bit depth of the on-disk samples
    pub fn bit_depth(&self) -> u16 {
        self.format.bits_per_sample()
    }

    /// Bytes per frame
    pub fn block_alignment(&self) -> u16 {
        self.format.block_alignment()
    }

    /// Number of frames in the data chunk
    pub fn number_of_frames(&self) -> u64 {
        self.data_size / self.block_alignment() as u64
    }

    /// All chunk headers in file order
    pub fn chunk_headers(&self) -> &[ChunkHeader] {
        &self.chunk_headers
    }

    /// Check whether a chunk with the given id is present
    pub fn has_chunk(&self, id: FourCC) -> bool {
        self.chunk_headers.iter().any(|header| header.id == id)
    }

    /// Get the `ds64` chunk if present
    pub fn ds64_chunk(&self) -> Option<&DataSize64Chunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::DataSize64(ds64) => Some(ds64),
            _ => None,
        })
    }

    /// Get the `fmt ` chunk
    pub fn format_chunk(&self) -> &FormatInfoChunk {
        &self.format
    }

    /// Get the `data` chunk if present.
    ///
    /// Frame access normally goes through [`read`](Bw64Reader::read); this
    /// accessor only exposes the recorded size.
    pub fn data_chunk(&self) -> Option<&DataChunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Data(data) => Some(data),
            _ => None,
        })
    }

    /// Get the `chna` chunk if present
    pub fn chna_chunk(&self) -> Option<&ChnaChunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Chna(chna) => Some(chna),
            _ => None,
        })
    }

    /// Get the `axml` chunk if present
    pub fn axml_chunk(&self) -> Option<&AxmlChunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Axml(axml) => Some(axml),
            _ => None,
        })
    }

    /// Get the `cue ` chunk if present
    pub fn cue_chunk(&self) -> Option<&CueChunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Cue(cue) => Some(cue),
            _ => None,
        })
    }

    /// Get all `LIST` chunks in the file
    pub fn list_chunks(&self) -> Vec<&ListChunk> {
        self.chunks
            .iter()
            .filter_map(|chunk| match chunk {
                Chunk::List(list) => Some(list),
                _ => None,
            })
            .collect()
    }

    /// All markers with their labels, sorted by position
    pub fn markers(&self) -> Vec<CuePoint> {
        match self.cue_chunk() {
            Some(cue) => cue.cue_points().to_vec(),
            None => Vec::new(),
        }
    }

    /// Find a marker by its cue point id
    pub fn find_marker_by_id(&self, id: u32) -> Option<&CuePoint> {
        self.cue_chunk()?.cue_points().iter().find(|point| point.id == id)
    }

    /// Seek to a frame position within the data chunk.
    ///
    /// The offset is measured in frames relative to the start, the current
    /// position or the end of the data chunk, and is clamped to
    /// `[0, number_of_frames]`. Returns the resulting frame position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let frames = self.number_of_frames() as i64;

        let (start, offset) = match pos {
            SeekFrom::Start(offset) => (0, offset.min(i64::MAX as u64) as i64),
            SeekFrom::Current(offset) => (self.tell()? as i64, offset),
            SeekFrom::End(offset) => (frames, offset),
        };
        let frame = start.saturating_add(offset).clamp(0, frames) as u64;

        let byte_pos = self.data_start + frame * self.block_alignment() as u64;
        self.reader.seek(SeekFrom::Start(byte_pos))?;
        Ok(frame)
    }

    /// Current frame position within the data chunk
    pub fn tell(&mut self) -> Result<u64> {
        let pos = self.reader.stream_position()?;
        Ok(pos.saturating_sub(self.data_start) / self.block_alignment() as u64)
    }

    /// Check whether the end of the data chunk has been reached
    pub fn eof(&mut self) -> Result<bool> {
        Ok(self.tell()? == self.number_of_frames())
    }

    /// Read frames into an interleaved host float buffer.
    ///
    /// Reads at most `frames`, clamped to the remainder of the data chunk,
    /// and returns the number of frames actually decoded. The buffer must
    /// hold `frames * channels` samples.
    pub fn read<T: Sample>(&mut self, buffer: &mut [T], frames: u64) -> Result<u64> {
        let remaining = self.number_of_frames().saturating_sub(self.tell()?);
        let frames = frames.min(remaining);
        if frames == 0 {
            return Ok(0);
        }

        let samples = (frames * self.channels() as u64) as usize;
        if buffer.len() < samples {
            return Err(Error::invalid_argument(format!(
                "buffer holds {} samples but {} frames need {}",
                buffer.len(),
                frames,
                samples
            )));
        }

        let byte_count = (frames * self.block_alignment() as u64) as usize;
        self.raw_buffer.resize(byte_count, 0);
        self.reader.read_exact(&mut self.raw_buffer)?;

        if self.format.is_float() {
            decode_float_samples(&self.raw_buffer, &mut buffer[..samples], self.bit_depth())?;
        } else {
            decode_pcm_samples(&self.raw_buffer, &mut buffer[..samples], self.bit_depth())?;
        }
        Ok(frames)
    }

    /// Read frames as raw bytes without decoding.
    ///
    /// The buffer must hold `frames * block_alignment` bytes; the sample
    /// layout matches the file's bit depth and coding.
    pub fn read_raw(&mut self, buffer: &mut [u8], frames: u64) -> Result<u64> {
        let remaining = self.number_of_frames().saturating_sub(self.tell()?);
        let frames = frames.min(remaining);
        if frames == 0 {
            return Ok(0);
        }

        let byte_count = (frames * self.block_alignment() as u64) as usize;
        if buffer.len() < byte_count {
            return Err(Error::invalid_argument(format!(
                "buffer holds {} bytes but {} frames need {}",
                buffer.len(),
                frames,
                byte_count
            )));
        }
        self.reader.read_exact(&mut buffer[..byte_count])?;
        Ok(frames)
    }

    /// Close the reader, releasing the underlying stream
    pub fn close(self) -> Result<()> {
        drop(self);
        Ok(())
    }

    /// Join `labl` sub-chunks of every `LIST/adtl` chunk onto the cue points
    fn associate_cue_labels(&mut self) {
        let mut labels: BTreeMap<u32, String> = BTreeMap::new();
        for chunk in &self.chunks {
            let list = match chunk {
                Chunk::List(list) if list.list_type() == ids::ADTL => list,
                _ => continue,
            };
            for sub_chunk in list.sub_chunks() {
                if let Chunk::Label(label) = sub_chunk {
                    labels.insert(label.cue_point_id(), label.label().to_string());
                }
            }
        }
        if labels.is_empty() {
            return;
        }

        for chunk in &mut self.chunks {
            if let Chunk::Cue(cue) = chunk {
                for point in cue.cue_points_mut() {
                    if let Some(label) = labels.get(&point.id) {
                        point.label = label.clone();
                    }
                }
            }
        }
    }
}
