//! Writing BW64/RF64 files

use crate::chunk::{
    ids, AxmlChunk, ChnaChunk, Chunk, ChunkHeader, CueChunk, CuePoint, DataChunk, DataSize64Chunk,
    ExtraData, FormatInfoChunk, LabelChunk, ListChunk,
};
use crate::chunk::format::{
    KSDATAFORMAT_SUBTYPE_IEEE_FLOAT, KSDATAFORMAT_SUBTYPE_PCM, WAVE_FORMAT_EXTENSIBLE,
    WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM,
};
use crate::codec::{encode_float_samples, encode_pcm_samples, Sample};
use crate::error::{Error, Result};
use crate::util::FourCC;
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::mem;
use std::path::Path;
use tracing::debug;

/// Upper bound on AudioId records; sizes the `chna` placeholder
pub const MAX_NUMBER_OF_UIDS: u32 = 1024;

/// 28-byte ds64 header plus exactly one table slot, reserved for `axml`
const DS64_PLACEHOLDER_SIZE: u32 = 40;

/// Parameters for a new file.
///
/// `use_extensible` forces the extensible `fmt ` layout; a non-zero
/// `channel_mask` implies it. `max_markers` reserves space for a `cue `
/// chunk; markers can only be added when it is non-zero.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub use_extensible: bool,
    pub use_float: bool,
    pub channel_mask: u32,
    pub max_markers: u32,
    pub use_rf64_id: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 48000,
            bit_depth: 24,
            use_extensible: false,
            use_float: false,
            channel_mask: 0,
            max_markers: 0,
            use_rf64_id: false,
        }
    }
}

/// A zero mask means "the default layout": the lowest `channels` speaker bits
fn correct_channel_mask(channel_mask: u32, channels: u16) -> u32 {
    if channel_mask != 0 {
        return channel_mask;
    }
    if channels >= 32 {
        u32::MAX
    } else {
        (1u32 << channels) - 1
    }
}

/// Writer for a BW64/RF64 file.
///
/// Construction lays out the RIFF header, a `JUNK` reservation for a
/// potential `ds64` promotion, the `fmt ` chunk, all pre-data chunks and the
/// `data` chunk header. Frames are then streamed with
/// [`write`](Bw64Writer::write); [`finalize`](Bw64Writer::finalize) patches
/// every reserved header and closes the file. A writer dropped without
/// finalizing attempts the same finalization, ignoring errors.
pub struct Bw64Writer<W: Write + Seek> {
    writer: W,
    format: FormatInfoChunk,
    chunks: Vec<Chunk>,
    chunk_headers: Vec<ChunkHeader>,
    post_data_chunks: Vec<Chunk>,
    data_size: u64,
    use_rf64_id: bool,
    finalized: bool,
    raw_buffer: Vec<u8>,
}

impl Bw64Writer<BufWriter<File>> {
    /// Create a new BW64 file for writing.
    ///
    /// An existing file at `path` is overwritten.
    pub fn create<P: AsRef<Path>>(
        path: P,
        config: WriterConfig,
        pre_data_chunks: Vec<Chunk>,
    ) -> Result<Self> {
        let file = File::create(path)?;
        Bw64Writer::new(BufWriter::new(file), config, pre_data_chunks)
    }
}

impl<W: Write + Seek> Bw64Writer<W> {
    /// Open a new BW64 stream for writing, emitting everything up to the
    /// `data` chunk header.
    ///
    /// Chunks that must appear before the audio payload go in
    /// `pre_data_chunks`; they are written in order directly after `fmt `.
    pub fn new(mut writer: W, config: WriterConfig, pre_data_chunks: Vec<Chunk>) -> Result<Self> {
        // placeholder outer header; finalize patches id and size
        writer.write_u32::<LittleEndian>(ids::RIFF.as_u32())?;
        writer.write_u32::<LittleEndian>(u32::MAX)?;
        writer.write_u32::<LittleEndian>(ids::WAVE.as_u32())?;

        let format = if config.use_extensible || config.channel_mask != 0 {
            let channel_mask = correct_channel_mask(config.channel_mask, config.channels);
            let sub_format = if config.use_float {
                KSDATAFORMAT_SUBTYPE_IEEE_FLOAT
            } else {
                KSDATAFORMAT_SUBTYPE_PCM
            };
            FormatInfoChunk::new(
                config.channels,
                config.sample_rate,
                config.bit_depth,
                Some(ExtraData::new(config.bit_depth, channel_mask, sub_format)),
                WAVE_FORMAT_EXTENSIBLE,
            )?
        } else {
            let format_tag = if config.use_float {
                WAVE_FORMAT_IEEE_FLOAT
            } else {
                WAVE_FORMAT_PCM
            };
            FormatInfoChunk::new(config.channels, config.sample_rate, config.bit_depth, None, format_tag)?
        };

        let mut bw64 = Bw64Writer {
            writer,
            format: format.clone(),
            chunks: Vec::new(),
            chunk_headers: Vec::new(),
            post_data_chunks: Vec::new(),
            data_size: 0,
            use_rf64_id: config.use_rf64_id,
            finalized: false,
            raw_buffer: Vec::new(),
        };

        bw64.write_chunk_placeholder(ids::JUNK, DS64_PLACEHOLDER_SIZE)?;
        bw64.write_chunk(Chunk::Format(format))?;

        for chunk in pre_data_chunks {
            bw64.write_chunk(chunk)?;
        }

        // reserve cue space, then empty the chunk so markers fill it back up
        if config.max_markers > 0 {
            let placeholder = CueChunk::new(vec![CuePoint::default(); config.max_markers as usize]);
            bw64.write_chunk(Chunk::Cue(placeholder))?;
            if let Some(cue) = bw64.cue_chunk_mut() {
                cue.clear_cue_points();
            }
        }

        if bw64.chna_chunk().is_none() {
            bw64.write_chunk_placeholder(ids::CHNA, MAX_NUMBER_OF_UIDS * 40 + 4)?;
        }

        bw64.write_chunk(Chunk::Data(DataChunk::default()))?;
        Ok(bw64)
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

    /// Number of frames written so far
    pub fn frames_written(&self) -> u64 {
        self.data_size / self.block_alignment() as u64
    }

    /// Get the `fmt ` chunk
    pub fn format_chunk(&self) -> &FormatInfoChunk {
        &self.format
    }

    /// Get the `chna` chunk if one has been written or set
    pub fn chna_chunk(&self) -> Option<&ChnaChunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Chna(chna) => Some(chna),
            _ => None,
        })
    }

    /// Get the `axml` chunk if one was supplied before the data chunk
    pub fn axml_chunk(&self) -> Option<&AxmlChunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Axml(axml) => Some(axml),
            _ => None,
        })
    }

    /// Get the reserved `cue ` chunk if present
    pub fn cue_chunk(&self) -> Option<&CueChunk> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Cue(cue) => Some(cue),
            _ => None,
        })
    }

    /// Use the `RF64` id instead of `BW64` when the file grows past 4 GiB
    pub fn use_rf64_id(&mut self, state: bool) {
        self.use_rf64_id = state;
    }

    /// Replace the reserved `chna` region with real content.
    ///
    /// The chunk must fit the reservation made at open (1024 AudioIds).
    pub fn set_chna_chunk(&mut self, chunk: ChnaChunk) -> Result<()> {
        if chunk.num_uids() as u32 > MAX_NUMBER_OF_UIDS {
            return Err(Error::invalid_argument(format!(
                "number of track UIDs is > {}",
                MAX_NUMBER_OF_UIDS
            )));
        }
        self.overwrite_chunk(ids::CHNA, &Chunk::Chna(chunk.clone()))?;

        // keep the accessor truthful about what is on disk
        if let Some(existing) = self.chunks.iter_mut().find(|c| matches!(c, Chunk::Chna(_))) {
            *existing = Chunk::Chna(chunk);
        } else {
            self.chunks.push(Chunk::Chna(chunk));
        }
        Ok(())
    }

    /// Queue an `axml` chunk to be written after the data chunk
    pub fn set_axml_chunk(&mut self, chunk: AxmlChunk) {
        self.post_data_chunks.push(Chunk::Axml(chunk));
    }

    /// Queue any chunk to be written after the data chunk
    pub fn post_data_chunk(&mut self, chunk: Chunk) {
        self.post_data_chunks.push(chunk);
    }

    /// Add a marker at a sample position, with an optional label.
    ///
    /// Fails when no cue space was reserved (`max_markers == 0`) or the id is
    /// already taken.
    pub fn add_marker<S: Into<String>>(&mut self, id: u32, position: u32, label: S) -> Result<()> {
        self.add_marker_point(CuePoint::new(id, position, label))
    }

    /// Add an existing cue point as a marker
    pub fn add_marker_point(&mut self, cue_point: CuePoint) -> Result<()> {
        let cue = self.cue_chunk_mut().ok_or(Error::MissingChunk(ids::CUE))?;
        cue.add_cue_point(cue_point)
    }

    /// Add several markers at once
    pub fn add_markers<I: IntoIterator<Item = CuePoint>>(&mut self, markers: I) -> Result<()> {
        for marker in markers {
            self.add_marker_point(marker)?;
        }
        Ok(())
    }

    /// Encode and append interleaved host float frames to the data chunk.
    ///
    /// Returns the number of frames written. The buffer must hold
    /// `frames * channels` samples.
    pub fn write<T: Sample>(&mut self, buffer: &[T], frames: u64) -> Result<u64> {
        self.check_writable()?;

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
        let bit_depth = self.bit_depth();
        self.raw_buffer.resize(byte_count, 0);
        if self.format.is_float() {
            encode_float_samples(&buffer[..samples], &mut self.raw_buffer, bit_depth)?;
        } else {
            encode_pcm_samples(&buffer[..samples], &mut self.raw_buffer, bit_depth)?;
        }
        self.writer.write_all(&self.raw_buffer)?;

        self.grow_data_chunk(byte_count as u64);
        Ok(frames)
    }

    /// Append already-encoded frames to the data chunk.
    ///
    /// The bytes must match the file's bit depth and coding exactly:
    /// `frames * block_alignment` bytes of little-endian samples.
    pub fn write_raw(&mut self, data: &[u8], frames: u64) -> Result<u64> {
        self.check_writable()?;

        let byte_count = frames * self.block_alignment() as u64;
        if data.len() as u64 != byte_count {
            return Err(Error::invalid_argument(format!(
                "{} frames require {} bytes at {} bits, got {}",
                frames,
                byte_count,
                self.bit_depth(),
                data.len()
            )));
        }
        self.writer.write_all(data)?;

        self.grow_data_chunk(byte_count);
        Ok(frames)
    }

    /// Finalize and close the file.
    ///
    /// Pads the data chunk, patches every reserved header, writes queued
    /// post-data chunks and promotes the file to BW64/RF64 when it outgrew
    /// 4 GiB. If finalization fails the file is closed anyway but its
    /// contents are not valid; do not retry.
    pub fn finalize(mut self) -> Result<()> {
        self.do_finalize()
    }

    fn check_writable(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::invalid_argument("writer is already finalized"));
        }
        Ok(())
    }

    fn do_finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        // even a failed finalization must not run twice
        self.finalized = true;

        self.finalize_data_chunk()?;
        self.finalize_cue_chunk()?;
        let post_data_chunks = mem::take(&mut self.post_data_chunks);
        for chunk in post_data_chunks {
            self.write_chunk(chunk)?;
        }
        self.finalize_riff_chunk()?;
        self.writer.flush()?;

        debug!(
            frames = self.frames_written(),
            bytes = self.data_size,
            "finalized bw64 file"
        );
        Ok(())
    }

    fn grow_data_chunk(&mut self, bytes: u64) {
        self.data_size += bytes;
        for chunk in &mut self.chunks {
            if let Chunk::Data(data) = chunk {
                data.set_size(self.data_size);
            }
        }
        if let Some(header) = self.chunk_headers.iter_mut().find(|h| h.id == ids::DATA) {
            header.size = self.data_size;
        }
    }

    fn cue_chunk_mut(&mut self) -> Option<&mut CueChunk> {
        self.chunks.iter_mut().find_map(|chunk| match chunk {
            Chunk::Cue(cue) => Some(cue),
            _ => None,
        })
    }

    fn chunk_header(&self, id: FourCC) -> Option<ChunkHeader> {
        self.chunk_headers.iter().find(|header| header.id == id).copied()
    }

    fn chunk_size_for_header(size: u64) -> u32 {
        if size >= u32::MAX as u64 {
            u32::MAX
        } else {
            size as u32
        }
    }

    /// Append a chunk at the current end of file, recording its header
    fn write_chunk(&mut self, chunk: Chunk) -> Result<()> {
        let position = self.writer.stream_position()?;
        self.chunk_headers
            .push(ChunkHeader::new(chunk.id(), chunk.size(), position));

        self.writer.write_u32::<LittleEndian>(chunk.id().as_u32())?;
        self.writer
            .write_u32::<LittleEndian>(Self::chunk_size_for_header(chunk.size()))?;
        chunk.write(&mut self.writer)?;
        if chunk.size() % 2 == 1 {
            self.writer.write_u8(0)?;
        }

        self.chunks.push(chunk);
        Ok(())
    }

    /// Reserve a zero-filled region with a chunk header
    fn write_chunk_placeholder(&mut self, id: FourCC, size: u32) -> Result<()> {
        let position = self.writer.stream_position()?;
        self.chunk_headers
            .push(ChunkHeader::new(id, size as u64, position));
        self.writer.write_u32::<LittleEndian>(id.as_u32())?;
        self.writer.write_u32::<LittleEndian>(size)?;
        self.writer.write_all(&vec![0u8; size as usize])?;
        Ok(())
    }

    /// Rewrite a previously written or reserved chunk in place.
    ///
    /// The new content must fit the region recorded for `target_id`.
    fn overwrite_chunk(&mut self, target_id: FourCC, chunk: &Chunk) -> Result<()> {
        let header = self
            .chunk_header(target_id)
            .ok_or(Error::MissingChunk(target_id))?;
        if chunk.size() > header.size {
            return Err(Error::CapacityExceeded {
                chunk: chunk.id(),
                needed: chunk.size(),
                reserved: header.size,
            });
        }

        let last_position = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(header.position))?;
        self.writer.write_u32::<LittleEndian>(chunk.id().as_u32())?;
        self.writer
            .write_u32::<LittleEndian>(Self::chunk_size_for_header(chunk.size()))?;
        chunk.write(&mut self.writer)?;
        if chunk.size() % 2 == 1 {
            self.writer.write_u8(0)?;
        }
        self.writer.seek(SeekFrom::Start(last_position))?;
        Ok(())
    }

    /// Size of the outer RIFF chunk: everything after the first 8 bytes
    fn riff_chunk_size(&mut self) -> Result<u64> {
        let last_position = self.writer.stream_position()?;
        let end = self.writer.seek(SeekFrom::End(0))?;
        self.writer.seek(SeekFrom::Start(last_position))?;
        Ok(end - 8)
    }

    fn finalize_data_chunk(&mut self) -> Result<()> {
        if self.data_size % 2 == 1 {
            self.writer.write_u8(0)?;
        }
        let last_position = self.writer.stream_position()?;
        let header = self
            .chunk_header(ids::DATA)
            .ok_or(Error::MissingChunk(ids::DATA))?;
        self.writer.seek(SeekFrom::Start(header.position))?;
        self.writer.write_u32::<LittleEndian>(ids::DATA.as_u32())?;
        self.writer
            .write_u32::<LittleEndian>(Self::chunk_size_for_header(self.data_size))?;
        self.writer.seek(SeekFrom::Start(last_position))?;
        Ok(())
    }

    /// Patch the reserved cue region and queue a `LIST/adtl` with the labels
    fn finalize_cue_chunk(&mut self) -> Result<()> {
        let cue = match self.cue_chunk() {
            Some(cue) => cue.clone(),
            None => return Ok(()),
        };

        let labels = cue.labels();
        if !labels.is_empty() {
            let label_chunks = labels
                .into_iter()
                .map(|(id, label)| Chunk::Label(LabelChunk::new(id, label)))
                .collect();
            self.post_data_chunks
                .push(Chunk::List(ListChunk::new(ids::ADTL, label_chunks)));
        }

        self.overwrite_chunk(ids::CUE, &Chunk::Cue(cue))
    }

    fn finalize_riff_chunk(&mut self) -> Result<()> {
        let riff_size = self.riff_chunk_size()?;
        let promote = riff_size > u32::MAX as u64
            || self.chunk_headers.iter().any(|h| h.size > u32::MAX as u64);

        let last_position = self.writer.seek(SeekFrom::End(0))?;
        self.writer.seek(SeekFrom::Start(0))?;
        if promote {
            let id = if self.use_rf64_id { ids::RF64 } else { ids::BW64 };
            self.writer.write_u32::<LittleEndian>(id.as_u32())?;
            self.writer.write_u32::<LittleEndian>(u32::MAX)?;
            self.overwrite_junk_with_ds64(riff_size)?;
        } else {
            self.writer.write_u32::<LittleEndian>(ids::RIFF.as_u32())?;
            self.writer.write_u32::<LittleEndian>(riff_size as u32)?;
        }
        self.writer.seek(SeekFrom::Start(last_position))?;
        Ok(())
    }

    /// Rewrite the `JUNK` reservation as a `ds64` chunk.
    ///
    /// The chunk is declared at the full reserved size; the bytes after the
    /// table are junk padding, which the parser side skips. This keeps the
    /// chunk walk aligned even with an empty table.
    fn overwrite_junk_with_ds64(&mut self, riff_size: u64) -> Result<()> {
        let mut ds64 = DataSize64Chunk::new(riff_size, self.data_size, BTreeMap::new());
        // the data size is carried in its fixed field; the table only holds
        // other oversized chunks
        for header in &self.chunk_headers {
            if header.id != ids::DATA && header.size > u32::MAX as u64 {
                ds64.set_chunk_size(header.id, header.size);
            }
        }

        let junk = self
            .chunk_header(ids::JUNK)
            .ok_or(Error::MissingChunk(ids::JUNK))?;
        if ds64.size() > junk.size {
            return Err(Error::CapacityExceeded {
                chunk: ids::DS64,
                needed: ds64.size(),
                reserved: junk.size,
            });
        }

        self.writer.seek(SeekFrom::Start(junk.position))?;
        self.writer.write_u32::<LittleEndian>(ids::DS64.as_u32())?;
        self.writer.write_u32::<LittleEndian>(junk.size as u32)?;
        ds64.write(&mut self.writer)?;
        let padding = junk.size - ds64.size();
        self.writer.write_all(&vec![0u8; padding as usize])?;
        Ok(())
    }
}

impl<W: Write + Seek> Drop for Bw64Writer<W> {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = self.do_finalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn writer_with(config: WriterConfig) -> Bw64Writer<Cursor<Vec<u8>>> {
        Bw64Writer::new(Cursor::new(Vec::new()), config, Vec::new()).unwrap()
    }

    #[test]
    fn test_layout_at_open() {
        let writer = writer_with(WriterConfig::default());
        let ids_in_order: Vec<FourCC> = writer.chunk_headers.iter().map(|h| h.id).collect();
        assert_eq!(ids_in_order, vec![ids::JUNK, ids::FMT, ids::CHNA, ids::DATA]);

        // JUNK reservation directly after the 12-byte outer header
        assert_eq!(writer.chunk_headers[0].position, 12);
        assert_eq!(writer.chunk_headers[0].size, 40);
        // chna placeholder sized for 1024 AudioIds
        assert_eq!(writer.chunk_headers[2].size, 4 + 1024 * 40);
    }

    #[test]
    fn test_cue_reservation_in_layout() {
        let writer = writer_with(WriterConfig {
            max_markers: 5,
            ..WriterConfig::default()
        });
        let cue = writer.chunk_header(ids::CUE).unwrap();
        assert_eq!(cue.size, 4 + 5 * 24);
        // reserved space is logically empty until markers are added
        assert!(writer.cue_chunk().unwrap().cue_points().is_empty());
    }

    #[test]
    fn test_small_file_stays_riff() {
        let mut writer = writer_with(WriterConfig {
            channels: 1,
            bit_depth: 16,
            ..WriterConfig::default()
        });
        writer.write(&[0.0f32; 100], 100).unwrap();
        writer.do_finalize().unwrap();

        let bytes = writer.writer.get_ref().clone();
        assert_eq!(&bytes[0..4], b"RIFF");
        let group_size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(group_size as usize, bytes.len() - 8);
        // the ds64 reservation stays a JUNK chunk in the short form
        assert_eq!(&bytes[12..16], b"JUNK");
    }

    #[test]
    fn test_promotion_rewrites_junk_as_ds64() {
        let mut writer = writer_with(WriterConfig {
            channels: 1,
            bit_depth: 16,
            ..WriterConfig::default()
        });
        writer.write(&[0.25f32; 10], 10).unwrap();

        // pretend the data chunk outgrew 4 GiB
        let fake_size = 5_000_000_000u64;
        writer.data_size = fake_size;
        writer.grow_data_chunk(0);

        writer.do_finalize().unwrap();
        let bytes = writer.writer.get_ref().clone();

        assert_eq!(&bytes[0..4], b"BW64");
        assert_eq!(&bytes[4..8], &[0xff, 0xff, 0xff, 0xff]);
        // the JUNK reservation at offset 12 is now a ds64 chunk
        assert_eq!(&bytes[12..16], b"ds64");
        assert_eq!(&bytes[16..20], &40u32.to_le_bytes());
        let data_size = u64::from_le_bytes(bytes[28..36].try_into().unwrap());
        assert_eq!(data_size, fake_size);
        // the data chunk header carries the clamp marker
        let data_pos = writer.chunk_header(ids::DATA).unwrap().position as usize;
        assert_eq!(&bytes[data_pos + 4..data_pos + 8], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_rf64_id_opt_in() {
        let mut writer = writer_with(WriterConfig {
            channels: 1,
            bit_depth: 16,
            use_rf64_id: true,
            ..WriterConfig::default()
        });
        writer.data_size = 5_000_000_000;
        writer.grow_data_chunk(0);
        writer.do_finalize().unwrap();
        assert_eq!(&writer.writer.get_ref()[0..4], b"RF64");
    }

    #[test]
    fn test_writes_after_finalize_rejected() {
        let mut writer = writer_with(WriterConfig::default());
        writer.do_finalize().unwrap();
        assert!(writer.write(&[0.0f32; 1], 1).is_err());
        assert!(writer.write_raw(&[0u8; 3], 1).is_err());
    }
}
