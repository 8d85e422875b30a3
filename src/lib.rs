//! bw64 - Broadcast Wave 64 (BW64/RF64) file reading and writing
//!
//! This crate reads and writes the long-form RIFF/WAVE containers used for
//! programme exchange in broadcast: files larger than 4 GiB, Audio
//! Definition Model metadata (`axml`), channel allocation (`chna`) and cue
//! markers with labels, over integer PCM or IEEE float samples.
//!
//! # Architecture
//!
//! - `util`: four-character codes and low-level byte I/O
//! - `codec`: sample conversion between host floats and on-disk PCM/float
//! - `chunk`: typed chunk objects and their serialization
//! - `parser`: per-chunk decoders with grammar validation
//! - `reader`: chunk directory walking and frame-level read access
//! - `writer`: two-pass writing with placeholder reservation and promotion
//!   to BW64/RF64 on overflow
//!
//! # Example
//!
//! ```no_run
//! use bw64::{read_file, write_file};
//!
//! # fn main() -> bw64::Result<()> {
//! let mut writer = write_file("tone.wav", 2, 48000, 24)?;
//! let frames = vec![0.0f32; 2 * 48000];
//! writer.write(&frames, 48000)?;
//! writer.finalize()?;
//!
//! let mut reader = read_file("tone.wav")?;
//! let mut buffer = vec![0.0f32; 2 * 1024];
//! let frames_read = reader.read(&mut buffer, 1024)?;
//! # let _ = frames_read;
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod codec;
pub mod error;
pub mod parser;
pub mod reader;
pub mod util;
pub mod writer;

pub use chunk::{
    ids, AudioId, AxmlChunk, ChnaChunk, Chunk, ChunkHeader, CueChunk, CuePoint, DataChunk,
    DataSize64Chunk, ExtraData, FormatInfoChunk, Guid, LabelChunk, ListChunk, UnknownChunk,
};
pub use codec::Sample;
pub use error::{Error, Result};
pub use reader::Bw64Reader;
pub use util::FourCC;
pub use writer::{Bw64Writer, WriterConfig};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// bw64 version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open a BW64 file for reading.
///
/// Parses the whole chunk directory so the returned reader is ready to
/// query format metadata and read samples.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Bw64Reader<BufReader<File>>> {
    Bw64Reader::open(path)
}

/// Open a new BW64 file for writing.
///
/// Convenience wrapper around [`Bw64Writer::create`] for the common case of
/// plain PCM without metadata chunks.
pub fn write_file<P: AsRef<Path>>(
    path: P,
    channels: u16,
    sample_rate: u32,
    bit_depth: u16,
) -> Result<Bw64Writer<BufWriter<File>>> {
    let config = WriterConfig {
        channels,
        sample_rate,
        bit_depth,
        ..WriterConfig::default()
    };
    Bw64Writer::create(path, config, Vec::new())
}

/// Open a new BW64 file for writing, with `chna` and `axml` metadata.
///
/// The chunks are written before the data chunk, which is the recommended
/// practice when all components are known up front.
pub fn write_file_with_chunks<P: AsRef<Path>>(
    path: P,
    channels: u16,
    sample_rate: u32,
    bit_depth: u16,
    chna: Option<ChnaChunk>,
    axml: Option<AxmlChunk>,
) -> Result<Bw64Writer<BufWriter<File>>> {
    let config = WriterConfig {
        channels,
        sample_rate,
        bit_depth,
        ..WriterConfig::default()
    };
    let mut pre_data_chunks = Vec::new();
    if let Some(chna) = chna {
        pre_data_chunks.push(Chunk::Chna(chna));
    }
    if let Some(axml) = axml {
        pre_data_chunks.push(Chunk::Axml(axml));
    }
    Bw64Writer::create(path, config, pre_data_chunks)
}

/// Open a new BW64 file for writing with cue space reserved, adding the
/// given markers immediately.
///
/// When the pre-data chunks contain no `chna`, a default one with one track
/// per channel is synthesized.
pub fn write_file_with_markers<P: AsRef<Path>>(
    path: P,
    mut config: WriterConfig,
    markers: Vec<CuePoint>,
    pre_data_chunks: Vec<Chunk>,
) -> Result<Bw64Writer<BufWriter<File>>> {
    config.max_markers = markers.len() as u32;
    let mut writer = write_file_with_max_markers(path, config, pre_data_chunks)?;
    writer.add_markers(markers)?;
    Ok(writer)
}

/// Open a new BW64 file for writing with cue space reserved for
/// `config.max_markers` markers.
///
/// When the pre-data chunks contain no `chna`, a default one with one track
/// per channel is synthesized.
pub fn write_file_with_max_markers<P: AsRef<Path>>(
    path: P,
    config: WriterConfig,
    mut pre_data_chunks: Vec<Chunk>,
) -> Result<Bw64Writer<BufWriter<File>>> {
    let got_chna = pre_data_chunks
        .iter()
        .any(|chunk| chunk.id() == ids::CHNA);
    if !got_chna {
        pre_data_chunks.push(Chunk::Chna(default_chna_chunk(config.channels)?));
    }
    Bw64Writer::create(path, config, pre_data_chunks)
}

/// A `chna` chunk with one track UID per channel
fn default_chna_chunk(channels: u16) -> Result<ChnaChunk> {
    let mut chna = ChnaChunk::default();
    for channel in 1..=channels {
        chna.add_audio_id(AudioId::new(
            channel,
            format!("ATU_{:08}", channel),
            format!("AT_000100{:02}_01", channel),
            "AP_00010001".to_string(),
        )?);
    }
    Ok(chna)
}
