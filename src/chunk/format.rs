//! The `fmt ` chunk: sample coding, channel count, rates and derived fields

use crate::error::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// WAVE format tag for integer PCM
pub const WAVE_FORMAT_PCM: u16 = 0x0001;
/// WAVE format tag for IEEE float
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// WAVE format tag for the extensible layout; the effective coding lives in
/// the sub-format GUID
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Windows-style GUID as stored in the extensible `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

/// Sub-format GUID selecting integer PCM
pub const KSDATAFORMAT_SUBTYPE_PCM: Guid = Guid {
    data1: 0x0000_0001,
    data2: 0x0000,
    data3: 0x0010,
    data4: [0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71],
};

/// Sub-format GUID selecting IEEE float
pub const KSDATAFORMAT_SUBTYPE_IEEE_FLOAT: Guid = Guid {
    data1: 0x0000_0003,
    data2: 0x0000,
    data3: 0x0010,
    data4: [0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71],
};

impl Guid {
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.data1)?;
        writer.write_u16::<LittleEndian>(self.data2)?;
        writer.write_u16::<LittleEndian>(self.data3)?;
        writer.write_all(&self.data4)?;
        Ok(())
    }
}

/// The 22 bytes of extra data carried by an extensible `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraData {
    valid_bits_per_sample: u16,
    channel_mask: u32,
    sub_format: Guid,
}

impl ExtraData {
    pub fn new(valid_bits_per_sample: u16, channel_mask: u32, sub_format: Guid) -> Self {
        ExtraData {
            valid_bits_per_sample,
            channel_mask,
            sub_format,
        }
    }

    pub fn valid_bits_per_sample(&self) -> u16 {
        self.valid_bits_per_sample
    }

    pub fn channel_mask(&self) -> u32 {
        self.channel_mask
    }

    pub fn sub_format(&self) -> &Guid {
        &self.sub_format
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(self.valid_bits_per_sample)?;
        writer.write_u32::<LittleEndian>(self.channel_mask)?;
        self.sub_format.write(writer)
    }
}

/// The `fmt ` chunk.
///
/// `block_alignment` and `bytes_per_second` are derived from the essential
/// fields at construction; storing inconsistent values is impossible, and the
/// parser rejects files whose stored values disagree with the derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfoChunk {
    format_tag: u16,
    channel_count: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    extra_data: Option<ExtraData>,
}

impl FormatInfoChunk {
    /// Construct a format chunk, validating field ranges and derived-field
    /// overflow
    pub fn new(
        channel_count: u16,
        sample_rate: u32,
        bits_per_sample: u16,
        extra_data: Option<ExtraData>,
        format_tag: u16,
    ) -> Result<Self> {
        if channel_count < 1 {
            return Err(Error::invalid_argument("channel count must be at least 1"));
        }
        if sample_rate < 1 {
            return Err(Error::invalid_argument("sample rate must be at least 1"));
        }
        match format_tag {
            WAVE_FORMAT_PCM | WAVE_FORMAT_IEEE_FLOAT => {
                if extra_data.is_some() {
                    return Err(Error::invalid_argument(
                        "PCM and IEEE float formats carry no extra data",
                    ));
                }
            }
            WAVE_FORMAT_EXTENSIBLE => {
                let extra = extra_data
                    .as_ref()
                    .ok_or_else(|| Error::invalid_argument("extensible format requires extra data"))?;
                let data1 = extra.sub_format().data1;
                if data1 != WAVE_FORMAT_PCM as u32 && data1 != WAVE_FORMAT_IEEE_FLOAT as u32 {
                    return Err(Error::invalid_argument(format!(
                        "sub-format unsupported: {:#x}",
                        data1
                    )));
                }
            }
            tag => {
                return Err(Error::invalid_argument(format!(
                    "format unsupported: {:#x}",
                    tag
                )))
            }
        }

        let chunk = FormatInfoChunk {
            format_tag,
            channel_count,
            sample_rate,
            bits_per_sample,
            extra_data,
        };

        let legal_depths: &[u16] = if chunk.is_float() { &[32, 64] } else { &[8, 16, 24, 32] };
        if !legal_depths.contains(&bits_per_sample) {
            return Err(Error::invalid_argument(format!(
                "unsupported bit depth {} for {} samples",
                bits_per_sample,
                if chunk.is_float() { "float" } else { "PCM" }
            )));
        }

        let block_alignment = channel_count as u32 * bits_per_sample as u32 / 8;
        if block_alignment > u16::MAX as u32 {
            return Err(Error::invalid_argument(
                "channel count and bits per sample would overflow block alignment",
            ));
        }
        let bytes_per_second = sample_rate as u64 * block_alignment as u64;
        if bytes_per_second > u32::MAX as u64 {
            return Err(Error::invalid_argument(
                "sample rate, channel count and bits per sample would overflow bytes per second",
            ));
        }

        Ok(chunk)
    }

    pub fn format_tag(&self) -> u16 {
        self.format_tag
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Bytes per frame: channel count times bytes per sample
    pub fn block_alignment(&self) -> u16 {
        (self.channel_count as u32 * self.bits_per_sample as u32 / 8) as u16
    }

    /// Bytes per second of audio at the nominal rate
    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * self.block_alignment() as u32
    }

    pub fn extra_data(&self) -> Option<&ExtraData> {
        self.extra_data.as_ref()
    }

    pub fn is_extensible(&self) -> bool {
        self.format_tag == WAVE_FORMAT_EXTENSIBLE
    }

    /// Whether samples are IEEE float, either directly or through the
    /// extensible sub-format
    pub fn is_float(&self) -> bool {
        match self.extra_data.as_ref() {
            Some(extra) => extra.sub_format().data1 == WAVE_FORMAT_IEEE_FLOAT as u32,
            None => self.format_tag == WAVE_FORMAT_IEEE_FLOAT,
        }
    }

    pub fn size(&self) -> u64 {
        if self.is_extensible() {
            40
        } else {
            16
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(self.format_tag)?;
        writer.write_u16::<LittleEndian>(self.channel_count)?;
        writer.write_u32::<LittleEndian>(self.sample_rate)?;
        writer.write_u32::<LittleEndian>(self.bytes_per_second())?;
        writer.write_u16::<LittleEndian>(self.block_alignment())?;
        writer.write_u16::<LittleEndian>(self.bits_per_sample)?;
        if let Some(extra) = self.extra_data.as_ref() {
            writer.write_u16::<LittleEndian>(22)?;
            extra.write(writer)?;
        }
        Ok(())
    }
}
