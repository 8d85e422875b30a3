//! Sample codec between host float buffers and on-disk sample formats
//!
//! Audio frames travel through the library as interleaved host floating-point
//! samples, nominally in [-1.0, 1.0]. On disk they are little-endian integer
//! PCM (8, 16, 24 or 32 bit) or IEEE float (32 or 64 bit). The integer
//! encoders saturate out-of-range input; the float encoders pass values
//! through untouched. That difference is observable: a PCM file clips, a
//! float file preserves |x| > 1.0 exactly.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Host sample type accepted by the encode/decode lanes
pub trait Sample: Copy + Default {
    /// Widen to f64 for quantization
    fn to_f64(self) -> f64;

    /// Narrow from f64 after dequantization
    fn from_f64(value: f64) -> Self;
}

impl Sample for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Sample for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Bytes per sample for a given bit depth
pub fn bytes_per_sample(bits_per_sample: u16) -> usize {
    bits_per_sample as usize / 8
}

fn check_lengths(byte_len: usize, sample_len: usize, bits_per_sample: u16) -> Result<()> {
    if byte_len != sample_len * bytes_per_sample(bits_per_sample) {
        return Err(Error::invalid_argument(format!(
            "byte buffer length {} does not match {} samples at {} bits",
            byte_len, sample_len, bits_per_sample
        )));
    }
    Ok(())
}

/// Encode host samples to little-endian integer PCM.
///
/// Out-of-range samples saturate at the integer limits.
pub fn encode_pcm_samples<T: Sample>(input: &[T], output: &mut [u8], bits_per_sample: u16) -> Result<()> {
    check_lengths(output.len(), input.len(), bits_per_sample)?;
    match bits_per_sample {
        8 => {
            for (sample, out) in input.iter().zip(output.iter_mut()) {
                let value = (sample.to_f64() * 128.0).round() + 128.0;
                *out = value.clamp(0.0, 255.0) as u8;
            }
        }
        16 => {
            for (sample, out) in input.iter().zip(output.chunks_exact_mut(2)) {
                let value = (sample.to_f64() * 32768.0).round();
                LittleEndian::write_i16(out, value.clamp(-32768.0, 32767.0) as i16);
            }
        }
        24 => {
            for (sample, out) in input.iter().zip(output.chunks_exact_mut(3)) {
                let value = (sample.to_f64() * 8388608.0).round();
                let value = value.clamp(-8388608.0, 8388607.0) as i32;
                out[0] = value as u8;
                out[1] = (value >> 8) as u8;
                out[2] = (value >> 16) as u8;
            }
        }
        32 => {
            for (sample, out) in input.iter().zip(output.chunks_exact_mut(4)) {
                let value = (sample.to_f64() * 2147483648.0).round();
                let value = value.clamp(i32::MIN as f64, i32::MAX as f64) as i32;
                LittleEndian::write_i32(out, value);
            }
        }
        bits => {
            return Err(Error::invalid_argument(format!(
                "unsupported PCM bit depth: {}",
                bits
            )))
        }
    }
    Ok(())
}

/// Decode little-endian integer PCM to host samples
pub fn decode_pcm_samples<T: Sample>(input: &[u8], output: &mut [T], bits_per_sample: u16) -> Result<()> {
    check_lengths(input.len(), output.len(), bits_per_sample)?;
    match bits_per_sample {
        8 => {
            for (bytes, sample) in input.iter().zip(output.iter_mut()) {
                *sample = T::from_f64((*bytes as f64 - 128.0) / 128.0);
            }
        }
        16 => {
            for (bytes, sample) in input.chunks_exact(2).zip(output.iter_mut()) {
                *sample = T::from_f64(LittleEndian::read_i16(bytes) as f64 / 32768.0);
            }
        }
        24 => {
            for (bytes, sample) in input.chunks_exact(3).zip(output.iter_mut()) {
                let value = ((bytes[2] as i32) << 24 | (bytes[1] as i32) << 16 | (bytes[0] as i32) << 8) >> 8;
                *sample = T::from_f64(value as f64 / 8388608.0);
            }
        }
        32 => {
            for (bytes, sample) in input.chunks_exact(4).zip(output.iter_mut()) {
                *sample = T::from_f64(LittleEndian::read_i32(bytes) as f64 / 2147483648.0);
            }
        }
        bits => {
            return Err(Error::invalid_argument(format!(
                "unsupported PCM bit depth: {}",
                bits
            )))
        }
    }
    Ok(())
}

/// Encode host samples to little-endian IEEE float.
///
/// The range is not clipped; values outside [-1.0, 1.0] are stored as-is.
pub fn encode_float_samples<T: Sample>(input: &[T], output: &mut [u8], bits_per_sample: u16) -> Result<()> {
    check_lengths(output.len(), input.len(), bits_per_sample)?;
    match bits_per_sample {
        32 => {
            for (sample, out) in input.iter().zip(output.chunks_exact_mut(4)) {
                LittleEndian::write_f32(out, sample.to_f64() as f32);
            }
        }
        64 => {
            for (sample, out) in input.iter().zip(output.chunks_exact_mut(8)) {
                LittleEndian::write_f64(out, sample.to_f64());
            }
        }
        bits => {
            return Err(Error::invalid_argument(format!(
                "unsupported float bit depth: {}",
                bits
            )))
        }
    }
    Ok(())
}

/// Decode little-endian IEEE float to host samples
pub fn decode_float_samples<T: Sample>(input: &[u8], output: &mut [T], bits_per_sample: u16) -> Result<()> {
    check_lengths(input.len(), output.len(), bits_per_sample)?;
    match bits_per_sample {
        32 => {
            for (bytes, sample) in input.chunks_exact(4).zip(output.iter_mut()) {
                *sample = T::from_f64(LittleEndian::read_f32(bytes) as f64);
            }
        }
        64 => {
            for (bytes, sample) in input.chunks_exact(8).zip(output.iter_mut()) {
                *sample = T::from_f64(LittleEndian::read_f64(bytes));
            }
        }
        bits => {
            return Err(Error::invalid_argument(format!(
                "unsupported float bit depth: {}",
                bits
            )))
        }
    }
    Ok(())
}
