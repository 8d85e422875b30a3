//! Common utilities and low-level byte I/O
//!
//! Everything on disk is little-endian; multi-byte integers go through
//! `byteorder`, fixed-width ASCII fields through the helpers in this module.

pub mod fourcc;

pub use fourcc::FourCC;

use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Round a chunk payload size up to the next even byte boundary.
///
/// Chunk payloads of odd length are followed by a single pad byte. The pad is
/// outside the chunk's declared size but inside the enclosing container.
pub fn padded_size(size: u64) -> u64 {
    size + (size & 1)
}

/// Read a fixed-width ASCII field (not null-terminated).
///
/// End-of-file in the middle of the field is an error; partial structures are
/// never returned.
pub fn read_fixed_ascii<R: Read>(reader: &mut R, width: usize) -> Result<String> {
    let mut buf = vec![0u8; width];
    reader.read_exact(&mut buf)?;
    if !buf.is_ascii() {
        return Err(Error::format("fixed-width field contains non-ASCII bytes"));
    }
    // ASCII bytes only, so this cannot fail
    String::from_utf8(buf).map_err(|_| Error::format("fixed-width field contains invalid bytes"))
}

/// Write a fixed-width ASCII field. The value must occupy its declared width
/// exactly.
pub fn write_fixed_ascii<W: Write>(writer: &mut W, value: &str, width: usize) -> Result<()> {
    if value.len() != width || !value.is_ascii() {
        return Err(Error::invalid_argument(format!(
            "'{}' does not fit a {}-byte ASCII field",
            value, width
        )));
    }
    writer.write_all(value.as_bytes())?;
    Ok(())
}
