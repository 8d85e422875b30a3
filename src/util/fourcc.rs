//! Four-character codes

use std::fmt;

/// Four-character code: four ASCII bytes packed little-endian into a `u32`.
///
/// This is how RIFF containers identify chunks on disk. The numeric value is
/// what appears in the file; `Display` renders the four ASCII characters.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FourCC(u32);

impl FourCC {
    /// Create a FourCC from its four ASCII bytes
    pub const fn new(code: &[u8; 4]) -> Self {
        FourCC(u32::from_le_bytes(*code))
    }

    /// Create a FourCC from the raw little-endian integer value
    pub const fn from_u32(value: u32) -> Self {
        FourCC(value)
    }

    /// Get the raw little-endian integer value
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the four ASCII bytes
    pub const fn bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes() {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '?'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}
