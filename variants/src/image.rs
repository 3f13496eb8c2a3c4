//! Memory-image loading (spec.md §6: "reset-initialisable from a static
//! image"). Adapted from the model repo's `machines::rom_loader` CRC32
//! validation and `device::cmos_ram`'s load/save shape, retargeted from
//! named ROM files onto a single persisted 32-bit word array that is
//! written into main memory before a core's reset is released.

use std::path::Path;

/// CRC-32 lookup table (reflected polynomial 0xEDB88320). Same algorithm
/// as MAME, ZIP, PNG, and Ethernet.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

#[derive(Debug)]
pub enum ImageLoadError {
    Io(std::io::Error),
    /// Byte length is not a multiple of 4 and cannot form whole words.
    Misaligned(usize),
    ChecksumMismatch { expected: u32, actual: u32 },
}

impl std::fmt::Display for ImageLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Misaligned(len) => write!(f, "image length {len} is not a multiple of 4"),
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "image CRC32 expected 0x{expected:08X}, got 0x{actual:08X}"
            ),
        }
    }
}

impl std::error::Error for ImageLoadError {}

impl From<std::io::Error> for ImageLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A persisted main-memory image: a flat array of big-endian 32-bit words,
/// as the memory controller's BMB address space expects (spec.md §6).
pub struct MemoryImage {
    words: Vec<u32>,
}

impl MemoryImage {
    /// Parse a byte buffer into whole big-endian words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageLoadError> {
        if bytes.len() % 4 != 0 {
            return Err(ImageLoadError::Misaligned(bytes.len()));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { words })
    }

    /// Load and parse a memory image from disk.
    pub fn from_file(path: &Path) -> Result<Self, ImageLoadError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Validate this image's CRC32 against an expected value, computed over
    /// the same big-endian byte encoding it was parsed from.
    pub fn verify_checksum(&self, expected: u32) -> Result<(), ImageLoadError> {
        let bytes: Vec<u8> = self.words.iter().flat_map(|w| w.to_be_bytes()).collect();
        let actual = crc32(&bytes);
        if actual != expected {
            return Err(ImageLoadError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn len_bytes(&self) -> usize {
        self.words.len() * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_words() {
        let image = MemoryImage::from_bytes(&[0x00, 0x00, 0x00, 0x01, 0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(image.words(), &[1, 0xDEAD_BEEF]);
    }

    #[test]
    fn rejects_misaligned_length() {
        let result = MemoryImage::from_bytes(&[0x00, 0x00, 0x00]);
        assert!(matches!(result, Err(ImageLoadError::Misaligned(3))));
    }

    #[test]
    fn checksum_round_trips() {
        let bytes = [0x00u8, 0x00, 0x00, 0x2A];
        let image = MemoryImage::from_bytes(&bytes).unwrap();
        let expected = crc32(&bytes);
        assert!(image.verify_checksum(expected).is_ok());
        assert!(image.verify_checksum(expected ^ 1).is_err());
    }

    #[test]
    fn empty_image_is_valid() {
        let image = MemoryImage::from_bytes(&[]).unwrap();
        assert_eq!(image.len_bytes(), 0);
    }
}
