//! LC-3 object image format.
//!
//! An object file is a sequence of big-endian 16-bit words:
//! - word 0: the origin (load address)
//! - words 1..: program contents, placed from the origin upward

use std::path::Path;

use thiserror::Error;

use crate::cpu::memory::{MemoryError, MEMORY_SIZE};
use crate::word::Word;

/// A loaded object image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Address of the first word.
    pub origin: Word,
    /// Program contents in native word order.
    pub words: Vec<Word>,
}

impl Image {
    pub fn new(origin: Word, words: Vec<Word>) -> Self {
        Self { origin, words }
    }

    /// Get the number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address of the last word (the origin for an empty image).
    pub fn end(&self) -> Word {
        self.origin
            .wrapping_add(self.words.len() as Word)
            .wrapping_sub(if self.words.is_empty() { 0 } else { 1 })
    }

    /// Words paired with their load addresses.
    pub fn iter(&self) -> impl Iterator<Item = (Word, Word)> + '_ {
        self.words
            .iter()
            .enumerate()
            .map(move |(i, &w)| (self.origin.wrapping_add(i as Word), w))
    }

    /// Serialize back to object file bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(Word::to_be_bytes)
            .collect()
    }
}

/// Parse object file bytes.
pub fn parse_image(bytes: &[u8]) -> Result<Image, ImageError> {
    if bytes.len() < 2 {
        return Err(ImageError::MissingOrigin);
    }
    if bytes.len() % 2 != 0 {
        return Err(ImageError::TruncatedWord { len: bytes.len() });
    }

    let mut words = bytes
        .chunks_exact(2)
        .map(|pair| Word::from_be_bytes([pair[0], pair[1]]));

    let origin = words.next().ok_or(ImageError::MissingOrigin)?;
    let words: Vec<Word> = words.collect();

    let available = MEMORY_SIZE - origin as usize;
    if words.len() > available {
        return Err(MemoryError::ProgramTooLarge {
            origin,
            size: words.len(),
            available,
        }
        .into());
    }

    Ok(Image { origin, words })
}

/// Load an object file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| ImageError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
    parse_image(&bytes)
}

/// Errors that can occur while loading an object image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("image is missing its origin word")]
    MissingOrigin,

    #[error("image length {len} is not a whole number of words")]
    TruncatedWord { len: usize },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_big_endian() {
        let image = parse_image(&[0x30, 0x00, 0xF0, 0x25, 0x12, 0x34]).unwrap();
        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0xF025, 0x1234]);
        assert_eq!(image.end(), 0x3001);
    }

    #[test]
    fn test_origin_only() {
        let image = parse_image(&[0x40, 0x00]).unwrap();
        assert!(image.is_empty());
        assert_eq!(image.end(), 0x4000);
    }

    #[test]
    fn test_malformed_images() {
        assert_eq!(parse_image(&[]), Err(ImageError::MissingOrigin));
        assert_eq!(parse_image(&[0x30]), Err(ImageError::MissingOrigin));
        assert_eq!(
            parse_image(&[0x30, 0x00, 0xF0]),
            Err(ImageError::TruncatedWord { len: 3 })
        );
    }

    #[test]
    fn test_image_past_end_of_memory() {
        let result = parse_image(&[0xFF, 0xFF, 0x00, 0x01, 0x00, 0x02]);
        assert!(matches!(
            result,
            Err(ImageError::Memory(MemoryError::ProgramTooLarge { size: 2, available: 1, .. }))
        ));
    }

    #[test]
    fn test_to_bytes_matches_input() {
        let bytes = [0x30, 0x00, 0x54, 0x20, 0xF0, 0x25];
        assert_eq!(parse_image(&bytes).unwrap().to_bytes(), bytes);
    }

    #[test]
    fn test_iter_addresses() {
        let image = Image::new(0xFFFF, vec![7]);
        assert_eq!(image.iter().collect::<Vec<_>>(), vec![(0xFFFF, 7)]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_image("/nonexistent/program.obj"),
            Err(ImageError::Io(_))
        ));
    }
}
