// ============================================================
// Layer 3 — Character Vocabulary
// ============================================================
// Bidirectional mapping between single-byte characters and
// dense indices in [0, V).
//
// Indices are assigned in first-occurrence order: the first
// distinct byte of the corpus gets 0, the next new byte gets 1,
// and so on. Once built (or loaded) a vocabulary never changes.
//
// Example:
//   corpus "abcab" → a=0, b=1, c=2
//
// The train/test split of the corpus index stream is produced
// in the same single scan.

use rand::Rng;

use crate::domain::error::CharRnnError;

/// Fraction of the corpus (by byte offset) that goes to the training partition.
pub const TRAIN_FRACTION: f64 = 0.9;

/// Immutable byte ↔ index mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Index → byte, in first-occurrence order
    int_to_char: Vec<u8>,
    /// Byte → index, `None` for bytes never seen
    char_to_int: [Option<usize>; 256],
}

/// The corpus translated into vocabulary indices and split in two.
///
/// Indices are stored as `f32` because that is what the network
/// engine consumes for its input and label buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusSplit {
    pub train: Vec<f32>,
    pub test:  Vec<f32>,
}

impl Vocabulary {
    /// Build a vocabulary from an explicit list of symbols, where the
    /// position of each byte is its index (the vocabulary file layout).
    ///
    /// Fails if the list is empty or repeats a byte.
    pub fn from_symbols(symbols: &[u8], origin: &str) -> Result<Self, CharRnnError> {
        if symbols.is_empty() {
            return Err(CharRnnError::vocabulary_format(origin, "no characters"));
        }

        let mut char_to_int = [None; 256];
        for (index, &byte) in symbols.iter().enumerate() {
            if char_to_int[byte as usize].is_some() {
                return Err(CharRnnError::vocabulary_format(
                    origin,
                    format!("character {:?} appears more than once", char::from(byte)),
                ));
            }
            char_to_int[byte as usize] = Some(index);
        }

        Ok(Self { int_to_char: symbols.to_vec(), char_to_int })
    }

    /// Scan a corpus once, assigning indices in first-occurrence order,
    /// and split the translated stream into train (first 90%) and test.
    ///
    /// Byte offset `i` belongs to the training partition iff
    /// `i < TRAIN_FRACTION * len`.
    pub fn build_from_corpus(
        corpus: &[u8],
        origin: &str,
    ) -> Result<(Self, CorpusSplit), CharRnnError> {
        if corpus.is_empty() {
            return Err(CharRnnError::vocabulary_format(origin, "corpus is empty"));
        }

        let mut int_to_char = Vec::new();
        let mut char_to_int: [Option<usize>; 256] = [None; 256];

        let split_at = (corpus.len() as f64 * TRAIN_FRACTION).ceil() as usize;
        let mut split = CorpusSplit {
            train: Vec::with_capacity(split_at),
            test:  Vec::with_capacity(corpus.len() - split_at.min(corpus.len())),
        };

        for (offset, &byte) in corpus.iter().enumerate() {
            let index = match char_to_int[byte as usize] {
                Some(index) => index,
                None => {
                    let index = int_to_char.len();
                    char_to_int[byte as usize] = Some(index);
                    int_to_char.push(byte);
                    index
                }
            };

            if offset < split_at {
                split.train.push(index as f32);
            } else {
                split.test.push(index as f32);
            }
        }

        tracing::debug!(
            "Corpus '{}': {} characters, {} distinct, {} train / {} test",
            origin,
            corpus.len(),
            int_to_char.len(),
            split.train.len(),
            split.test.len(),
        );

        Ok((Self { int_to_char, char_to_int }, split))
    }

    /// Index of `byte`, or `UnknownCharacter` if it was never seen.
    pub fn encode(&self, byte: u8) -> Result<usize, CharRnnError> {
        self.char_to_int[byte as usize].ok_or(CharRnnError::UnknownCharacter { byte })
    }

    /// Encode every byte of `text`; stops at the first unknown one.
    pub fn encode_all(&self, text: &[u8]) -> Result<Vec<usize>, CharRnnError> {
        text.iter().map(|&b| self.encode(b)).collect()
    }

    /// Byte stored at `index`.
    pub fn decode(&self, index: usize) -> Result<u8, CharRnnError> {
        self.int_to_char
            .get(index)
            .copied()
            .ok_or(CharRnnError::IndexOutOfRange { index, size: self.size() })
    }

    /// Number of distinct characters, V.
    pub fn size(&self) -> usize {
        self.int_to_char.len()
    }

    /// All characters in index order (the vocabulary file contents).
    pub fn symbols(&self) -> &[u8] {
        &self.int_to_char
    }

    /// A character drawn uniformly over the V entries.
    pub fn random_char<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        self.int_to_char[rng.gen_range(0..self.int_to_char.len())]
    }
}
