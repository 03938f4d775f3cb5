// ============================================================
// Layer 4 — Inference Window
// ============================================================
// Generation keeps exactly `sequence_length` indices of context.
// Each predicted index is pushed at the back and the oldest one
// falls off the front.
//
// The seed text is fitted to that length first:
//   - exact length → used as-is
//   - too long     → keep the last `sequence_length` characters
//   - too short    → left-pad with random vocabulary characters

use std::collections::VecDeque;

use rand::Rng;

use crate::domain::error::CharRnnError;
use crate::domain::vocabulary::Vocabulary;

/// Fit `seed` to exactly `sequence_length` characters.
pub fn fit_seed<R: Rng + ?Sized>(
    seed:            &[u8],
    sequence_length: usize,
    vocab:           &Vocabulary,
    rng:             &mut R,
) -> Vec<u8> {
    if seed.len() >= sequence_length {
        return seed[seed.len() - sequence_length..].to_vec();
    }

    let mut fitted: Vec<u8> = (0..sequence_length - seed.len())
        .map(|_| vocab.random_char(rng))
        .collect();
    fitted.extend_from_slice(seed);
    fitted
}

/// Fixed-capacity FIFO of vocabulary indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow {
    indices: VecDeque<usize>,
}

impl RollingWindow {
    /// Fit `seed` to `sequence_length` and encode it.
    ///
    /// Fails with `UnknownCharacter` if any character of the fitted
    /// window is not in the vocabulary.
    pub fn from_seed<R: Rng + ?Sized>(
        seed:            &[u8],
        sequence_length: usize,
        vocab:           &Vocabulary,
        rng:             &mut R,
    ) -> Result<Self, CharRnnError> {
        if sequence_length == 0 {
            return Err(CharRnnError::InvalidArgument("sequence_length must be positive".into()));
        }
        let fitted = fit_seed(seed, sequence_length, vocab, rng);
        let indices = vocab.encode_all(&fitted)?;
        Ok(Self { indices: indices.into() })
    }

    /// Push the newest index and evict the oldest one.
    pub fn advance(&mut self, index: usize) -> Option<usize> {
        self.indices.push_back(index);
        self.indices.pop_front()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn vocab() -> Vocabulary {
        Vocabulary::build_from_corpus(b"abcdefgh", "t").unwrap().0
    }

    #[test]
    fn test_short_seed_is_left_padded() {
        let v = vocab();
        let mut rng = StdRng::seed_from_u64(5);
        let fitted = fit_seed(b"ab", 5, &v, &mut rng);
        assert_eq!(fitted.len(), 5);
        assert_eq!(&fitted[3..], b"ab");
        assert!(fitted[..3].iter().all(|&c| v.encode(c).is_ok()));
    }

    #[test]
    fn test_long_seed_keeps_the_tail() {
        let v = vocab();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(fit_seed(b"abcdefg", 5, &v, &mut rng), b"cdefg");
    }

    #[test]
    fn test_exact_seed_unchanged() {
        let v = vocab();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(fit_seed(b"hgfed", 5, &v, &mut rng), b"hgfed");
    }

    #[test]
    fn test_empty_seed_is_all_padding() {
        let v = vocab();
        let mut rng = StdRng::seed_from_u64(9);
        let window = RollingWindow::from_seed(b"", 4, &v, &mut rng).unwrap();
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_unknown_seed_character() {
        let v = vocab();
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            RollingWindow::from_seed(b"abz", 3, &v, &mut rng),
            Err(CharRnnError::UnknownCharacter { byte: b'z' })
        ));
    }

    #[test]
    fn test_advance_is_fifo() {
        let v = vocab();
        let mut rng = StdRng::seed_from_u64(5);
        let mut window = RollingWindow::from_seed(b"abc", 3, &v, &mut rng).unwrap();
        assert_eq!(window.advance(7), Some(0));
        assert_eq!(window.advance(6), Some(1));
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![2, 7, 6]);
        assert_eq!(window.len(), 3);
    }
}
