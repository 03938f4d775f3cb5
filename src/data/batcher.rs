// ============================================================
// Layer 4 — Stateful Sequence Batch Packer
// ============================================================
// Packs `batch_size` independent random subsequences of the
// corpus stream into one time-major buffer:
//
//   data[t * batch_size + slot] = stream[s_slot + t]
//   label[t * batch_size + slot] = stream[s_slot + t + 1]
//
//   i.e. seq1_char1, seq2_char1, ..., seqB_char1, seq1_char2, ...
//
// Every call draws fresh offsets for every slot, so the
// continuation mask never changes: 0 for the first time-step
// (reset recurrent state), 1 afterwards.
//
// With batch_size == 1 the time-major layout is just a contiguous
// run of the stream, so the batch is returned as a view into the
// stream itself instead of a copy.

use rand::Rng;

use crate::domain::error::CharRnnError;

/// Input and label buffers for one step. Borrows either the packer's
/// own buffers or, for `batch_size == 1`, the corpus stream; it cannot
/// outlive whichever it points into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchView<'a> {
    pub data:   &'a [f32],
    pub labels: &'a [f32],
}

/// The fixed continuation mask for a `sequence_length × batch_size` buffer.
pub fn continuation_mask(sequence_length: usize, batch_size: usize) -> Vec<f32> {
    (0..sequence_length * batch_size)
        .map(|i| if i < batch_size { 0.0 } else { 1.0 })
        .collect()
}

#[derive(Debug, Clone)]
pub struct BatchPacker {
    sequence_length: usize,
    batch_size:      usize,
    data:            Vec<f32>,
    labels:          Vec<f32>,
    clip:            Vec<f32>,
}

impl BatchPacker {
    pub fn new(sequence_length: usize, batch_size: usize) -> Result<Self, CharRnnError> {
        if sequence_length == 0 || batch_size == 0 {
            return Err(CharRnnError::InvalidArgument(format!(
                "sequence_length ({sequence_length}) and batch_size ({batch_size}) must be positive"
            )));
        }
        let len = sequence_length * batch_size;
        Ok(Self {
            sequence_length,
            batch_size,
            data:   vec![0.0; len],
            labels: vec![0.0; len],
            clip:   continuation_mask(sequence_length, batch_size),
        })
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The mask computed at construction; identical for every batch.
    pub fn continuation_mask(&self) -> &[f32] {
        &self.clip
    }

    /// Smallest partition length that can be packed.
    pub fn required_len(&self) -> usize {
        self.sequence_length + 2
    }

    /// Pack one training batch from `stream`.
    ///
    /// Each slot starts at an offset drawn uniformly from
    /// `[0, len - sequence_length - 2]`. Fails with `InsufficientData`
    /// if the stream is shorter than `sequence_length + 2`.
    pub fn pack<'a, R: Rng + ?Sized>(
        &'a mut self,
        stream: &'a [f32],
        rng:    &mut R,
    ) -> Result<BatchView<'a>, CharRnnError> {
        if self.batch_size == 1 {
            let start = rng.gen_range(0..=self.max_offset(stream)?);
            let end = start + self.sequence_length;
            return Ok(BatchView {
                data:   &stream[start..end],
                labels: &stream[start + 1..end + 1],
            });
        }
        self.pack_general(stream, rng)
    }

    /// The copying algorithm, valid for any batch size.
    pub fn pack_general<'a, R: Rng + ?Sized>(
        &'a mut self,
        stream: &[f32],
        rng:    &mut R,
    ) -> Result<BatchView<'a>, CharRnnError> {
        let max_offset = self.max_offset(stream)?;

        for slot in 0..self.batch_size {
            let start = rng.gen_range(0..=max_offset);
            for t in 0..self.sequence_length {
                let at = t * self.batch_size + slot;
                self.data[at]   = stream[start + t];
                self.labels[at] = stream[start + t + 1];
            }
        }

        Ok(BatchView { data: &self.data, labels: &self.labels })
    }

    fn max_offset(&self, stream: &[f32]) -> Result<usize, CharRnnError> {
        let required = self.required_len();
        if stream.len() < required {
            return Err(CharRnnError::InsufficientData { available: stream.len(), required });
        }
        Ok(stream.len() - required)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32).collect()
    }

    #[test]
    fn test_mask_zero_only_for_first_time_step() {
        for (t, b) in [(1, 1), (1, 7), (5, 1), (4, 3), (50, 32)] {
            let mask = continuation_mask(t, b);
            assert_eq!(mask.len(), t * b);
            assert!(mask[..b].iter().all(|&v| v == 0.0), "t={t} b={b}");
            assert!(mask[b..].iter().all(|&v| v == 1.0), "t={t} b={b}");
        }
    }

    #[test]
    fn test_packer_mask_never_changes() {
        let stream = ramp(100);
        let mut rng = StdRng::seed_from_u64(1);
        let mut packer = BatchPacker::new(6, 4).unwrap();
        let before = packer.continuation_mask().to_vec();
        for _ in 0..5 {
            packer.pack(&stream, &mut rng).unwrap();
        }
        assert_eq!(packer.continuation_mask(), before.as_slice());
    }

    #[test]
    fn test_time_major_layout() {
        // On a ramp every slot's column must be consecutive values
        // and labels must be data shifted by one.
        let (t_len, batch) = (5, 3);
        let stream = ramp(40);
        let mut rng = StdRng::seed_from_u64(11);
        let mut packer = BatchPacker::new(t_len, batch).unwrap();
        let view = packer.pack(&stream, &mut rng).unwrap();

        assert_eq!(view.data.len(), t_len * batch);
        for slot in 0..batch {
            let first = view.data[slot];
            assert!(first <= (40 - t_len - 2) as f32);
            for t in 0..t_len {
                assert_eq!(view.data[t * batch + slot], first + t as f32);
                assert_eq!(view.labels[t * batch + slot], first + t as f32 + 1.0);
            }
        }
    }

    #[test]
    fn test_single_slot_view_matches_general_algorithm() {
        let stream = ramp(64);
        for seed in 0..20 {
            let mut aliased = BatchPacker::new(8, 1).unwrap();
            let mut copied  = BatchPacker::new(8, 1).unwrap();
            let mut rng_a = StdRng::seed_from_u64(seed);
            let mut rng_b = StdRng::seed_from_u64(seed);

            let a = aliased.pack(&stream, &mut rng_a).unwrap();
            let b = copied.pack_general(&stream, &mut rng_b).unwrap();
            assert_eq!(a, b, "seed {seed}");
        }
    }

    #[test]
    fn test_smallest_valid_stream_uses_offset_zero() {
        let stream = ramp(6);
        let mut rng = StdRng::seed_from_u64(3);
        let mut packer = BatchPacker::new(4, 2).unwrap();
        let view = packer.pack(&stream, &mut rng).unwrap();
        assert_eq!(view.data, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert_eq!(view.labels, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_short_stream_is_insufficient() {
        let stream = ramp(5);
        let mut rng = StdRng::seed_from_u64(0);
        for batch in [1, 3] {
            let mut packer = BatchPacker::new(4, batch).unwrap();
            assert!(matches!(
                packer.pack(&stream, &mut rng),
                Err(CharRnnError::InsufficientData { available: 5, required: 6 })
            ));
        }
    }

    #[test]
    fn test_zero_shape_rejected() {
        assert!(BatchPacker::new(0, 4).is_err());
        assert!(BatchPacker::new(4, 0).is_err());
    }
}
