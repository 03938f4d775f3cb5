// ============================================================
// Layer 5 — Sampler
// ============================================================
// Autoregressive generation over a fixed-size context window.
//
// Each of the N steps:
//   1. zero a [T][N] input buffer, write the window into slot 0
//   2. forward
//   3. read slot 0's logits at the last time-step:
//        offset = (T - 1) · N · V,  length V
//   4. pick an index (argmax at temperature 0, otherwise a
//      temperature-scaled softmax draw)
//   5. push it into the window, evicting the oldest index
//
// Softmax with temperature τ (max subtracted for stability):
//   p_i = exp((x_i - max) / τ) / Σ_j exp((x_j - max) / τ)

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use rand::{rngs::StdRng, Rng};

use crate::data::batcher::continuation_mask;
use crate::data::window::RollingWindow;
use crate::domain::error::CharRnnError;
use crate::domain::traits::{Blob, Network};
use crate::domain::vocabulary::Vocabulary;
use crate::ml::clock_rng;

/// Trailer appended to the output file after each generation.
const OUTPUT_TRAILER: &[u8] = b"\n\n\n\n";

// ─── Temperature ──────────────────────────────────────────────────────────────
/// Sampling temperature, always in `[0, 1]`.
///
/// Negative values are mirrored, anything above 1 becomes 1, and NaN
/// becomes 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f32);

impl Temperature {
    pub fn new(t: f32) -> Self {
        if t.is_nan() {
            return Self(1.0);
        }
        Self(t.abs().min(1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Temperature 0 means argmax.
    pub fn is_greedy(self) -> bool {
        self.0 == 0.0
    }
}

/// Index of the largest value; the earliest one wins ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let (first, rest) = values.split_first()?;
    let mut best = (0, *first);
    for (i, &v) in rest.iter().enumerate() {
        if v > best.1 {
            best = (i + 1, v);
        }
    }
    Some(best.0)
}

/// Pick an index from raw logits.
///
/// Greedy temperatures never touch `rng`. Otherwise one uniform draw
/// `u ∈ [0, 1)` is made and the first index whose cumulative
/// probability exceeds `u` is returned (the last index if none does).
pub fn select_index<R: Rng + ?Sized>(
    logits:      &[f32],
    temperature: Temperature,
    rng:         &mut R,
) -> Option<usize> {
    if temperature.is_greedy() {
        return argmax(logits);
    }
    let last = logits.len().checked_sub(1)?;

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let weights: Vec<f32> = logits
        .iter()
        .map(|&x| ((x - max) / temperature.value()).exp())
        .collect();
    let total: f32 = weights.iter().sum();

    let u: f32 = rng.gen();
    let mut cumulative = 0.0f32;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w / total;
        if cumulative > u {
            return Some(i);
        }
    }
    Some(last)
}

// ─── Sampler ──────────────────────────────────────────────────────────────────
pub struct Sampler<N: Network, R: Rng = StdRng> {
    net:             N,
    vocab:           Vocabulary,
    sequence_length: usize,
    batch_size:      usize,
    temperature:     Temperature,
    output_file:     Option<PathBuf>,
    rng:             R,
}

impl<N: Network> Sampler<N> {
    /// Sampler with a clock-seeded random engine.
    pub fn new(
        net:             N,
        vocab:           Vocabulary,
        sequence_length: usize,
        batch_size:      usize,
        temperature:     f32,
        output_file:     Option<PathBuf>,
    ) -> Result<Self, CharRnnError> {
        Self::with_rng(net, vocab, sequence_length, batch_size, temperature, output_file, clock_rng())
    }
}

impl<N: Network, R: Rng> Sampler<N, R> {
    /// Binds the continuation mask once; it is never rebound.
    pub fn with_rng(
        mut net:         N,
        vocab:           Vocabulary,
        sequence_length: usize,
        batch_size:      usize,
        temperature:     f32,
        output_file:     Option<PathBuf>,
        rng:             R,
    ) -> Result<Self, CharRnnError> {
        if sequence_length == 0 || batch_size == 0 {
            return Err(CharRnnError::InvalidArgument(
                "sequence_length and batch_size must be positive".into(),
            ));
        }
        net.set_blob(Blob::Clip, &continuation_mask(sequence_length, batch_size))?;
        Ok(Self {
            net,
            vocab,
            sequence_length,
            batch_size,
            temperature: Temperature::new(temperature),
            output_file,
            rng,
        })
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    pub fn network(&self) -> &N {
        &self.net
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Generate `n` characters, echoing them to stdout when `display`.
    pub fn generate(&mut self, seed: &[u8], n: usize, display: bool) -> Result<Vec<u8>, CharRnnError> {
        if display {
            let mut stdout = io::stdout().lock();
            self.generate_to(seed, n, Some(&mut stdout))
        } else {
            self.generate_to(seed, n, None)
        }
    }

    /// Generate `n` characters, writing each one to `echo` as it is
    /// produced and appending the whole run to the output file.
    ///
    /// A seed with a character outside the vocabulary fails before
    /// anything is written.
    pub fn generate_to(
        &mut self,
        seed:     &[u8],
        n:        usize,
        mut echo: Option<&mut dyn Write>,
    ) -> Result<Vec<u8>, CharRnnError> {
        let mut window = RollingWindow::from_seed(seed, self.sequence_length, &self.vocab, &mut self.rng)
            .map_err(|e| {
                tracing::error!("Seed rejected: {e}");
                e
            })?;

        let mut file = self.output_file.as_deref().and_then(open_output);
        let mut generated = Vec::with_capacity(n);

        for _ in 0..n {
            let index = self.predict(&window)?;
            window.advance(index);
            let byte = self.vocab.decode(index)?;
            generated.push(byte);

            if let Some(out) = echo.as_mut() {
                out.write_all(&[byte])?;
                out.flush()?;
            }
            if let Some(f) = file.as_mut() {
                if let Err(e) = f.write_all(&[byte]) {
                    tracing::warn!("Cannot write generated text ({e}); file output disabled");
                    file = None;
                }
            }
        }

        if let Some(mut f) = file {
            if let Err(e) = f.write_all(OUTPUT_TRAILER) {
                tracing::warn!("Cannot finish output file: {e}");
            }
        }
        tracing::debug!("Generated {} characters", generated.len());
        Ok(generated)
    }

    /// One forward pass over the window; returns the chosen index.
    fn predict(&mut self, window: &RollingWindow) -> Result<usize, CharRnnError> {
        let mut input = vec![0.0f32; self.sequence_length * self.batch_size];
        for (t, index) in window.iter().enumerate() {
            input[t * self.batch_size] = index as f32;
        }
        self.net.set_blob(Blob::Data, &input)?;
        self.net.forward()?;

        let v = self.vocab.size();
        let offset = (self.sequence_length - 1) * self.batch_size * v;
        let output = self.net.blob(Blob::Output)?;
        let logits = output.get(offset..offset + v).ok_or_else(|| {
            CharRnnError::Engine(format!(
                "output buffer holds {} values, expected at least {}",
                output.len(),
                offset + v
            ))
        })?;

        select_index(logits, self.temperature, &mut self.rng)
            .ok_or_else(|| CharRnnError::Engine("empty output distribution".into()))
    }
}

fn open_output(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => Some(f),
        Err(e) => {
            tracing::warn!("Cannot open output file '{}' ({e}); continuing without it", path.display());
            None
        }
    }
}
