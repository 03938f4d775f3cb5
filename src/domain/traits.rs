// ============================================================
// Layer 3 — Network Engine Abstractions
// ============================================================
// The trainer loop and the sampler never talk to burn directly.
// They drive a network through named buffers ("blobs"):
//
//   data  ── input character indices, [time][slot]
//   clip  ── continuation flags, same shape (0 = reset state)
//   label ── next-character targets, same shape
//   loss  ── one scalar, written by forward()
//   ip1   ── output logits, [time][slot][vocab]
//
// ml::network::CharRnnNetwork and ml::solver::BurnSolver are the
// burn implementations; tests use an in-memory mock.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::CharRnnError;

/// Named buffers exposed by a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blob {
    Data,
    Clip,
    Label,
    Loss,
    Output,
}

impl Blob {
    /// The engine-side buffer name.
    pub fn name(self) -> &'static str {
        match self {
            Blob::Data   => "data",
            Blob::Clip   => "clip",
            Blob::Label  => "label",
            Blob::Loss   => "loss",
            Blob::Output => "ip1",
        }
    }

    /// Loss and output are produced by `forward` and cannot be set.
    pub fn is_input(self) -> bool {
        matches!(self, Blob::Data | Blob::Clip | Blob::Label)
    }
}

/// Which role a network instance plays. Both share one architecture
/// definition; a test network never updates weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Train,
    Test,
}

// ─── Network ──────────────────────────────────────────────────────────────────
/// A network bound to fixed `sequence_length × batch_size` input buffers.
pub trait Network {
    fn phase(&self) -> Phase;

    /// Copy `values` into an input buffer. The length must match the
    /// buffer shape exactly.
    fn set_blob(&mut self, blob: Blob, values: &[f32]) -> Result<(), CharRnnError>;

    /// Read a buffer as a flat slice.
    fn blob(&self, blob: Blob) -> Result<&[f32], CharRnnError>;

    /// Forward pass over the currently bound inputs. Refreshes the
    /// output buffer, and the loss buffer when labels are bound.
    fn forward(&mut self) -> Result<(), CharRnnError>;
}

// ─── Solver ───────────────────────────────────────────────────────────────────
/// Owns the training network and its optimizer.
pub trait Solver {
    type Net: Network;
    type TestNet: Network;

    fn net(&self) -> &Self::Net;
    fn net_mut(&mut self) -> &mut Self::Net;

    /// Run `iters` forward + backward + update steps on the bound buffers.
    fn step(&mut self, iters: usize) -> Result<(), CharRnnError>;

    /// Number of completed optimisation steps.
    fn iter(&self) -> usize;

    /// Validation period in iterations; 0 disables validation.
    fn display_interval(&self) -> usize;

    /// Persist weights and optimizer state; returns the manifest path.
    fn snapshot(&mut self) -> Result<PathBuf, CharRnnError>;

    /// Reload weights, optimizer state and iteration from a manifest.
    fn restore(&mut self, manifest: &Path) -> Result<(), CharRnnError>;

    /// Build a test-phase network from the current trained parameters.
    fn materialize_test_net(&self) -> Result<Self::TestNet, CharRnnError>;

    /// Copy the current trained parameters into an existing test network,
    /// leaving its buffer bindings untouched.
    fn sync_test_net(&self, test: &mut Self::TestNet) -> Result<(), CharRnnError>;
}
