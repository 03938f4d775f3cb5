// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// Everything that touches burn tensors lives here (plus the
// checkpoint recorder in infra).
//
//   model.rs    — CharRnn: embedding, clip-aware LSTM stack, ip1
//   network.rs  — CharRnnNetwork: named f32 buffers around a model
//   solver.rs   — BurnSolver: Adam steps, snapshots, test-net sync
//   trainer.rs  — the training loop over any Solver
//   sampler.rs  — temperature sampling over any Network
//
// trainer and sampler only see the domain traits, so they are
// tested against mock.rs without a backend.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::StdRng, SeedableRng};

/// Character RNN architecture
pub mod model;

/// Buffer-bound network wrapper
pub mod network;

/// Optimizer and snapshot handling
pub mod solver;

/// Training loop with periodic validation
pub mod trainer;

/// Autoregressive generation
pub mod sampler;

#[cfg(test)]
pub(crate) mod mock;

/// Training runs with gradients on WGPU.
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
/// Generation needs no autodiff.
pub type InferBackend = burn::backend::Wgpu;

pub fn default_device() -> burn::backend::wgpu::WgpuDevice {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    device
}

/// Random engine seeded from the system clock's nanoseconds.
pub(crate) fn clock_rng() -> StdRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    StdRng::seed_from_u64(nanos)
}
