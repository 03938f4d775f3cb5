// ============================================================
// Layer 5 — Solver
// ============================================================
// Owns the training network and an Adam optimizer.
//
// One step:
//   bound buffers → forward_loss → backward → Adam update
//
// Adam with norm gradient clipping:
//   g ← g · min(1, clip / ‖g‖)
//   m = β1*m + (1-β1)*g
//   v = β2*v + (1-β2)*g²
//   θ = θ - lr * m / (√v + ε)
//
// Validation runs on a copy of the parameters on the inner
// (non-autodiff) backend, so dropout is off and no graph is built.

use std::path::{Path, PathBuf};

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::CharRnnError;
use crate::domain::traits::{Phase, Solver};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{CharRnn, CharRnnConfig};
use crate::ml::network::CharRnnNetwork;

#[derive(Config, Debug)]
pub struct SolverConfig {
    /// Path of the model config JSON.
    pub net:             String,
    /// Snapshots are written as `<snapshot_prefix>_iter_<n>…`.
    pub snapshot_prefix: String,
    #[config(default = 0.002)]
    pub base_lr:         f64,
    /// Validation period; 0 disables validation.
    #[config(default = 100)]
    pub display:         usize,
    #[config(default = 10000)]
    pub max_iter:        usize,
    /// Periodic snapshot period; 0 snapshots only on request.
    #[config(default = 0)]
    pub snapshot:        usize,
    /// Gradient L2-norm ceiling; 0 disables clipping.
    #[config(default = 5.0)]
    pub clip_gradients:  f32,
}

/// Optimizer for this config: Adam, with norm clipping when enabled.
pub fn adam<B: AutodiffBackend>(config: &SolverConfig) -> impl Optimizer<CharRnn<B>, B> + Clone {
    let clipping = (config.clip_gradients > 0.0)
        .then(|| GradientClippingConfig::Norm(config.clip_gradients));
    AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(clipping)
        .init::<B, CharRnn<B>>()
}

pub struct BurnSolver<B: AutodiffBackend, O> {
    config:      SolverConfig,
    net:         CharRnnNetwork<B>,
    optim:       O,
    iter:        usize,
    checkpoints: CheckpointManager,
    stem:        String,
}

impl<B, O> BurnSolver<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<CharRnn<B>, B> + Clone,
{
    pub fn new(config: SolverConfig, net: CharRnnNetwork<B>, optim: O) -> Self {
        let prefix = Path::new(&config.snapshot_prefix);
        let dir = prefix
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = prefix
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let checkpoints = CheckpointManager::new(dir);
        Self { config, net, optim, iter: 0, checkpoints, stem }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

/// Read the model config named by `config.net` and build a fresh
/// training solver with `sequence_length × batch_size` buffers.
pub fn build_solver<B: AutodiffBackend>(
    config:          SolverConfig,
    sequence_length: usize,
    batch_size:      usize,
    device:          B::Device,
) -> Result<BurnSolver<B, impl Optimizer<CharRnn<B>, B> + Clone>, CharRnnError> {
    let model_cfg = CharRnnConfig::load(&config.net).map_err(|e| {
        CharRnnError::Checkpoint(format!("cannot load model config '{}': {e}", config.net))
    })?;
    let model: CharRnn<B> = model_cfg.init(&device);
    let net = CharRnnNetwork::new(
        model,
        model_cfg.vocab_size,
        Phase::Train,
        sequence_length,
        batch_size,
        device,
    )?;
    let optim = adam::<B>(&config);
    tracing::info!(
        "Solver ready: {} layers, hidden_size={}, lr={}",
        model_cfg.num_layers, model_cfg.hidden_size, config.base_lr
    );
    Ok(BurnSolver::new(config, net, optim))
}

impl<B, O> Solver for BurnSolver<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<CharRnn<B>, B> + Clone,
{
    type Net = CharRnnNetwork<B>;
    type TestNet = CharRnnNetwork<B::InnerBackend>;

    fn net(&self) -> &Self::Net {
        &self.net
    }

    fn net_mut(&mut self) -> &mut Self::Net {
        &mut self.net
    }

    fn step(&mut self, iters: usize) -> Result<(), CharRnnError> {
        for _ in 0..iters {
            let (data, clip, labels) = self.net.training_tensors()?;
            let model = self.net.model().clone();

            let (loss, _) = model.forward_loss(data, clip, labels);
            self.net.store_loss(loss.clone());

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            let model = self.optim.step(self.config.base_lr, model, grads);
            self.net.replace_model(model);
            self.iter += 1;

            if self.config.snapshot > 0 && self.iter % self.config.snapshot == 0 {
                self.snapshot()?;
            }
        }
        Ok(())
    }

    fn iter(&self) -> usize {
        self.iter
    }

    fn display_interval(&self) -> usize {
        self.config.display
    }

    fn snapshot(&mut self) -> Result<PathBuf, CharRnnError> {
        let path = self.checkpoints.save_snapshot(&self.stem, self.iter, self.net.model(), &self.optim)?;
        tracing::info!("Snapshotting to '{}'", path.display());
        Ok(path)
    }

    fn restore(&mut self, manifest: &Path) -> Result<(), CharRnnError> {
        let snapshot = CheckpointManager::load_manifest(manifest)?;
        let device = self.net.device().clone();

        let model = CheckpointManager::load_weights(
            self.net.model().clone(),
            &snapshot.weights_path(),
            &device,
        )?;
        let optim = CheckpointManager::load_optimizer::<B, O>(
            self.optim.clone(),
            &snapshot.optimizer_path(),
            &device,
        )?;

        self.net.replace_model(model);
        self.optim = optim;
        self.iter = snapshot.manifest.iter;
        tracing::info!("Restored iteration {} from '{}'", self.iter, manifest.display());
        Ok(())
    }

    fn materialize_test_net(&self) -> Result<Self::TestNet, CharRnnError> {
        CharRnnNetwork::new(
            self.net.model().valid(),
            self.net.vocab_size(),
            Phase::Test,
            self.net.sequence_length(),
            self.net.batch_size(),
            self.net.device().clone(),
        )
    }

    fn sync_test_net(&self, test: &mut Self::TestNet) -> Result<(), CharRnnError> {
        test.replace_model(self.net.model().valid());
        Ok(())
    }
}
