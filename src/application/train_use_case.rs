// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Read the corpus, build the vocabulary   (Layer 4 - data)
//   Step 2: Save run config + vocabulary file       (Layer 6 - infra)
//   Step 3: Write model and solver configs          (Layer 6 - infra)
//   Step 4: Build the solver, maybe resume          (Layer 5 - ml)
//   Step 5: Open the loss log                       (Layer 6 - infra)
//   Step 6: Run the training loop, snapshot at end  (Layer 5 - ml)
//
// Everything lands in checkpoint_dir:
//   train_config.json  model_config.json  solver.json
//   vocabulary_<V>.txt  char_rnn_iter_<n>.*  latest_snapshot.json

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::corpus::CorpusLoader;
use crate::domain::traits::Solver;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::LossLog,
    vocab_store::VocabularyStore,
};
use crate::ml::{
    default_device,
    model::CharRnnConfig,
    solver::{build_solver, SolverConfig},
    trainer::{Trainer, TrainerSettings},
    TrainBackend,
};

pub const TRAIN_CONFIG_FILE:  &str = "train_config.json";
pub const MODEL_CONFIG_FILE:  &str = "model_config.json";
pub const SOLVER_CONFIG_FILE: &str = "solver.json";
const SNAPSHOT_STEM: &str = "char_rnn";

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved next to the checkpoints so generation can reuse the
// sequence length and batch size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus_file:       String,
    pub checkpoint_dir:    String,
    pub log_file:          Option<String>,
    pub log_interval:      usize,
    pub sequence_length:   usize,
    pub batch_size:        usize,
    pub max_iter:          usize,
    pub display:           usize,
    pub snapshot_interval: usize,
    pub lr:                f64,
    pub embed_dim:         usize,
    pub hidden_size:       usize,
    pub num_layers:        usize,
    pub dropout:           f64,
    pub clip_gradients:    f32,
    /// Snapshot manifest to resume from, or "latest".
    pub resume:            Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_file:       "data/input.txt".to_string(),
            checkpoint_dir:    "checkpoints".to_string(),
            log_file:          None,
            log_interval:      10,
            sequence_length:   50,
            batch_size:        32,
            max_iter:          10_000,
            display:           100,
            snapshot_interval: 0,
            lr:                0.002,
            embed_dim:         64,
            hidden_size:       256,
            num_layers:        2,
            dropout:           0.0,
            clip_gradients:    5.0,
            resume:            None,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self, vocab_size: usize) -> CharRnnConfig {
        CharRnnConfig::new(vocab_size)
            .with_embed_dim(self.embed_dim)
            .with_hidden_size(self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
    }

    pub fn solver_config(&self, model_config_path: &Path) -> SolverConfig {
        let prefix = Path::new(&self.checkpoint_dir).join(SNAPSHOT_STEM);
        SolverConfig::new(
            model_config_path.display().to_string(),
            prefix.display().to_string(),
        )
        .with_base_lr(self.lr)
        .with_display(self.display)
        .with_max_iter(self.max_iter)
        .with_snapshot(self.snapshot_interval)
        .with_clip_gradients(self.clip_gradients)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the whole pipeline; returns the final snapshot manifest.
    pub fn execute(&self) -> Result<PathBuf> {
        let cfg = &self.config;

        // ── Step 1: Corpus and vocabulary ────────────────────────────────────
        let corpus = CorpusLoader::new(&cfg.corpus_file)
            .load()
            .with_context(|| format!("Cannot start training on '{}'", cfg.corpus_file))?;
        let vocab_size = corpus.vocabulary.size();

        // ── Step 2: Run config and vocabulary file ───────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_json(TRAIN_CONFIG_FILE, cfg)?;
        VocabularyStore::new(&cfg.checkpoint_dir)
            .save(&corpus.vocabulary)
            .context("Failed to save vocabulary")?;

        // ── Step 3: Model and solver configs ─────────────────────────────────
        let model_path  = ckpt.save_json(MODEL_CONFIG_FILE, &cfg.model_config(vocab_size))?;
        let solver_cfg  = cfg.solver_config(&model_path);
        ckpt.save_json(SOLVER_CONFIG_FILE, &solver_cfg)?;

        // ── Step 4: Solver ───────────────────────────────────────────────────
        let mut solver = build_solver::<TrainBackend>(
            solver_cfg,
            cfg.sequence_length,
            cfg.batch_size,
            default_device(),
        )?;
        match self.resume_manifest(&ckpt)? {
            Some(manifest) => {
                tracing::info!("Resuming training from '{}'", manifest.display());
                solver
                    .restore(&manifest)
                    .with_context(|| format!("Cannot resume from '{}'", manifest.display()))?;
            }
            None => tracing::info!("Starting new training"),
        }

        // ── Step 5: Loss log ─────────────────────────────────────────────────
        let log = LossLog::open(cfg.log_file.as_deref().map(Path::new));

        // ── Step 6: Loop ─────────────────────────────────────────────────────
        let settings = TrainerSettings {
            sequence_length: cfg.sequence_length,
            batch_size:      cfg.batch_size,
            log_interval:    cfg.log_interval,
        };
        let mut trainer = Trainer::new(solver, corpus.split, settings, log)?;
        trainer.run(cfg.max_iter)?;
        let snapshot = trainer.finish()?;

        tracing::info!("Training complete! Final snapshot: '{}'", snapshot.display());
        Ok(snapshot)
    }

    fn resume_manifest(&self, ckpt: &CheckpointManager) -> Result<Option<PathBuf>> {
        match self.config.resume.as_deref() {
            None => Ok(None),
            Some("latest") => Ok(Some(ckpt.latest_manifest()?)),
            Some(path) => Ok(Some(PathBuf::from(path))),
        }
    }
}
