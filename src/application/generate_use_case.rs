// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Rebuilds a trained network from checkpoint_dir and samples
// text from it.
//
//   Step 1: Resolve artifacts   model config, vocabulary, weights,
//                               sequence length and batch size
//   Step 2: Check they agree    vocabulary size == model vocab_size
//   Step 3: Load the network    (Layer 5 - ml)
//   Step 4: Sample              (Layer 5 - ml)
//
// Anything not given explicitly is read from checkpoint_dir:
//   model_config.json, vocabulary_<V>.txt, train_config.json,
//   latest_snapshot.json

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::{TrainConfig, MODEL_CONFIG_FILE, TRAIN_CONFIG_FILE};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabularyStore};
use crate::ml::{
    default_device,
    model::CharRnnConfig,
    network::CharRnnNetwork,
    sampler::Sampler,
    InferBackend,
};

const RECORD_EXTENSION: &str = ".mpk.gz";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub checkpoint_dir:  String,
    pub model_config:    Option<String>,
    /// A `.solverstate.json` manifest or a weights file.
    pub weights:         Option<String>,
    pub vocabulary:      Option<String>,
    pub sequence_length: Option<usize>,
    pub batch_size:      Option<usize>,
    pub seed:            String,
    pub length:          usize,
    pub temperature:     f32,
    pub output_file:     Option<String>,
    pub display:         bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:  "checkpoints".to_string(),
            model_config:    None,
            weights:         None,
            vocabulary:      None,
            sequence_length: None,
            batch_size:      None,
            seed:            String::new(),
            length:          500,
            temperature:     0.5,
            output_file:     None,
            display:         true,
        }
    }
}

/// Everything needed to build the network, after defaults are applied.
#[derive(Debug, Clone)]
pub struct ResolvedArtifacts {
    pub model_config:    CharRnnConfig,
    pub vocabulary:      Vocabulary,
    pub weights:         PathBuf,
    pub sequence_length: usize,
    pub batch_size:      usize,
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Generate `length` characters; returns them.
    pub fn execute(&self) -> Result<Vec<u8>> {
        let cfg = &self.config;
        let artifacts = self.resolve()?;

        let net = CharRnnNetwork::<InferBackend>::load(
            &artifacts.model_config,
            &artifacts.weights,
            artifacts.sequence_length,
            artifacts.batch_size,
            default_device(),
        )
        .context("Failed to load the trained network")?;

        let mut sampler = Sampler::new(
            net,
            artifacts.vocabulary,
            artifacts.sequence_length,
            artifacts.batch_size,
            cfg.temperature,
            cfg.output_file.as_ref().map(PathBuf::from),
        )?;
        tracing::info!(
            "Generating {} characters at temperature {}",
            cfg.length,
            sampler.temperature().value()
        );

        let text = sampler
            .generate(cfg.seed.as_bytes(), cfg.length, cfg.display)
            .context("Generation failed")?;
        Ok(text)
    }

    /// Fill in every artifact path and shape, checking they agree.
    pub fn resolve(&self) -> Result<ResolvedArtifacts> {
        let cfg = &self.config;
        let dir = Path::new(&cfg.checkpoint_dir);

        let model_path = cfg
            .model_config
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| dir.join(MODEL_CONFIG_FILE));
        let model_config: CharRnnConfig = CheckpointManager::read_json(&model_path)
            .context("Failed to load model config")?;

        let vocab_path = cfg
            .vocabulary
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| VocabularyStore::new(dir).path_for(model_config.vocab_size));
        let vocabulary = VocabularyStore::load(&vocab_path)?;
        if vocabulary.size() != model_config.vocab_size {
            bail!(
                "Vocabulary '{}' has {} characters but the model expects {}",
                vocab_path.display(),
                vocabulary.size(),
                model_config.vocab_size
            );
        }

        let weights = match cfg.weights.as_deref() {
            Some(path) => weights_from(Path::new(path))?,
            None => {
                let manifest = CheckpointManager::new(dir).latest_manifest()?;
                weights_from(&manifest)?
            }
        };
        let record = PathBuf::from(format!("{}{RECORD_EXTENSION}", weights.display()));
        if !record.exists() {
            bail!("Weights file '{}' not found", record.display());
        }

        let (sequence_length, batch_size) = match (cfg.sequence_length, cfg.batch_size) {
            (Some(t), Some(n)) => (t, n),
            (t, n) => {
                let train: TrainConfig = CheckpointManager::read_json(&dir.join(TRAIN_CONFIG_FILE))
                    .context("Pass --sequence-length and --batch-size, or point at a training run")?;
                (t.unwrap_or(train.sequence_length), n.unwrap_or(train.batch_size))
            }
        };

        Ok(ResolvedArtifacts { model_config, vocabulary, weights, sequence_length, batch_size })
    }
}

/// Recorder path (no extension) from a manifest or a weights file.
fn weights_from(path: &Path) -> Result<PathBuf> {
    let lossy = path.to_string_lossy();
    let name: &str = &lossy;
    if name.ends_with(".solverstate.json") {
        let snapshot = CheckpointManager::load_manifest(path)?;
        return Ok(snapshot.weights_path());
    }
    Ok(PathBuf::from(name.strip_suffix(RECORD_EXTENSION).unwrap_or(name)))
}
