// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores solver snapshots with burn's CompactRecorder,
// plus the JSON run configuration.
//
// A snapshot at iteration n with stem "char_rnn" writes:
//   char_rnn_iter_n.mpk.gz                 ← model weights
//   char_rnn_iter_n_solverstate.mpk.gz     ← optimizer state
//   char_rnn_iter_n.solverstate.json       ← manifest {iter, weights, optimizer}
//   latest_snapshot.json                   ← name of the newest manifest
//
// Manifest entries are file names relative to the manifest's own
// directory, without the recorder extension.

use std::{fs, path::{Path, PathBuf}};

use burn::{
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::error::CharRnnError;
use crate::ml::model::CharRnn;

const LATEST_SNAPSHOT: &str = "latest_snapshot.json";

/// Contents of a `.solverstate.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub iter:      usize,
    pub weights:   String,
    pub optimizer: String,
}

/// A manifest together with the directory its entries are relative to.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub manifest: SnapshotManifest,
    dir:          PathBuf,
}

impl Snapshot {
    /// Weights path as passed to the recorder (no extension).
    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(&self.manifest.weights)
    }

    pub fn optimizer_path(&self) -> PathBuf {
        self.dir.join(&self.manifest.optimizer)
    }
}

/// All checkpoint files live in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager; the directory is created if missing.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ─── Run configuration ───────────────────────────────────────────────────

    /// Write `value` as pretty JSON to `<dir>/<name>`.
    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, CharRnnError> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| CharRnnError::Checkpoint(format!("cannot encode '{name}': {e}")))?;
        fs::write(&path, json)?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(path)
    }

    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, CharRnnError> {
        Self::read_json(&self.dir.join(name))
    }

    /// Read a JSON file from anywhere.
    pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CharRnnError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CharRnnError::Checkpoint(format!("cannot read '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| CharRnnError::Checkpoint(format!("cannot parse '{}': {e}", path.display())))
    }

    // ─── Snapshots ───────────────────────────────────────────────────────────

    /// Persist model weights and optimizer state for iteration `iter`.
    /// Returns the manifest path.
    pub fn save_snapshot<B, O>(
        &self,
        stem:      &str,
        iter:      usize,
        model:     &CharRnn<B>,
        optimizer: &O,
    ) -> Result<PathBuf, CharRnnError>
    where
        B: AutodiffBackend,
        O: Optimizer<CharRnn<B>, B>,
    {
        // The recorder replaces anything after a dot with its own extension.
        let stem = stem.replace('.', "_");
        let manifest = SnapshotManifest {
            iter,
            weights:   format!("{stem}_iter_{iter}"),
            optimizer: format!("{stem}_iter_{iter}_solverstate"),
        };

        let recorder = CompactRecorder::new();
        let weights = self.dir.join(&manifest.weights);
        <CompactRecorder as Recorder<B>>::record(&recorder, model.clone().into_record(), weights.clone())
            .map_err(|e| CharRnnError::Checkpoint(format!("cannot save '{}': {e}", weights.display())))?;

        let optim = self.dir.join(&manifest.optimizer);
        <CompactRecorder as Recorder<B>>::record(&recorder, optimizer.to_record(), optim.clone())
            .map_err(|e| CharRnnError::Checkpoint(format!("cannot save '{}': {e}", optim.display())))?;

        let manifest_name = format!("{stem}_iter_{iter}.solverstate.json");
        let manifest_path = self.save_json(&manifest_name, &manifest)?;
        self.save_json(LATEST_SNAPSHOT, &manifest_name)?;

        tracing::debug!("Snapshot written: iteration {}", iter);
        Ok(manifest_path)
    }

    /// Path of the newest manifest in this directory.
    pub fn latest_manifest(&self) -> Result<PathBuf, CharRnnError> {
        let name: String = self.load_json(LATEST_SNAPSHOT).map_err(|_| {
            CharRnnError::Checkpoint(format!(
                "no snapshot found in '{}'. Have you run 'train' first?",
                self.dir.display()
            ))
        })?;
        Ok(self.dir.join(name))
    }

    /// Read a manifest file.
    pub fn load_manifest(path: &Path) -> Result<Snapshot, CharRnnError> {
        let manifest: SnapshotManifest = Self::read_json(path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Snapshot { manifest, dir })
    }

    /// Load weights into `model`. `weights` has no extension.
    pub fn load_weights<B: Backend>(
        model:   CharRnn<B>,
        weights: &Path,
        device:  &B::Device,
    ) -> Result<CharRnn<B>, CharRnnError> {
        let record = CompactRecorder::new()
            .load(weights.to_path_buf(), device)
            .map_err(|e| {
                CharRnnError::Checkpoint(format!("cannot load weights '{}': {e}", weights.display()))
            })?;
        Ok(model.load_record(record))
    }

    /// Load optimizer state saved by [`save_snapshot`](Self::save_snapshot).
    pub fn load_optimizer<B, O>(
        optimizer: O,
        path:      &Path,
        device:    &B::Device,
    ) -> Result<O, CharRnnError>
    where
        B: AutodiffBackend,
        O: Optimizer<CharRnn<B>, B>,
    {
        let recorder = CompactRecorder::new();
        let record = <CompactRecorder as Recorder<B>>::load::<O::Record>(&recorder, path.to_path_buf(), device)
            .map_err(|e| {
                CharRnnError::Checkpoint(format!("cannot load solver state '{}': {e}", path.display()))
            })?;
        Ok(optimizer.load_record(record))
    }
}
