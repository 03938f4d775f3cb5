// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the vocabulary so generation uses the exact mapping
// the network was trained with.
//
// File format: raw bytes, one byte per distinct character, in
// index order. No separators, no header.
//
// File naming: vocabulary_<V>.txt, V = vocabulary size.

use std::{fs, path::{Path, PathBuf}};

use crate::domain::error::CharRnnError;
use crate::domain::vocabulary::Vocabulary;

pub struct VocabularyStore {
    dir: PathBuf,
}

impl VocabularyStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn file_name(size: usize) -> String {
        format!("vocabulary_{size}.txt")
    }

    /// Where a vocabulary of `size` characters lives in this store.
    pub fn path_for(&self, size: usize) -> PathBuf {
        self.dir.join(Self::file_name(size))
    }

    /// Write the vocabulary, replacing any previous file of the same size.
    pub fn save(&self, vocab: &Vocabulary) -> Result<PathBuf, CharRnnError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(vocab.size());
        fs::write(&path, vocab.symbols())?;
        tracing::info!("Vocabulary saved to '{}'", path.display());
        Ok(path)
    }

    /// Read a vocabulary file; each byte is the entry at its position.
    pub fn load(path: impl AsRef<Path>) -> Result<Vocabulary, CharRnnError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let bytes = fs::read(path)
            .map_err(|e| CharRnnError::vocabulary_format(&origin, format!("unable to open: {e}")))?;
        Vocabulary::from_symbols(&bytes, &origin)
    }
}
