// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the training text as raw bytes and hands it to the
// vocabulary builder. Every byte is one character; no decoding,
// no normalisation.

use std::{fs, path::{Path, PathBuf}};

use crate::domain::error::CharRnnError;
use crate::domain::vocabulary::{CorpusSplit, Vocabulary};

/// A corpus after the single vocabulary-building scan.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub vocabulary: Vocabulary,
    pub split:      CorpusSplit,
}

/// Loads a text file into a [`Corpus`].
pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Read the file and build the vocabulary and train/test streams.
    ///
    /// A missing, unreadable or empty file is a `VocabularyFormat` error.
    pub fn load(&self) -> Result<Corpus, CharRnnError> {
        let origin = self.path.display().to_string();
        tracing::info!("Reading {}", origin);

        let bytes = fs::read(&self.path)
            .map_err(|e| CharRnnError::vocabulary_format(&origin, format!("cannot read text file: {e}")))?;

        let (vocabulary, split) = Vocabulary::build_from_corpus(&bytes, &origin)?;
        tracing::info!(
            "Vocabulary of {} characters; {} train / {} test",
            vocabulary.size(),
            split.train.len(),
            split.test.len()
        );

        Ok(Corpus { vocabulary, split })
    }
}
