// ============================================================
// Layer 3 — Error Kinds
// ============================================================
// One error enum shared by every library layer. The application
// and CLI layers wrap it in anyhow with extra context.
//
// Fatal kinds:
//   VocabularyFormat — corpus or vocabulary source unreadable/empty
//   InsufficientData — a corpus partition is too short to pack a batch
//   Engine / Checkpoint — the network engine failed
//
// Caller-visible, non-fatal for the process:
//   UnknownCharacter — a seed byte was never seen in the vocabulary

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CharRnnError {
    /// The vocabulary (or the corpus it is built from) cannot be used.
    #[error("vocabulary source '{origin}' is unusable: {reason}")]
    VocabularyFormat { origin: String, reason: String },

    /// A byte that is not part of the vocabulary.
    #[error("character {:?} is not in the vocabulary", char::from(*.byte))]
    UnknownCharacter { byte: u8 },

    /// A vocabulary index outside `[0, size)`.
    #[error("vocabulary index {index} is out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    /// A corpus partition shorter than `sequence_length + 2`.
    #[error("corpus partition holds {available} characters, at least {required} are needed")]
    InsufficientData { available: usize, required: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("network engine: {0}")]
    Engine(String),

    #[error("checkpoint: {0}")]
    Checkpoint(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CharRnnError {
    pub(crate) fn vocabulary_format(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VocabularyFormat {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_character_message_shows_the_character() {
        let err = CharRnnError::UnknownCharacter { byte: b'#' };
        assert_eq!(err.to_string(), "character '#' is not in the vocabulary");
    }

    #[test]
    fn insufficient_data_message_names_both_sizes() {
        let err = CharRnnError::InsufficientData { available: 7, required: 12 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("12"));
    }
}
