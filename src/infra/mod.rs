// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything a run leaves on disk:
//
//   checkpoint.rs  — Solver snapshots and run configuration
//                    Model weights and Adam state go through
//                    burn's CompactRecorder; a small JSON
//                    manifest ties one snapshot together and
//                    latest_snapshot.json points at the newest.
//
//   vocab_store.rs — vocabulary_<V>.txt
//                    The characters in index order, so
//                    generation decodes with the mapping the
//                    network was trained on.
//
//   metrics.rs     — Semicolon loss log
//                    Training and validation losses in one
//                    append-mode file.

/// Snapshot and config persistence
pub mod checkpoint;

/// Vocabulary file persistence
pub mod vocab_store;

/// Training/validation loss log
pub mod metrics;
