// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From raw corpus bytes to engine-ready f32 buffers:
//
//   text file
//       │
//       ▼
//   CorpusLoader   → vocabulary + train/test index streams
//       │
//       ▼
//   BatchPacker    → [time][slot] data/label buffers + clip mask
//
// and for generation:
//
//   seed text → fit_seed → RollingWindow (fixed-size FIFO)

/// Reads the corpus and builds the vocabulary
pub mod corpus;

/// Training batch packing and the continuation mask
pub mod batcher;

/// Seed fitting and the rolling inference window
pub mod window;
