// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
//   - the character vocabulary and the split corpus stream
//   - the error kinds
//   - the network/solver traits the engine implements
//
// No burn types and no file I/O here.

/// Byte ↔ index mapping and corpus split
pub mod vocabulary;

/// Error kinds shared by all library layers
pub mod error;

/// Network engine abstractions (named buffers, phases, solver)
pub mod traits;
