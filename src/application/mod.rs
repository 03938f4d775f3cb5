// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Wires the other layers together for one goal each.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination, with anyhow context on failures

// Corpus → vocabulary → solver → training loop → snapshot
pub mod train_use_case;

// Checkpoint directory → network → sampler
pub mod generate_use_case;
