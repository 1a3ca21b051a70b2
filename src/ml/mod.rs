// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only this one.
//
// Why isolate Burn code here?
//   - If Burn's API changes, we only update this layer
//   - Other layers are testable without a GPU
//   - The model architecture is clearly separated from
//     data loading and application logic
//
// What's in this layer:
//
//   rnn.rs        — GRU building blocks
//                   A single GRU cell assembled from two linear
//                   gate projections, stacked into a multi-layer
//                   unit with a per-step padding mask so final
//                   states always reflect true word lengths
//
//   attention.rs  — Dot-product attention over encoder states
//
//   loss.rs       — Cross-entropy over decoder logits, plus the
//                   host-side negative log-likelihood used for
//                   per-word diagnostic losses
//
//   model.rs      — The lemmatizer encoder/decoder architecture:
//                   • Character embeddings on both sides
//                   • (Bi)directional GRU character encoder
//                   • Optional pretrained word vector input
//                   • GRU decoder with optional attention
//                   • Vocabulary projection head
//
//   beam.rs       — Beam-search decoding, batched (slot arena)
//                   and sequential variants
//
//   trainer.rs    — The training loop
//                   Handles forward pass, loss computation,
//                   backward pass, optimiser step, validation
//                   and checkpoint saving per epoch
//
//   inferencer.rs — The inference engine
//                   Loads a checkpoint and annotates sentences
//                   with predicted lemmas
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning
//            Bahdanau et al. (2015) Neural Machine Translation

/// GRU cell and stacked GRU with step masking
pub mod rnn;

/// Dot-product attention over character context states
pub mod attention;

/// Sequence cross-entropy and host-side NLL helpers
pub mod loss;

/// Encoder/decoder lemmatizer architecture
pub mod model;

/// Beam-search decoding strategies
pub mod beam;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and predicts lemmas
pub mod inferencer;
