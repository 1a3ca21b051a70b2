// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - NO ML-specific code
//   - Only plain Rust structs, enums, and traits
//
// The lemmatizer works on sentences of words: every Word
// carries its surface text, a map of named labels (the gold
// lemma lives under "lemma", predictions under whatever label
// name the caller picks) and an optional pretrained embedding
// vector filled in by a WordEmbedder.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Sentences and words with labels and embeddings
pub mod sentence;

// Core abstractions (traits) that other layers implement
pub mod traits;
