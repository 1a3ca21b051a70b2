// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types,
// we can swap implementations without changing the code that
// uses them. For example:
//   - TsvCorpusLoader implements CorpusSource
//   - A future ConlluLoader could also implement CorpusSource
//   - The application layer only sees CorpusSource
//     and works with both without any changes
//
// The model itself is bound by the LemmaAnnotator contract
// rather than inheriting from a shared classifier base —
// there is no shared base-class state anywhere.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::sentence::Sentence;
use anyhow::Result;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can supply sentences for training or
/// prediction.
pub trait CorpusSource {
    /// Load all available sentences from this source.
    fn load_all(&self) -> Result<Vec<Sentence>>;
}

// ─── WordEmbedder ─────────────────────────────────────────────────────────────
/// Any component that can attach a fixed-length numeric
/// representation vector to every Word of a batch of sentences.
///
/// The lemmatizer only consumes these vectors when its
/// external-representation encoding is switched on; how they
/// are computed is entirely this collaborator's business.
pub trait WordEmbedder {
    /// Populate `Word::embedding` for every word in place.
    fn embed(&self, sentences: &mut [Sentence]) -> Result<()>;

    /// Length of the vectors this embedder produces.
    fn embedding_length(&self) -> usize;
}

// ─── LemmaAnnotator ───────────────────────────────────────────────────────────
/// Any component that can predict lemmas for words.
///
/// Implementations:
///   - Inferencer → beam-search decoding with the trained model
pub trait LemmaAnnotator {
    /// Attach a lemma prediction to every word of every
    /// non-empty sentence, in place, under `label_name`.
    fn annotate(&self, sentences: &mut [Sentence], label_name: &str) -> Result<()>;
}
