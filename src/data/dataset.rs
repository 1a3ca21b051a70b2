// ============================================================
// Layer 4 — Sentence Dataset
// ============================================================
// Holds the sentences of one split and hands out mini-batch
// slices. Tensor construction happens inside the model (it
// depends on the model's symbol-placement flags), so a batch
// here is simply a slice of Sentences.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::sentence::Sentence;

pub struct SentenceDataset {
    sentences: Vec<Sentence>,
}

impl SentenceDataset {
    /// Empty sentences are dropped — they carry nothing to learn
    /// from or predict on.
    pub fn new(sentences: Vec<Sentence>) -> Self {
        let sentences = sentences.into_iter().filter(|s| !s.is_empty()).collect();
        Self { sentences }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Reorder sentences in place, once per epoch.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.sentences.shuffle(rng);
    }

    /// Mini-batch slices of at most `batch_size` sentences.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = &[Sentence]> {
        self.sentences.chunks(batch_size.max(1))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentence::Word;

    fn sentence(texts: &[&str]) -> Sentence {
        Sentence::new(texts.iter().map(|t| Word::new(*t)).collect())
    }

    #[test]
    fn test_filters_empty_sentences() {
        let ds = SentenceDataset::new(vec![sentence(&["a"]), Sentence::default()]);
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_batches_cover_everything() {
        let ds = SentenceDataset::new(vec![
            sentence(&["a"]),
            sentence(&["b"]),
            sentence(&["c"]),
        ]);
        let sizes: Vec<usize> = ds.batches(2).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }
}
