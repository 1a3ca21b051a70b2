// ============================================================
// Layer 3 — Sentence and Word Domain Types
// ============================================================
// A Sentence owns its Words; Words are never shared between
// sentences. A Word is a text span plus a map of named string
// labels. The gold lemma (if the corpus provides one) is just
// another label, so training data and unlabelled input flow
// through the same types.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One token of running text.
///
/// `labels` maps a label name (e.g. "lemma" for gold annotations,
/// "predicted" for model output) to a string value. `embedding`
/// is only populated when a pretrained word representation is in
/// use — see the WordEmbedder trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    text: String,
    labels: HashMap<String, String>,
    embedding: Option<Vec<f32>>,
}

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            labels: HashMap::new(),
            embedding: None,
        }
    }

    /// Convenience constructor for labelled corpus data.
    pub fn with_label(
        text: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut word = Self::new(text);
        word.set_label(name, value);
        word
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters, not bytes — the model operates on
    /// Unicode scalar values, one index per character.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn set_label(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(name.into(), value.into());
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn remove_label(&mut self, name: &str) {
        self.labels.remove(name);
    }

    pub fn set_embedding(&mut self, vector: Vec<f32>) {
        self.embedding = Some(vector);
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

/// An ordered sequence of Words.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sentence {
    words: Vec<Word>,
}

impl Sentence {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    pub fn push(&mut self, word: Word) {
        self.words.push(word);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [Word] {
        &mut self.words
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_set_get_remove() {
        let mut w = Word::new("running");
        assert_eq!(w.label("lemma"), None);
        w.set_label("lemma", "run");
        assert_eq!(w.label("lemma"), Some("run"));
        w.remove_label("lemma");
        assert_eq!(w.label("lemma"), None);
    }

    #[test]
    fn test_char_len_is_character_count() {
        // 4 characters, more than 4 bytes
        let w = Word::new("héhé");
        assert_eq!(w.char_len(), 4);
    }

    #[test]
    fn test_empty_sentence() {
        let s = Sentence::default();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }
}
