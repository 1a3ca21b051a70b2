// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads sentences from a two-column TSV corpus:
//
//   form<TAB>lemma
//   form<TAB>lemma
//   <blank line>          ← sentence boundary
//   # comment lines are skipped
//
// The lemma column is optional — unlabelled text for prediction
// uses the same format with just the form column. Completely
// empty sentences are dropped at load time; zero-length forms
// are dropped too since the model would only produce a
// degenerate end-only sequence for them.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::domain::sentence::{Sentence, Word};
use crate::domain::traits::CorpusSource;

/// Label name under which gold lemmas from the corpus are stored.
pub const GOLD_LEMMA_LABEL: &str = "lemma";

pub struct TsvCorpusLoader {
    path: PathBuf,
}

impl TsvCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse TSV content into sentences. Shared by file loading
    /// and the tests.
    pub fn parse_str(content: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut current = Sentence::default();

        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.starts_with('#') {
                continue;
            }
            if line.trim().is_empty() {
                if !current.is_empty() {
                    sentences.push(std::mem::take(&mut current));
                }
                continue;
            }

            let mut cols = line.split('\t');
            let form = cols.next().unwrap_or("").trim();
            if form.is_empty() {
                continue;
            }
            let lemma = cols.next().map(str::trim).filter(|l| !l.is_empty());

            current.push(match lemma {
                Some(lemma) => Word::with_label(form, GOLD_LEMMA_LABEL, lemma),
                None => Word::new(form),
            });
        }

        if !current.is_empty() {
            sentences.push(current);
        }
        sentences
    }
}

impl CorpusSource for TsvCorpusLoader {
    fn load_all(&self) -> Result<Vec<Sentence>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus file '{}'", self.path.display()))?;

        let sentences = Self::parse_str(&content);
        tracing::info!(
            "Loaded {} sentences from '{}'",
            sentences.len(),
            self.path.display()
        );
        Ok(sentences)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_sentences_and_lemmas() {
        let corpus = "Die\td\nKatzen\tKatze\n\nläuft\tlaufen\n";
        let sentences = TsvCorpusLoader::parse_str(corpus);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].len(), 2);
        assert_eq!(sentences[0].words()[1].text(), "Katzen");
        assert_eq!(sentences[0].words()[1].label(GOLD_LEMMA_LABEL), Some("Katze"));
    }

    #[test]
    fn test_form_only_lines_have_no_gold_label() {
        let sentences = TsvCorpusLoader::parse_str("Katzen\n");
        assert_eq!(sentences[0].words()[0].label(GOLD_LEMMA_LABEL), None);
    }

    #[test]
    fn test_skips_comments_and_extra_blank_lines() {
        let corpus = "# header\n\n\na\tb\n\n\n# tail\n";
        let sentences = TsvCorpusLoader::parse_str(corpus);
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].len(), 1);
    }
}
