// ============================================================
// Layer 2 — Lemmatize Use Case
// ============================================================
// Inference workflows on a trained checkpoint:
//
//   lemmatize — read unlabelled TSV text, beam-decode a lemma
//               for every word, return the annotated sentences
//
//   evaluate  — read a labelled TSV corpus, predict with the
//               diagnostic loss switched on, report average
//               loss and exact-match accuracy
//
// Both restore the same architecture + dictionary that training
// persisted; the caller never touches burn types.

use anyhow::Result;

use crate::data::loader::{TsvCorpusLoader, GOLD_LEMMA_LABEL};
use crate::domain::sentence::Sentence;
use crate::domain::traits::CorpusSource;
use crate::infra::{checkpoint::CheckpointManager, dict_store::DictStore};
use crate::ml::inferencer::Inferencer;
use crate::ml::model::PredictOptions;

/// Label name predictions are written under.
pub const PREDICTED_LABEL: &str = "predicted";

/// Evaluation summary over a labelled corpus.
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Average per-word diagnostic loss
    pub avg_loss: f64,
    /// Exact-match lemma accuracy
    pub accuracy: f64,
    /// Number of words evaluated
    pub tokens: usize,
}

pub struct LemmatizeUseCase {
    inferencer: Inferencer,
    beam_size:  Option<usize>,
}

impl LemmatizeUseCase {
    /// Restore the trained model from the checkpoint directory.
    pub fn new(checkpoint_dir: String, beam_size: Option<usize>) -> Result<Self> {
        let dict_store = DictStore::new(&checkpoint_dir);
        let dict       = dict_store.load()?;
        let ckpt       = CheckpointManager::new(&checkpoint_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt, dict)?;
        Ok(Self { inferencer, beam_size })
    }

    /// Lemmatize an unlabelled TSV file and return the annotated
    /// sentences. Predictions land under `PREDICTED_LABEL`.
    pub fn lemmatize_file(&self, input_path: &str) -> Result<Vec<Sentence>> {
        let loader = TsvCorpusLoader::new(input_path);
        let mut sentences = loader.load_all()?;

        let opts = PredictOptions {
            label_name: PREDICTED_LABEL.to_string(),
            beam_size: self.beam_size,
            ..PredictOptions::default()
        };
        self.inferencer.predict(&mut sentences, &opts)?;

        Ok(sentences)
    }

    /// Evaluate against a labelled TSV corpus.
    pub fn evaluate(&self, corpus_path: &str) -> Result<EvalReport> {
        let loader = TsvCorpusLoader::new(corpus_path);
        let mut sentences = loader.load_all()?;

        let opts = PredictOptions {
            label_name: PREDICTED_LABEL.to_string(),
            beam_size: self.beam_size,
            return_loss: true,
            ..PredictOptions::default()
        };
        let summary = self.inferencer.predict(&mut sentences, &opts)?;
        let (total_loss, tokens) = summary.unwrap_or((0.0, 0));

        let mut correct = 0usize;
        for sentence in &sentences {
            for word in sentence.words() {
                // unlabelled words are scored against their own text,
                // the same pseudo-gold the loss uses
                let gold = word.label(GOLD_LEMMA_LABEL).unwrap_or(word.text());
                if word.label(PREDICTED_LABEL) == Some(gold) {
                    correct += 1;
                }
            }
        }

        Ok(EvalReport {
            avg_loss: if tokens > 0 { total_loss / tokens as f64 } else { 0.0 },
            accuracy: if tokens > 0 { correct as f64 / tokens as f64 } else { 0.0 },
            tokens,
        })
    }
}

/// Render annotated sentences back to two-column TSV, blank
/// lines between sentences.
pub fn format_tsv(sentences: &[Sentence]) -> String {
    let mut out = String::new();
    for (i, sentence) in sentences.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for word in sentence.words() {
            out.push_str(word.text());
            out.push('\t');
            out.push_str(word.label(PREDICTED_LABEL).unwrap_or(""));
            out.push('\n');
        }
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentence::Word;

    #[test]
    fn test_format_tsv_layout() {
        let mut w1 = Word::new("Katzen");
        w1.set_label(PREDICTED_LABEL, "Katze");
        let mut w2 = Word::new("laufen");
        w2.set_label(PREDICTED_LABEL, "laufen");
        let sentences = vec![
            Sentence::new(vec![w1]),
            Sentence::new(vec![w2]),
        ];
        assert_eq!(format_tsv(&sentences), "Katzen\tKatze\n\nlaufen\tlaufen\n");
    }
}
