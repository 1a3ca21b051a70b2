// ============================================================
// Layer 4 — Pretrained Word Embeddings
// ============================================================
// Loads word vectors from the word2vec text format:
//
//   word 0.12 -0.05 0.33 ...
//
// and attaches them to Words via the WordEmbedder trait. Words
// missing from the table get a zero vector of the same length,
// so the encoder always sees a fixed-width representation.
//
// This is the "external representation" collaborator of the
// model: when external-representation encoding is enabled, the
// vector is broadcast across the decoder layers as an
// alternative initial state.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::sentence::Sentence;
use crate::domain::traits::WordEmbedder;

pub struct TextEmbeddings {
    table: HashMap<String, Vec<f32>>,
    dim: usize,
}

impl TextEmbeddings {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read embeddings file '{}'", path.display()))?;
        let embeddings = Self::parse_str(&content)?;
        tracing::info!(
            "Loaded {} word vectors (dim {}) from '{}'",
            embeddings.table.len(),
            embeddings.dim,
            path.display()
        );
        Ok(embeddings)
    }

    pub fn parse_str(content: &str) -> Result<Self> {
        let mut table = HashMap::new();
        let mut dim = 0usize;

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let word = parts.next().unwrap_or("");
            let vector: Vec<f32> = parts
                .map(|p| {
                    p.parse::<f32>()
                        .with_context(|| format!("Bad float '{p}' on line {}", lineno + 1))
                })
                .collect::<Result<_>>()?;

            // a one-column header line ("<count> <dim>") is allowed
            if lineno == 0 && vector.len() == 1 {
                continue;
            }
            if dim == 0 {
                dim = vector.len();
            } else if vector.len() != dim {
                bail!(
                    "Vector length {} on line {} does not match dimension {}",
                    vector.len(),
                    lineno + 1,
                    dim
                );
            }
            table.insert(word.to_string(), vector);
        }

        if dim == 0 {
            bail!("Embeddings file contains no vectors");
        }
        Ok(Self { table, dim })
    }
}

impl WordEmbedder for TextEmbeddings {
    fn embed(&self, sentences: &mut [Sentence]) -> Result<()> {
        for sentence in sentences {
            for word in sentence.words_mut() {
                let vector = self
                    .table
                    .get(word.text())
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dim]);
                word.set_embedding(vector);
            }
        }
        Ok(())
    }

    fn embedding_length(&self) -> usize {
        self.dim
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentence::Word;

    #[test]
    fn test_parses_vectors_and_embeds() {
        let emb = TextEmbeddings::parse_str("cat 1.0 2.0\ndog 3.0 4.0\n").unwrap();
        assert_eq!(emb.embedding_length(), 2);

        let mut sentences = vec![Sentence::new(vec![Word::new("cat"), Word::new("bird")])];
        emb.embed(&mut sentences).unwrap();

        let words = sentences[0].words();
        assert_eq!(words[0].embedding(), Some(&[1.0, 2.0][..]));
        // out-of-vocabulary word gets a zero vector
        assert_eq!(words[1].embedding(), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn test_rejects_ragged_vectors() {
        assert!(TextEmbeddings::parse_str("cat 1.0 2.0\ndog 3.0\n").is_err());
    }
}
