// ============================================================
// Layer 6 — Character Dictionary Store
// ============================================================
// Persists the character dictionary next to the checkpoints.
//
// The dictionary's item order IS the model's index space: the
// embedding tables and the output projection are sized and
// addressed by it. Loading a checkpoint with a differently
// ordered dictionary would silently scramble every character,
// so the snapshot written at training time is the only source
// of indices for inference.
//
// Stored as plain JSON (a list of items); the lookup map is
// rebuilt on load.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::char_dict::CharDictionary;
use crate::domain::sentence::Sentence;

const DICT_FILE: &str = "char_dict.json";

pub struct DictStore {
    dir: PathBuf,
}

impl DictStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Load an existing dictionary snapshot, or build one from
    /// the corpus and save it.
    pub fn load_or_build(&self, sentences: &[Sentence]) -> Result<CharDictionary> {
        let path = self.dir.join(DICT_FILE);
        if path.exists() {
            tracing::info!("Loading existing character dictionary from disk");
            self.load()
        } else {
            tracing::info!("Building new character dictionary from corpus");
            let dict = CharDictionary::from_sentences(sentences);
            self.save(&dict)?;
            Ok(dict)
        }
    }

    /// Load a previously saved dictionary snapshot.
    pub fn load(&self) -> Result<CharDictionary> {
        let path = self.dir.join(DICT_FILE);
        let json = std::fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read character dictionary from '{}'. \
                     Have you run 'train' first?",
                    path.display()
                )
            })?;
        let items: Vec<String> = serde_json::from_str(&json)?;
        CharDictionary::from_items(items)
    }

    /// Write the dictionary's item list as JSON.
    pub fn save(&self, dict: &CharDictionary) -> Result<()> {
        std::fs::create_dir_all(&self.dir).ok();
        let path = self.dir.join(DICT_FILE);
        let json = serde_json::to_string_pretty(dict.items())?;
        std::fs::write(&path, json)
            .with_context(|| format!("Cannot write character dictionary to '{}'", path.display()))?;
        tracing::info!(
            "Character dictionary with {} items saved to '{}'",
            dict.items().len(),
            path.display()
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentence::Word;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("dict_store_test_{}", std::process::id()));
        let store = DictStore::new(dir.to_string_lossy().to_string());

        let sentences = vec![Sentence::new(vec![Word::new("ab"), Word::new("c")])];
        let built = store.load_or_build(&sentences).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.len(), built.len());
        assert_eq!(loaded.index_of("a"), built.index_of("a"));
        assert_eq!(loaded.index_of("c"), built.index_of("c"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
