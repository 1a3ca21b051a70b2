// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the TSV corpus        (Layer 4 - data)
//   Step 2: Attach word embeddings     (Layer 4 - data, optional)
//   Step 3: Build / load dictionary    (Layer 6 - infra)
//   Step 4: Split train/validation     (Layer 4 - data)
//   Step 5: Build datasets             (Layer 4 - data)
//   Step 6: Save config                (Layer 6 - infra)
//   Step 7: Run training loop          (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::SentenceDataset,
    embeddings::TextEmbeddings,
    loader::{TsvCorpusLoader, GOLD_LEMMA_LABEL},
    splitter::split_train_val,
};
use crate::domain::traits::{CorpusSource, WordEmbedder};
use crate::infra::{checkpoint::CheckpointManager, dict_store::DictStore};
use crate::ml::model::LemmatizerConfig;
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for inference.
// `embedding_length` is filled in by the use case once the
// embedding file (if any) has been read — the inferencer needs
// it to rebuild the exact architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus_path:     String,
    pub checkpoint_dir:  String,
    pub embeddings_path: Option<String>,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub train_fraction:  f64,
    pub rnn_input_size:  usize,
    pub rnn_hidden_size: usize,
    pub rnn_layers:      usize,
    pub beam_size:       usize,
    pub encode_characters: bool,
    pub use_attention:     bool,
    pub bidirectional_encoding: bool,
    pub padding_in_front_for_encoder: bool,
    pub start_symbol_for_encoding: bool,
    pub end_symbol_for_encoding:   bool,
    pub max_sequence_length: usize,
    pub max_length_dependent_on_input: bool,
    #[serde(default)]
    pub embedding_length: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_path:     "data/corpus.tsv".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            embeddings_path: None,
            batch_size:      32,
            epochs:          10,
            lr:              1e-3,
            train_fraction:  0.8,
            rnn_input_size:  50,
            rnn_hidden_size: 256,
            rnn_layers:      2,
            beam_size:       5,
            encode_characters: true,
            use_attention:     true,
            bidirectional_encoding: false,
            padding_in_front_for_encoder: false,
            start_symbol_for_encoding: true,
            end_symbol_for_encoding:   false,
            max_sequence_length: 20,
            max_length_dependent_on_input: true,
            embedding_length: 0,
        }
    }
}

impl TrainConfig {
    /// The model architecture this training run describes.
    /// Shared by the trainer and the inferencer so both always
    /// build the same network.
    pub fn model_config(&self) -> LemmatizerConfig {
        LemmatizerConfig::new(
            self.rnn_input_size,
            self.rnn_hidden_size,
            self.rnn_layers,
            GOLD_LEMMA_LABEL.to_string(),
        )
        .with_beam_size(self.beam_size)
        .with_encode_characters(self.encode_characters)
        .with_use_attention(self.use_attention)
        .with_bidirectional_encoding(self.bidirectional_encoding)
        .with_padding_in_front_for_encoder(self.padding_in_front_for_encoder)
        .with_start_symbol_for_encoding(self.start_symbol_for_encoding)
        .with_end_symbol_for_encoding(self.end_symbol_for_encoding)
        .with_max_sequence_length(self.max_sequence_length)
        .with_max_length_dependent_on_input(self.max_length_dependent_on_input)
        .with_embedding_length(self.embedding_length)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let mut cfg = self.config.clone();

        // ── Step 1: Load the labelled corpus ─────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.corpus_path);
        let loader = TsvCorpusLoader::new(&cfg.corpus_path);
        let mut sentences = loader.load_all()?;
        let word_count: usize = sentences.iter().map(|s| s.len()).sum();
        tracing::info!("Loaded {} sentences ({} words)", sentences.len(), word_count);

        // ── Step 2: Attach pretrained word vectors (optional) ────────────────
        // When an embedding file is given, every word carries a
        // fixed vector into the encoder; its length becomes part
        // of the persisted architecture.
        if let Some(path) = &cfg.embeddings_path {
            tracing::info!("Loading word embeddings from '{}'", path);
            let embedder = TextEmbeddings::load(path)?;
            embedder.embed(&mut sentences)?;
            cfg.embedding_length = embedder.embedding_length();
            tracing::info!("Embeddings attached (dim={})", cfg.embedding_length);
        }

        // ── Step 3: Build / load the character dictionary ────────────────────
        // If a dictionary snapshot already exists in the
        // checkpoint directory, reuse it so resumed runs keep
        // their index space.
        let dict_store = DictStore::new(&cfg.checkpoint_dir);
        let dict = dict_store.load_or_build(&sentences)?;
        tracing::info!("Character dictionary ready ({} items)", dict.len());

        // ── Step 4: Train / validation split ─────────────────────────────────
        // Shuffle and split so the model is evaluated on unseen data
        let (train_sentences, val_sentences) = split_train_val(sentences, cfg.train_fraction);
        tracing::info!(
            "Split: {} train, {} validation",
            train_sentences.len(),
            val_sentences.len()
        );

        // ── Step 5: Build datasets ───────────────────────────────────────────
        // Empty sentences are dropped here; they carry no words
        // to train on.
        let train_dataset = SentenceDataset::new(train_sentences);
        let val_dataset   = SentenceDataset::new(val_sentences);

        // ── Step 6: Save config for inference ────────────────────────────────
        // The inferencer needs to know the model architecture to rebuild it
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(&cfg)?;

        // ── Step 7: Run training loop (Layer 5) ──────────────────────────────
        run_training(&cfg, train_dataset, val_dataset, ckpt_manager, dict)?;

        Ok(())
    }
}
