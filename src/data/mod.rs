// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw corpus files and the model:
//
//   corpus file (TSV)
//       │
//       ▼
//   TsvCorpusLoader   → parses form/lemma columns into Sentences
//       │
//       ▼
//   TextEmbeddings    → optional pretrained word vectors
//       │
//       ▼
//   CharDictionary    → characters ↔ indices, index matrices
//       │
//       ▼
//   SentenceDataset   → shuffling and mini-batch slices
//       │
//       ▼
//   training loop / beam search (Layer 5)
//
// Unlike token-level models there is no subword tokenizer here:
// the vocabulary is the set of characters seen in the corpus,
// plus four reserved symbols. Index-matrix construction depends
// on model flags (start/end symbols, padding side), so the
// tensors themselves are built inside Layer 5 from the
// IndexMatrix values produced here.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Character ↔ index dictionary and index-matrix encoding
pub mod char_dict;

/// Loads form/lemma sentences from TSV corpus files
pub mod loader;

/// Word2vec-style text-format word embeddings
pub mod embeddings;

/// Sentence container with shuffling and mini-batch slices
pub mod dataset;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
