// ============================================================
// Layer 4 — Character Dictionary
// ============================================================
// Bidirectional mapping between characters and integer indices.
//
// Four entries are reserved:
//   <unk> — unknown characters (must exist before a model is
//           built on top of this dictionary)
//   <>    — padding / dummy symbol
//   <S>   — start of sequence
//   <E>   — end of sequence
//
// The three special symbols <> / <S> / <E> are appended in that
// fixed order if absent, and their indices are recorded once in
// a SpecialSymbols struct. Nothing ever depends on map iteration
// order for index assignment.
//
// `encode_words` turns a list of strings into an IndexMatrix —
// the (word-count × sequence-length) block of character indices
// that the encoder and decoder consume. Padding side, start/end
// insertion and a minimum row length are caller-controlled.
//
// Reference: Rust Book §8 (HashMaps, Strings)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const UNK_SYMBOL: &str = "<unk>";
pub const PADDING_SYMBOL: &str = "<>";
pub const START_SYMBOL: &str = "<S>";
pub const END_SYMBOL: &str = "<E>";

// ─── SpecialSymbols ───────────────────────────────────────────────────────────
/// Recorded indices of the three reserved non-unknown symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialSymbols {
    pub padding: usize,
    pub start: usize,
    pub end: usize,
}

// ─── EncodeOptions ────────────────────────────────────────────────────────────
/// How `encode_words` lays out each row of the IndexMatrix.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// Insert <S> immediately before the text
    pub start_symbol: bool,
    /// Insert <E> immediately after the text
    pub end_symbol: bool,
    /// Put padding before the content instead of after it
    pub pad_front: bool,
    /// Rows are at least this long (padding fills the rest)
    pub min_length: Option<usize>,
}

// ─── IndexMatrix ──────────────────────────────────────────────────────────────
/// A dense (rows × cols) block of character indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMatrix {
    rows: usize,
    cols: usize,
    data: Vec<usize>,
}

impl IndexMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> usize {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[usize] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Flat row-major copy in the integer type burn tensors take.
    pub fn to_i32_vec(&self) -> Vec<i32> {
        self.data.iter().map(|&v| v as i32).collect()
    }
}

// ─── CharDictionary ───────────────────────────────────────────────────────────
/// The character vocabulary. Immutable during model use except
/// for the one-time appension of the three special symbols.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharDictionary {
    items: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    unk_index: usize,
}

impl CharDictionary {
    /// A dictionary containing only <unk>.
    pub fn new() -> Self {
        let mut dict = Self {
            items: Vec::new(),
            index: HashMap::new(),
            unk_index: 0,
        };
        dict.unk_index = dict.add_item(UNK_SYMBOL);
        dict
    }

    /// Rebuild from a snapshot of items (e.g. a JSON file).
    /// Fails if the snapshot does not define the unknown symbol.
    pub fn from_items(items: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            index.entry(item.clone()).or_insert(i);
        }
        let Some(&unk_index) = index.get(UNK_SYMBOL) else {
            bail!("character dictionary snapshot does not contain '{UNK_SYMBOL}'");
        };
        Ok(Self { items, index, unk_index })
    }

    /// Build a dictionary from every character of every word in
    /// the given sentences, special symbols included.
    pub fn from_sentences(sentences: &[crate::domain::sentence::Sentence]) -> Self {
        let mut dict = Self::new();
        dict.ensure_special_symbols();
        for sentence in sentences {
            for word in sentence.words() {
                for ch in word.text().chars() {
                    dict.add_item(ch.to_string());
                }
            }
        }
        dict
    }

    /// Add an item if absent; returns its index either way.
    pub fn add_item(&mut self, item: impl Into<String>) -> usize {
        let item = item.into();
        if let Some(&idx) = self.index.get(&item) {
            return idx;
        }
        let idx = self.items.len();
        self.index.insert(item.clone(), idx);
        self.items.push(item);
        idx
    }

    /// Append <> / <S> / <E> if absent and record their indices.
    /// Deterministic: appension order is fixed, indices come from
    /// the item list, never from map iteration.
    pub fn ensure_special_symbols(&mut self) -> SpecialSymbols {
        SpecialSymbols {
            padding: self.add_item(PADDING_SYMBOL),
            start: self.add_item(START_SYMBOL),
            end: self.add_item(END_SYMBOL),
        }
    }

    pub fn has_unknown(&self) -> bool {
        self.index.contains_key(UNK_SYMBOL)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of a character, or the unknown index if absent.
    pub fn index_of(&self, item: &str) -> usize {
        self.index.get(item).copied().unwrap_or(self.unk_index)
    }

    /// The string form of an index. Out-of-range indices map to
    /// the unknown symbol rather than panicking.
    pub fn char_of(&self, index: usize) -> &str {
        self.items
            .get(index)
            .map(String::as_str)
            .unwrap_or(UNK_SYMBOL)
    }

    /// Snapshot of the item list for persistence.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    // ─── encode_words ─────────────────────────────────────────────────────────
    /// Build the index matrix for a list of words.
    ///
    /// Row length is `max(min_length, longest word + inserted
    /// symbols)`, and at least 1 so that zero-length input still
    /// yields a well-formed matrix. Unused cells hold the padding
    /// index; <S> goes immediately before the text and <E>
    /// immediately after, the whole block shifted to the row end
    /// when `pad_front` is set.
    pub fn encode_words(
        &self,
        words: &[&str],
        symbols: &SpecialSymbols,
        opts: EncodeOptions,
    ) -> IndexMatrix {
        let extra = usize::from(opts.start_symbol) + usize::from(opts.end_symbol);

        let longest = words
            .iter()
            .map(|w| w.chars().count() + extra)
            .max()
            .unwrap_or(0);
        let cols = longest.max(opts.min_length.unwrap_or(0)).max(1);

        let mut data = vec![symbols.padding; words.len() * cols];

        for (row, word) in words.iter().enumerate() {
            let len = word.chars().count();
            let shift = if opts.pad_front { cols - (len + extra) } else { 0 };
            let start_offset = usize::from(opts.start_symbol);
            let base = row * cols + shift;

            if opts.start_symbol {
                data[base] = symbols.start;
            }
            for (i, ch) in word.chars().enumerate() {
                data[base + start_offset + i] = self.index_of(&ch.to_string());
            }
            if opts.end_symbol {
                data[base + start_offset + len] = symbols.end;
            }
        }

        IndexMatrix {
            rows: words.len(),
            cols,
            data,
        }
    }

    /// Restore the lookup map after deserialization (serde skips
    /// the HashMap; the item list is the source of truth).
    pub fn rebuild_index(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.clone(), i))
            .collect();
    }
}

impl Default for CharDictionary {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn dict_with(text: &str) -> (CharDictionary, SpecialSymbols) {
        let mut dict = CharDictionary::new();
        let symbols = dict.ensure_special_symbols();
        for ch in text.chars() {
            dict.add_item(ch.to_string());
        }
        (dict, symbols)
    }

    #[test]
    fn test_round_trip() {
        let (dict, _) = dict_with("abc");
        for ch in "abccba".chars() {
            let s = ch.to_string();
            assert_eq!(dict.char_of(dict.index_of(&s)), s);
        }
    }

    #[test]
    fn test_unknown_fallback() {
        let (dict, _) = dict_with("ab");
        assert_eq!(dict.char_of(dict.index_of("z")), UNK_SYMBOL);
        // out-of-range index also degrades to <unk>
        assert_eq!(dict.char_of(9999), UNK_SYMBOL);
    }

    #[test]
    fn test_special_symbols_are_stable() {
        let (mut dict, symbols) = dict_with("ab");
        // a second appension must not move anything
        let again = dict.ensure_special_symbols();
        assert_eq!(symbols, again);
        assert_eq!(dict.index_of(PADDING_SYMBOL), symbols.padding);
        assert_eq!(dict.index_of(START_SYMBOL), symbols.start);
        assert_eq!(dict.index_of(END_SYMBOL), symbols.end);
    }

    #[test]
    fn test_missing_unknown_is_rejected() {
        let result = CharDictionary::from_items(vec!["a".into(), "b".into()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_padding_goes_to_the_row_end() {
        let (dict, sym) = dict_with("abc");
        let m = dict.encode_words(
            &["ab", "c"],
            &sym,
            EncodeOptions {
                start_symbol: true,
                end_symbol: true,
                pad_front: false,
                min_length: None,
            },
        );
        assert_eq!((m.rows(), m.cols()), (2, 4));
        let a = dict.index_of("a");
        let b = dict.index_of("b");
        let c = dict.index_of("c");
        assert_eq!(m.row(0), &[sym.start, a, b, sym.end]);
        assert_eq!(m.row(1), &[sym.start, c, sym.end, sym.padding]);
    }

    #[test]
    fn test_padding_in_front_shifts_content() {
        let (dict, sym) = dict_with("abc");
        let m = dict.encode_words(
            &["ab", "c"],
            &sym,
            EncodeOptions {
                start_symbol: true,
                end_symbol: false,
                pad_front: true,
                min_length: None,
            },
        );
        let c = dict.index_of("c");
        assert_eq!(m.row(1), &[sym.padding, sym.start, c]);
    }

    #[test]
    fn test_min_length_extends_rows() {
        let (dict, sym) = dict_with("a");
        let m = dict.encode_words(
            &["a"],
            &sym,
            EncodeOptions {
                start_symbol: false,
                end_symbol: true,
                pad_front: false,
                min_length: Some(6),
            },
        );
        assert_eq!(m.cols(), 6);
        assert_eq!(m.get(0, 0), dict.index_of("a"));
        assert_eq!(m.get(0, 1), sym.end);
        assert_eq!(m.get(0, 5), sym.padding);
    }

    #[test]
    fn test_empty_word_yields_one_padding_column() {
        let (dict, sym) = dict_with("a");
        let m = dict.encode_words(
            &[""],
            &sym,
            EncodeOptions {
                start_symbol: false,
                end_symbol: false,
                pad_front: false,
                min_length: None,
            },
        );
        assert_eq!((m.rows(), m.cols()), (1, 1));
        assert_eq!(m.get(0, 0), sym.padding);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut dict, sym) = dict_with("xy");
        dict.rebuild_index();
        let restored = CharDictionary::from_items(dict.items().to_vec()).unwrap();
        assert_eq!(restored.len(), dict.len());
        assert_eq!(restored.index_of("x"), dict.index_of("x"));
        assert_eq!(restored.index_of(END_SYMBOL), sym.end);
    }
}
