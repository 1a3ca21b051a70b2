// ============================================================
// Layer 5 — Lemmatizer Model
// ============================================================
// Character-level encoder/decoder:
//
//   encoder — embeds the characters of each word and runs them
//             through a (optionally bidirectional) GRU stack;
//             and/or broadcasts a pretrained word vector across
//             the decoder layers. The sources are concatenated
//             and projected to the decoder hidden size by one
//             learned linear map.
//
//   decoder — a GRU stack advanced one character at a time.
//             Each step embeds the previous output character,
//             updates the state, optionally attends over the
//             encoder context states, and projects to logits
//             over the full character vocabulary. The step
//             itself never masks illegal symbols — suppressing
//             the padding/start logits during inference is the
//             beam search's contract.
//
// Training is teacher-forced: the decoder always receives the
// true previous gold character. Inference goes through the
// BeamSearch in beam.rs via `predict`.
//
// Reference: Burn Book §3 (Building Blocks)
//            Bahdanau et al. (2015) Neural Machine Translation

use anyhow::{bail, Result};
use burn::{
    module::Ignored,
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::data::char_dict::{CharDictionary, EncodeOptions, IndexMatrix, SpecialSymbols};
use crate::domain::sentence::{Sentence, Word};
use crate::ml::attention;
use crate::ml::beam::BeamSearch;
use crate::ml::loss;
use crate::ml::rnn::{StackedGru, StackedGruConfig};

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LemmatizerConfig {
    /// Character embedding size fed to both GRU stacks
    pub rnn_input_size: usize,
    /// Hidden state size of encoder and decoder GRUs
    pub rnn_hidden_size: usize,
    /// Number of stacked GRU layers
    pub rnn_layers: usize,
    /// Label name carrying the gold lemma
    pub label_type: String,

    #[config(default = 5)]
    pub beam_size: usize,
    #[config(default = true)]
    pub encode_characters: bool,
    #[config(default = true)]
    pub use_attention: bool,
    #[config(default = false)]
    pub bidirectional_encoding: bool,
    /// Padding side for the encoder input matrix
    #[config(default = false)]
    pub padding_in_front_for_encoder: bool,
    #[config(default = true)]
    pub start_symbol_for_encoding: bool,
    #[config(default = false)]
    pub end_symbol_for_encoding: bool,
    /// Fixed decoding cap when not dependent on input
    #[config(default = 20)]
    pub max_sequence_length: usize,
    /// Derive the cap per call as longest word + 1
    #[config(default = true)]
    pub max_length_dependent_on_input: bool,
    /// Length of pretrained word vectors; 0 disables the
    /// external-representation encoding path
    #[config(default = 0)]
    pub embedding_length: usize,
}

/// Hyperparameters the numeric code consults at run time.
/// Kept in one Ignored block so the Module derive only sees
/// learnable components.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub beam_size: usize,
    pub rnn_layers: usize,
    pub rnn_hidden_size: usize,
    pub embedding_length: usize,
    pub max_sequence_length: usize,
    pub max_length_dependent_on_input: bool,
    pub use_attention: bool,
    pub encode_characters: bool,
    pub bidirectional_encoding: bool,
    pub start_symbol_for_encoding: bool,
    pub end_symbol_for_encoding: bool,
    pub padding_in_front_for_encoder: bool,
    pub label_type: String,
}

// ─── Encoder output ───────────────────────────────────────────────────────────
/// Per-character encoder states for one batch, plus the mask
/// marking padded positions (true = padding).
#[derive(Debug, Clone)]
pub struct EncoderContexts<B: Backend> {
    /// [batch, src_len, hidden], padded positions zeroed
    pub states: Tensor<B, 3>,
    /// [batch, src_len]
    pub pad_mask: Tensor<B, 2, Bool>,
}

/// Everything the decoder needs from one encoder pass.
#[derive(Debug, Clone)]
pub struct EncoderState<B: Backend> {
    /// Initial decoder state, [layers, batch, hidden]
    pub hidden: Tensor<B, 3>,
    /// Present only when character encoding is enabled
    pub contexts: Option<EncoderContexts<B>>,
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct LemmatizerModel<B: Backend> {
    encoder_embedding: Option<Embedding<B>>,
    encoder_fwd: Option<StackedGru<B>>,
    encoder_bwd: Option<StackedGru<B>>,
    /// Projects bidirectional context states (2·hidden) back to
    /// the decoder hidden size
    bi_context_proj: Option<Linear<B>>,
    /// Projects the concatenated initial-state sources to the
    /// decoder hidden size
    emb_to_hidden: Linear<B>,
    decoder_embedding: Embedding<B>,
    decoder_rnn: StackedGru<B>,
    /// Output projection to vocabulary logits; input width is
    /// doubled when attention is on
    character_decoder: Linear<B>,
    char_dict: Ignored<CharDictionary>,
    symbols: Ignored<SpecialSymbols>,
    settings: Ignored<ModelSettings>,
}

impl LemmatizerConfig {
    /// Builder-style setter for the required `rnn_layers` field,
    /// matching the `with_*` setters the Config derive generates
    /// for defaulted fields.
    pub fn with_rnn_layers(mut self, rnn_layers: usize) -> Self {
        self.rnn_layers = rnn_layers;
        self
    }

    /// Build the model over a character dictionary.
    ///
    /// Fails if the dictionary has no unknown symbol or if both
    /// encoding sources are disabled — these are configuration
    /// errors, not runtime conditions. The three special symbols
    /// are appended to the dictionary here, once, in fixed order.
    pub fn init<B: Backend>(
        &self,
        mut dict: CharDictionary,
        device: &B::Device,
    ) -> Result<LemmatizerModel<B>> {
        if !dict.has_unknown() {
            bail!("character dictionary must contain the unknown symbol '<unk>'");
        }
        if !self.encode_characters && self.embedding_length == 0 {
            bail!(
                "no encoding source: enable character encoding or configure \
                 a pretrained embedding length"
            );
        }

        let symbols = dict.ensure_special_symbols();
        let vocab = dict.len();
        // attention only makes sense over character context states
        let use_attention = self.use_attention && self.encode_characters;
        let bidirectional = self.bidirectional_encoding && self.encode_characters;
        let hidden = self.rnn_hidden_size;

        let (encoder_embedding, encoder_fwd) = if self.encode_characters {
            (
                Some(EmbeddingConfig::new(vocab, self.rnn_input_size).init(device)),
                Some(
                    StackedGruConfig::new(self.rnn_input_size, hidden, self.rnn_layers)
                        .init(device),
                ),
            )
        } else {
            (None, None)
        };

        let (encoder_bwd, bi_context_proj) = if bidirectional {
            (
                Some(
                    StackedGruConfig::new(self.rnn_input_size, hidden, self.rnn_layers)
                        .init(device),
                ),
                Some(LinearConfig::new(2 * hidden, hidden).init(device)),
            )
        } else {
            (None, None)
        };

        let mut hidden_input_size = 0;
        if self.encode_characters {
            hidden_input_size += hidden;
        }
        if bidirectional {
            hidden_input_size += hidden;
        }
        if self.embedding_length > 0 {
            hidden_input_size += self.embedding_length;
        }

        let decoder_out_width = if use_attention { 2 * hidden } else { hidden };

        Ok(LemmatizerModel {
            encoder_embedding,
            encoder_fwd,
            encoder_bwd,
            bi_context_proj,
            emb_to_hidden: LinearConfig::new(hidden_input_size, hidden).init(device),
            decoder_embedding: EmbeddingConfig::new(vocab, self.rnn_input_size).init(device),
            decoder_rnn: StackedGruConfig::new(self.rnn_input_size, hidden, self.rnn_layers)
                .init(device),
            character_decoder: LinearConfig::new(decoder_out_width, vocab).init(device),
            char_dict: Ignored(dict),
            symbols: Ignored(symbols),
            settings: Ignored(ModelSettings {
                beam_size: self.beam_size.max(1),
                rnn_layers: self.rnn_layers,
                rnn_hidden_size: hidden,
                embedding_length: self.embedding_length,
                max_sequence_length: self.max_sequence_length,
                max_length_dependent_on_input: self.max_length_dependent_on_input,
                use_attention,
                encode_characters: self.encode_characters,
                bidirectional_encoding: bidirectional,
                start_symbol_for_encoding: self.start_symbol_for_encoding,
                end_symbol_for_encoding: self.end_symbol_for_encoding,
                padding_in_front_for_encoder: self.padding_in_front_for_encoder,
                label_type: self.label_type.clone(),
            }),
        })
    }
}

/// Lift an IndexMatrix onto the device as an Int tensor.
pub fn index_tensor<B: Backend>(matrix: &IndexMatrix, device: &B::Device) -> Tensor<B, 2, Int> {
    let flat = matrix.to_i32_vec();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([matrix.rows(), matrix.cols()])
}

impl<B: Backend> LemmatizerModel<B> {
    pub fn device(&self) -> B::Device {
        self.decoder_embedding.weight.val().device()
    }

    pub fn char_dict(&self) -> &CharDictionary {
        &self.char_dict
    }

    pub fn symbols(&self) -> &SpecialSymbols {
        &self.symbols
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Gold target string for a word: its lemma label, or the
    /// word's own text when no label is present (documented
    /// pseudo-gold fallback).
    pub fn gold_target(&self, word: &Word) -> String {
        word.label(&self.settings.label_type)
            .filter(|l| !l.is_empty())
            .unwrap_or(word.text())
            .to_string()
    }

    // ─── Encoder ──────────────────────────────────────────────────────────────
    /// Encode a batch of words into one EncoderState.
    pub fn encode(&self, words: &[Word]) -> Result<EncoderState<B>> {
        if words.is_empty() {
            bail!("cannot encode an empty batch of words");
        }
        let device = self.device();
        let n = words.len();
        let mut initial_parts: Vec<Tensor<B, 3>> = Vec::with_capacity(2);
        let mut contexts = None;

        if let (Some(embedding), Some(fwd)) = (&self.encoder_embedding, &self.encoder_fwd) {
            let texts: Vec<&str> = words.iter().map(|w| w.text()).collect();
            let matrix = self.char_dict.encode_words(
                &texts,
                &self.symbols,
                EncodeOptions {
                    start_symbol: self.settings.start_symbol_for_encoding,
                    end_symbol: self.settings.end_symbol_for_encoding,
                    pad_front: self.settings.padding_in_front_for_encoder,
                    min_length: None,
                },
            );
            let indices = index_tensor::<B>(&matrix, &device);

            // 1.0 at real character positions, 0.0 at padding
            let real = indices
                .clone()
                .equal_elem(self.symbols.padding as i32)
                .bool_not();
            let seq_mask = real.clone().float();

            let char_vectors = embedding.forward(indices);
            let (fwd_out, fwd_final) =
                fwd.forward_sequence(char_vectors.clone(), Some(&seq_mask), false);

            let (ctx, final_hidden) =
                if let (Some(bwd), Some(proj)) = (&self.encoder_bwd, &self.bi_context_proj) {
                    let (bwd_out, bwd_final) =
                        bwd.forward_sequence(char_vectors, Some(&seq_mask), true);
                    // context states projected back to hidden size,
                    // final direction states concatenated per layer
                    let ctx = proj.forward(Tensor::cat(vec![fwd_out, bwd_out], 2));
                    let hidden = Tensor::cat(vec![fwd_final, bwd_final], 2);
                    (ctx, hidden)
                } else {
                    (fwd_out, fwd_final)
                };

            // zero padded positions so they contribute nothing to
            // attention's weighted sum
            let keep: Tensor<B, 3> = seq_mask.unsqueeze_dim(2);
            contexts = Some(EncoderContexts {
                states: ctx * keep,
                pad_mask: real.bool_not(),
            });
            initial_parts.push(final_hidden);
        }

        if self.settings.embedding_length > 0 {
            let dim = self.settings.embedding_length;
            let mut flat = Vec::with_capacity(n * dim);
            for word in words {
                match word.embedding() {
                    Some(v) if v.len() == dim => flat.extend_from_slice(v),
                    Some(v) => bail!(
                        "word '{}' has embedding length {}, expected {}",
                        word.text(),
                        v.len(),
                        dim
                    ),
                    // missing vector degrades to zeros
                    None => flat.extend(std::iter::repeat(0.0).take(dim)),
                }
            }
            let vectors = Tensor::<B, 1>::from_floats(flat.as_slice(), &device).reshape([n, dim]);
            // broadcast across all decoder layers
            let broadcast: Tensor<B, 3> =
                Tensor::stack(vec![vectors; self.settings.rnn_layers], 0);
            initial_parts.push(broadcast);
        }

        let hidden = self.emb_to_hidden.forward(Tensor::cat(initial_parts, 2));
        Ok(EncoderState { hidden, contexts })
    }

    // ─── Decoder ──────────────────────────────────────────────────────────────
    /// One decoder step for a batch of slots.
    ///
    /// inputs: [slots] character indices
    /// state:  [layers, slots, hidden]
    ///
    /// Returns (logits [slots, vocab], new state). Logits are
    /// unmasked — see module header.
    pub fn decode_step(
        &self,
        inputs: Tensor<B, 1, Int>,
        state: Tensor<B, 3>,
        contexts: Option<&EncoderContexts<B>>,
    ) -> (Tensor<B, 2>, Tensor<B, 3>) {
        let [slots] = inputs.dims();
        let vectors = self
            .decoder_embedding
            .forward(inputs.reshape([slots, 1]))
            .flatten::<2>(0, 1);

        let (output, new_state) = self.decoder_rnn.step(vectors, state, None);

        let output = match contexts {
            Some(ctx) if self.settings.use_attention => {
                let summary =
                    attention::attend(ctx.states.clone(), ctx.pad_mask.clone(), output.clone());
                Tensor::cat(vec![output, summary], 1)
            }
            _ => output,
        };

        (self.character_decoder.forward(output), new_state)
    }

    /// Teacher-forced decode of a whole input matrix.
    ///
    /// inputs: [batch, seq] — gold characters shifted right
    /// behind a start symbol.
    ///
    /// Returns logits [batch, seq, vocab].
    pub fn decode_sequence(
        &self,
        inputs: Tensor<B, 2, Int>,
        state: Tensor<B, 3>,
        contexts: Option<&EncoderContexts<B>>,
    ) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let [batch, seq_len] = inputs.dims();
        let mut state = state;
        let mut steps = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let input_t = inputs
                .clone()
                .slice([0..batch, t..t + 1])
                .reshape([batch]);
            let (logits, next) = self.decode_step(input_t, state, contexts);
            state = next;
            steps.push(logits);
        }

        let logits: Tensor<B, 3> = Tensor::stack(steps, 1);
        (logits, state)
    }

    // ─── Training loss ────────────────────────────────────────────────────────
    /// Mean per-character cross-entropy over all words of the
    /// given sentences, teacher-forced.
    pub fn forward_loss(&self, sentences: &[Sentence]) -> Result<Tensor<B, 1>> {
        let words: Vec<Word> = sentences
            .iter()
            .flat_map(|s| s.words().iter().cloned())
            .collect();
        if words.is_empty() {
            bail!("cannot compute a loss over zero words");
        }

        let enc = self.encode(&words)?;

        let labels: Vec<String> = words.iter().map(|w| self.gold_target(w)).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();

        // decoder sees <S> + lemma, must produce lemma + <E>;
        // both matrices share the row length max(lemma) + 1
        let input_matrix = self.char_dict.encode_words(
            &refs,
            &self.symbols,
            EncodeOptions {
                start_symbol: true,
                end_symbol: false,
                pad_front: false,
                min_length: None,
            },
        );
        let target_matrix = self.char_dict.encode_words(
            &refs,
            &self.symbols,
            EncodeOptions {
                start_symbol: false,
                end_symbol: true,
                pad_front: false,
                min_length: None,
            },
        );

        let device = self.device();
        let inputs = index_tensor::<B>(&input_matrix, &device);
        let targets = index_tensor::<B>(&target_matrix, &device);

        let (logits, _) = self.decode_sequence(inputs, enc.hidden, enc.contexts.as_ref());
        Ok(loss::mean(logits, targets))
    }

    // ─── Prediction ───────────────────────────────────────────────────────────
    /// Beam-search lemma prediction for every word, written in
    /// place under `opts.label_name`. Empty sentences pass
    /// through untouched. Returns `(total_loss, token_count)`
    /// when `opts.return_loss` is set.
    pub fn predict(
        &self,
        sentences: &mut [Sentence],
        opts: &PredictOptions,
    ) -> Result<Option<(f64, usize)>> {
        let beam_size = opts.beam_size.unwrap_or(self.settings.beam_size).max(1);

        let mut non_empty: Vec<&mut Sentence> =
            sentences.iter_mut().filter(|s| !s.is_empty()).collect();
        if non_empty.is_empty() {
            return Ok(opts.return_loss.then_some((0.0, 0)));
        }

        // the cap is shared by the whole call, not per batch
        let max_length = if self.settings.max_length_dependent_on_input {
            non_empty
                .iter()
                .flat_map(|s| s.words().iter())
                .map(|w| w.char_len() + 1)
                .max()
                .unwrap_or(self.settings.max_sequence_length)
        } else {
            self.settings.max_sequence_length
        };

        let search = BeamSearch::new(self, beam_size, max_length);
        let mut total_loss = 0.0f64;
        let mut total_tokens = 0usize;

        for batch in non_empty.chunks_mut(opts.mini_batch_size.max(1)) {
            let words: Vec<Word> = batch
                .iter()
                .flat_map(|s| s.words().iter().cloned())
                .collect();
            total_tokens += words.len();

            let targets = if opts.return_loss {
                let labels: Vec<String> = words.iter().map(|w| self.gold_target(w)).collect();
                let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                Some(self.char_dict.encode_words(
                    &refs,
                    &self.symbols,
                    EncodeOptions {
                        start_symbol: false,
                        end_symbol: true,
                        pad_front: false,
                        min_length: Some(max_length),
                    },
                ))
            } else {
                None
            };

            let decoded = search.run(&words, targets.as_ref())?;
            let mut decoded = decoded.into_iter();

            for sentence in batch.iter_mut() {
                for word in sentence.words_mut() {
                    let Some(result) = decoded.next() else {
                        bail!("beam search returned fewer results than words");
                    };
                    let lemma: String = result
                        .indices
                        .iter()
                        .map(|&i| self.char_dict.char_of(i))
                        .collect();
                    word.remove_label(opts.label_name.as_str());
                    word.set_label(opts.label_name.as_str(), lemma);
                    total_loss += f64::from(result.loss);
                }
            }
        }

        Ok(opts.return_loss.then_some((total_loss, total_tokens)))
    }
}

/// Knobs for one `predict` call.
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Label name the prediction is stored under
    pub label_name: String,
    /// Sentences per beam-search batch
    pub mini_batch_size: usize,
    /// Overrides the model's configured beam size
    pub beam_size: Option<usize>,
    /// Also accumulate diagnostic loss against gold lemmas
    pub return_loss: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            label_name: "predicted".to_string(),
            mini_batch_size: 16,
            beam_size: None,
            return_loss: false,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentence::{Sentence, Word};

    type TB = burn::backend::NdArray;

    fn dict() -> CharDictionary {
        let mut dict = CharDictionary::new();
        dict.ensure_special_symbols();
        for ch in "abc".chars() {
            dict.add_item(ch.to_string());
        }
        dict
    }

    fn small_config() -> LemmatizerConfig {
        LemmatizerConfig::new(4, 8, 1, "lemma".to_string()).with_beam_size(2)
    }

    fn words(texts: &[&str]) -> Vec<Word> {
        texts.iter().map(|t| Word::new(*t)).collect()
    }

    #[test]
    fn test_init_rejects_configuration_without_encoder_source() {
        let cfg = small_config()
            .with_encode_characters(false)
            .with_embedding_length(0);
        assert!(cfg.init::<TB>(dict(), &Default::default()).is_err());
    }

    #[test]
    fn test_encode_shapes() {
        let device = Default::default();
        let model = small_config().init::<TB>(dict(), &device).unwrap();
        let state = model.encode(&words(&["ab", "c"])).unwrap();
        assert_eq!(state.hidden.dims(), [1, 2, 8]);
        let ctx = state.contexts.unwrap();
        // longest word (2) + start symbol (1) = 3 columns
        assert_eq!(ctx.states.dims(), [2, 3, 8]);
        assert_eq!(ctx.pad_mask.dims(), [2, 3]);
    }

    #[test]
    fn test_bidirectional_encode_shapes() {
        let device = Default::default();
        let model = small_config()
            .with_bidirectional_encoding(true)
            .with_rnn_layers(2)
            .init::<TB>(dict(), &device)
            .unwrap();
        let state = model.encode(&words(&["abc"])).unwrap();
        assert_eq!(state.hidden.dims(), [2, 1, 8]);
        assert_eq!(state.contexts.unwrap().states.dims(), [1, 4, 8]);
    }

    #[test]
    fn test_embedding_only_encoder() {
        let device = Default::default();
        let model = small_config()
            .with_encode_characters(false)
            .with_embedding_length(3)
            .init::<TB>(dict(), &device)
            .unwrap();
        let mut word = Word::new("ab");
        word.set_embedding(vec![0.1, 0.2, 0.3]);
        let state = model.encode(&[word]).unwrap();
        assert_eq!(state.hidden.dims(), [1, 1, 8]);
        assert!(state.contexts.is_none());
    }

    #[test]
    fn test_forward_loss_is_finite() {
        let device = Default::default();
        let model = small_config().init::<TB>(dict(), &device).unwrap();
        let sentences = vec![Sentence::new(vec![
            Word::with_label("abc", "lemma", "ab"),
            Word::with_label("ba", "lemma", "b"),
        ])];
        let loss: f32 = model.forward_loss(&sentences).unwrap().into_scalar().elem();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn test_predict_annotates_in_place() {
        let device = Default::default();
        let model = small_config().init::<TB>(dict(), &device).unwrap();
        let mut sentences = vec![
            Sentence::new(vec![Word::new("ab"), Word::new("c")]),
            Sentence::default(),
        ];
        let loss = model
            .predict(&mut sentences, &PredictOptions::default())
            .unwrap();
        assert!(loss.is_none());
        for word in sentences[0].words() {
            let label = word.label("predicted").unwrap();
            assert!(!label.is_empty());
        }
        // empty sentence passed through untouched
        assert!(sentences[1].is_empty());
    }

    #[test]
    fn test_predict_with_loss_counts_tokens() {
        let device = Default::default();
        let model = small_config().init::<TB>(dict(), &device).unwrap();
        let mut sentences = vec![Sentence::new(vec![
            Word::with_label("ab", "lemma", "a"),
            // no gold label: falls back to the word's own text
            Word::new("cb"),
        ])];
        let opts = PredictOptions {
            return_loss: true,
            ..PredictOptions::default()
        };
        let (loss, tokens) = model.predict(&mut sentences, &opts).unwrap().unwrap();
        assert_eq!(tokens, 2);
        assert!(loss.is_finite());
        assert!(loss >= 0.0);
    }
}
