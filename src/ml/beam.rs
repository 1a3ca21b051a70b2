// ============================================================
// Layer 5 — Beam Search Decoding
// ============================================================
// Turns encoder states into output character sequences.
//
// Two interchangeable strategies:
//
//   batched    — all words advance in lock-step through a fixed
//                arena of (word × beam) decoder slots. State
//                rows are gathered per step by parent-slot
//                index, so one tensor step serves every
//                hypothesis of every word.
//
//   sequential — one word at a time, each hypothesis carrying
//                its own state tensor. Simpler bookkeeping,
//                used at beam width 1 where the arena brings
//                nothing.
//
// Both produce identical results for the same beam width.
//
// Scoring: a hypothesis accumulates the log-probability of each
// chosen character. When the end symbol is chosen, the sequence
// is finalized with score cum / (len + 1) — length-normalized so
// short and long lemmas compete fairly. Surviving (unfinalized)
// hypotheses are ranked by their raw cumulative score. A word
// whose beam never produces the end symbol within the length cap
// falls back to its best live hypothesis, normalized by the cap.
//
// Candidate characters never include the padding or start
// symbol; the end symbol is handled as finalization, not
// expansion (except in the very first step, where every top-k
// character seeds a hypothesis as-is).
//
// Reference: Sutskever et al. (2014) Sequence to Sequence Learning

use std::cmp::Ordering;

use anyhow::{anyhow, bail, Result};
use burn::prelude::*;
use burn::tensor::activation::log_softmax;

use crate::data::char_dict::IndexMatrix;
use crate::domain::sentence::Word;
use crate::ml::loss;
use crate::ml::model::{EncoderContexts, LemmatizerModel};

/// Decoded output for one word.
#[derive(Debug, Clone)]
pub struct DecodedWord {
    /// Character indices, end symbol excluded
    pub indices: Vec<usize>,
    /// Length-normalized log-probability, ≤ 0
    pub score: f32,
    /// Length-normalized negative log-likelihood against the
    /// gold target; 0.0 when no targets were supplied
    pub loss: f32,
}

/// Live hypothesis in the batched arena. Its decoder state lives
/// in the shared state tensor at the hypothesis' slot.
#[derive(Debug, Clone)]
struct Hypothesis {
    seq: Vec<usize>,
    score: f32,
    loss: f32,
}

/// Live hypothesis in the sequential strategy, state attached.
#[derive(Debug, Clone)]
struct SoloHypothesis<B: Backend> {
    seq: Vec<usize>,
    state: Tensor<B, 3>,
    score: f32,
    loss: f32,
}

/// A finalized candidate sequence.
#[derive(Debug, Clone)]
struct Finalized {
    seq: Vec<usize>,
    score: f32,
    loss: f32,
}

pub struct BeamSearch<'a, B: Backend> {
    model: &'a LemmatizerModel<B>,
    beam_size: usize,
    max_length: usize,
}

impl<'a, B: Backend> BeamSearch<'a, B> {
    pub fn new(model: &'a LemmatizerModel<B>, beam_size: usize, max_length: usize) -> Self {
        // the candidate pool must be able to fill every beam slot
        // with a non-special character
        let cap = model.char_dict().len().saturating_sub(2).max(1);
        Self {
            model,
            beam_size: beam_size.clamp(1, cap),
            max_length: max_length.max(1),
        }
    }

    /// Decode every word. `targets` (rows aligned with `words`,
    /// `max_length` columns, end symbol included) enables the
    /// per-word diagnostic loss.
    pub fn run(&self, words: &[Word], targets: Option<&IndexMatrix>) -> Result<Vec<DecodedWord>> {
        if self.beam_size == 1 {
            self.run_sequential(words, targets)
        } else {
            self.run_batched(words, targets)
        }
    }

    // ─── Batched strategy ─────────────────────────────────────────────────────
    pub fn run_batched(
        &self,
        words: &[Word],
        targets: Option<&IndexMatrix>,
    ) -> Result<Vec<DecodedWord>> {
        let n = words.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let k = self.beam_size;
        let device = self.model.device();
        let sym = *self.model.symbols();
        let skip = [sym.padding, sym.start];

        let enc = self.model.encode(words)?;

        // ── Step 0: one start-symbol step per word seeds k hypotheses each ──
        let starts = vec![sym.start as i32; n];
        let inputs = Tensor::<B, 1, Int>::from_ints(starts.as_slice(), &device);
        let (logits, hidden) = self
            .model
            .decode_step(inputs, enc.hidden.clone(), enc.contexts.as_ref());
        let rows = log_prob_rows(logits)?;

        let mut finalized: Vec<Vec<Finalized>> = vec![Vec::new(); n];
        let mut hyps: Vec<Hypothesis> = Vec::with_capacity(n * k);
        for (w, row) in rows.iter().enumerate() {
            let step_loss = targets.map_or(0.0, |m| loss::nll(row, m.get(w, 0)));
            for (idx, lp) in top_k(row, k, &skip) {
                hyps.push(Hypothesis {
                    seq: vec![idx],
                    score: lp,
                    loss: step_loss,
                });
            }
        }

        // expand encoder output to one slot per (word, beam) pair
        let slot_words: Vec<i32> = (0..n)
            .flat_map(|w| std::iter::repeat(w as i32).take(k))
            .collect();
        let gather = Tensor::<B, 1, Int>::from_ints(slot_words.as_slice(), &device);
        let mut state = hidden.select(1, gather.clone());
        let contexts = enc.contexts.as_ref().map(|c| EncoderContexts {
            states: c.states.clone().select(0, gather.clone()),
            pad_mask: c
                .pad_mask
                .clone()
                .int()
                .select(0, gather)
                .equal_elem(1),
        });

        // ── Lock-step expansion ──
        for t in 1..self.max_length {
            let last_chars: Vec<i32> = hyps
                .iter()
                .map(|h| h.seq.last().copied().unwrap_or(sym.padding) as i32)
                .collect();
            let input_t = Tensor::<B, 1, Int>::from_ints(last_chars.as_slice(), &device);
            let (logits, new_state) = self.model.decode_step(input_t, state, contexts.as_ref());
            let rows = log_prob_rows(logits)?;

            let mut next: Vec<Hypothesis> = Vec::with_capacity(n * k);
            let mut parents: Vec<i32> = Vec::with_capacity(n * k);

            for w in 0..n {
                let target_t = targets.map(|m| m.get(w, t));

                // candidate pool: up to k continuations from each of
                // the word's k slots; end-symbol picks finalize
                // immediately instead of entering the pool
                let mut pool: Vec<(usize, usize, f32)> = Vec::with_capacity(k * k);
                for j in 0..k {
                    let slot = w * k + j;
                    let hyp = &hyps[slot];
                    for (idx, lp) in top_k(&rows[slot], k, &skip) {
                        if idx == sym.end {
                            let norm = (hyp.seq.len() + 1) as f32;
                            let fin_loss = target_t
                                .map_or(0.0, |tg| (hyp.loss + loss::nll(&rows[slot], tg)) / norm);
                            finalized[w].push(Finalized {
                                seq: hyp.seq.clone(),
                                score: (hyp.score + lp) / norm,
                                loss: fin_loss,
                            });
                        } else {
                            pool.push((slot, idx, lp));
                        }
                    }
                }

                // rank the whole pool by raw cumulative score; stable
                // sort keeps the lower slot on ties
                pool.sort_by(|a, b| {
                    let sa = hyps[a.0].score + a.2;
                    let sb = hyps[b.0].score + b.2;
                    sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
                });

                for pick in 0..k {
                    if let Some(&(slot, idx, lp)) = pool.get(pick) {
                        let hyp = &hyps[slot];
                        let step_loss =
                            target_t.map_or(0.0, |tg| loss::nll(&rows[slot], tg));
                        let mut seq = hyp.seq.clone();
                        seq.push(idx);
                        next.push(Hypothesis {
                            seq,
                            score: hyp.score + lp,
                            loss: hyp.loss + step_loss,
                        });
                        parents.push(slot as i32);
                    } else {
                        // pool shortfall (possible only at beam width 1,
                        // when the single slot's sole candidate was the
                        // end symbol): freeze the slot on a dead copy so
                        // the arena keeps its shape. Dead hypotheses can
                        // never outrank a live one.
                        let slot = w * k + pick;
                        let hyp = &hyps[slot];
                        next.push(Hypothesis {
                            seq: hyp.seq.clone(),
                            score: f32::NEG_INFINITY,
                            loss: hyp.loss,
                        });
                        parents.push(slot as i32);
                    }
                }
            }

            let parent_t = Tensor::<B, 1, Int>::from_ints(parents.as_slice(), &device);
            state = new_state.select(1, parent_t);
            hyps = next;
        }

        // ── Winner selection ──
        let mut results = Vec::with_capacity(n);
        for w in 0..n {
            if finalized[w].is_empty() {
                // length cap reached without an end symbol: fall back
                // to the best live hypothesis, normalized by the cap
                let slots = &hyps[w * k..(w + 1) * k];
                let mut best = &slots[0];
                for h in &slots[1..] {
                    if h.score > best.score {
                        best = h;
                    }
                }
                finalized[w].push(Finalized {
                    seq: best.seq.clone(),
                    score: best.score / self.max_length as f32,
                    loss: best.loss / self.max_length as f32,
                });
            }

            let mut candidates = std::mem::take(&mut finalized[w]);
            candidates
                .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            let Some(winner) = candidates.into_iter().next() else {
                bail!("beam search produced no candidate for word '{}'", words[w].text());
            };
            results.push(DecodedWord {
                indices: winner.seq,
                score: winner.score,
                loss: winner.loss,
            });
        }
        Ok(results)
    }

    // ─── Sequential strategy ──────────────────────────────────────────────────
    pub fn run_sequential(
        &self,
        words: &[Word],
        targets: Option<&IndexMatrix>,
    ) -> Result<Vec<DecodedWord>> {
        words
            .iter()
            .enumerate()
            .map(|(w, word)| self.search_single(w, word, targets))
            .collect()
    }

    fn search_single(
        &self,
        w: usize,
        word: &Word,
        targets: Option<&IndexMatrix>,
    ) -> Result<DecodedWord> {
        let k = self.beam_size;
        let device = self.model.device();
        let sym = *self.model.symbols();
        let skip = [sym.padding, sym.start];

        let enc = self.model.encode(std::slice::from_ref(word))?;

        let start = [sym.start as i32];
        let inputs = Tensor::<B, 1, Int>::from_ints(start.as_slice(), &device);
        let (logits, hidden) = self
            .model
            .decode_step(inputs, enc.hidden.clone(), enc.contexts.as_ref());
        let rows = log_prob_rows(logits)?;
        let row = &rows[0];
        let step_loss = targets.map_or(0.0, |m| loss::nll(row, m.get(w, 0)));

        let mut live: Vec<SoloHypothesis<B>> = top_k(row, k, &skip)
            .into_iter()
            .map(|(idx, lp)| SoloHypothesis {
                seq: vec![idx],
                state: hidden.clone(),
                score: lp,
                loss: step_loss,
            })
            .collect();
        let mut finalized: Vec<Finalized> = Vec::new();

        for t in 1..self.max_length {
            let mut pool: Vec<SoloHypothesis<B>> = Vec::with_capacity(live.len() * k);

            for hyp in &live {
                let last = [hyp.seq.last().copied().unwrap_or(sym.padding) as i32];
                let input_t = Tensor::<B, 1, Int>::from_ints(last.as_slice(), &device);
                let (logits, new_state) =
                    self.model
                        .decode_step(input_t, hyp.state.clone(), enc.contexts.as_ref());
                let rows = log_prob_rows(logits)?;
                let row = &rows[0];
                let step_loss = targets.map_or(0.0, |m| loss::nll(row, m.get(w, t)));

                for (idx, lp) in top_k(row, k, &skip) {
                    if idx == sym.end {
                        let norm = (hyp.seq.len() + 1) as f32;
                        finalized.push(Finalized {
                            seq: hyp.seq.clone(),
                            score: (hyp.score + lp) / norm,
                            loss: (hyp.loss + step_loss) / norm,
                        });
                    } else {
                        let mut seq = hyp.seq.clone();
                        seq.push(idx);
                        pool.push(SoloHypothesis {
                            seq,
                            state: new_state.clone(),
                            score: hyp.score + lp,
                            loss: hyp.loss + step_loss,
                        });
                    }
                }
            }

            if pool.is_empty() {
                // only possible at beam width 1: the single path ended
                break;
            }
            pool.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            pool.truncate(k);
            live = pool;
        }

        if finalized.is_empty() {
            let Some(best) = live.first() else {
                bail!("beam search produced no candidate for word '{}'", word.text());
            };
            finalized.push(Finalized {
                seq: best.seq.clone(),
                score: best.score / self.max_length as f32,
                loss: best.loss / self.max_length as f32,
            });
        }

        finalized.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        let Some(winner) = finalized.into_iter().next() else {
            bail!("beam search produced no candidate for word '{}'", word.text());
        };
        Ok(DecodedWord {
            indices: winner.seq,
            score: winner.score,
            loss: winner.loss,
        })
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────
/// Log-softmax the logits and pull them back to the host, one
/// Vec per row.
fn log_prob_rows<B: Backend>(logits: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, cols] = logits.dims();
    let flat: Vec<f32> = log_softmax(logits, 1)
        .into_data()
        .to_vec()
        .map_err(|e| anyhow!("cannot read log-probabilities from device: {e:?}"))?;
    Ok(flat.chunks(cols).map(<[f32]>::to_vec).collect())
}

/// The k best (index, log-prob) entries of a row, skipping the
/// given indices. Ties break toward the lower index so results
/// are deterministic.
fn top_k(row: &[f32], k: usize, skip: &[usize]) -> Vec<(usize, f32)> {
    let mut entries: Vec<(usize, f32)> = row
        .iter()
        .copied()
        .enumerate()
        .filter(|(i, _)| !skip.contains(i))
        .collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    entries.truncate(k);
    entries
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::char_dict::{CharDictionary, EncodeOptions};
    use crate::ml::model::LemmatizerConfig;

    type TB = burn::backend::NdArray;

    fn model() -> LemmatizerModel<TB> {
        let mut dict = CharDictionary::new();
        dict.ensure_special_symbols();
        for ch in "abc".chars() {
            dict.add_item(ch.to_string());
        }
        LemmatizerConfig::new(4, 8, 1, "lemma".to_string())
            .init(dict, &Default::default())
            .unwrap()
    }

    fn words(texts: &[&str]) -> Vec<Word> {
        texts.iter().map(|t| Word::new(*t)).collect()
    }

    /// Plain greedy decoding, the ground truth for beam width 1.
    fn greedy(model: &LemmatizerModel<TB>, word: &Word, max_length: usize) -> Vec<usize> {
        let sym = *model.symbols();
        let skip = [sym.padding, sym.start];
        let enc = model.encode(std::slice::from_ref(word)).unwrap();
        let mut input = sym.start;
        let mut state = enc.hidden.clone();
        let mut seq = Vec::new();
        for t in 0..max_length {
            let chars = [input as i32];
            let input_t = Tensor::<TB, 1, Int>::from_ints(chars.as_slice(), &Default::default());
            let (logits, next) = model.decode_step(input_t, state, enc.contexts.as_ref());
            state = next;
            let row = &log_prob_rows(logits).unwrap()[0];
            let (idx, _) = top_k(row, 1, &skip)[0];
            if idx == sym.end && t > 0 {
                break;
            }
            seq.push(idx);
            input = idx;
        }
        seq
    }

    #[test]
    fn test_top_k_skips_and_orders() {
        let row = [0.1, 0.9, 0.5, 0.9];
        let picked = top_k(&row, 3, &[1]);
        assert_eq!(picked.len(), 3);
        assert_eq!(picked[0].0, 3);
        assert_eq!(picked[1].0, 2);
        assert_eq!(picked[2].0, 0);
    }

    #[test]
    fn test_degenerate_beam_equals_greedy() {
        let model = model();
        let batch = words(&["ab", "cba", "a"]);
        let search = BeamSearch::new(&model, 1, 6);

        let batched = search.run_batched(&batch, None).unwrap();
        let sequential = search.run_sequential(&batch, None).unwrap();

        for (i, word) in batch.iter().enumerate() {
            let expected = greedy(&model, word, 6);
            assert_eq!(batched[i].indices, expected, "batched, word {i}");
            assert_eq!(sequential[i].indices, expected, "sequential, word {i}");
        }
    }

    #[test]
    fn test_strategies_agree_at_wider_beam() {
        let model = model();
        let batch = words(&["abc", "ba"]);
        let search = BeamSearch::new(&model, 3, 5);

        let batched = search.run_batched(&batch, None).unwrap();
        let sequential = search.run_sequential(&batch, None).unwrap();
        for i in 0..batch.len() {
            assert_eq!(batched[i].indices, sequential[i].indices, "word {i}");
            assert!((batched[i].score - sequential[i].score).abs() < 1e-5);
        }
    }

    #[test]
    fn test_result_is_independent_of_batch_composition() {
        let model = model();
        let search = BeamSearch::new(&model, 2, 5);

        let alone = search.run_batched(&words(&["ab"]), None).unwrap();
        let in_company = search
            .run_batched(&words(&["ab", "cccba", "b"]), None)
            .unwrap();

        assert_eq!(alone[0].indices, in_company[0].indices);
        assert!((alone[0].score - in_company[0].score).abs() < 1e-5);
    }

    #[test]
    fn test_length_cap_fallback_yields_nonempty_sequence() {
        let model = model();
        let search = BeamSearch::new(&model, 2, 1);
        let decoded = search.run(&words(&["abc", "a"]), None).unwrap();
        for d in &decoded {
            assert!(!d.indices.is_empty());
            assert!(d.score.is_finite());
        }
    }

    #[test]
    fn test_scores_are_log_probabilities() {
        let model = model();
        let search = BeamSearch::new(&model, 3, 6);
        for d in search.run(&words(&["ab", "c", "bca"]), None).unwrap() {
            assert!(d.score <= 0.0);
        }
    }

    #[test]
    fn test_loss_accumulates_against_targets() {
        let model = model();
        let batch = words(&["ab", "ca"]);
        let max_length = 4;
        let texts: Vec<&str> = batch.iter().map(|w| w.text()).collect();
        let targets = model.char_dict().encode_words(
            &texts,
            model.symbols(),
            EncodeOptions {
                start_symbol: false,
                end_symbol: true,
                pad_front: false,
                min_length: Some(max_length),
            },
        );
        let search = BeamSearch::new(&model, 2, max_length);
        for d in search.run(&batch, Some(&targets)).unwrap() {
            assert!(d.loss.is_finite());
            assert!(d.loss >= 0.0);
        }
    }
}
