// ============================================================
// Layer 5 — Sequence Loss
// ============================================================
// Cross-entropy between decoder outputs and gold character
// sequences, in the two forms the system needs:
//
//   mean()  — one scalar averaged over every character position
//             of every word in the batch; the training loss
//             under teacher forcing.
//
//   nll()   — the negative log-likelihood of a single target
//             symbol given one already log-softmaxed row; used
//             by the beam search to accumulate per-hypothesis
//             diagnostic losses on the CPU side, where the
//             hypothesis arena lives.
//
// Reference: Burn Book §5 (Training)

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;

/// Mean cross-entropy over all positions and all words.
///
/// logits:  [batch, seq_len, vocab]
/// targets: [batch, seq_len]
pub fn mean<B: Backend>(logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Tensor<B, 1> {
    let [batch, seq_len, vocab] = logits.dims();
    let ce = CrossEntropyLossConfig::new().init(&logits.device());
    ce.forward(
        logits.reshape([batch * seq_len, vocab]),
        targets.reshape([batch * seq_len]),
    )
}

/// Negative log-likelihood of `target` in one log-probability
/// row (a row of log_softmax output pulled back to the CPU).
pub fn nll(log_probs: &[f32], target: usize) -> f32 {
    -log_probs[target]
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    #[test]
    fn test_mean_is_finite_and_positive() {
        let device = Default::default();
        let logits = Tensor::<TB, 1>::from_floats(
            [0.5, -0.2, 0.1, 0.0, 1.0, -1.0, 0.3, 0.3, 0.3, -0.5, 0.0, 0.5],
            &device,
        )
        .reshape([2, 2, 3]);
        let targets = Tensor::<TB, 1, Int>::from_ints([0, 2, 1, 1], &device).reshape([2, 2]);

        let loss: f32 = mean(logits, targets).into_scalar().elem();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn test_nll_flips_sign() {
        let row = [-0.1f32, -2.3, -4.0];
        assert_eq!(nll(&row, 1), 2.3);
    }
}
