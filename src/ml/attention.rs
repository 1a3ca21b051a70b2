// ============================================================
// Layer 5 — Dot-Product Attention
// ============================================================
// At every decoder step the raw recurrent output attends back
// over the encoder's per-character context states:
//
//   score_i = ⟨context_i, output⟩        (inner product)
//   weights = softmax over source positions
//   result  = Σ_i weights_i · context_i  (convex combination)
//
// Padded source positions must not take part: their scores are
// forced to an unreachable minimum before the softmax, so a
// word decoded alone and the same word inside a padded batch
// see identical attention distributions. The minimum is finite
// so that a fully padded row (zero-length word) still softmaxes
// to a well-defined uniform distribution over zero vectors
// instead of producing NaNs.
//
// There are no learned parameters here; the fusion with the
// decoder output (concatenation before the output projection)
// happens in the model.

use burn::prelude::*;
use burn::tensor::activation::softmax;

/// Score assigned to padded source positions. exp() of this
/// underflows to zero, removing them from the distribution.
const MASKED_SCORE: f32 = -1.0e9;

/// Weighted sum of context states for a batch of decoder
/// outputs.
///
/// contexts: [batch, src_len, hidden], masked-positions zeroed
/// pad_mask: [batch, src_len] Bool, true at padded positions
/// output:   [batch, hidden] (current decoder step)
///
/// Returns [batch, hidden].
pub fn attend<B: Backend>(
    contexts: Tensor<B, 3>,
    pad_mask: Tensor<B, 2, Bool>,
    output: Tensor<B, 2>,
) -> Tensor<B, 2> {
    let [batch, src_len, _hidden] = contexts.dims();

    // [batch, src_len, hidden] × [batch, hidden, 1] → [batch, src_len, 1]
    let query = output.unsqueeze_dim::<3>(2);
    let scores = contexts.clone().matmul(query);

    let mask: Tensor<B, 3, Bool> = pad_mask.reshape([batch, src_len, 1]);
    let scores = scores.mask_fill(mask, MASKED_SCORE);

    let weights = softmax(scores, 1);

    // Σ over source positions of weight · context
    (contexts * weights).sum_dim(1).flatten::<2>(1, 2)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    #[test]
    fn test_masked_positions_do_not_contribute() {
        let device = Default::default();

        // two source positions with very different vectors;
        // position 1 is masked out
        let contexts = Tensor::<TB, 1>::from_floats([1.0, 1.0, 100.0, 100.0], &device)
            .reshape([1, 2, 2]);
        let pad_mask = Tensor::<TB, 1, Int>::from_ints([0, 1], &device)
            .reshape([1, 2])
            .equal_elem(1);
        let output = Tensor::<TB, 1>::from_floats([1.0, 1.0], &device).reshape([1, 2]);

        let result: Vec<f32> = attend(contexts, pad_mask, output)
            .into_data()
            .to_vec()
            .unwrap();

        // all weight collapses onto position 0
        assert!((result[0] - 1.0).abs() < 1e-5);
        assert!((result[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_fully_masked_row_is_finite() {
        let device = Default::default();
        let contexts = Tensor::<TB, 3>::zeros([1, 3, 2], &device);
        let pad_mask = Tensor::<TB, 2, Int>::ones([1, 3], &device).equal_elem(1);
        let output = Tensor::<TB, 2>::ones([1, 2], &device);

        let result: Vec<f32> = attend(contexts, pad_mask, output)
            .into_data()
            .to_vec()
            .unwrap();
        assert!(result.iter().all(|v| v.is_finite()));
    }
}
