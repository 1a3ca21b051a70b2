// ============================================================
// Layer 5 — Recurrent Cells
// ============================================================
// GRU cells built from burn Linear layers. The beam search
// needs to advance the decoder one character at a time with the
// state in hand, and the encoder needs per-layer final states
// and per-position outputs under padding masks — so the cells
// expose an explicit step API instead of hiding the recurrence
// behind a sequence-level forward.
//
// Gate equations (as in Cho et al. 2014):
//   r = σ(W_ir·x + W_hr·h)
//   z = σ(W_iz·x + W_hz·h)
//   n = tanh(W_in·x + r ⊙ W_hn·h)
//   h' = (1 − z) ⊙ n + z ⊙ h
//
// Reference: Burn Book §3 (Building Blocks)
//            Cho et al. (2014) Learning Phrase Representations

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

// ─── GruCell ──────────────────────────────────────────────────────────────────
/// One GRU layer. The two Linears produce all three gates at
/// once; their outputs are chunked into (reset, update, new).
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    input_proj: Linear<B>,
    hidden_proj: Linear<B>,
}

#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub d_input: usize,
    pub d_hidden: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        GruCell {
            input_proj: LinearConfig::new(self.d_input, 3 * self.d_hidden).init(device),
            hidden_proj: LinearConfig::new(self.d_hidden, 3 * self.d_hidden).init(device),
        }
    }
}

impl<B: Backend> GruCell<B> {
    /// Advance one step: input [batch, d_input], hidden
    /// [batch, d_hidden] → new hidden [batch, d_hidden].
    pub fn step(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        let gi = self.input_proj.forward(input).chunk(3, 1);
        let gh = self.hidden_proj.forward(hidden.clone()).chunk(3, 1);

        let reset = sigmoid(gi[0].clone() + gh[0].clone());
        let update = sigmoid(gi[1].clone() + gh[1].clone());
        let new = tanh(gi[2].clone() + reset * gh[2].clone());

        let keep = update.clone();
        (keep.ones_like() - update) * new + keep * hidden
    }
}

// ─── StackedGru ───────────────────────────────────────────────────────────────
/// A stack of GRU layers sharing one [layers, batch, hidden]
/// state tensor, layer 0 first.
#[derive(Module, Debug)]
pub struct StackedGru<B: Backend> {
    cells: Vec<GruCell<B>>,
    d_hidden: usize,
}

#[derive(Config, Debug)]
pub struct StackedGruConfig {
    pub d_input: usize,
    pub d_hidden: usize,
    pub layers: usize,
}

impl StackedGruConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StackedGru<B> {
        let cells = (0..self.layers)
            .map(|layer| {
                let d_in = if layer == 0 { self.d_input } else { self.d_hidden };
                GruCellConfig::new(d_in, self.d_hidden).init(device)
            })
            .collect();
        StackedGru {
            cells,
            d_hidden: self.d_hidden,
        }
    }
}

impl<B: Backend> StackedGru<B> {
    pub fn layers(&self) -> usize {
        self.cells.len()
    }

    pub fn d_hidden(&self) -> usize {
        self.d_hidden
    }

    /// Zero state for a batch.
    pub fn zero_state(&self, batch: usize, device: &B::Device) -> Tensor<B, 3> {
        Tensor::zeros([self.cells.len(), batch, self.d_hidden], device)
    }

    /// One step through the whole stack.
    ///
    /// `step_mask` (if given) is [batch, 1] with 1.0 for rows
    /// that really advance; masked rows carry their state
    /// forward unchanged, which is what keeps padded positions
    /// from polluting final encoder states.
    ///
    /// Returns (top-layer output [batch, hidden], new state
    /// [layers, batch, hidden]).
    pub fn step(
        &self,
        input: Tensor<B, 2>,
        state: Tensor<B, 3>,
        step_mask: Option<&Tensor<B, 2>>,
    ) -> (Tensor<B, 2>, Tensor<B, 3>) {
        let mut layer_input = input;
        let mut new_layers = Vec::with_capacity(self.cells.len());

        for (layer, cell) in self.cells.iter().enumerate() {
            let old = state
                .clone()
                .slice([layer..layer + 1])
                .flatten::<2>(0, 1);
            let mut new = cell.step(layer_input, old.clone());
            if let Some(mask) = step_mask {
                let m = mask.clone();
                new = new * m.clone() + old * (m.ones_like() - m);
            }
            layer_input = new.clone();
            new_layers.push(new);
        }

        let new_state: Tensor<B, 3> = Tensor::stack(new_layers, 0);
        (layer_input, new_state)
    }

    /// Run a whole [batch, seq, d_input] sequence.
    ///
    /// `seq_mask` is [batch, seq] with 1.0 at real positions.
    /// With `reverse` the sequence is walked right-to-left while
    /// outputs stay aligned to their positions.
    ///
    /// Returns (outputs [batch, seq, hidden], final state
    /// [layers, batch, hidden]).
    pub fn forward_sequence(
        &self,
        inputs: Tensor<B, 3>,
        seq_mask: Option<&Tensor<B, 2>>,
        reverse: bool,
    ) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let [batch, seq_len, _] = inputs.dims();
        let device = inputs.device();

        let mut state = self.zero_state(batch, &device);
        let mut outputs: Vec<Tensor<B, 2>> = Vec::with_capacity(seq_len);

        let positions: Vec<usize> = if reverse {
            (0..seq_len).rev().collect()
        } else {
            (0..seq_len).collect()
        };

        for t in positions {
            let x = inputs
                .clone()
                .slice([0..batch, t..t + 1])
                .flatten::<2>(1, 2);
            let mask_t = seq_mask.map(|m| m.clone().slice([0..batch, t..t + 1]));
            let (out, next) = self.step(x, state, mask_t.as_ref());
            state = next;
            outputs.push(out);
        }
        // visit order is reversed, position order is not
        if reverse {
            outputs.reverse();
        }

        let stacked: Tensor<B, 3> = Tensor::stack(outputs, 1);
        (stacked, state)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    fn device() -> <TB as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_step_shapes() {
        let device = device();
        let gru: StackedGru<TB> = StackedGruConfig::new(4, 6, 2).init(&device);
        let state = gru.zero_state(3, &device);
        let input = Tensor::<TB, 2>::zeros([3, 4], &device);
        let (out, next) = gru.step(input, state, None);
        assert_eq!(out.dims(), [3, 6]);
        assert_eq!(next.dims(), [2, 3, 6]);
    }

    #[test]
    fn test_masked_step_carries_state() {
        let device = device();
        let gru: StackedGru<TB> = StackedGruConfig::new(2, 3, 1).init(&device);
        let state = gru.zero_state(1, &device);
        let input = Tensor::<TB, 2>::ones([1, 2], &device);

        // advance once to get a non-zero state
        let (_, advanced) = gru.step(input.clone(), state, None);

        // a fully masked step must leave the state untouched
        let mask = Tensor::<TB, 2>::zeros([1, 1], &device);
        let (_, frozen) = gru.step(input, advanced.clone(), Some(&mask));

        let before: Vec<f32> = advanced.into_data().to_vec().unwrap();
        let after: Vec<f32> = frozen.into_data().to_vec().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_sequence_output_shape() {
        let device = device();
        let gru: StackedGru<TB> = StackedGruConfig::new(4, 5, 1).init(&device);
        let inputs = Tensor::<TB, 3>::zeros([2, 7, 4], &device);
        let (outputs, state) = gru.forward_sequence(inputs, None, false);
        assert_eq!(outputs.dims(), [2, 7, 5]);
        assert_eq!(state.dims(), [1, 2, 5]);
    }
}
