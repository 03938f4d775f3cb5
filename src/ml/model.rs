// ============================================================
// Layer 5 — Character RNN Architecture
// ============================================================
//
//   data  [T, N] (Int)          clip [T, N] (0/1)
//      │                           │
//      ▼                           │
//   Embedding  → [T, N, E]         │
//      │                           │
//      ▼                           ▼
//   ClippedLstm × num_layers  → [T, N, H]
//      │
//   Dropout
//      │
//      ▼
//   Linear "ip1" → [T, N, V] logits
//
// Every tensor is time-major, so flattening the output gives the
// [time][slot][vocab] layout the sampler reads from.

use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CharRnnConfig {
    pub vocab_size:  usize,
    #[config(default = 64)]
    pub embed_dim:   usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub num_layers:  usize,
    #[config(default = 0.0)]
    pub dropout:     f64,
}

impl CharRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CharRnn<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device);
        let layers: Vec<ClippedLstm<B>> = (0..self.num_layers)
            .map(|layer| {
                let input = if layer == 0 { self.embed_dim } else { self.hidden_size };
                ClippedLstm::new(input, self.hidden_size, device)
            })
            .collect();
        let dropout = DropoutConfig::new(self.dropout).init();
        let ip1     = LinearConfig::new(self.hidden_size, self.vocab_size).init(device);
        CharRnn { embedding, layers, dropout, ip1 }
    }
}

// ─── Clip-aware LSTM ──────────────────────────────────────────────────────────
/// LSTM layer whose recurrent state is gated by a continuation mask.
///
/// Before the gate update at step t, the previous hidden and cell
/// state of each slot are multiplied by `clip[t][slot]`: a 0 starts a
/// fresh sequence, a 1 carries the state forward.
#[derive(Module, Debug)]
pub struct ClippedLstm<B: Backend> {
    /// x → [input | forget | cell | output] pre-activations
    pub input_gates:  Linear<B>,
    /// h → same four blocks, no bias
    pub hidden_gates: Linear<B>,
    pub hidden_size:  usize,
}

impl<B: Backend> ClippedLstm<B> {
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            input_gates:  LinearConfig::new(input_size, 4 * hidden_size).init(device),
            hidden_gates: LinearConfig::new(hidden_size, 4 * hidden_size)
                .with_bias(false)
                .init(device),
            hidden_size,
        }
    }

    /// x: [T, N, D], clip: [T, N] → hidden states [T, N, H]
    pub fn forward(&self, x: Tensor<B, 3>, clip: Tensor<B, 2>) -> Tensor<B, 3> {
        let [steps, slots, _] = x.dims();
        let hs = self.hidden_size;
        let device = x.device();

        // Input projections for all time-steps at once.
        let projected = self.input_gates.forward(x);

        let mut h = Tensor::<B, 2>::zeros([slots, hs], &device);
        let mut c = Tensor::<B, 2>::zeros([slots, hs], &device);
        let mut outputs = Vec::with_capacity(steps);

        for t in 0..steps {
            let keep = clip.clone().slice([t..t + 1, 0..slots]).reshape([slots, 1]);
            h = h * keep.clone();
            c = c * keep;

            let gates = projected
                .clone()
                .slice([t..t + 1, 0..slots, 0..4 * hs])
                .reshape([slots, 4 * hs])
                + self.hidden_gates.forward(h);

            let i = sigmoid(gates.clone().slice([0..slots, 0..hs]));
            let f = sigmoid(gates.clone().slice([0..slots, hs..2 * hs]));
            let g = tanh(gates.clone().slice([0..slots, 2 * hs..3 * hs]));
            let o = sigmoid(gates.slice([0..slots, 3 * hs..4 * hs]));

            c = f * c + i * g;
            h = o * tanh(c.clone());
            outputs.push(h.clone().reshape([1, slots, hs]));
        }

        Tensor::cat(outputs, 0)
    }
}

// ─── Full model ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CharRnn<B: Backend> {
    pub embedding: Embedding<B>,
    pub layers:    Vec<ClippedLstm<B>>,
    pub dropout:   Dropout,
    pub ip1:       Linear<B>,
}

impl<B: Backend> CharRnn<B> {
    /// data: [T, N] indices, clip: [T, N] → logits [T, N, V]
    pub fn forward(&self, data: Tensor<B, 2, Int>, clip: Tensor<B, 2>) -> Tensor<B, 3> {
        let mut x = self.embedding.forward(data);
        for layer in &self.layers {
            x = layer.forward(x, clip.clone());
        }
        self.ip1.forward(self.dropout.forward(x))
    }

    /// Mean cross-entropy of the next-character prediction over all
    /// T × N positions. Returns (loss [1], logits [T, N, V]).
    pub fn forward_loss(
        &self,
        data:   Tensor<B, 2, Int>,
        clip:   Tensor<B, 2>,
        labels: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward(data, clip);
        let [steps, slots, vocab] = logits.dims();

        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(
            logits.clone().reshape([steps * slots, vocab]),
            labels.reshape([steps * slots]),
        );
        (loss, logits)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn tiny() -> CharRnnConfig {
        CharRnnConfig::new(5)
            .with_embed_dim(4)
            .with_hidden_size(6)
            .with_num_layers(2)
    }

    fn ints(values: Vec<i64>, shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn floats(values: Vec<f32>, shape: [usize; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_output_is_time_major_logits() {
        let device = Default::default();
        let model = tiny().init::<TestBackend>(&device);
        let data = ints(vec![0, 1, 2, 3, 4, 0], [3, 2]);
        let clip = floats(vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0], [3, 2]);
        assert_eq!(model.forward(data, clip).dims(), [3, 2, 5]);
    }

    #[test]
    fn test_loss_is_a_positive_scalar() {
        let device = Default::default();
        let model = tiny().init::<TestBackend>(&device);
        let data   = ints(vec![0, 1, 2, 3], [2, 2]);
        let labels = ints(vec![1, 2, 3, 4], [2, 2]);
        let clip   = floats(vec![0.0, 0.0, 1.0, 1.0], [2, 2]);

        let (loss, logits) = model.forward_loss(data, clip, labels);
        assert_eq!(loss.dims(), [1]);
        assert_eq!(logits.dims(), [2, 2, 5]);
        assert!(loss.into_scalar().elem::<f32>() > 0.0);
    }

    #[test]
    fn test_zero_clip_resets_recurrent_state() {
        // With every flag at 0, each step ignores the previous ones, so
        // the final step only depends on the final input.
        let device = Default::default();
        let lstm = ClippedLstm::<TestBackend>::new(3, 4, &device);
        let reset = floats(vec![0.0; 3], [3, 1]);

        let a: Tensor<TestBackend, 3> = Tensor::from_data(
            TensorData::new(vec![1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.5, 0.5], [3, 1, 3]),
            &device,
        );
        let b: Tensor<TestBackend, 3> = Tensor::from_data(
            TensorData::new(vec![0.0f32, 0.0, 1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5], [3, 1, 3]),
            &device,
        );

        let last = |x| -> Vec<f32> {
            lstm.forward(x, reset.clone())
                .slice([2..3, 0..1, 0..4])
                .into_data()
                .iter::<f32>()
                .collect()
        };
        for (x, y) in last(a).iter().zip(last(b).iter()) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }

    #[test]
    fn test_config_defaults() {
        let cfg = CharRnnConfig::new(65);
        assert_eq!(cfg.embed_dim, 64);
        assert_eq!(cfg.hidden_size, 256);
        assert_eq!(cfg.num_layers, 2);
        assert_eq!(cfg.dropout, 0.0);
    }
}
