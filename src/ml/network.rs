// ============================================================
// Layer 5 — Network (named buffer bindings)
// ============================================================
// Wraps a CharRnn model with the flat f32 buffers the trainer and
// sampler talk to. Inputs are copied in with set_blob, turned into
// tensors on forward(), and the results are copied back out.
//
//   data  [T·N]   → Tensor<Int>  [T, N]
//   clip  [T·N]   → Tensor       [T, N]
//   label [T·N]   → Tensor<Int>  [T, N]
//   ip1   [T·N·V] ← logits       [T, N, V]
//   loss  [1]     ← mean cross-entropy

use std::path::Path;

use burn::{prelude::*, tensor::TensorData};

use crate::domain::error::CharRnnError;
use crate::domain::traits::{Blob, Network, Phase};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{CharRnn, CharRnnConfig};

pub struct CharRnnNetwork<B: Backend> {
    model:           CharRnn<B>,
    phase:           Phase,
    sequence_length: usize,
    batch_size:      usize,
    vocab_size:      usize,
    device:          B::Device,

    data:        Vec<f32>,
    clip:        Vec<f32>,
    label:       Vec<f32>,
    label_bound: bool,
    loss:        Vec<f32>,
    output:      Vec<f32>,
}

impl<B: Backend> CharRnnNetwork<B> {
    pub fn new(
        model:           CharRnn<B>,
        vocab_size:      usize,
        phase:           Phase,
        sequence_length: usize,
        batch_size:      usize,
        device:          B::Device,
    ) -> Result<Self, CharRnnError> {
        if sequence_length == 0 || batch_size == 0 || vocab_size == 0 {
            return Err(CharRnnError::InvalidArgument(format!(
                "network shape must be positive (sequence_length={sequence_length}, \
                 batch_size={batch_size}, vocab_size={vocab_size})"
            )));
        }
        let size = sequence_length * batch_size;
        Ok(Self {
            model,
            phase,
            sequence_length,
            batch_size,
            vocab_size,
            device,
            data:        vec![0.0; size],
            clip:        vec![0.0; size],
            label:       vec![0.0; size],
            label_bound: false,
            loss:        vec![0.0],
            output:      vec![0.0; size * vocab_size],
        })
    }

    /// Build a test-phase network from a model config and trained weights.
    pub fn load(
        config:          &CharRnnConfig,
        weights:         &Path,
        sequence_length: usize,
        batch_size:      usize,
        device:          B::Device,
    ) -> Result<Self, CharRnnError> {
        let model = CheckpointManager::load_weights(config.init::<B>(&device), weights, &device)?;
        tracing::info!("Weights loaded from '{}'", weights.display());
        Self::new(model, config.vocab_size, Phase::Test, sequence_length, batch_size, device)
    }

    pub fn model(&self) -> &CharRnn<B> {
        &self.model
    }

    /// Swap in new parameters; buffer bindings are kept.
    pub fn replace_model(&mut self, model: CharRnn<B>) {
        self.model = model;
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    // ─── Tensor conversion ───────────────────────────────────────────────────

    fn index_tensor(&self, blob: Blob, values: &[f32]) -> Result<Tensor<B, 2, Int>, CharRnnError> {
        let mut indices = Vec::with_capacity(values.len());
        for &v in values {
            if !(v >= 0.0 && (v as usize) < self.vocab_size) || v.fract() != 0.0 {
                return Err(CharRnnError::Engine(format!(
                    "'{}' holds {v}, not an index below {}",
                    blob.name(),
                    self.vocab_size
                )));
            }
            indices.push(v as i64);
        }
        Ok(Tensor::from_data(
            TensorData::new(indices, [self.sequence_length, self.batch_size]),
            &self.device,
        ))
    }

    fn clip_tensor(&self) -> Tensor<B, 2> {
        Tensor::from_data(
            TensorData::new(self.clip.clone(), [self.sequence_length, self.batch_size]),
            &self.device,
        )
    }

    /// Inputs as tensors: (data, clip, labels). Labels must be bound.
    pub(crate) fn training_tensors(
        &self,
    ) -> Result<(Tensor<B, 2, Int>, Tensor<B, 2>, Tensor<B, 2, Int>), CharRnnError> {
        if !self.label_bound {
            return Err(CharRnnError::Engine("no label buffer bound".into()));
        }
        Ok((
            self.index_tensor(Blob::Data, &self.data)?,
            self.clip_tensor(),
            self.index_tensor(Blob::Label, &self.label)?,
        ))
    }

    pub(crate) fn store_loss(&mut self, loss: Tensor<B, 1>) {
        self.loss[0] = loss.into_scalar().elem::<f32>();
    }

    fn store_output(&mut self, logits: Tensor<B, 3>) {
        self.output = logits.into_data().iter::<f32>().collect();
    }
}

impl<B: Backend> Network for CharRnnNetwork<B> {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn set_blob(&mut self, blob: Blob, values: &[f32]) -> Result<(), CharRnnError> {
        let target = match blob {
            Blob::Data  => &mut self.data,
            Blob::Clip  => &mut self.clip,
            Blob::Label => &mut self.label,
            Blob::Loss | Blob::Output => {
                return Err(CharRnnError::InvalidArgument(format!(
                    "'{}' is an output buffer",
                    blob.name()
                )))
            }
        };
        if values.len() != target.len() {
            return Err(CharRnnError::InvalidArgument(format!(
                "'{}' expects {} values, got {}",
                blob.name(),
                target.len(),
                values.len()
            )));
        }
        target.copy_from_slice(values);
        if blob == Blob::Label {
            self.label_bound = true;
        }
        Ok(())
    }

    fn blob(&self, blob: Blob) -> Result<&[f32], CharRnnError> {
        Ok(match blob {
            Blob::Data   => &self.data,
            Blob::Clip   => &self.clip,
            Blob::Label  => &self.label,
            Blob::Loss   => &self.loss,
            Blob::Output => &self.output,
        })
    }

    fn forward(&mut self) -> Result<(), CharRnnError> {
        if self.label_bound {
            let (data, clip, labels) = self.training_tensors()?;
            let (loss, logits) = self.model.forward_loss(data, clip, labels);
            self.store_loss(loss);
            self.store_output(logits);
        } else {
            let data = self.index_tensor(Blob::Data, &self.data)?;
            let logits = self.model.forward(data, self.clip_tensor());
            self.store_output(logits);
        }
        Ok(())
    }
}
