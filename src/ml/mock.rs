// In-memory Network / Solver used by the trainer and sampler tests.
//
// MockNetwork::forward writes logits that put all mass on
// `(input + 1) % V` at every position, so greedy generation walks
// the vocabulary in index order.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::domain::error::CharRnnError;
use crate::domain::traits::{Blob, Network, Phase, Solver};

pub struct MockNetwork {
    phase:           Phase,
    sequence_length: usize,
    batch_size:      usize,
    vocab_size:      usize,
    buffers:         HashMap<Blob, Vec<f32>>,
    /// Number of set_blob calls per buffer.
    pub sets:        HashMap<Blob, usize>,
    pub forwards:    usize,
    /// Value written to the loss buffer by forward().
    pub loss_value:  f32,
    /// Solver iteration the weights were last synced from.
    pub synced_from: usize,
}

impl MockNetwork {
    pub fn new(phase: Phase, sequence_length: usize, batch_size: usize, vocab_size: usize) -> Self {
        let size = sequence_length * batch_size;
        let buffers = HashMap::from([
            (Blob::Data,   vec![0.0; size]),
            (Blob::Clip,   vec![0.0; size]),
            (Blob::Label,  vec![0.0; size]),
            (Blob::Loss,   vec![0.0]),
            (Blob::Output, vec![0.0; size * vocab_size]),
        ]);
        Self {
            phase,
            sequence_length,
            batch_size,
            vocab_size,
            buffers,
            sets: HashMap::new(),
            forwards: 0,
            loss_value: 0.0,
            synced_from: 0,
        }
    }

    pub fn set_count(&self, blob: Blob) -> usize {
        self.sets.get(&blob).copied().unwrap_or(0)
    }

    fn set_loss(&mut self, value: f32) {
        if let Some(loss) = self.buffers.get_mut(&Blob::Loss) {
            loss[0] = value;
        }
    }
}

impl Network for MockNetwork {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn set_blob(&mut self, blob: Blob, values: &[f32]) -> Result<(), CharRnnError> {
        if !blob.is_input() {
            return Err(CharRnnError::InvalidArgument(format!("'{}' is an output", blob.name())));
        }
        let target = self.buffers.get_mut(&blob).ok_or_else(|| CharRnnError::Engine("no buffer".into()))?;
        if target.len() != values.len() {
            return Err(CharRnnError::InvalidArgument(format!(
                "'{}' expects {} values, got {}",
                blob.name(),
                target.len(),
                values.len()
            )));
        }
        target.copy_from_slice(values);
        *self.sets.entry(blob).or_insert(0) += 1;
        Ok(())
    }

    fn blob(&self, blob: Blob) -> Result<&[f32], CharRnnError> {
        self.buffers
            .get(&blob)
            .map(Vec::as_slice)
            .ok_or_else(|| CharRnnError::Engine("no buffer".into()))
    }

    fn forward(&mut self) -> Result<(), CharRnnError> {
        let v = self.vocab_size;
        let data = self.buffers[&Blob::Data].clone();
        let mut output = vec![0.0; self.sequence_length * self.batch_size * v];
        for (pos, &x) in data.iter().enumerate() {
            output[pos * v + (x as usize + 1) % v] = 10.0;
        }
        self.buffers.insert(Blob::Output, output);
        let loss = self.loss_value;
        self.set_loss(loss);
        self.forwards += 1;
        Ok(())
    }
}

/// Counters that outlive the solver (the trainer owns and drops it).
#[derive(Debug, Default, Clone)]
pub struct SolverProbe {
    pub snapshots:    Rc<Cell<usize>>,
    pub materialized: Rc<Cell<usize>>,
    pub syncs:        Rc<Cell<usize>>,
}

pub struct MockSolver {
    net:           MockNetwork,
    iter:          usize,
    display:       usize,
    pub probe:     SolverProbe,
    pub fail_step: Option<usize>,
}

impl MockSolver {
    pub fn new(sequence_length: usize, batch_size: usize, vocab_size: usize, display: usize) -> Self {
        Self {
            net: MockNetwork::new(Phase::Train, sequence_length, batch_size, vocab_size),
            iter: 0,
            display,
            probe: SolverProbe::default(),
            fail_step: None,
        }
    }
}

impl Solver for MockSolver {
    type Net = MockNetwork;
    type TestNet = MockNetwork;

    fn net(&self) -> &MockNetwork {
        &self.net
    }

    fn net_mut(&mut self) -> &mut MockNetwork {
        &mut self.net
    }

    /// The training loss after step n is n.
    fn step(&mut self, iters: usize) -> Result<(), CharRnnError> {
        for _ in 0..iters {
            if self.fail_step == Some(self.iter) {
                return Err(CharRnnError::Engine("step failed".into()));
            }
            self.iter += 1;
            self.net.loss_value = self.iter as f32;
            self.net.forward()?;
        }
        Ok(())
    }

    fn iter(&self) -> usize {
        self.iter
    }

    fn display_interval(&self) -> usize {
        self.display
    }

    fn snapshot(&mut self) -> Result<PathBuf, CharRnnError> {
        self.probe.snapshots.set(self.probe.snapshots.get() + 1);
        Ok(PathBuf::from(format!("mock_iter_{}.solverstate.json", self.iter)))
    }

    fn restore(&mut self, manifest: &Path) -> Result<(), CharRnnError> {
        let name = manifest.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        self.iter = name
            .trim_start_matches("mock_iter_")
            .trim_end_matches(".solverstate.json")
            .parse()
            .map_err(|_| CharRnnError::Checkpoint(format!("bad manifest '{name}'")))?;
        Ok(())
    }

    /// Test networks report a constant loss of 0.5.
    fn materialize_test_net(&self) -> Result<MockNetwork, CharRnnError> {
        self.probe.materialized.set(self.probe.materialized.get() + 1);
        let mut test = MockNetwork::new(
            Phase::Test,
            self.net.sequence_length,
            self.net.batch_size,
            self.net.vocab_size,
        );
        test.loss_value = 0.5;
        test.synced_from = self.iter;
        Ok(test)
    }

    fn sync_test_net(&self, test: &mut MockNetwork) -> Result<(), CharRnnError> {
        self.probe.syncs.set(self.probe.syncs.get() + 1);
        test.synced_from = self.iter;
        Ok(())
    }
}
