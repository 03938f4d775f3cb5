// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives a Solver one iteration at a time:
//
//   ┌──────────────────────────────────────────────────────┐
//   │ iter % display == 0 && iter > 0 ?                    │
//   │    → Validating: sync test net, 20 forward passes    │
//   │      on test-partition batches, log the mean loss    │
//   │ Training: pack a batch → data/label → solver.step(1) │
//   │ iter % log_interval == 0 ? → log the training loss   │
//   └──────────────────────────────────────────────────────┘
//            ... until max_iter, then Checkpointing
//
// The continuation mask is bound once on each network (training
// at construction, test on first materialisation).
//
// Teardown always snapshots: finish() does it explicitly, and a
// trainer dropped mid-run (e.g. after an error) snapshots from Drop.

use rand::{rngs::StdRng, Rng};

use crate::data::batcher::BatchPacker;
use crate::domain::error::CharRnnError;
use crate::domain::traits::{Blob, Network, Solver};
use crate::domain::vocabulary::CorpusSplit;
use crate::infra::metrics::LossLog;
use crate::ml::clock_rng;

/// Forward passes averaged per validation.
pub const VALIDATION_PASSES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Training,
    Validating,
    Checkpointing,
    Finished,
    Aborted,
}

/// Batch shape and logging cadence for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerSettings {
    pub sequence_length: usize,
    pub batch_size:      usize,
    /// Training-loss log period; 0 disables training rows.
    pub log_interval:    usize,
}

pub struct Trainer<S: Solver, R: Rng = StdRng> {
    solver:       S,
    test_net:     Option<S::TestNet>,
    split:        CorpusSplit,
    packer:       BatchPacker,
    log:          LossLog,
    log_interval: usize,
    rng:          R,
    state:        TrainerState,
}

impl<S: Solver> Trainer<S> {
    pub fn new(
        solver:   S,
        split:    CorpusSplit,
        settings: TrainerSettings,
        log:      LossLog,
    ) -> Result<Self, CharRnnError> {
        Self::with_rng(solver, split, settings, log, clock_rng())
    }
}

impl<S: Solver, R: Rng> Trainer<S, R> {
    pub fn with_rng(
        mut solver: S,
        split:      CorpusSplit,
        settings:   TrainerSettings,
        log:        LossLog,
        rng:        R,
    ) -> Result<Self, CharRnnError> {
        let packer = BatchPacker::new(settings.sequence_length, settings.batch_size)?;
        solver.net_mut().set_blob(Blob::Clip, packer.continuation_mask())?;
        tracing::debug!(
            "Trainer ready: {} train / {} test indices",
            split.train.len(),
            split.test.len()
        );
        Ok(Self {
            solver,
            test_net: None,
            split,
            packer,
            log,
            log_interval: settings.log_interval,
            rng,
            state: TrainerState::Training,
        })
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    pub fn test_net(&self) -> Option<&S::TestNet> {
        self.test_net.as_ref()
    }

    /// One training iteration, preceded by a validation when due.
    pub fn update(&mut self) -> Result<(), CharRnnError> {
        let iter = self.solver.iter();
        let display = self.solver.display_interval();
        if display > 0 && iter > 0 && iter % display == 0 {
            let loss = self.validate()?;
            tracing::info!("Iteration {iter}, validation loss = {loss}");
            self.log.log_validation(iter, loss);
        }

        self.state = TrainerState::Training;
        let batch = self.packer.pack(&self.split.train, &mut self.rng)?;
        let net = self.solver.net_mut();
        net.set_blob(Blob::Data, batch.data)?;
        net.set_blob(Blob::Label, batch.labels)?;
        self.solver.step(1)?;

        let iter = self.solver.iter();
        if self.log_interval > 0 && iter % self.log_interval == 0 {
            let loss = first_scalar(self.solver.net())?;
            tracing::debug!("Iteration {iter}, loss = {loss}");
            self.log.log_training(iter, loss);
        }
        Ok(())
    }

    /// Mean loss over [`VALIDATION_PASSES`] test-partition batches.
    pub fn validate(&mut self) -> Result<f32, CharRnnError> {
        self.state = TrainerState::Validating;

        let test = match self.test_net.take() {
            Some(mut test) => {
                self.solver.sync_test_net(&mut test)?;
                test
            }
            None => {
                let mut test = self.solver.materialize_test_net()?;
                test.set_blob(Blob::Clip, self.packer.continuation_mask())?;
                test
            }
        };
        let test = self.test_net.insert(test);

        let mut total = 0.0f32;
        for _ in 0..VALIDATION_PASSES {
            let batch = self.packer.pack(&self.split.test, &mut self.rng)?;
            test.set_blob(Blob::Data, batch.data)?;
            test.set_blob(Blob::Label, batch.labels)?;
            test.forward()?;
            total += first_scalar(test)?;
        }
        Ok(total / VALIDATION_PASSES as f32)
    }

    /// Run updates until the solver reaches `max_iter`.
    pub fn run(&mut self, max_iter: usize) -> Result<(), CharRnnError> {
        while self.solver.iter() < max_iter {
            if let Err(e) = self.update() {
                self.state = TrainerState::Aborted;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Snapshot the solver and stop.
    pub fn finish(mut self) -> Result<std::path::PathBuf, CharRnnError> {
        self.state = TrainerState::Checkpointing;
        let result = self.solver.snapshot();
        self.state = TrainerState::Finished;
        result
    }
}

impl<S: Solver, R: Rng> Drop for Trainer<S, R> {
    fn drop(&mut self) {
        if self.state == TrainerState::Finished {
            return;
        }
        self.state = TrainerState::Checkpointing;
        match self.solver.snapshot() {
            Ok(path) => tracing::info!("Snapshot written on teardown: '{}'", path.display()),
            Err(e) => tracing::error!("Snapshot on teardown failed: {e}"),
        }
        self.state = TrainerState::Finished;
    }
}

fn first_scalar<N: Network>(net: &N) -> Result<f32, CharRnnError> {
    net.blob(Blob::Loss)?
        .first()
        .copied()
        .ok_or_else(|| CharRnnError::Engine("empty loss buffer".into()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::fs;
    use std::path::PathBuf;

    use crate::data::batcher::continuation_mask;
    use crate::domain::traits::Phase;
    use crate::infra::metrics::LOG_HEADER;
    use crate::ml::mock::{MockSolver, SolverProbe};

    const SETTINGS: TrainerSettings = TrainerSettings { sequence_length: 3, batch_size: 2, log_interval: 2 };

    fn split() -> CorpusSplit {
        CorpusSplit {
            train: (0..40).map(|i| (i % 4) as f32).collect(),
            test:  (0..10).map(|i| (i % 4) as f32).collect(),
        }
    }

    fn trainer(display: usize, log: LossLog) -> (Trainer<MockSolver, StdRng>, SolverProbe) {
        let solver = MockSolver::new(3, 2, 4, display);
        let probe = solver.probe.clone();
        let t = Trainer::with_rng(solver, split(), SETTINGS, log, StdRng::seed_from_u64(7)).unwrap();
        (t, probe)
    }

    #[test]
    fn test_clip_bound_once_on_training_net() {
        let (mut t, _) = trainer(0, LossLog::disabled());
        t.run(5).unwrap();
        let net = t.solver().net();
        assert_eq!(net.set_count(Blob::Clip), 1);
        assert_eq!(net.set_count(Blob::Data), 5);
        assert_eq!(net.blob(Blob::Clip).unwrap(), continuation_mask(3, 2).as_slice());
    }

    #[test]
    fn test_run_stops_at_max_iter() {
        let (mut t, _) = trainer(0, LossLog::disabled());
        t.run(7).unwrap();
        assert_eq!(t.solver().iter(), 7);
        t.run(7).unwrap();
        assert_eq!(t.solver().iter(), 7);
    }

    #[test]
    fn test_validation_schedule_and_test_net_reuse() {
        let (mut t, probe) = trainer(3, LossLog::disabled());
        t.run(10).unwrap();
        // validated before iterations 3, 6 and 9
        assert_eq!(probe.materialized.get(), 1);
        assert_eq!(probe.syncs.get(), 2);

        let test = t.test_net().unwrap();
        assert_eq!(test.phase(), Phase::Test);
        assert_eq!(test.set_count(Blob::Clip), 1);
        assert_eq!(test.forwards, 3 * VALIDATION_PASSES);
        assert_eq!(test.synced_from, 9);
    }

    #[test]
    fn test_zero_display_never_validates() {
        let (mut t, probe) = trainer(0, LossLog::disabled());
        t.run(12).unwrap();
        assert_eq!(probe.materialized.get(), 0);
        assert!(t.test_net().is_none());
    }

    #[test]
    fn test_validation_is_mean_of_test_losses() {
        let (mut t, _) = trainer(0, LossLog::disabled());
        assert_eq!(t.validate().unwrap(), 0.5);
        assert_eq!(t.state(), TrainerState::Validating);
    }

    #[test]
    fn test_log_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.log");
        {
            let (mut t, _) = trainer(4, LossLog::open(Some(&path)));
            t.run(5).unwrap();
            t.finish().unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [LOG_HEADER, "2;2", "4;4", ";;4;0.5"]);
    }

    #[test]
    fn test_short_partition_is_fatal() {
        let solver = MockSolver::new(3, 2, 4, 0);
        let split = CorpusSplit { train: vec![0.0; 4], test: vec![0.0; 10] };
        let mut t = Trainer::with_rng(solver, split, SETTINGS, LossLog::disabled(), StdRng::seed_from_u64(1)).unwrap();
        assert!(matches!(
            t.run(3),
            Err(CharRnnError::InsufficientData { available: 4, required: 5 })
        ));
        assert_eq!(t.state(), TrainerState::Aborted);
    }

    #[test]
    fn test_finish_snapshots_once() {
        let (mut t, probe) = trainer(0, LossLog::disabled());
        t.run(4).unwrap();
        let path = t.finish().unwrap();
        assert_eq!(path, PathBuf::from("mock_iter_4.solverstate.json"));
        assert_eq!(probe.snapshots.get(), 1);
    }

    #[test]
    fn test_drop_snapshots_after_failure() {
        let mut solver = MockSolver::new(3, 2, 4, 0);
        solver.fail_step = Some(2);
        let probe = solver.probe.clone();
        {
            let mut t = Trainer::with_rng(solver, split(), SETTINGS, LossLog::disabled(), StdRng::seed_from_u64(1)).unwrap();
            assert!(t.run(5).is_err());
            assert_eq!(t.solver().iter(), 2);
        }
        assert_eq!(probe.snapshots.get(), 1);
    }

    #[test]
    fn test_resumed_solver_continues_from_its_iteration() {
        let mut solver = MockSolver::new(3, 2, 4, 0);
        solver.restore(std::path::Path::new("mock_iter_6.solverstate.json")).unwrap();
        let mut t = Trainer::with_rng(solver, split(), SETTINGS, LossLog::disabled(), StdRng::seed_from_u64(1)).unwrap();
        t.run(8).unwrap();
        assert_eq!(t.solver().net().set_count(Blob::Data), 2);
    }
}
