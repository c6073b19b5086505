//! Adapter that lets the work manager drive a [`Trial`].

use std::sync::Arc;

use parking_lot::Mutex;

use nav_core::OwnerId;
use nav_schedule::{WorkError, WorkItem, WorkOutcome, WorkStatus};

use crate::{ItineraryTrial, PathTrial, Trial};

/// Runs a shared trial `slice` iterations per manager pass.
///
/// The trial sits behind a mutex so the submitter can keep a handle and
/// read results once the item retires.
pub struct TrialWork<T: Trial> {
    name:  String,
    owner: OwnerId,
    slice: u64,
    trial: Arc<Mutex<T>>,
}

pub type PathTrialWork = TrialWork<PathTrial>;
pub type ItineraryTrialWork = TrialWork<ItineraryTrial>;

impl<T: Trial> TrialWork<T> {
    pub fn new(owner: OwnerId, slice: u64, trial: Arc<Mutex<T>>) -> Self {
        let name = trial.lock().label();
        Self { name, owner, slice: slice.max(1), trial }
    }

    pub fn trial(&self) -> &Arc<Mutex<T>> {
        &self.trial
    }
}

impl<T: Trial> WorkItem for TrialWork<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn run(&mut self) -> Result<WorkStatus, WorkError> {
        let status = self.trial.lock().step(self.slice).map_err(|e| WorkError::new(e.to_string()))?;
        Ok(if status.is_terminal() { WorkStatus::Done } else { WorkStatus::NotDone })
    }

    fn reset(&mut self) {
        self.trial.lock().reset();
    }

    fn retire(&mut self, outcome: &WorkOutcome) {
        if matches!(outcome, WorkOutcome::Canceled) {
            self.trial.lock().cancel();
        }
    }
}
