//! Production step progress on a spinner.

use std::time::Instant;

use parking_lot::Mutex;
use tessel_build::{BuildError, ProductionObserver, ProductionStep};

use super::{Spinner, format_duration};

/// Shows one spinner per production step.
#[derive(Default)]
pub struct SpinnerObserver {
    current: Mutex<Option<(Spinner, Instant)>>,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductionObserver for SpinnerObserver {
    fn step_started(&self, step: ProductionStep) {
        *self.current.lock() = Some((Spinner::new(&format!("{step}...")), Instant::now()));
    }

    fn step_finished(&self, step: ProductionStep) {
        if let Some((spinner, started)) = self.current.lock().take() {
            spinner.finish(&format!("{step} ({})", format_duration(started.elapsed())));
        }
    }

    fn step_failed(&self, step: ProductionStep, _error: &BuildError) {
        if let Some((spinner, _)) = self.current.lock().take() {
            spinner.fail(&format!("{step} failed"));
        }
    }
}
