//! Observer pattern for monitoring optimization progress.
//!
//! Observers are notified after every accepted Newton update with the current iterate and
//! the iteration number. Metrics that are not part of the state (residual norms, step
//! lengths) are pushed beforehand through [`OptObserver::set_iteration_metrics`].
//!
//! # Examples
//!
//! ```
//! use equilibrium_solver::observers::TraceRecorder;
//! use equilibrium_solver::IpNewton;
//!
//! let recorder = TraceRecorder::new();
//! let mut solver = IpNewton::new();
//! solver.add_observer(recorder.clone());
//! // ... solve, then inspect recorder.records()
//! ```

use crate::core::{result::ErrorNorms, state::OptimumState};
use nalgebra::DVector;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::error;

/// Observer-specific error types
#[derive(Debug, Clone, Error)]
pub enum ObserverError {
    /// Mutex was poisoned (a thread panicked while holding the lock)
    #[error("Mutex poisoned in {context}: {reason}")]
    MutexPoisoned { context: String, reason: String },
}

impl ObserverError {
    /// Log the error with tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error together with the underlying source error
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Result type for observer operations
pub type ObserverResult<T> = Result<T, ObserverError>;

/// Scalar diagnostics of one Newton iteration
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct IterationMetrics {
    /// Objective value after the update
    pub objective: f64,
    pub errors: ErrorNorms,
    /// Step length used for `x` (after any line search)
    pub alpha_x: f64,
    /// Step length used for `z`
    pub alpha_z: f64,
    /// `min(alpha_x, alpha_z)`
    pub alpha: f64,
}

/// Observer notified after each iteration.
///
/// Implementations must be `Send`; interior mutability (`Arc<Mutex<..>>`) is the usual way to
/// accumulate data since notifications receive `&self`.
pub trait OptObserver: Send {
    /// Called after the iterate has been updated and re-evaluated
    fn on_step(&self, state: &OptimumState, iteration: usize);

    /// Receive the scalar metrics of the iteration about to be notified
    fn set_iteration_metrics(&self, _metrics: &IterationMetrics) {
        // Default implementation does nothing
    }
}

/// Collection of observers notified together
#[derive(Default)]
pub struct OptObserverVec {
    observers: Vec<Box<dyn OptObserver>>,
}

impl OptObserverVec {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn add(&mut self, observer: impl OptObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn add_boxed(&mut self, observer: Box<dyn OptObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub fn set_iteration_metrics(&self, metrics: &IterationMetrics) {
        for observer in &self.observers {
            observer.set_iteration_metrics(metrics);
        }
    }

    #[inline]
    pub fn notify(&self, state: &OptimumState, iteration: usize) {
        for observer in &self.observers {
            observer.on_step(state, iteration);
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

/// Snapshot of one iteration kept by [`TraceRecorder`]
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub x: DVector<f64>,
    pub z: DVector<f64>,
    pub metrics: IterationMetrics,
}

/// Observer recording every iterate in memory.
///
/// Clones share the same storage, so one clone can be handed to the solver and another
/// kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    records: Arc<Mutex<Vec<IterationRecord>>>,
    pending: Arc<Mutex<IterationMetrics>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all records collected so far
    pub fn records(&self) -> ObserverResult<Vec<IterationRecord>> {
        let guard = self.records.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TraceRecorder::records".to_string(),
                reason: e.to_string(),
            }
            .log()
        })?;
        Ok(guard.clone())
    }

    /// Drop all collected records
    pub fn clear(&self) -> ObserverResult<()> {
        let mut guard = self.records.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TraceRecorder::clear".to_string(),
                reason: e.to_string(),
            }
            .log()
        })?;
        guard.clear();
        Ok(())
    }
}

impl OptObserver for TraceRecorder {
    fn set_iteration_metrics(&self, metrics: &IterationMetrics) {
        if let Ok(mut pending) = self.pending.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TraceRecorder::set_iteration_metrics".to_string(),
                reason: e.to_string(),
            }
            .log()
        }) {
            *pending = *metrics;
        }
    }

    fn on_step(&self, state: &OptimumState, iteration: usize) {
        let metrics = match self.pending.lock() {
            Ok(pending) => *pending,
            Err(e) => {
                let _ = ObserverError::MutexPoisoned {
                    context: "TraceRecorder::on_step".to_string(),
                    reason: e.to_string(),
                }
                .log();
                return;
            }
        };

        if let Ok(mut records) = self.records.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TraceRecorder::on_step".to_string(),
                reason: e.to_string(),
            }
            .log()
        }) {
            records.push(IterationRecord {
                iteration,
                x: state.x.clone(),
                z: state.z.clone(),
                metrics,
            });
        }
    }
}
