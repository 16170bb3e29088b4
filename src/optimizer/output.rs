//! Human-readable iteration trace.
//!
//! Rows are emitted with `tracing::info!` when [`OutputOptions::active`] is set. The column
//! layout is a convenience for reading convergence histories, not a stable format.

use crate::core::{result::ErrorNorms, state::OptimumState};
use crate::optimizer::{StepLengths, options::OutputOptions};
use tracing::info;

const WIDTH: usize = 13;

/// Formats the header and rows of the iteration trace
pub struct TraceOutput {
    active: bool,
    header: String,
}

impl TraceOutput {
    pub fn new(options: &OutputOptions, n: usize, m: usize) -> Self {
        if !options.active {
            return Self {
                active: false,
                header: String::new(),
            };
        }

        let mut columns = vec!["iter".to_string()];
        columns.extend(OutputOptions::labels(&options.x_prefix, &options.x_names, n));
        columns.extend(OutputOptions::labels(&options.y_prefix, &options.y_names, m));
        columns.extend(OutputOptions::labels(&options.z_prefix, &options.z_names, n));
        columns.extend(
            ["f", "h", "errorf", "errorh", "errorc", "error", "alpha", "alphax", "alphaz"]
                .iter()
                .map(|c| c.to_string()),
        );

        Self {
            active: true,
            header: columns
                .iter()
                .map(|column| format!("{column:>WIDTH$}"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn header(&self) {
        if self.active {
            info!("{}", self.header);
        }
    }

    /// Row for the initial iterate, before any step has been taken
    pub fn initial_row(&self, state: &OptimumState) {
        if self.active {
            info!("{}", Self::initial_line(state));
        }
    }

    fn initial_line(state: &OptimumState) -> String {
        let mut cells = Self::state_columns(0, state);
        cells.extend(std::iter::repeat_n(format!("{:>WIDTH$}", "---"), 7));
        cells.join(" ")
    }

    pub fn row(
        &self,
        iteration: usize,
        state: &OptimumState,
        errors: &ErrorNorms,
        steps: &StepLengths,
    ) {
        if self.active {
            info!("{}", Self::line(iteration, state, errors, steps));
        }
    }

    fn line(
        iteration: usize,
        state: &OptimumState,
        errors: &ErrorNorms,
        steps: &StepLengths,
    ) -> String {
        let mut cells = Self::state_columns(iteration, state);
        cells.extend(
            [
                errors.stationarity,
                errors.feasibility,
                errors.centering,
                errors.max(),
                steps.alpha,
                steps.alpha_x,
                steps.alpha_z,
            ]
            .iter()
            .map(|value| format!("{value:>WIDTH$.4e}")),
        );
        cells.join(" ")
    }

    /// Iteration, `x`, `y`, `z`, `f` and `‖h‖∞`, one cell each
    fn state_columns(iteration: usize, state: &OptimumState) -> Vec<String> {
        let mut cells = vec![format!("{iteration:>WIDTH$}")];
        cells.extend(
            state
                .x
                .iter()
                .chain(state.y.iter())
                .chain(state.z.iter())
                .chain([state.f, state.h.amax()].iter())
                .map(|value| format!("{value:>WIDTH$.4e}")),
        );
        cells
    }
}
