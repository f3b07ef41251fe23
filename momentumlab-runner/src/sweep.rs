//! Parameter grid and the parallel sweep executor.
//!
//! The grid is materialised as an ordered list of [`GridCell`]s. Cells are
//! independent work units: the sweep maps an evaluation closure over them,
//! on the rayon pool or sequentially, and returns results in grid order
//! regardless of thread count.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use momentumlab_core::scoring::BenfordParams;
use momentumlab_core::BacktestParams;

use crate::volatility::VolatilityBand;

pub const COOLDOWNS: [usize; 4] = [2, 3, 5, 7];
pub const BENFORD_WINDOWS: [usize; 4] = [15, 20, 30, 45];
/// Benford influence candidates in percent.
pub const BENFORD_INFLUENCES_PCT: [u32; 5] = [5, 10, 15, 20, 25];
pub const BENFORD_MIN_HITS: [usize; 3] = [2, 3, 5];

/// One combination of tunable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub cooldown: usize,
    pub benford_window: usize,
    /// Fraction, e.g. 0.15.
    pub benford_influence: f64,
    pub min_hits: usize,
}

impl GridCell {
    pub fn benford(&self) -> BenfordParams {
        BenfordParams {
            influence: self.benford_influence,
            window: self.benford_window,
            min_hits: self.min_hits,
        }
    }

    /// `base` with this cell's exits, cooldown and Benford settings.
    pub fn apply(&self, base: &BacktestParams) -> BacktestParams {
        BacktestParams {
            take_profit: Some(self.take_profit),
            stop_loss: Some(self.stop_loss),
            cooldown: Some(self.cooldown),
            benford: self.benford(),
            ..base.clone()
        }
    }
}

/// Candidate values per parameter; the grid is their Cartesian product.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub take_profits: Vec<f64>,
    pub stop_losses: Vec<f64>,
    pub cooldowns: Vec<usize>,
    pub benford_windows: Vec<usize>,
    pub benford_influences: Vec<f64>,
    pub min_hits: Vec<usize>,
}

impl ParamGrid {
    /// Full walk-forward grid for a volatility band.
    pub fn for_band(band: VolatilityBand) -> Self {
        Self {
            take_profits: band.take_profits().to_vec(),
            stop_losses: band.stop_losses().to_vec(),
            cooldowns: COOLDOWNS.to_vec(),
            benford_windows: BENFORD_WINDOWS.to_vec(),
            benford_influences: BENFORD_INFLUENCES_PCT
                .iter()
                .map(|&p| f64::from(p) / 100.0)
                .collect(),
            min_hits: BENFORD_MIN_HITS.to_vec(),
        }
    }

    pub fn size(&self) -> usize {
        self.take_profits.len()
            * self.stop_losses.len()
            * self.cooldowns.len()
            * self.benford_windows.len()
            * self.benford_influences.len()
            * self.min_hits.len()
    }

    /// All cells, take-profit outermost and min-hits innermost.
    pub fn cells(&self) -> Vec<GridCell> {
        let mut cells = Vec::with_capacity(self.size());
        for &take_profit in &self.take_profits {
            for &stop_loss in &self.stop_losses {
                for &cooldown in &self.cooldowns {
                    for &benford_window in &self.benford_windows {
                        for &benford_influence in &self.benford_influences {
                            for &min_hits in &self.min_hits {
                                cells.push(GridCell {
                                    take_profit,
                                    stop_loss,
                                    cooldown,
                                    benford_window,
                                    benford_influence,
                                    min_hits,
                                });
                            }
                        }
                    }
                }
            }
        }
        cells
    }
}

/// Shared, caller-driven cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Results of a sweep, in grid order.
///
/// A cell skipped after cancellation holds `None`.
#[derive(Debug)]
pub struct SweepResults<T> {
    results: Vec<Option<T>>,
    cancelled: bool,
}

impl<T> SweepResults<T> {
    pub fn all(&self) -> &[Option<T>] {
        &self.results
    }

    pub fn completed(&self) -> impl Iterator<Item = (usize, &T)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (i, r)))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
    cancel: CancelToken,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self {
            parallel: true,
            cancel: CancelToken::new(),
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn sweep<T, F>(&self, cells: &[GridCell], eval: F) -> SweepResults<T>
    where
        T: Send,
        F: Fn(&GridCell) -> T + Send + Sync,
    {
        self.sweep_with_progress(cells, eval, |_, _| {})
    }

    /// Executes a sweep with progress reporting.
    ///
    /// The callback runs after each evaluated cell with the number of cells
    /// done so far and the grid size. Once the token is cancelled, remaining
    /// cells are skipped.
    pub fn sweep_with_progress<T, F, P>(
        &self,
        cells: &[GridCell],
        eval: F,
        progress: P,
    ) -> SweepResults<T>
    where
        T: Send,
        F: Fn(&GridCell) -> T + Send + Sync,
        P: Fn(usize, usize) + Send + Sync,
    {
        let total = cells.len();
        let done = AtomicUsize::new(0);
        let run = |cell: &GridCell| {
            if self.cancel.is_cancelled() {
                return None;
            }
            let result = eval(cell);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress(n, total);
            Some(result)
        };

        let results: Vec<Option<T>> = if self.parallel {
            cells.par_iter().map(run).collect()
        } else {
            cells.iter().map(run).collect()
        };

        SweepResults {
            cancelled: self.cancel.is_cancelled(),
            results,
        }
    }
}
