//! Additive-trend exponential smoothing (Holt's linear method).
//!
//! The model keeps a smoothed level `L` and trend `T`:
//!
//! ```text
//! prediction  ŷ_t = L_{t-1} + T_{t-1}
//! level       L_t = α·y_t + (1 − α)·(L_{t-1} + T_{t-1})
//! trend       T_t = β·(L_t − L_{t-1}) + (1 − β)·T_{t-1}
//! forecast    ŷ_{n+h} = L_n + h·T_n
//! ```
//!
//! Fitting minimizes the in-sample one-step-ahead SSE over `α, β ∈ [0, 1]`
//! and the initial state `(L_0, T_0)`. For fixed `(α, β)` every prediction is
//! linear in `(L_0, T_0)`, so the initial state is solved exactly by least
//! squares and only `(α, β)` are searched: a deterministic coarse grid, then
//! progressively narrower local grids around the best candidate.

use crate::aggregation::DailySeries;
use crate::error::{Result, SalesForecastError};
use crate::schema::ModelSummary;
use crate::utils::{add_days, next_day, solve_least_squares};
use chrono::NaiveDate;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

/// Number of days projected past the last observation.
pub const FORECAST_HORIZON: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SmoothingState {
    level: f64,
    trend: f64,
}

impl SmoothingState {
    const ZERO: SmoothingState = SmoothingState {
        level: 0.0,
        trend: 0.0,
    };

    fn predict(&self) -> f64 {
        self.level + self.trend
    }

    fn update(&self, observed: f64, params: SmoothingParams) -> SmoothingState {
        let level = params.alpha * observed + (1.0 - params.alpha) * self.predict();
        let trend = params.beta * (level - self.level) + (1.0 - params.beta) * self.trend;
        SmoothingState { level, trend }
    }

    fn is_finite(&self) -> bool {
        self.level.is_finite() && self.trend.is_finite()
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    params: SmoothingParams,
    initial: SmoothingState,
    last: SmoothingState,
    fitted: Vec<f64>,
    sse: f64,
}

/// Smoothing state fitted to one daily series.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    params: SmoothingParams,
    initial_level: f64,
    initial_trend: f64,
    level: f64,
    trend: f64,
    fitted: Vec<f64>,
    sse: f64,
    last_date: NaiveDate,
    flat_fallback: bool,
}

impl FittedModel {
    /// Level = the only observation, trend = 0.
    fn flat(series: &DailySeries) -> Self {
        let value = series.values()[0];
        FittedModel {
            params: SmoothingParams {
                alpha: 1.0,
                beta: 0.0,
            },
            initial_level: value,
            initial_trend: 0.0,
            level: value,
            trend: 0.0,
            fitted: vec![value],
            sse: 0.0,
            last_date: series.end_date(),
            flat_fallback: true,
        }
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn trend(&self) -> f64 {
        self.trend
    }

    pub fn initial_level(&self) -> f64 {
        self.initial_level
    }

    pub fn initial_trend(&self) -> f64 {
        self.initial_trend
    }

    /// One-step-ahead in-sample predictions, one per observed day.
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    pub fn sse(&self) -> f64 {
        self.sse
    }

    pub fn rmse(&self) -> f64 {
        (self.sse / self.fitted.len() as f64).sqrt()
    }

    pub fn observations(&self) -> usize {
        self.fitted.len()
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    /// True when the series had a single day and no trend could be estimated.
    pub fn is_flat_fallback(&self) -> bool {
        self.flat_fallback
    }

    /// Projects the next `FORECAST_HORIZON` days as `level + h·trend`.
    pub fn forecast(&self) -> Result<Forecast> {
        let values: Vec<f64> = (1..=FORECAST_HORIZON)
            .map(|h| normalize_zero(self.level + h as f64 * self.trend))
            .collect();

        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(SalesForecastError::ModelFit(format!(
                "forecast produced a non-finite value ({})",
                bad
            )));
        }

        Ok(Forecast {
            start: next_day(self.last_date)?,
            values,
        })
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            alpha: self.params.alpha,
            beta: self.params.beta,
            level: normalize_zero(self.level),
            trend: normalize_zero(self.trend),
            sse: self.sse,
            rmse: self.rmse(),
            observations: self.observations(),
        }
    }
}

/// Exactly `FORECAST_HORIZON` projected values on consecutive days.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    start: NaiveDate,
    values: Vec<f64>,
}

impl Forecast {
    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        add_days(self.start, self.values.len() as u64 - 1).unwrap_or(self.start)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.start.iter_days().zip(self.values.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastEngine {
    grid_steps: usize,
    refine_rounds: usize,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self {
            grid_steps: 21,
            refine_rounds: 4,
        }
    }
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// `grid_steps` points per axis on the coarse grid (at least 2), then
    /// `refine_rounds` local passes that halve the spacing each time.
    pub fn with_search(grid_steps: usize, refine_rounds: usize) -> Self {
        Self {
            grid_steps: grid_steps.max(2),
            refine_rounds,
        }
    }

    pub fn fit(&self, series: &DailySeries) -> Result<FittedModel> {
        let y = series.values();

        if y.len() == 1 {
            warn!(
                "Only one day of sales ({}); forecasting a flat line at {}",
                series.start_date(),
                y[0]
            );
            return Ok(FittedModel::flat(series));
        }

        if y.len() <= 3 {
            warn!(
                "Only {} days of sales; the fitted trend may be unstable",
                y.len()
            );
        }

        let mut best: Option<Candidate> = None;
        let coarse_step = 1.0 / (self.grid_steps - 1) as f64;

        for i in 0..self.grid_steps {
            for j in 0..self.grid_steps {
                let params = SmoothingParams {
                    alpha: i as f64 * coarse_step,
                    beta: j as f64 * coarse_step,
                };
                consider(&mut best, evaluate(y, params));
            }
        }

        let mut step = coarse_step;
        for round in 0..self.refine_rounds {
            let Some(center) = best.as_ref().map(|c| c.params) else {
                break;
            };
            step /= 2.0;

            for da in -2i32..=2 {
                for db in -2i32..=2 {
                    if da == 0 && db == 0 {
                        continue;
                    }
                    let params = SmoothingParams {
                        alpha: (center.alpha + da as f64 * step).clamp(0.0, 1.0),
                        beta: (center.beta + db as f64 * step).clamp(0.0, 1.0),
                    };
                    consider(&mut best, evaluate(y, params));
                }
            }

            if let Some(c) = &best {
                debug!(
                    "Refinement round {}: alpha={:.5}, beta={:.5}, sse={:.6}",
                    round + 1,
                    c.params.alpha,
                    c.params.beta,
                    c.sse
                );
            }
        }

        let Some(best) = best else {
            return Err(SalesForecastError::ModelFit(format!(
                "no smoothing parameters produced finite estimates for {} days of data",
                y.len()
            )));
        };

        let model = FittedModel {
            params: best.params,
            initial_level: best.initial.level,
            initial_trend: best.initial.trend,
            level: best.last.level,
            trend: best.last.trend,
            sse: best.sse,
            fitted: best.fitted,
            last_date: series.end_date(),
            flat_fallback: false,
        };

        info!(
            "Fitted additive-trend smoothing on {} days: alpha={:.4}, beta={:.4}, level={:.4}, trend={:.4}, rmse={:.4}",
            model.observations(),
            model.params.alpha,
            model.params.beta,
            model.level,
            model.trend,
            model.rmse()
        );

        Ok(model)
    }
}

fn consider(best: &mut Option<Candidate>, candidate: Option<Candidate>) {
    let Some(candidate) = candidate else {
        return;
    };
    // Ties keep the earlier candidate.
    let improves = best
        .as_ref()
        .map_or(true, |current| candidate.sse < current.sse);
    if improves {
        *best = Some(candidate);
    }
}

/// Best initial state and resulting fit for fixed `(α, β)`.
///
/// Returns `None` when any intermediate value is non-finite.
fn evaluate(y: &[f64], params: SmoothingParams) -> Option<Candidate> {
    let n = y.len();

    // Predictions decompose as: response to the data from a zero state, plus
    // L_0 times the response to a unit level, plus T_0 times the response to
    // a unit trend (both with zero data).
    let mut from_data = SmoothingState::ZERO;
    let mut unit_level = SmoothingState {
        level: 1.0,
        trend: 0.0,
    };
    let mut unit_trend = SmoothingState {
        level: 0.0,
        trend: 1.0,
    };

    let mut design = DMatrix::<f64>::zeros(n, 2);
    let mut target = DVector::<f64>::zeros(n);

    for (t, &observed) in y.iter().enumerate() {
        design[(t, 0)] = unit_level.predict();
        design[(t, 1)] = unit_trend.predict();
        target[t] = observed - from_data.predict();

        from_data = from_data.update(observed, params);
        unit_level = unit_level.update(0.0, params);
        unit_trend = unit_trend.update(0.0, params);

        if !(from_data.is_finite() && unit_level.is_finite() && unit_trend.is_finite()) {
            return None;
        }
    }

    let solution = solve_least_squares(&design, &target)?;
    let initial = SmoothingState {
        level: solution[0],
        trend: solution[1],
    };

    let mut state = initial;
    let mut fitted = Vec::with_capacity(n);
    let mut sse = 0.0;

    for &observed in y {
        let predicted = state.predict();
        let error = observed - predicted;
        sse += error * error;
        fitted.push(normalize_zero(predicted));

        state = state.update(observed, params);
        if !(state.is_finite() && sse.is_finite()) {
            return None;
        }
    }

    Some(Candidate {
        params,
        initial,
        last: state,
        fitted,
        sse,
    })
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}
