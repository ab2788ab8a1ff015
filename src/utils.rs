use crate::error::{Result, SalesForecastError};
use chrono::{Days, NaiveDate};
use nalgebra::{DMatrix, DVector};

pub fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt().ok_or_else(|| {
        SalesForecastError::InvalidSeries(format!("no calendar day follows {}", date))
    })
}

pub fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days)).ok_or_else(|| {
        SalesForecastError::InvalidSeries(format!("{} + {} days is out of range", date, days))
    })
}

/// Every calendar day from `start` to `end`, both inclusive.
pub fn get_days_in_period(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if end < start {
        return Vec::new();
    }
    start.iter_days().take_while(|d| *d <= end).collect()
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Least-squares solution of `x * beta = y` via SVD.
///
/// Returns `None` when no tolerance yields a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
