//! Daily revenue aggregation and gap-filling.

use crate::error::{Result, SalesForecastError};
use crate::schema::ValidatedRecordSet;
use crate::utils::{add_days, days_between, get_days_in_period};
use chrono::{Days, NaiveDate};
use log::{debug, info};
use std::collections::BTreeMap;

/// Longest series accepted, in days (ten years including leap days).
pub const MAX_SERIES_DAYS: usize = 3653;

/// Revenue per calendar day over an unbroken run of days.
///
/// Stored as a start date plus one value per day, so consecutive entries are
/// always exactly one day apart and no date can repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl DailySeries {
    pub fn from_values(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(SalesForecastError::EmptySeries);
        }

        if values.len() > MAX_SERIES_DAYS {
            return Err(SalesForecastError::InvalidSeries(format!(
                "{} days exceeds the limit of {} days",
                values.len(),
                MAX_SERIES_DAYS
            )));
        }

        if let Some((idx, v)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(SalesForecastError::InvalidSeries(format!(
                "value #{} ({}) must be finite and non-negative",
                idx, v
            )));
        }

        // The last date must be representable.
        add_days(start, values.len() as u64 - 1)?;

        Ok(Self { start, values })
    }

    /// Reindexes per-date totals onto every day between the first and last key,
    /// filling absent days with zero.
    pub fn from_daily_totals(totals: &BTreeMap<NaiveDate, f64>) -> Result<Self> {
        let (Some((&start, _)), Some((&end, _))) =
            (totals.first_key_value(), totals.last_key_value())
        else {
            return Err(SalesForecastError::EmptySeries);
        };

        // Checked before the span is allocated.
        let span = days_between(start, end) + 1;
        if span > MAX_SERIES_DAYS as i64 {
            return Err(SalesForecastError::InvalidSeries(format!(
                "dates from {} to {} span {} days, more than the limit of {} days",
                start, end, span, MAX_SERIES_DAYS
            )));
        }

        let values = get_days_in_period(start, end)
            .into_iter()
            .map(|day| totals.get(&day).copied().unwrap_or(0.0))
            .collect();

        Self::from_values(start, values)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.date_at(self.values.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        let offset = days_between(self.start, date);
        usize::try_from(offset)
            .ok()
            .and_then(|idx| self.values.get(idx).copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.start
            .iter_days()
            .zip(self.values.iter().copied())
    }

    /// The last `n` days; never fewer than one, all of them if the series is shorter.
    pub fn tail(&self, n: usize) -> DailySeries {
        let skip = self.values.len().saturating_sub(n.max(1));
        DailySeries {
            start: self.date_at(skip),
            values: self.values[skip..].to_vec(),
        }
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    fn date_at(&self, idx: usize) -> NaiveDate {
        // In range by construction (checked in `from_values`).
        self.start
            .checked_add_days(Days::new(idx as u64))
            .unwrap_or(self.start)
    }
}

/// Sums revenue per calendar day and fills every missing day in the span with zero.
pub fn aggregate_daily(records: &ValidatedRecordSet) -> Result<DailySeries> {
    if records.is_empty() {
        return Err(SalesForecastError::EmptySeries);
    }

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records.records() {
        let record = record?;
        *totals.entry(record.date).or_insert(0.0) += record.revenue();
    }

    let series = DailySeries::from_daily_totals(&totals)?;

    info!(
        "Aggregated {} rows into {} days ({} to {})",
        records.len(),
        series.len(),
        series.start_date(),
        series.end_date()
    );
    debug!(
        "{} of {} days had no transactions and were zero-filled",
        series.len() - totals.len(),
        series.len()
    );

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::parse_csv_bytes;
    use crate::schema::validate_schema;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn aggregate(csv: &str) -> Result<DailySeries> {
        let validated = validate_schema(parse_csv_bytes(csv.as_bytes())?)?;
        aggregate_daily(&validated)
    }

    #[test]
    fn test_groups_and_fills_gaps() {
        let series = aggregate(
            "date,sku,quantity,price\n\
             2024-01-01,SKU1,2,10.0\n\
             2024-01-01,SKU2,1,5.0\n\
             2024-01-03,SKU1,1,10.0\n",
        )
        .unwrap();

        assert_eq!(series.start_date(), date(2024, 1, 1));
        assert_eq!(series.end_date(), date(2024, 1, 3));
        assert_eq!(series.values(), &[25.0, 0.0, 10.0]);
    }

    #[test]
    fn test_unsorted_rows_and_time_of_day() {
        let series = aggregate(
            "date,sku,quantity,price\n\
             2024-01-05 18:00:00,A,1,4.0\n\
             2024-01-02 09:30:00,B,3,1.0\n\
             2024-01-05 08:00:00,C,2,0.5\n",
        )
        .unwrap();

        assert_eq!(series.start_date(), date(2024, 1, 2));
        assert_eq!(series.values(), &[3.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_single_date_gives_length_one() {
        let series = aggregate("date,sku,quantity,price\n2024-06-01,A,2,3.5\n").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.values(), &[7.0]);
    }

    #[test]
    fn test_zero_rows_is_empty_series() {
        let err = aggregate("date,sku,quantity,price\n").unwrap_err();
        assert_eq!(err, SalesForecastError::EmptySeries);
    }

    #[test]
    fn test_bad_row_fails_fast() {
        let err = aggregate(
            "date,sku,quantity,price\n\
             2024-01-01,A,1,1\n\
             2024-01-02,B,1,\n",
        )
        .unwrap_err();
        assert_eq!(
            err,
            SalesForecastError::InvalidField {
                line: 3,
                column: "price".to_string(),
                details: "value is missing".to_string(),
            }
        );
    }

    #[test]
    fn test_consecutive_dates_are_one_day_apart() {
        let series = aggregate(
            "date,sku,quantity,price\n\
             2024-02-27,A,1,1\n\
             2024-03-02,A,1,1\n\
             2023-12-30,A,1,1\n",
        )
        .unwrap();

        let dates: Vec<NaiveDate> = series.iter().map(|(d, _)| d).collect();
        assert_eq!(dates.len(), series.len());
        for pair in dates.windows(2) {
            assert_eq!(pair[0].succ_opt().unwrap(), pair[1]);
        }
    }

    #[test]
    fn test_from_values_rejects_bad_input() {
        assert_eq!(
            DailySeries::from_values(date(2024, 1, 1), vec![]).unwrap_err(),
            SalesForecastError::EmptySeries
        );
        assert!(DailySeries::from_values(date(2024, 1, 1), vec![1.0, f64::NAN]).is_err());
        assert!(DailySeries::from_values(date(2024, 1, 1), vec![-1.0]).is_err());
    }

    #[test]
    fn test_far_apart_years_exceed_span_limit() {
        let err = aggregate(
            "date,sku,quantity,price\n\
             +200000-01-01,A,1,1\n\
             -200000-01-01,A,1,1\n",
        )
        .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::ParseError);
        match err {
            SalesForecastError::InvalidSeries(details) => {
                assert!(details.contains("146097001 days"), "{}", details)
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = aggregate(
            "date,sku,quantity,price\n\
             0001-01-01,A,1,1\n\
             2024-12-31,A,1,1\n",
        )
        .unwrap_err();
        assert!(matches!(err, SalesForecastError::InvalidSeries(_)));
    }

    #[test]
    fn test_span_at_limit_is_accepted() {
        let start = date(2015, 1, 1);
        let mut totals = BTreeMap::new();
        totals.insert(start, 5.0);
        totals.insert(add_days(start, MAX_SERIES_DAYS as u64 - 1).unwrap(), 7.0);

        let series = DailySeries::from_daily_totals(&totals).unwrap();
        assert_eq!(series.len(), MAX_SERIES_DAYS);

        totals.insert(add_days(start, MAX_SERIES_DAYS as u64).unwrap(), 1.0);
        assert!(DailySeries::from_daily_totals(&totals).is_err());
        assert!(DailySeries::from_values(start, vec![0.0; MAX_SERIES_DAYS + 1]).is_err());
    }

    #[test]
    fn test_tail_and_lookup() {
        let series = DailySeries::from_values(date(2024, 1, 1), (1..=12).map(f64::from).collect())
            .unwrap();

        let tail = series.tail(10);
        assert_eq!(tail.len(), 10);
        assert_eq!(tail.start_date(), date(2024, 1, 3));
        assert_eq!(tail.values()[0], 3.0);

        assert_eq!(series.tail(50), series);
        assert_eq!(series.get(date(2024, 1, 12)), Some(12.0));
        assert_eq!(series.get(date(2023, 12, 31)), None);
        assert_eq!(series.total(), 78.0);
    }
}
