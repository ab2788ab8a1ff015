use crate::aggregation::DailySeries;
use crate::engine::Forecast;
use crate::{ForecastPoint, PointOrigin};
use chrono::NaiveDate;

/// Number of most recent observed days echoed back with a forecast.
pub const HISTORY_WINDOW: usize = 10;

/// History tail followed by the forecast, each in chronological order.
pub fn format_forecast(series: &DailySeries, forecast: &Forecast) -> Vec<ForecastPoint> {
    let history = series.tail(HISTORY_WINDOW);

    history
        .iter()
        .map(|(date, value)| point(date, value, PointOrigin::History))
        .chain(
            forecast
                .iter()
                .map(|(date, value)| point(date, value, PointOrigin::Forecast)),
        )
        .collect()
}

fn point(date: NaiveDate, value: f64, origin: PointOrigin) -> ForecastPoint {
    ForecastPoint {
        date: date.format("%Y-%m-%d").to_string(),
        // -0.0 prints as "-0" in JSON.
        value: if value == 0.0 { 0.0 } else { value },
        origin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ForecastEngine;

    fn series(start: (i32, u32, u32), values: Vec<f64>) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap();
        DailySeries::from_values(start, values).unwrap()
    }

    #[test]
    fn test_short_history_is_kept_whole() {
        let series = series((2024, 1, 1), vec![25.0, 0.0, 10.0]);
        let forecast = ForecastEngine::new().fit(&series).unwrap().forecast().unwrap();
        let points = format_forecast(&series, &forecast);

        assert_eq!(points.len(), 3 + 7);
        assert_eq!(points[0].date, "2024-01-01");
        assert_eq!(points[0].value, 25.0);
        assert_eq!(points[2].origin, PointOrigin::History);
        assert_eq!(points[3].date, "2024-01-04");
        assert_eq!(points[3].origin, PointOrigin::Forecast);
        assert_eq!(points[9].date, "2024-01-10");
    }

    #[test]
    fn test_long_history_keeps_last_ten_days() {
        let series = series((2024, 1, 1), (1..=30).map(f64::from).collect());
        let forecast = ForecastEngine::new().fit(&series).unwrap().forecast().unwrap();
        let points = format_forecast(&series, &forecast);

        assert_eq!(points.len(), HISTORY_WINDOW + 7);
        assert_eq!(points[0].date, "2024-01-21");
        assert_eq!(points[0].value, 21.0);
        assert_eq!(points[9].date, "2024-01-30");
        assert_eq!(points[10].date, "2024-01-31");
        assert_eq!(points[16].date, "2024-02-06");

        let origins: Vec<PointOrigin> = points.iter().map(|p| p.origin).collect();
        assert!(origins[..10].iter().all(|o| *o == PointOrigin::History));
        assert!(origins[10..].iter().all(|o| *o == PointOrigin::Forecast));
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let series = series((2024, 3, 1), vec![4.0, 6.5, 0.0, 8.0, 9.5]);
        let forecast = ForecastEngine::new().fit(&series).unwrap().forecast().unwrap();

        assert_eq!(
            format_forecast(&series, &forecast),
            format_forecast(&series, &forecast)
        );
    }

    #[test]
    fn test_points_serialize_with_lowercase_origin() {
        let series = series((2024, 1, 1), vec![0.0]);
        let forecast = ForecastEngine::new().fit(&series).unwrap().forecast().unwrap();
        let json = serde_json::to_value(format_forecast(&series, &forecast)).unwrap();

        assert_eq!(json[0]["origin"], "history");
        assert_eq!(json[0]["value"], 0.0);
        assert_eq!(json[1]["origin"], "forecast");
        assert_eq!(json[1]["date"], "2024-01-02");
    }
}
