//! CSV ingestion: raw upload bytes into a [`RecordSet`], and row typing.
//!
//! Reading is permissive about layout (extra columns, any column
//! order, rows shorter than the header) and strict about content: a required
//! field that is absent or does not parse is an error, never a silent zero.

use crate::error::{Result, SalesForecastError};
use crate::schema::{ColumnLayout, RawRecord, RecordSet, TabularRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use serde_json::{Map, Number, Value};

/// Number of rows returned by an upload preview.
pub const PREVIEW_ROWS: usize = 5;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub fn parse_csv_bytes(bytes: &[u8]) -> Result<RecordSet> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| SalesForecastError::MalformedCsv(format!("failed to read header: {e}")))?
        .clone();

    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(SalesForecastError::MalformedCsv(
            "no columns to parse from input".to_string(),
        ));
    }

    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| SalesForecastError::MalformedCsv(e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() > columns.len() {
            return Err(SalesForecastError::MalformedCsv(format!(
                "expected {} fields on line {}, saw {}",
                columns.len(),
                line,
                record.len()
            )));
        }

        // A blank line between records carries no data.
        if record.iter().all(str::is_empty) && record.len() <= 1 {
            continue;
        }

        rows.push(TabularRow {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    debug!(
        "Parsed CSV upload: {} columns, {} data rows",
        columns.len(),
        rows.len()
    );

    Ok(RecordSet::new(columns, rows))
}

pub fn parse_record(row: &TabularRow, layout: &ColumnLayout) -> Result<RawRecord> {
    let date_raw = required_field(row, layout.date, "date")?;
    let date = parse_calendar_date(date_raw).ok_or_else(|| SalesForecastError::InvalidField {
        line: row.line,
        column: "date".to_string(),
        details: format!("'{date_raw}' is not a calendar date"),
    })?;

    let sku = required_field(row, layout.sku, "sku")?.to_string();

    let quantity_raw = required_field(row, layout.quantity, "quantity")?;
    let quantity = parse_quantity(quantity_raw).map_err(|details| {
        SalesForecastError::InvalidField {
            line: row.line,
            column: "quantity".to_string(),
            details,
        }
    })?;

    let price_raw = required_field(row, layout.price, "price")?;
    let price = parse_price(price_raw).map_err(|details| SalesForecastError::InvalidField {
        line: row.line,
        column: "price".to_string(),
        details,
    })?;

    Ok(RawRecord {
        date,
        sku,
        quantity,
        price,
    })
}

fn required_field<'a>(row: &'a TabularRow, idx: usize, column: &str) -> Result<&'a str> {
    match row.get(idx) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SalesForecastError::InvalidField {
            line: row.line,
            column: column.to_string(),
            details: "value is missing".to_string(),
        }),
    }
}

/// Interprets a date or timestamp string as a calendar date, dropping any time of day.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_local().date())
}

fn parse_quantity(raw: &str) -> std::result::Result<u64, String> {
    if let Ok(q) = raw.parse::<u64>() {
        return Ok(q);
    }

    // Spreadsheets often export whole numbers as "2.0".
    match raw.parse::<f64>() {
        Ok(q) if q.is_finite() && q < 0.0 => Err(format!("quantity {raw} is negative")),
        Ok(q) if q.is_finite() && q.fract() == 0.0 && q <= u64::MAX as f64 => Ok(q as u64),
        Ok(_) => Err(format!("'{raw}' is not a whole number")),
        Err(_) => Err(format!("'{raw}' is not a number")),
    }
}

fn parse_price(raw: &str) -> std::result::Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(p) if !p.is_finite() => Err(format!("'{raw}' is not a finite number")),
        Ok(p) if p < 0.0 => Err(format!("price {raw} is negative")),
        Ok(p) => Ok(p),
        Err(_) => Err(format!("'{raw}' is not a number")),
    }
}

/// First `PREVIEW_ROWS` rows as ordered column -> value maps.
///
/// Values are typed per cell the way a dataframe dump would show them:
/// integers, floats, `null` for empty cells and strings otherwise.
pub fn preview_rows(records: &RecordSet) -> Vec<Map<String, Value>> {
    records
        .rows()
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| {
            records
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, column)| (column.clone(), infer_json_value(row.get(idx))))
                .collect()
        })
        .collect()
}

fn infer_json_value(raw: Option<&str>) -> Value {
    let Some(raw) = raw.filter(|v| !v.is_empty()) else {
        return Value::Null;
    };

    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }

    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }

    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate_schema;

    fn layout() -> ColumnLayout {
        ColumnLayout {
            date: 0,
            sku: 1,
            quantity: 2,
            price: 3,
        }
    }

    fn row(fields: &[&str]) -> TabularRow {
        TabularRow {
            line: 7,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_csv_bytes_reads_header_and_rows() {
        let csv = b"date,sku,quantity,price\n2024-01-01,SKU1,2,10.0\n2024-01-02,SKU2,1,5.5\n";
        let records = parse_csv_bytes(csv).unwrap();

        assert_eq!(records.columns(), &["date", "sku", "quantity", "price"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records.rows()[0].line, 2);
        assert_eq!(records.rows()[1].fields[3], "5.5");
    }

    #[test]
    fn test_parse_csv_bytes_trims_and_strips_bom() {
        let csv = b"\xEF\xBB\xBFdate , sku,quantity,price\n 2024-01-01 ,A, 2 ,1\n";
        let records = parse_csv_bytes(csv).unwrap();

        assert_eq!(records.column_index("date"), Some(0));
        assert_eq!(records.rows()[0].fields[0], "2024-01-01");
        assert_eq!(records.rows()[0].fields[2], "2");
    }

    #[test]
    fn test_empty_upload_is_malformed() {
        let err = parse_csv_bytes(b"").unwrap_err();
        assert!(matches!(err, SalesForecastError::MalformedCsv(_)));
    }

    #[test]
    fn test_header_only_upload_has_no_rows() {
        let records = parse_csv_bytes(b"date,sku,quantity,price\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_row_with_too_many_fields_is_malformed() {
        let err = parse_csv_bytes(b"date,sku,quantity,price\n2024-01-01,A,1,2,extra\n").unwrap_err();
        assert!(matches!(err, SalesForecastError::MalformedCsv(_)));
    }

    #[test]
    fn test_parse_record_types_fields() {
        let record = parse_record(&row(&["2024-03-05", "SKU9", "3", "2.25"]), &layout()).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(record.sku, "SKU9");
        assert_eq!(record.quantity, 3);
        assert_eq!(record.price, 2.25);
        assert_eq!(record.revenue(), 6.75);
    }

    #[test]
    fn test_missing_quantity_is_parse_error() {
        let err = parse_record(&row(&["2024-03-05", "SKU9", "", "2.25"]), &layout()).unwrap_err();
        assert_eq!(
            err,
            SalesForecastError::InvalidField {
                line: 7,
                column: "quantity".to_string(),
                details: "value is missing".to_string(),
            }
        );
    }

    #[test]
    fn test_short_row_reports_missing_price() {
        let err = parse_record(&row(&["2024-03-05", "SKU9", "1"]), &layout()).unwrap_err();
        match err {
            SalesForecastError::InvalidField { column, .. } => assert_eq!(column, "price"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_and_negative_values_rejected() {
        for fields in [
            ["2024-03-05", "A", "two", "1.0"],
            ["2024-03-05", "A", "-1", "1.0"],
            ["2024-03-05", "A", "1.5", "1.0"],
            ["2024-03-05", "A", "1", "abc"],
            ["2024-03-05", "A", "1", "-0.5"],
            ["2024-03-05", "A", "1", "NaN"],
            ["2024-03-05", "A", "1", "inf"],
        ] {
            let result = parse_record(&row(&fields), &layout());
            assert!(result.is_err(), "{:?} should be rejected", fields);
        }
    }

    #[test]
    fn test_whole_float_quantity_accepted() {
        let record = parse_record(&row(&["2024-03-05", "A", "4.0", "1"]), &layout()).unwrap();
        assert_eq!(record.quantity, 4);
    }

    #[test]
    fn test_unparseable_date_rejected() {
        let err = parse_record(&row(&["yesterday", "A", "1", "1"]), &layout()).unwrap_err();
        match err {
            SalesForecastError::InvalidField { column, details, .. } => {
                assert_eq!(column, "date");
                assert!(details.contains("yesterday"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_calendar_date_discards_time_of_day() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        for raw in [
            "2024-01-03",
            "2024/01/03",
            "01/03/2024",
            "2024-01-03 23:59:59",
            "2024-01-03T08:15:00.250",
            "2024-01-03 08:15",
            "2024-01-03T23:30:00+05:00",
        ] {
            assert_eq!(parse_calendar_date(raw), Some(expected), "{}", raw);
        }
        assert_eq!(parse_calendar_date("2024-02-30"), None);
    }

    #[test]
    fn test_preview_rows_types_values_and_keeps_order() {
        let csv = b"sku,date,quantity,price,note\nA,2024-01-01,2,10.5,\nB,2024-01-02,1,3,hi\n";
        let records = parse_csv_bytes(csv).unwrap();
        let preview = preview_rows(&records);

        assert_eq!(preview.len(), 2);
        let keys: Vec<&String> = preview[0].keys().collect();
        assert_eq!(keys, vec!["sku", "date", "quantity", "price", "note"]);
        assert_eq!(preview[0]["quantity"], Value::from(2));
        assert_eq!(preview[0]["price"], Value::from(10.5));
        assert_eq!(preview[0]["note"], Value::Null);
        assert_eq!(preview[1]["note"], Value::from("hi"));
    }

    #[test]
    fn test_preview_rows_caps_at_five() {
        let mut csv = String::from("date,sku,quantity,price\n");
        for day in 1..=8 {
            csv.push_str(&format!("2024-01-0{day},A,1,1\n"));
        }
        let records = parse_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(preview_rows(&records).len(), PREVIEW_ROWS);
        assert_eq!(validate_schema(records).unwrap().len(), 8);
    }
}
