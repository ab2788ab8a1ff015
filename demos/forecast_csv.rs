use retail_pulse::*;
use std::error::Error;

const DEFAULT_PATH: &str = "demos/data/sample_sales.csv";

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PATH.to_string());

    println!("📊 Retail Pulse Forecast Demo\n");
    println!("Reading transactions from {}\n", path);

    let bytes = std::fs::read(&path)?;

    let preview = preview_upload(&bytes)?;
    println!("📋 Upload: {} rows", preview.rows_received);
    for row in &preview.preview {
        println!("  {}", serde_json::to_string(row)?);
    }

    let report = match process_sales_forecast(&bytes) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("❌ {} ({:?}, {:?})", e, e.kind(), e.category());
            return Err(e.into());
        }
    };

    println!("\n🔄 Model:");
    println!(
        "  alpha = {:.4}, beta = {:.4}",
        report.model.alpha, report.model.beta
    );
    println!(
        "  level = {:.2}, trend = {:+.2}/day, rmse = {:.2} over {} days",
        report.model.level, report.model.trend, report.model.rmse, report.model.observations
    );

    println!("\n✅ Revenue:\n");
    for point in &report.points {
        let marker = match point.origin {
            PointOrigin::History => "  ",
            PointOrigin::Forecast => "→ ",
        };
        println!("  {}{}: ${:>10.2}", marker, point.date, point.value);
    }

    let projected: f64 = report.forecast().map(|p| p.value).sum();
    println!(
        "\n  Projected revenue for the next {} days: ${:.2}",
        FORECAST_HORIZON, projected
    );

    Ok(())
}
