//! analytics-runner: CSV import and analytics reports for the merchant
//! activity ledger.
//!
//! Usage:
//!   analytics-runner import --db activities.db --data-dir ./data
//!   analytics-runner report --db activities.db
//!   analytics-runner report --db activities.db --only failure-rates
//!
//! Flags override environment settings (DATABASE_URL, DATA_DIR).

use anyhow::{bail, Result};
use merchant_analytics_core::{
    analytics::AnalyticsService, config::Settings, ingest, store::ActivityStore,
};
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("import") => run_import(&args),
        Some("report") => run_report(&args),
        Some(other) => bail!("unknown command: {other} (expected 'import' or 'report')"),
        None => bail!("usage: analytics-runner <import|report> [--db PATH] [--data-dir DIR]"),
    }
}

fn run_import(args: &[String]) -> Result<()> {
    let db = database_url(args)?;
    let data_dir = flag_value(args, "--data-dir")
        .map(PathBuf::from)
        .or_else(|| Settings::from_env().ok().map(|s| s.data_dir))
        .unwrap_or_else(|| PathBuf::from(merchant_analytics_core::config::DEFAULT_DATA_DIR));

    let store = ActivityStore::open(&db)?;
    let summary = ingest::run(&store, &data_dir)?;

    for report in &summary.files {
        println!(
            "  {}: {} rows processed, {} skipped (malformed)",
            report.file, report.processed, report.skipped
        );
    }
    println!(
        "Done. Total processed: {}, total skipped (malformed): {}",
        summary.total_processed, summary.total_skipped
    );
    Ok(())
}

fn run_report(args: &[String]) -> Result<()> {
    let db = database_url(args)?;
    let store = ActivityStore::open(&db)?;
    store.migrate()?;
    let service = AnalyticsService::new(&store);

    let rendered = match flag_value(args, "--only").as_deref() {
        Some("top-merchant") => serde_json::to_string_pretty(&service.top_merchant()?)?,
        Some("monthly-active-merchants") => {
            serde_json::to_string_pretty(&service.monthly_active_merchants()?)?
        }
        Some("product-adoption") => serde_json::to_string_pretty(&service.product_adoption()?)?,
        Some("kyc-funnel") => serde_json::to_string_pretty(&service.kyc_funnel()?)?,
        Some("failure-rates") => serde_json::to_string_pretty(&service.failure_rates()?)?,
        Some(other) => bail!("unknown report: {other}"),
        None => {
            let all = serde_json::json!({
                "top_merchant": service.top_merchant()?,
                "monthly_active_merchants": service.monthly_active_merchants()?,
                "product_adoption": service.product_adoption()?,
                "kyc_funnel": service.kyc_funnel()?,
                "failure_rates": service.failure_rates()?,
            });
            serde_json::to_string_pretty(&all)?
        }
    };
    println!("{rendered}");
    Ok(())
}

fn database_url(args: &[String]) -> Result<String> {
    if let Some(db) = flag_value(args, "--db") {
        return Ok(db);
    }
    Ok(Settings::from_env()?.database_url)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
