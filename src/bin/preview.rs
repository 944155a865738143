use anyhow::{Context, Result};
use arrow::util::pretty::print_batches;
use sales_dashboard::{config::DashboardConfig, process};
use std::{env, path::Path, process::exit};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(env_filter).init();

    // Expect a CSV path and an optional YAML config.
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <SALES_CSV> [CONFIG_YAML]", args[0]);
        exit(1);
    }
    if let Err(e) = preview(Path::new(&args[1]), args.get(2).map(Path::new)) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print the normalized sheet, its column types, and the display-label lookup.
fn preview(csv_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(p) => DashboardConfig::from_yaml_file(p)
            .with_context(|| format!("loading config {}", p.display()))?,
        None => DashboardConfig::default(),
    };

    let raw = process::load_raw_batch(csv_path)
        .with_context(|| format!("reading {}", csv_path.display()))?;
    let table = process::normalize(&raw, &config).context("normalizing sheet")?;

    // 1) Data
    println!("=== Data Preview: {} ===", csv_path.display());
    print_batches(std::slice::from_ref(&table.batch))?;
    println!();

    // 2) Column types
    println!("=== Column types ===");
    for field in table.batch.schema().fields() {
        println!(
            "- {:<30} | {:<8} | label: {}",
            field.name(),
            field.data_type().to_string(),
            table.labels.display(field.name())
        );
    }
    println!();

    // 3) Label lookup
    println!("=== Renamed columns ===");
    println!("{}", serde_json::to_string_pretty(&table.labels)?);
    Ok(())
}
