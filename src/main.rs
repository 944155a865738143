use anyhow::{Context, Result};
use arrow::util::pretty::print_batches;
use sales_dashboard::{catalog, config::DashboardConfig, export, process};
use std::{env, path::PathBuf, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sales_dashboard=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configure inputs ─────────────────────────────────────────
    let csv_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data-dummies-yerba.csv"));
    let out_dir = env::var("DASHBOARD_OUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("dashboard"));
    let config = match env::var("DASHBOARD_CONFIG") {
        Ok(path) => DashboardConfig::from_yaml_file(&path)
            .with_context(|| format!("loading config {}", path))?,
        Err(_) => DashboardConfig::default(),
    };

    // ─── 3) load + normalize (fail-fast on any bad cell) ─────────────
    let start = Instant::now();
    let raw = process::load_raw_batch(&csv_path)
        .with_context(|| format!("reading {}", csv_path.display()))?;
    let table = process::normalize(&raw, &config)
        .with_context(|| format!("normalizing {}", csv_path.display()))?;

    // ─── 4) run the query catalog ────────────────────────────────────
    let tables = catalog::run_catalog(&table, &config).context("running query catalog")?;
    info!(elapsed = ?start.elapsed(), "pipeline done");

    // ─── 5) hand off to the presentation layer ───────────────────────
    for (name, batch) in tables.iter() {
        println!("── {} ──", name);
        print_batches(std::slice::from_ref(batch)).context("printing table")?;
    }
    let files = export::write_tables(&out_dir, &tables)
        .with_context(|| format!("exporting to {}", out_dir.display()))?;
    info!(files = files.len(), dir = %out_dir.display(), "all done");
    Ok(())
}
