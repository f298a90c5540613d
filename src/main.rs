use anyhow::Result;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ats_trends::config::Config;
use ats_trends::error::{ErrorKind, error_kind};
use ats_trends::fetch::HttpPageSource;
use ats_trends::ingest::{IngestOptions, ingest_leagues};
use ats_trends::store::{Store, timestamp};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        report_failure(&err);
        std::process::exit(1);
    }
}

// Written straight to stderr so the failing stage is visible even when
// RUST_LOG filters out error events.
fn report_failure(err: &anyhow::Error) {
    let kind = error_kind(err).map_or("Error", ErrorKind::as_str);
    eprintln!("{kind}: {err}");
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
    debug!(kind, error = ?err, "scrape aborted");
}

fn run() -> Result<()> {
    let config = Config::from_env_and_args()?;
    let mut store = Store::open(&config.database_url)?;
    let options = IngestOptions::new(config.policy, config.leagues);

    let summary = ingest_leagues(&mut store, &HttpPageSource, &options)?;

    for league in &summary.per_league {
        println!("\n=== {} ===", league.league.to_uppercase());
        println!("Fetched: {}", league.url);
        println!("Rows parsed: {}", league.rows_parsed);
        println!(
            "Snapshots written ({}): {} (run_id={})",
            summary.policy, league.rows_affected, league.run_id
        );
    }

    println!(
        "\nDone. Total snapshots written across leagues: {}",
        summary.total_rows_affected
    );
    println!("scraped_at (UTC): {}", timestamp(summary.scraped_at));
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}=info", env!("CARGO_CRATE_NAME"))));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
