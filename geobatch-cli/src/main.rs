use anyhow::Result;
use geobatch_core::{
    resolve_api_key, top_locations, unique_filename, GeocodeConfig, GeocodeEngine, InputTable,
    ProviderConfig, ReportStats, DEFAULT_WINDOW,
};

mod cli;

fn main() -> Result<()> {
    let args = cli::parse_args();

    // Initialize logger with appropriate level based on verbose flag
    if std::env::var("RUST_LOG").is_err() {
        if args.verbose {
            std::env::set_var("RUST_LOG", "debug");
        } else {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    if args.dry_run {
        log::info!("Running in DRY-RUN mode - no provider will be called");
    }

    let table = InputTable::load_csv(&args.input)?;
    let columns = args.column_selection(table.headers())?;
    log::info!(
        "Using columns '{}' / '{}'",
        columns.latitude,
        columns.longitude
    );

    let mut provider = ProviderConfig::new(args.provider).with_api_key(resolve_api_key(args.api_key.clone()));
    if args.quota.is_some() {
        provider = provider.with_quota(args.quota);
    }

    let engine = GeocodeEngine::new(GeocodeConfig {
        provider,
        log_window: DEFAULT_WINDOW,
    });

    let preflight = engine.preflight(&table, &columns)?;
    println!("Provider:        {}", preflight.provider);
    println!("Rows:            {}", preflight.total_rows);
    println!("Valid rows:      {}", preflight.valid_rows);
    println!("Planned calls:   {}", preflight.planned_calls);
    if preflight.deferred_rows > 0 {
        println!(
            "Deferred rows:   {} (quota reached, rerun later)",
            preflight.deferred_rows
        );
    }
    println!("Estimated time:  {:.1}s", preflight.estimated.as_secs_f64());

    if args.dry_run {
        log::info!("[DRY RUN] No requests sent");
        return Ok(());
    }

    let outcome = engine.run(&preflight, &table, &columns, |progress, _log| {
        log::debug!(
            "Progress {:.1}% ({}/{}), last row {}, about {:.0}s remaining",
            progress.percent(),
            progress.row,
            progress.total_rows,
            progress.status,
            progress.remaining.as_secs_f64()
        );
    })?;

    let counters = outcome.counters();
    println!();
    println!("✅ Geocoded:   {}", counters.processed);
    println!("❌ Failed:     {}", counters.errors);
    println!("⏭️ Skipped:    {}", counters.skipped);
    if counters.deferred > 0 {
        println!("⏸️ Deferred:   {}", counters.deferred);
    }

    let report = &outcome.report;
    let stats = ReportStats::from_report(report);
    println!(
        "Success rate: {:.1}% ({} of {}), {} states, {} cities, {} countries",
        stats.success_rate,
        stats.successful,
        stats.total_records,
        stats.unique_states,
        stats.unique_cities,
        stats.unique_countries
    );
    for (city, count) in top_locations(report, "City", 5) {
        println!("  {:<30} {}", city, count);
    }

    let stem = unique_filename();
    for format in args.format.exports() {
        let path = report.save(&args.output, &stem, format)?;
        println!("Saved {}", path.display());
    }

    if counters.deferred > 0 {
        log::warn!(
            "{} rows were deferred by the quota; rerun them later",
            counters.deferred
        );
    }

    log::info!("Processing complete!");

    Ok(())
}
