use std::time::Duration;

use console::style;
use repocache::db;
use repocache::entity::platform::Platform;
use repocache::http::reqwest_transport::ReqwestTransport;
use repocache::source::HttpPageSource;
use repocache::{RefetchOutcome, RefetchReport, Refetcher};
use sea_orm::Iterable;

use crate::config::Config;
use crate::shutdown;

/// Per-request timeout for listing calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

type HttpRefetcher = Refetcher<HttpPageSource<ReqwestTransport>>;

async fn build_refetcher(
    config: &Config,
    database_url: &str,
) -> Result<HttpRefetcher, Box<dyn std::error::Error>> {
    let db = db::connect_and_migrate(database_url).await?;

    let mut source = HttpPageSource::new(ReqwestTransport::with_timeout(HTTP_TIMEOUT)?);
    for platform in Platform::iter() {
        let endpoint = config.endpoint(platform);
        if endpoint.token.is_none() {
            tracing::debug!(platform = %platform, "No API token configured, listing anonymously");
        }
        source = source.with_endpoint(platform, endpoint);
    }

    Ok(Refetcher::new(db, source).with_options(config.refetch.options()))
}

fn print_report(report: &RefetchReport) {
    let partial = if report.partial_list {
        format!(" {}", style("(partial listing)").yellow())
    } else {
        String::new()
    };
    println!(
        "{} participant {} on {}: {} page(s), {} of {} record(s) kept, {} removed{}",
        style("✓").green().bold(),
        report.participant,
        style(report.platform).cyan(),
        report.pages_fetched,
        report.records_kept,
        report.records_received,
        report.deleted_count,
        partial,
    );
}

fn print_outcome(outcome: &RefetchOutcome) {
    match outcome {
        RefetchOutcome::Idle => println!("Nothing is due for a refetch."),
        RefetchOutcome::Busy {
            participant,
            platform,
        } => println!(
            "{} participant {} on {} is being refetched by another process",
            style("⚠").yellow().bold(),
            participant,
            platform
        ),
        RefetchOutcome::Completed(report) => print_report(report),
    }
}

/// Refetch the stalest pair once.
pub(crate) async fn handle_refetch(
    config: &Config,
    database_url: &str,
    timeout_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let refetcher = build_refetcher(config, database_url).await?;
    let timeout = timeout_secs.map_or_else(|| config.refetch.timeout(), Duration::from_secs);

    let outcome = refetcher.refetch_with_timeout(timeout).await?;
    print_outcome(&outcome);
    Ok(())
}

/// Refetch one pair now, stale or not.
pub(crate) async fn handle_fetch(
    config: &Config,
    database_url: &str,
    participant: i64,
    platform: Platform,
) -> Result<(), Box<dyn std::error::Error>> {
    let refetcher = build_refetcher(config, database_url).await?;
    let outcome = refetcher.refetch_pair(participant, platform).await?;
    print_outcome(&outcome);
    Ok(())
}

/// Run one refetch per interval until Ctrl+C.
///
/// Failed runs are logged and retried on a later tick; the failed pair is
/// still the stalest one, so it is picked again.
pub(crate) async fn handle_schedule(
    config: &Config,
    database_url: &str,
    interval_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let refetcher = build_refetcher(config, database_url).await?;
    let interval = interval_secs.map_or_else(|| config.refetch.schedule_interval(), Duration::from_secs);
    let timeout = config.refetch.timeout();

    shutdown::setup_shutdown_handler();
    tracing::info!(
        interval_secs = interval.as_secs(),
        timeout_secs = timeout.as_secs(),
        "Starting refetch schedule"
    );

    let mut runs: u64 = 0;
    let mut failures: u64 = 0;
    while !shutdown::is_shutdown_requested() {
        runs += 1;
        match refetcher.refetch_with_timeout(timeout).await {
            Ok(RefetchOutcome::Completed(report)) => print_report(&report),
            Ok(RefetchOutcome::Idle) => tracing::debug!("Nothing is due for a refetch"),
            Ok(RefetchOutcome::Busy {
                participant,
                platform,
            }) => tracing::info!(participant, platform = %platform, "Pair busy, skipping"),
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Refetch run failed"
                );
            }
        }
        shutdown::sleep_unless_shutdown(interval).await;
    }

    tracing::info!(runs, failures, "Refetch schedule stopped");
    Ok(())
}
