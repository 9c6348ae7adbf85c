//! Cache command - inspect or clear bundle caches

use crate::bundle::BundleRefs;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::cli::commands::{decide_all, load_bundles, with_cache_key, DecisionReport};
use crate::config::Config;
use crate::error::OptimizerResult;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> OptimizerResult<()> {
    match args.action {
        CacheAction::Status {
            bundles,
            optimizer_cache_key,
            format,
        } => show_status(&bundles, optimizer_cache_key, format, config).await,
        CacheAction::Clear { bundles } => clear_caches(&bundles).await,
    }
}

/// Show the cache decision for every bundle
async fn show_status(
    path: &Path,
    optimizer_cache_key: Option<String>,
    format: OutputFormat,
    config: &Config,
) -> OptimizerResult<()> {
    let bundles = load_bundles(path).await?;
    let worker = with_cache_key(&config.worker, optimizer_cache_key);
    let bundle_refs = BundleRefs::from_bundles(bundles.iter().map(Arc::as_ref));

    let reports: Vec<DecisionReport> = decide_all(&bundles, &worker, &bundle_refs)
        .await?
        .iter()
        .map(|(bundle, decision)| DecisionReport::new(bundle, decision))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("No bundles found.");
                return Ok(());
            }

            for report in &reports {
                report.print_text();
            }

            let cached = reports.iter().filter(|r| r.is_cached()).count();
            println!();
            println!("Cached: {} of {}", cached, reports.len());
        }
    }

    Ok(())
}

/// Remove the cache record of every bundle
async fn clear_caches(path: &Path) -> OptimizerResult<()> {
    let bundles = load_bundles(path).await?;

    for bundle in &bundles {
        debug!("Clearing {}", bundle.cache.path().display());
        bundle.cache.clear()?;
    }

    println!(
        "{} Cleared {} bundle cache(s)",
        style("✓").green(),
        bundles.len()
    );
    Ok(())
}
