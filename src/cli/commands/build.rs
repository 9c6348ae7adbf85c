//! Build command - compile every bundle that is not cached

use crate::bundle::BundleRefs;
use crate::cli::args::{BuildArgs, OutputFormat};
use crate::cli::commands::{decide_all, load_bundles, with_cache_key, DecisionReport};
use crate::config::{Config, WorkerConfig};
use crate::error::{OptimizerError, OptimizerResult};
use crate::orchestration::{CompilerEvent, CompilerMsg, Orchestrator, ProcessCompiler};
use console::style;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> OptimizerResult<()> {
    let bundles = load_bundles(&args.bundles).await?;
    let worker = worker_config(&args, &config.worker);
    let bundle_refs = BundleRefs::from_bundles(bundles.iter().map(Arc::as_ref));

    let mut to_compile = Vec::new();
    for (bundle, decision) in decide_all(&bundles, &worker, &bundle_refs).await? {
        let report = DecisionReport::new(&bundle, &decision);
        match args.format {
            OutputFormat::Text => report.print_text(),
            OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        }

        // Watch mode keeps every bundle hot, cached or not
        if worker.watch || !decision.is_cached() {
            to_compile.push(bundle);
        }
    }

    if to_compile.is_empty() {
        if args.format == OutputFormat::Text {
            println!(
                "{} All {} bundles are cached",
                style("✓").green(),
                bundles.len()
            );
        }
        return Ok(());
    }

    let compiler = Arc::new(ProcessCompiler::new(config.compiler.clone()));
    let mut handle = Orchestrator::new(worker, to_compile, bundle_refs, compiler)?.start();
    let mut failed = BTreeSet::new();

    loop {
        tokio::select! {
            msg = handle.next_event() => {
                let Some(msg) = msg else { break };
                print_event(&msg, args.format)?;
                track_failure(&mut failed, &msg);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping compiler");
                handle.stop();
            }
        }
    }

    handle.wait().await?;

    if failed.is_empty() {
        Ok(())
    } else {
        Err(OptimizerError::User(format!(
            "{} bundle(s) failed to build: {}",
            failed.len(),
            failed.into_iter().collect::<Vec<_>>().join(", ")
        )))
    }
}

fn worker_config(args: &BuildArgs, worker: &WorkerConfig) -> WorkerConfig {
    let mut worker = with_cache_key(worker, args.optimizer_cache_key.clone());
    worker.watch |= args.watch;
    worker.profile_webpack |= args.profile;
    if args.no_cache {
        worker.cache = false;
    }
    worker
}

/// Keep the set of bundles whose latest pass did not succeed
fn track_failure(failed: &mut BTreeSet<String>, msg: &CompilerMsg) {
    if !msg.state.is_terminal() {
        return;
    }

    if matches!(msg.state, CompilerEvent::Success { .. }) {
        failed.remove(&msg.bundle_id);
    } else {
        failed.insert(msg.bundle_id.clone());
    }
}

fn print_event(msg: &CompilerMsg, format: OutputFormat) -> OptimizerResult<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string(msg)?);
        return Ok(());
    }

    match msg.state {
        CompilerEvent::Running => println!("{} {} compiling", style("~").yellow(), msg.bundle_id),
        CompilerEvent::Success { module_count } => println!(
            "{} {} built ({} modules)",
            style("✓").green(),
            msg.bundle_id,
            module_count
        ),
        CompilerEvent::Failure { ref message } => {
            println!("{} {} failed", style("✗").red(), msg.bundle_id);
            eprintln!("{}", message);
        }
        CompilerEvent::Error { ref message } => {
            println!(
                "{} {} errored: {}",
                style("✗").red(),
                msg.bundle_id,
                message
            );
        }
    }

    Ok(())
}
