//! Multi-bundle compile orchestration
//!
//! One compiler run covers every bundle. Its hooks are merged into a single
//! channel and handled sequentially by one event loop, which owns the
//! per-bundle pass state and emits `{bundleId, state}` messages. Cache
//! records are written on the blocking pool so event delivery never waits on
//! disk I/O.

use crate::bundle::{Bundle, BundleDependencies, BundleRefs};
use crate::cache::{get_hashes, CacheRecord};
use crate::config::WorkerConfig;
use crate::error::{OptimizerError, OptimizerResult};
use crate::orchestration::compiler::{Compiler, CompilerHook, CompilerJob, PassStats};
use crate::orchestration::events::{CompilerEvent, CompilerMsg};
use crate::orchestration::modules::{summarize_pass, undeclared_imports, PassSummary};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Hooks buffered between the compiler and the event loop
const HOOK_BUFFER: usize = 64;

/// File name of the per-bundle diagnostics written when profiling
pub const STATS_FILE_NAME: &str = "stats.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    /// Waiting for the next pass
    Idle,
    /// A pass is in flight
    Running,
    /// No further events will be emitted
    Terminal,
}

/// Orders the background writes of one file
///
/// Each write takes a generation when it is dispatched and only lands if no
/// newer generation landed first, so the file ends up describing the latest
/// pass even when an older write finishes last.
#[derive(Debug, Default)]
struct WriteOrder {
    dispatched: AtomicU64,
    landed: Mutex<u64>,
}

impl WriteOrder {
    fn next(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.dispatched.load(Ordering::SeqCst) > generation
    }

    /// Run `write` unless a newer generation already landed
    fn land(&self, generation: u64, write: impl FnOnce()) -> bool {
        let mut landed = self.landed.lock().unwrap_or_else(PoisonError::into_inner);
        if *landed > generation {
            return false;
        }
        write();
        *landed = generation;
        true
    }
}

struct Tracked {
    bundle: Arc<Bundle>,
    dependencies: BundleDependencies,
    state: PassState,
    record_writes: Arc<WriteOrder>,
    stats_writes: Arc<WriteOrder>,
}

impl Tracked {
    fn new(bundle: Arc<Bundle>) -> OptimizerResult<Self> {
        let dependencies = bundle.read_bundle_deps()?;
        Ok(Self {
            bundle,
            dependencies,
            state: PassState::Idle,
            record_writes: Arc::default(),
            stats_writes: Arc::default(),
        })
    }
}

/// Drives one compiler over a set of bundles
pub struct Orchestrator {
    config: WorkerConfig,
    tracked: Vec<Tracked>,
    bundle_refs: BundleRefs,
    compiler: Arc<dyn Compiler>,
}

impl Orchestrator {
    /// Create an orchestrator for `bundles`
    ///
    /// `bundle_refs` should describe every bundle of the build, not only the
    /// ones being compiled, so cross-bundle imports resolve. Each bundle's
    /// dependency manifest is read here; one that cannot be read or parsed
    /// fails construction.
    pub fn new(
        config: WorkerConfig,
        bundles: Vec<Arc<Bundle>>,
        bundle_refs: BundleRefs,
        compiler: Arc<dyn Compiler>,
    ) -> OptimizerResult<Self> {
        let tracked = bundles
            .into_iter()
            .map(Tracked::new)
            .collect::<OptimizerResult<Vec<_>>>()?;

        Ok(Self {
            config,
            tracked,
            bundle_refs,
            compiler,
        })
    }

    /// Start compiling; must be called inside a Tokio runtime
    pub fn start(self) -> OrchestratorHandle {
        let cancel = CancellationToken::new();
        let (hooks_tx, hooks_rx) = mpsc::channel(HOOK_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let job = CompilerJob::new(
            self.tracked
                .iter()
                .map(|t| (t.bundle.as_ref(), &t.dependencies)),
            &self.bundle_refs,
            self.config.watch,
        );

        info!(
            "Starting {} compiler for {} bundles{}",
            self.compiler.name(),
            self.tracked.len(),
            if self.config.watch { " in watch mode" } else { "" }
        );

        let compiler = Arc::clone(&self.compiler);
        let compiler_cancel = cancel.clone();
        let compiler_task =
            tokio::spawn(async move { compiler.run(job, hooks_tx, compiler_cancel).await });

        let event_loop = EventLoop {
            config: self.config,
            tracked: self.tracked,
            bundle_refs: self.bundle_refs,
            events: events_tx,
            writes: JoinSet::new(),
        };
        let task = tokio::spawn(event_loop.drive(hooks_rx, compiler_task, cancel.clone()));

        OrchestratorHandle {
            events: events_rx,
            cancel,
            task,
        }
    }
}

/// Running orchestration
pub struct OrchestratorHandle {
    events: mpsc::UnboundedReceiver<CompilerMsg>,
    cancel: CancellationToken,
    task: JoinHandle<OptimizerResult<()>>,
}

impl OrchestratorHandle {
    /// Next event, or `None` once the orchestration has ended
    pub async fn next_event(&mut self) -> Option<CompilerMsg> {
        self.events.recv().await
    }

    /// Stop compiling; closes the event stream
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the orchestration to end and pending cache writes to land
    pub async fn wait(self) -> OptimizerResult<()> {
        drop(self.events);
        self.task
            .await
            .map_err(|e| OptimizerError::Internal(format!("orchestrator task failed: {}", e)))?
    }

    /// Drain every event, then wait
    pub async fn collect(mut self) -> (Vec<CompilerMsg>, OptimizerResult<()>) {
        let mut events = Vec::new();
        while let Some(msg) = self.events.recv().await {
            events.push(msg);
        }
        (events, self.wait().await)
    }
}

struct EventLoop {
    config: WorkerConfig,
    tracked: Vec<Tracked>,
    bundle_refs: BundleRefs,
    events: mpsc::UnboundedSender<CompilerMsg>,
    writes: JoinSet<()>,
}

impl EventLoop {
    async fn drive(
        mut self,
        mut hooks: mpsc::Receiver<CompilerHook>,
        compiler: JoinHandle<OptimizerResult<()>>,
        cancel: CancellationToken,
    ) -> OptimizerResult<()> {
        let mut compiler = Some(compiler);

        let result = loop {
            if !self.config.watch && self.all_terminal() {
                debug!("All bundles finished");
                break Ok(());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Orchestration stopped");
                    break Ok(());
                }
                hook = hooks.recv() => match hook {
                    Some(hook) => {
                        if let Err(e) = self.handle_hook(hook) {
                            error!("{}", e);
                            break Err(e);
                        }
                    }
                    None => {
                        let outcome = match compiler.take() {
                            Some(task) => join_compiler(task).await,
                            None => Ok(()),
                        };
                        let message = match outcome {
                            Ok(()) => "compiler exited before the bundle completed".to_string(),
                            Err(e) => e.to_string(),
                        };
                        self.fail_outstanding(&message);
                        break Ok(());
                    }
                }
            }
        };

        cancel.cancel();
        drop(hooks);
        if let Some(task) = compiler {
            if let Err(e) = join_compiler(task).await {
                debug!("Compiler stopped with error: {}", e);
            }
        }

        let EventLoop {
            events, mut writes, ..
        } = self;
        drop(events);

        while let Some(joined) = writes.join_next().await {
            if let Err(e) = joined {
                debug!("Cache write task failed: {}", e);
            }
        }

        result
    }

    fn all_terminal(&self) -> bool {
        self.tracked.iter().all(|t| t.state == PassState::Terminal)
    }

    fn emit(&self, bundle_id: &str, state: CompilerEvent) {
        debug!("{}: {}", bundle_id, state);
        // A dropped receiver only means nobody is listening any more
        let _ = self.events.send(CompilerMsg::new(bundle_id, state));
    }

    fn handle_hook(&mut self, hook: CompilerHook) -> OptimizerResult<()> {
        let watch = self.config.watch;
        let Some(index) = self
            .tracked
            .iter()
            .position(|t| t.bundle.id() == hook.bundle_id())
        else {
            warn!("Ignoring hook for unknown bundle {}", hook.bundle_id());
            return Ok(());
        };

        let tracked = &mut self.tracked[index];
        if tracked.state == PassState::Terminal {
            debug!("Ignoring hook for finished bundle {}", hook.bundle_id());
            return Ok(());
        }

        let bundle = Arc::clone(&tracked.bundle);
        let was_idle = tracked.state == PassState::Idle;

        match hook {
            CompilerHook::Run { .. } => {
                if was_idle {
                    tracked.state = PassState::Running;
                    self.emit(bundle.id(), CompilerEvent::Running);
                }
            }
            CompilerHook::Failed { message, .. } => {
                tracked.state = PassState::Terminal;
                if was_idle {
                    self.emit(bundle.id(), CompilerEvent::Running);
                }
                self.emit(bundle.id(), CompilerEvent::Error { message });
            }
            CompilerHook::Done { stats, .. } => {
                if stats.needs_additional_pass {
                    debug!("{}: additional pass requested", bundle);
                    if was_idle {
                        tracked.state = PassState::Running;
                        self.emit(bundle.id(), CompilerEvent::Running);
                    }
                    return Ok(());
                }

                tracked.state = if watch {
                    PassState::Idle
                } else {
                    PassState::Terminal
                };
                if was_idle {
                    self.emit(bundle.id(), CompilerEvent::Running);
                }

                let event = self.complete_pass(index, stats)?;
                self.emit(bundle.id(), event);
            }
        }

        Ok(())
    }

    fn complete_pass(&mut self, index: usize, stats: PassStats) -> OptimizerResult<CompilerEvent> {
        let tracked = &self.tracked[index];
        let undeclared = undeclared_imports(
            &tracked.bundle,
            &tracked.dependencies,
            &self.bundle_refs,
            &stats,
        );

        if !stats.errors.is_empty() || !undeclared.is_empty() {
            let message = stats
                .errors
                .iter()
                .chain(&undeclared)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n\n");
            if self.config.profile_webpack {
                self.write_stats(index, stats);
            }
            return Ok(CompilerEvent::Failure { message });
        }

        let summary = summarize_pass(&tracked.bundle, &stats)?;
        let module_count = summary.module_count;
        if self.config.profile_webpack {
            self.write_stats(index, stats);
        }
        self.persist(index, summary);

        Ok(CompilerEvent::Success { module_count })
    }

    fn fail_outstanding(&mut self, message: &str) {
        let outstanding: Vec<(String, bool)> = self
            .tracked
            .iter_mut()
            .filter(|t| t.state != PassState::Terminal)
            .map(|t| {
                let was_idle = t.state == PassState::Idle;
                t.state = PassState::Terminal;
                (t.bundle.id().to_string(), was_idle)
            })
            .collect();

        for (bundle_id, was_idle) in outstanding {
            if was_idle {
                self.emit(&bundle_id, CompilerEvent::Running);
            }
            self.emit(
                &bundle_id,
                CompilerEvent::Error {
                    message: message.to_string(),
                },
            );
        }
    }

    /// Hash referenced files and write the new cache record in the background
    fn persist(&mut self, index: usize, summary: PassSummary) {
        self.reap_writes();

        let tracked = &self.tracked[index];
        let bundle = Arc::clone(&tracked.bundle);
        let order = Arc::clone(&tracked.record_writes);
        let generation = order.next();
        let optimizer_cache_key = self.config.optimizer_cache_key.clone();

        self.writes.spawn_blocking(move || {
            write_record(&bundle, &order, generation, summary, optimizer_cache_key)
        });
    }

    fn write_stats(&mut self, index: usize, stats: PassStats) {
        self.reap_writes();

        let tracked = &self.tracked[index];
        let path = tracked.bundle.output_dir().join(STATS_FILE_NAME);
        let order = Arc::clone(&tracked.stats_writes);
        let generation = order.next();

        self.writes.spawn_blocking(move || {
            order.land(generation, || {
                let result = std::fs::create_dir_all(path.parent().unwrap_or(&path))
                    .map_err(|e| e.to_string())
                    .and_then(|()| serde_json::to_vec_pretty(&stats).map_err(|e| e.to_string()))
                    .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));

                if let Err(e) = result {
                    debug!("Unable to write {}: {}", path.display(), e);
                }
            });
        });
    }

    fn reap_writes(&mut self) {
        while self.writes.try_join_next().is_some() {}
    }
}

/// Store the record of pass `generation` unless a newer pass got there first
fn write_record(
    bundle: &Bundle,
    order: &WriteOrder,
    generation: u64,
    summary: PassSummary,
    optimizer_cache_key: Option<String>,
) {
    if order.is_superseded(generation) {
        debug!("Skipping superseded cache write for {}", bundle);
        return;
    }

    let files = summary.referenced_files;
    let hashes = get_hashes(&files);
    let record = CacheRecord {
        cache_key: Some(bundle.create_cache_key(&files, &hashes)),
        optimizer_cache_key,
        files: Some(files),
        module_count: Some(summary.module_count),
        work_units: Some(summary.work_units),
        bundle_ref_export_ids: Some(summary.bundle_ref_export_ids),
    };

    let landed = order.land(generation, || {
        if let Err(e) = bundle.cache.set(&record) {
            debug!("Unable to write cache for {}: {}", bundle, e);
        }
    });
    if !landed {
        debug!("Dropped superseded cache write for {}", bundle);
    }
}

async fn join_compiler(task: JoinHandle<OptimizerResult<()>>) -> OptimizerResult<()> {
    task.await
        .map_err(|e| OptimizerError::Internal(format!("compiler task failed: {}", e)))?
}
