//! Bundler running as a child process
//!
//! The job is written to the child's stdin as one JSON document, while its
//! output is already being read. The child reports hooks on stdout, one JSON
//! object per line; any other output is logged and kept for error messages.

use crate::config::CompilerConfig;
use crate::error::{OptimizerError, OptimizerResult};
use crate::orchestration::compiler::{Compiler, CompilerHook, CompilerJob};
use crate::orchestration::OutputTail;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Compiler backed by an external bundler process
pub struct ProcessCompiler {
    config: CompilerConfig,
}

impl ProcessCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.config.command.as_str())
            .chain(self.config.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn spawn(&self) -> OptimizerResult<Child> {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref cwd) = self.config.cwd {
            cmd.current_dir(cwd);
        }

        debug!("Spawning compiler: {}", self.command_line());
        cmd.spawn()
            .map_err(|e| OptimizerError::command_failed(self.command_line(), e))
    }
}

/// Parse a stdout line as a hook; `None` for ordinary output
fn parse_hook_line(line: &str) -> Option<CompilerHook> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }

    match serde_json::from_str(trimmed) {
        Ok(hook) => Some(hook),
        Err(e) => {
            warn!("Ignoring malformed compiler hook: {}", e);
            None
        }
    }
}

/// Write the job and close stdin so the child sees end of input
async fn write_job(mut stdin: ChildStdin, payload: Vec<u8>) -> std::io::Result<()> {
    stdin.write_all(&payload).await?;
    stdin.shutdown().await
}

async fn stop_child(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Failed to kill compiler: {}", e);
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    async fn run(
        &self,
        job: CompilerJob,
        hooks: mpsc::Sender<CompilerHook>,
        cancel: CancellationToken,
    ) -> OptimizerResult<()> {
        let payload = serde_json::to_vec(&job)?;
        let mut child = self.spawn()?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(OptimizerError::Internal(
                "compiler stdio was not piped".to_string(),
            ));
        };

        let mut job_write = Box::pin(write_job(stdin, payload));
        let mut job_pending = true;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();
        let mut output = OutputTail::default();
        let mut stdout_done = false;
        let mut stderr_done = false;

        while !stdout_done || !stderr_done {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Stopping compiler");
                    stop_child(&mut child).await;
                    return Ok(());
                }
                written = &mut job_write, if job_pending => {
                    job_pending = false;
                    match written {
                        Ok(()) => debug!("Compiler job written"),
                        // The exit status below decides whether this matters
                        Err(e) => debug!("Compiler did not read the whole job: {}", e),
                    }
                }
                line = stdout_reader.next_line(), if !stdout_done => {
                    match line {
                        Ok(Some(line)) => match parse_hook_line(&line) {
                            Some(hook) => {
                                if hooks.send(hook).await.is_err() {
                                    debug!("Hook receiver dropped, stopping compiler");
                                    stop_child(&mut child).await;
                                    return Ok(());
                                }
                            }
                            None => {
                                debug!("compiler: {}", line);
                                output.push(line);
                            }
                        },
                        _ => stdout_done = true,
                    }
                }
                line = stderr_reader.next_line(), if !stderr_done => {
                    match line {
                        Ok(Some(line)) => {
                            debug!("compiler: {}", line);
                            output.push(line);
                        }
                        _ => stderr_done = true,
                    }
                }
            }
        }

        // Closes stdin if the child stopped reading without exiting
        drop(job_write);

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                stop_child(&mut child).await;
                return Ok(());
            }
            status = child.wait() => {
                status.map_err(|e| OptimizerError::io("waiting for compiler", e))?
            }
        };

        if status.success() {
            debug!("Compiler exited cleanly");
            Ok(())
        } else {
            Err(OptimizerError::CompilerExited {
                code: status.code().unwrap_or(-1),
                output: output.render(),
            })
        }
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
