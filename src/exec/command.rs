// src/exec/command.rs

//! Build-step process runner.
//!
//! Steps are spawned from an explicit program + argument list (never through
//! a shell), in the configured working directory, with stdout/stderr captured
//! and logged line by line. A step that outlives its timeout is killed
//! together with everything it spawned.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::StepConfig;
use crate::errors::{RebuildError, Result};

/// How long to wait for the output readers after the process exited.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Keep at most this many bytes of stderr in error values.
const STDERR_TAIL_BYTES: usize = 4096;

/// Captured result of a step that exited on its own.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Run one build step to completion.
///
/// - Non-zero exit → [`RebuildError::CommandFailed`] carrying stderr.
/// - Exceeding `timeout` → [`RebuildError::CommandTimeout`]; the process
///   group is killed and the child reaped before returning.
pub async fn run_step(step: &StepConfig, cwd: &Path, timeout: Duration) -> Result<CommandOutput> {
    info!(
        step = %step.name,
        program = %step.program,
        args = ?step.args,
        cwd = ?cwd,
        timeout_s = timeout.as_secs(),
        "starting build step"
    );

    let mut cmd = Command::new(&step.program);
    cmd.args(&step.args)
        .envs(&step.env)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group so a timeout can take down grandchildren too.
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| RebuildError::Spawn {
        step: step.name.clone(),
        source,
    })?;

    let stdout_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(collect_output(out, step.name.clone(), "stdout")));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(collect_output(err, step.name.clone(), "stderr")));

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res?;
            let elapsed = started.elapsed();
            let stdout = drain(stdout_task).await;
            let stderr = drain(stderr_task).await;
            let code = status.code();

            info!(
                step = %step.name,
                exit_code = code.unwrap_or(-1),
                success = status.success(),
                elapsed_ms = elapsed.as_millis() as u64,
                "build step exited"
            );

            if !status.success() {
                return Err(RebuildError::CommandFailed {
                    step: step.name.clone(),
                    code,
                    stderr: tail(&stderr, STDERR_TAIL_BYTES).trim().to_string(),
                });
            }

            Ok(CommandOutput {
                code,
                success: true,
                stdout,
                stderr,
                elapsed,
            })
        }

        _ = tokio::time::sleep(timeout) => {
            error!(
                step = %step.name,
                timeout_s = timeout.as_secs(),
                "build step timed out; killing process"
            );
            terminate(&mut child, &step.name).await;
            for task in [stdout_task, stderr_task].into_iter().flatten() {
                task.abort();
            }
            Err(RebuildError::CommandTimeout {
                step: step.name.clone(),
                timeout,
            })
        }
    }
}

/// Read a child stream to the end, logging each line verbatim at info.
async fn collect_output<R>(reader: R, step: String, stream: &'static str) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();

    while let Ok(Some(line)) = lines.next_line().await {
        info!(step = %step, "{}: {}", stream, line);
        collected.push_str(&line);
        collected.push('\n');
    }

    collected
}

async fn drain(task: Option<JoinHandle<String>>) -> String {
    let Some(task) = task else {
        return String::new();
    };
    let abort = task.abort_handle();
    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, task).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(error = %e, "output reader task failed");
            String::new()
        }
        Err(_) => {
            // Something the step spawned still holds the pipe open.
            warn!("output still open after process exit; discarding the rest");
            abort.abort();
            String::new()
        }
    }
}

async fn terminate(child: &mut Child, step: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain syscall; a negative pid addresses the process group
        // created at spawn time, which only contains this step's processes.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(step = %step, "process group already gone");
        }
    }

    if let Err(e) = child.kill().await {
        warn!(step = %step, error = %e, "failed to kill timed-out process");
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
