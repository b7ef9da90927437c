//! Process task runner - launches the dev server command and watches it exit

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use devlens_core::{
    HostError, ListenerSet, NameHandler, Reveal, ShellCommand, Subscription, TaskHandle,
    TaskRunner, TaskSpec,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Notify;

/// A live child process registered under a task name
struct Execution {
    id: u64,
    kill: Arc<Notify>,
}

struct RunnerState {
    running: DashMap<String, Execution>,
    ended: ListenerSet<NameHandler>,
    next_execution: AtomicU64,
}

/// Runs tasks as `sh -c <command line>` child processes.
///
/// An execution is listed as running until its child exits or it is
/// terminated through a handle. Only exits of still-listed executions are
/// reported to `on_task_ended` subscribers.
pub struct ProcessTaskRunner {
    state: Arc<RunnerState>,
}

impl ProcessTaskRunner {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RunnerState {
                running: DashMap::new(),
                ended: ListenerSet::new(),
                next_execution: AtomicU64::new(1),
            }),
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state.running.contains_key(name)
    }

    /// Terminating through the handle unlists the execution right away, so a
    /// restart never adopts a task that is still shutting down.
    fn handle(state: &Arc<RunnerState>, name: &str, id: u64, kill: Arc<Notify>) -> TaskHandle {
        let state = state.clone();
        let key = name.to_string();
        TaskHandle::new(name, move || {
            state.running.remove_if(&key, |_, execution| execution.id == id);
            kill.notify_one();
        })
    }
}

impl Default for ProcessTaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn shell(command: &ShellCommand) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C");
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c");
        cmd
    };
    cmd.arg(&command.command_line)
        .envs(&command.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &command.cwd {
        cmd.current_dir(cwd);
    }
    cmd
}

fn forward_output<R>(task: String, stream: Option<R>, reveal: Reveal)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(stream) = stream else {
        return;
    };
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match reveal {
                Reveal::Always => tracing::info!(task = %task, "{}", line),
                Reveal::Silent => tracing::debug!(task = %task, "{}", line),
                Reveal::Never => tracing::trace!(task = %task, "{}", line),
            }
        }
    });
}

#[async_trait]
impl TaskRunner for ProcessTaskRunner {
    fn find_running(&self, name: &str) -> Option<TaskHandle> {
        self.state
            .running
            .get(name)
            .map(|execution| {
                Self::handle(&self.state, name, execution.id, execution.kill.clone())
            })
    }

    async fn launch(&self, spec: TaskSpec) -> Result<TaskHandle, HostError> {
        let mut child = shell(&spec.command).spawn()?;
        let pid = child.id();
        let id = self.state.next_execution.fetch_add(1, Ordering::Relaxed);
        let kill = Arc::new(Notify::new());

        forward_output(spec.name.clone(), child.stdout.take(), spec.reveal);
        forward_output(spec.name.clone(), child.stderr.take(), spec.reveal);

        self.state.running.insert(
            spec.name.clone(),
            Execution {
                id,
                kill: kill.clone(),
            },
        );
        tracing::info!(
            task = %spec.name,
            pid = ?pid,
            background = spec.background,
            "Task launched"
        );

        let state = self.state.clone();
        let name = spec.name.clone();
        let kill_requested = kill.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_requested.notified() => {
                    tracing::debug!(task = %name, "Terminating task");
                    if let Err(e) = child.kill().await {
                        tracing::warn!(task = %name, error = %e, "Failed to kill task");
                    }
                    child.wait().await
                }
            };

            match status {
                Ok(status) => tracing::info!(task = %name, status = %status, "Task exited"),
                Err(e) => tracing::warn!(task = %name, error = %e, "Failed to wait for task"),
            }

            // Executions terminated on request, or replaced by a newer launch
            // under the same name, are already unlisted and stay quiet.
            if state
                .running
                .remove_if(&name, |_, execution| execution.id == id)
                .is_some()
            {
                state.ended.emit(&name);
            }
        });

        Ok(Self::handle(&self.state, &spec.name, id, kill))
    }

    fn on_task_ended(&self, handler: NameHandler) -> Subscription {
        self.state.ended.subscribe(handler)
    }
}
