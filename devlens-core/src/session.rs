//! Server session controller
//!
//! Owns the session state machine (`Stopped -> Spinning -> Started -> Stopped`)
//! and is the only place that mutates it. Four independent event sources feed
//! into it: user start/stop/toggle, task-ended notifications, terminal-closed
//! notifications, and active document changes.
//!
//! `start()` suspends several times (command resolution, task launch, URL
//! resolution, readiness polling). Each start captures a generation number and
//! re-checks it after every suspension point; `stop()` bumps the generation, so
//! a start that was interrupted by a stop never marks the session started.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::defaults::READINESS_TIMEOUT;
use crate::error::SessionError;
use crate::host::{
    CommandProvider, DocumentRef, EditorHost, NameHandler, PreviewSurface, StatusBar,
    Subscription, TaskHandle, TaskRunner, TaskSpec, UrlResolver,
};
use crate::navigator::{Navigation, Navigator};
use crate::readiness::{Probe, Readiness, ReadinessPoller};
use crate::status::{StatusBarSpec, StatusIndicator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Stopped,
    /// Task launching, server not yet confirmed ready.
    Spinning,
    Started,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Stopped => "stopped",
            SessionState::Spinning => "spinning",
            SessionState::Started => "started",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Session configuration, fixed for the lifetime of the session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Display name of the task; also used to find a task to reuse
    pub task_name: String,
    pub auto_start: bool,
    /// Zero disables waiting for readiness
    pub readiness_timeout: Duration,
    /// No status badge is created when `None`
    pub status_bar: Option<StatusBarSpec>,
}

impl SessionOptions {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            auto_start: false,
            readiness_timeout: READINESS_TIMEOUT,
            status_bar: None,
        }
    }
}

/// Project callbacks
#[derive(Clone)]
pub struct Providers {
    pub command: Arc<dyn CommandProvider>,
    pub url: Arc<dyn UrlResolver>,
}

/// Host collaborators
#[derive(Clone)]
pub struct Host {
    pub tasks: Arc<dyn TaskRunner>,
    pub editor: Arc<dyn EditorHost>,
    pub preview: Arc<dyn PreviewSurface>,
    pub status_bar: Arc<dyn StatusBar>,
    pub probe: Arc<dyn Probe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    AlreadyRunning,
    Started { readiness: Readiness, reused_task: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Stopped,
    Started { outcome: StartOutcome },
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub task_name: String,
    pub state: SessionState,
    pub last_opened_url: Option<String>,
    pub has_task: bool,
    pub watching_editor: bool,
}

struct Inner {
    state: SessionState,
    generation: u64,
    task: Option<TaskHandle>,
    editor_watch: Option<Subscription>,
    last_opened_url: Option<String>,
    indicator: Option<StatusIndicator>,
    listeners: Vec<Subscription>,
    disposed: bool,
}

pub struct ServerSession {
    options: SessionOptions,
    providers: Providers,
    host: Host,
    navigator: Navigator,
    poller: ReadinessPoller,
    inner: Mutex<Inner>,
    /// Held for the whole of `navigate`, so navigations finish in call order.
    navigation: tokio::sync::Mutex<()>,
    this: Weak<ServerSession>,
}

impl ServerSession {
    /// Builds the session and registers the task-ended and terminal-closed
    /// listeners. Those stay registered until [`ServerSession::dispose`].
    pub fn new(options: SessionOptions, providers: Providers, host: Host) -> Arc<Self> {
        let indicator = options
            .status_bar
            .clone()
            .map(|spec| StatusIndicator::new(host.status_bar.as_ref(), spec));

        let session = Arc::new_cyclic(|this| Self {
            navigator: Navigator::new(host.preview.clone()),
            poller: ReadinessPoller::new(host.probe.clone()),
            options,
            providers,
            host,
            inner: Mutex::new(Inner {
                state: SessionState::Stopped,
                generation: 0,
                task: None,
                editor_watch: None,
                last_opened_url: None,
                indicator,
                listeners: Vec::new(),
                disposed: false,
            }),
            navigation: tokio::sync::Mutex::new(()),
            this: this.clone(),
        });

        let on_ended = session.stop_when_task_named();
        let listeners = vec![
            session.host.tasks.on_task_ended(on_ended.clone()),
            session.host.editor.on_terminal_closed(on_ended),
        ];
        session.inner.lock().listeners = listeners;

        session
    }

    /// [`ServerSession::new`] followed by [`ServerSession::auto_start`].
    pub async fn activate(options: SessionOptions, providers: Providers, host: Host) -> Arc<Self> {
        let session = Self::new(options, providers, host);
        session.auto_start().await;
        session
    }

    /// Starts the session if configured to. Failures are logged.
    pub async fn auto_start(&self) {
        if !self.options.auto_start {
            return;
        }
        if let Err(e) = self.start().await {
            tracing::warn!(task = %self.options.task_name, error = %e, "Auto-start did not complete");
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn status(&self) -> SessionStatus {
        let inner = self.inner.lock();
        SessionStatus {
            task_name: self.options.task_name.clone(),
            state: inner.state,
            last_opened_url: inner.last_opened_url.clone(),
            has_task: inner.task.is_some(),
            watching_editor: inner.editor_watch.is_some(),
        }
    }

    pub async fn start(&self) -> Result<StartOutcome, SessionError> {
        let task_name = &self.options.task_name;
        let generation = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return Err(SessionError::Disposed);
            }
            if inner.state != SessionState::Stopped {
                tracing::debug!(task = %task_name, state = %inner.state, "Start ignored, session already active");
                return Ok(StartOutcome::AlreadyRunning);
            }

            inner.generation += 1;
            inner.state = SessionState::Spinning;
            inner.last_opened_url = None;
            if let Some(indicator) = inner.indicator.as_mut() {
                indicator.enter(SessionState::Spinning);
            }
            inner.editor_watch = Some(self.watch_editor());
            inner.generation
        };

        tracing::info!(task = %task_name, "Starting dev server session");

        let (task, reused_task) = match self.acquire_task(generation).await {
            Ok(acquired) => acquired,
            Err(SessionError::Superseded) => return Err(SessionError::Superseded),
            Err(e) => {
                tracing::error!(task = %task_name, error = %e, "Failed to start dev server");
                if self.is_current(generation) {
                    self.stop();
                }
                return Err(e);
            }
        };
        self.store_task(generation, task)?;

        let readiness = match self.providers.url.resolve(None).await {
            Ok(Some(root)) => {
                self.ensure_current(generation)?;
                self.poller
                    .wait_until_ready(&root, self.options.readiness_timeout)
                    .await
            }
            Ok(None) => {
                tracing::debug!(task = %task_name, "No root URL, skipping readiness check");
                Readiness::Skipped
            }
            Err(e) => {
                tracing::warn!(task = %task_name, error = %e, "Failed to resolve root URL");
                Readiness::Skipped
            }
        };

        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return Err(SessionError::Superseded);
            }
            inner.state = SessionState::Started;
        }

        match readiness {
            Readiness::Ready { attempts } => {
                tracing::info!(task = %task_name, attempts, "Dev server is ready");
            }
            Readiness::TimedOut { attempts } => {
                tracing::warn!(task = %task_name, attempts, "Dev server did not respond before timeout, continuing");
            }
            Readiness::Skipped => {}
        }

        let active = self.host.editor.active_document();
        self.navigate(active.as_ref()).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return Err(SessionError::Superseded);
        }
        if let Some(indicator) = inner.indicator.as_mut() {
            indicator.enter(SessionState::Started);
        }

        Ok(StartOutcome::Started {
            readiness,
            reused_task,
        })
    }

    /// Safe to call from any state, any number of times.
    pub fn stop(&self) {
        let (task, editor_watch, previous) = {
            let mut inner = self.inner.lock();
            let previous = inner.state;
            inner.generation += 1;
            inner.state = SessionState::Stopped;
            inner.last_opened_url = None;
            if let Some(indicator) = inner.indicator.as_mut() {
                indicator.enter(SessionState::Stopped);
            }
            (inner.task.take(), inner.editor_watch.take(), previous)
        };

        // Released outside the lock: a task runner may report the task as
        // ended synchronously, which calls back into stop().
        if let Some(watch) = editor_watch {
            watch.dispose();
        }
        if let Some(task) = task {
            tracing::info!(task = %task.name(), "Stopping task");
            task.dispose();
        }

        if previous != SessionState::Stopped {
            tracing::info!(task = %self.options.task_name, "Dev server session stopped");
        }
    }

    pub async fn toggle(&self) -> Result<ToggleOutcome, SessionError> {
        if self.state() != SessionState::Stopped {
            self.stop();
            return Ok(ToggleOutcome::Stopped);
        }
        let outcome = self.start().await?;
        Ok(ToggleOutcome::Started { outcome })
    }

    /// Stops the session and releases the badge and every listener. The
    /// session cannot be started again afterwards.
    pub fn dispose(&self) {
        self.stop();

        let (indicator, listeners) = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            (inner.indicator.take(), std::mem::take(&mut inner.listeners))
        };

        for listener in listeners {
            listener.dispose();
        }
        if let Some(indicator) = indicator {
            indicator.dispose();
        }
        tracing::debug!(task = %self.options.task_name, "Session disposed");
    }

    /// Opens the preview for `document`. Does nothing without a document,
    /// without a URL mapping, or once the session has stopped.
    pub async fn navigate(&self, document: Option<&DocumentRef>) {
        let Some(document) = document else {
            return;
        };
        let _navigating = self.navigation.lock().await;
        let generation = self.inner.lock().generation;

        let url = match self.providers.url.resolve(Some(document)).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                tracing::debug!(document = %document.path.display(), "No preview URL for document");
                return;
            }
            Err(e) => {
                tracing::warn!(document = %document.path.display(), error = %e, "Failed to resolve preview URL");
                return;
            }
        };

        let (last_opened, server_started) = {
            let inner = self.inner.lock();
            if inner.generation != generation || inner.state == SessionState::Stopped {
                return;
            }
            // Only deduplicate against URLs recorded in this started session.
            let started = inner.state == SessionState::Started;
            let last = if started {
                inner.last_opened_url.clone()
            } else {
                None
            };
            (last, started)
        };

        let navigation = self
            .navigator
            .open(&url, last_opened.as_deref(), server_started)
            .await;

        if matches!(navigation, Navigation::Opened { record: true }) {
            let mut inner = self.inner.lock();
            if inner.generation == generation && inner.state == SessionState::Started {
                inner.last_opened_url = Some(url);
            }
        }
    }

    async fn acquire_task(&self, generation: u64) -> Result<(TaskHandle, bool), SessionError> {
        let task_name = &self.options.task_name;

        if let Some(handle) = self.host.tasks.find_running(task_name) {
            tracing::info!(task = %task_name, "Reusing running task");
            return Ok((handle, true));
        }

        let command = self
            .providers
            .command
            .command()
            .await
            .map_err(SessionError::CommandProvider)?;
        self.ensure_current(generation)?;

        tracing::info!(task = %task_name, command = %command.command_line, "Launching task");
        let handle = self
            .host
            .tasks
            .launch(TaskSpec::background(task_name.clone(), command))
            .await
            .map_err(SessionError::TaskLaunch)?;
        Ok((handle, false))
    }

    /// Stores the task handle, or terminates it if a stop happened meanwhile.
    fn store_task(&self, generation: u64, task: TaskHandle) -> Result<(), SessionError> {
        let (stale, superseded) = {
            let mut inner = self.inner.lock();
            if inner.generation == generation {
                (inner.task.replace(task), false)
            } else {
                (Some(task), true)
            }
        };

        if let Some(stale) = stale {
            tracing::debug!(task = %stale.name(), "Releasing stale task handle");
            stale.dispose();
        }
        if superseded {
            Err(SessionError::Superseded)
        } else {
            Ok(())
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), SessionError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            tracing::debug!(task = %self.options.task_name, "Start superseded by stop");
            Err(SessionError::Superseded)
        }
    }

    /// Subscribes to document changes. Changes are queued to a single worker
    /// and navigated one at a time, in arrival order; the worker exits once
    /// the subscription is released.
    fn watch_editor(&self) -> Subscription {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, active document changes are ignored");
            return Subscription::noop();
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<Option<DocumentRef>>();
        let this = self.this.clone();
        runtime.spawn(async move {
            while let Some(document) = rx.recv().await {
                let Some(session) = this.upgrade() else {
                    break;
                };
                session.navigate(document.as_ref()).await;
            }
        });

        self.host
            .editor
            .on_active_document_changed(Arc::new(move |document| {
                let _ = tx.send(document);
            }))
    }

    fn stop_when_task_named(&self) -> NameHandler {
        let this = self.this.clone();
        let task_name = self.options.task_name.clone();
        Arc::new(move |name: &str| {
            if name != task_name {
                return;
            }
            if let Some(session) = this.upgrade() {
                tracing::info!(task = %name, "Task ended outside the session");
                session.stop();
            }
        })
    }
}
