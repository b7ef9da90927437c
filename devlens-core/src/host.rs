//! Host collaborator contracts
//!
//! The controller never talks to a concrete editor, process runner or browser.
//! Everything it needs from the outside world comes through the traits below,
//! injected at construction time:
//! - [`CommandProvider`] / [`UrlResolver`]: per-project callbacks
//! - [`TaskRunner`]: launches and tracks named background executions
//! - [`EditorHost`]: active document and terminal notifications
//! - [`PreviewSurface`]: renders a URL beside the editor
//! - [`StatusBar`]: creates the badge driven by [`crate::StatusIndicator`]

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::status::StatusAppearance;

type Release = Box<dyn FnOnce() + Send>;

/// A registration that is released exactly once.
///
/// Calling [`Subscription::dispose`] releases it explicitly; dropping an
/// undisposed subscription releases it as well.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    release: Option<Release>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn dispose(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Owned handle to a running task. Disposing it terminates the execution.
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    terminate: Subscription,
}

impl TaskHandle {
    pub fn new(name: impl Into<String>, terminate: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            terminate: Subscription::new(terminate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispose(self) {
        self.terminate.dispose();
    }
}

/// Reference to a document open in the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub path: PathBuf,
}

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Shell command line plus execution options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCommand {
    pub command_line: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ShellCommand {
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            ..Default::default()
        }
    }
}

/// How a launched task presents itself to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reveal {
    Always,
    Silent,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub command: ShellCommand,
    pub reveal: Reveal,
    pub background: bool,
}

impl TaskSpec {
    /// A background task that does not take over the terminal panel.
    pub fn background(name: impl Into<String>, command: ShellCommand) -> Self {
        Self {
            name: name.into(),
            command,
            reveal: Reveal::Silent,
            background: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Active,
    Beside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub placement: Placement,
    pub preserve_focus: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            placement: Placement::Beside,
            preserve_focus: true,
        }
    }
}

pub type DocumentHandler = Arc<dyn Fn(Option<DocumentRef>) + Send + Sync>;
pub type NameHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[async_trait]
pub trait CommandProvider: Send + Sync {
    async fn command(&self) -> Result<ShellCommand, HostError>;
}

#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// With a document, the URL that previews it. Without one, the server's
    /// root URL. `None` means there is no mapping.
    async fn resolve(&self, document: Option<&DocumentRef>) -> Result<Option<String>, HostError>;
}

#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// A live (not exited) execution carrying `name`, if any.
    fn find_running(&self, name: &str) -> Option<TaskHandle>;

    async fn launch(&self, spec: TaskSpec) -> Result<TaskHandle, HostError>;

    /// Called with the task name whenever an execution ends.
    fn on_task_ended(&self, handler: NameHandler) -> Subscription;
}

pub trait EditorHost: Send + Sync {
    fn active_document(&self) -> Option<DocumentRef>;

    fn on_active_document_changed(&self, handler: DocumentHandler) -> Subscription;

    fn on_terminal_closed(&self, handler: NameHandler) -> Subscription;
}

#[async_trait]
pub trait PreviewSurface: Send + Sync {
    async fn open(&self, url: &str, options: OpenOptions) -> Result<(), HostError>;

    /// Whether a preview tab is currently showing.
    fn has_preview_open(&self) -> bool;
}

pub trait StatusBar: Send + Sync {
    fn create(&self) -> Box<dyn StatusBarItem>;
}

pub trait StatusBarItem: Send {
    fn show(&mut self);

    fn update(&mut self, appearance: &StatusAppearance);

    fn dispose(self: Box<Self>);
}

/// Handlers registered through [`Subscription`]s.
///
/// Host implementations use this to back their `on_*` methods; each
/// subscription removes its own handler when released.
pub struct ListenerSet<H> {
    handlers: Arc<Mutex<Vec<(u64, H)>>>,
    next_id: AtomicU64,
}

impl<H: Clone + Send + 'static> ListenerSet<H> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, handler: H) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().push((id, handler));

        let handlers: Weak<Mutex<Vec<(u64, H)>>> = Arc::downgrade(&self.handlers);
        Subscription::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                handlers.lock().retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }

    /// Copy of the current handlers, so they can be invoked without holding the lock.
    pub fn snapshot(&self) -> Vec<H> {
        self.handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: Clone + Send + 'static> Default for ListenerSet<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerSet<NameHandler> {
    pub fn emit(&self, name: &str) {
        for handler in self.snapshot() {
            handler(name);
        }
    }
}

impl ListenerSet<DocumentHandler> {
    pub fn emit(&self, document: Option<DocumentRef>) {
        for handler in self.snapshot() {
            handler(document.clone());
        }
    }
}
