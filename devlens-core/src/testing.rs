//! In-memory collaborators for controller tests

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::HostError;
use crate::host::{
    CommandProvider, DocumentHandler, DocumentRef, EditorHost, ListenerSet, NameHandler,
    OpenOptions, PreviewSurface, ShellCommand, StatusBar, StatusBarItem, Subscription,
    TaskHandle, TaskRunner, TaskSpec, UrlResolver,
};
use crate::readiness::Probe;
use crate::session::{Host, Providers, ServerSession, SessionOptions};
use crate::status::{StatusAppearance, StatusBarSpec};

/// Polls `condition` until it holds or one second passes.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[derive(Default)]
struct TaskBook {
    running: Vec<String>,
    launched: Vec<TaskSpec>,
    terminated: Vec<String>,
}

pub struct FakeTaskRunner {
    book: Arc<Mutex<TaskBook>>,
    ended: ListenerSet<NameHandler>,
    fail_launches: AtomicBool,
}

impl FakeTaskRunner {
    pub fn new() -> Self {
        Self {
            book: Arc::new(Mutex::new(TaskBook::default())),
            ended: ListenerSet::new(),
            fail_launches: AtomicBool::new(false),
        }
    }

    pub fn add_running(&self, name: &str) {
        self.book.lock().running.push(name.to_string());
    }

    pub fn fail_launches(&self, fail: bool) {
        self.fail_launches.store(fail, Ordering::SeqCst);
    }

    pub fn launched(&self) -> Vec<String> {
        self.book
            .lock()
            .launched
            .iter()
            .map(|spec| spec.name.clone())
            .collect()
    }

    pub fn last_spec(&self) -> Option<TaskSpec> {
        self.book.lock().launched.last().cloned()
    }

    pub fn terminated(&self) -> Vec<String> {
        self.book.lock().terminated.clone()
    }

    pub fn ended_listeners(&self) -> usize {
        self.ended.len()
    }

    /// Simulates the execution exiting on its own.
    pub fn end_task(&self, name: &str) {
        self.book.lock().running.retain(|n| n != name);
        self.ended.emit(name);
    }

    fn handle_for(&self, name: &str) -> TaskHandle {
        let book = self.book.clone();
        let owned = name.to_string();
        TaskHandle::new(name, move || {
            let mut book = book.lock();
            book.running.retain(|n| *n != owned);
            book.terminated.push(owned);
        })
    }
}

#[async_trait]
impl TaskRunner for FakeTaskRunner {
    fn find_running(&self, name: &str) -> Option<TaskHandle> {
        let running = self.book.lock().running.iter().any(|n| n == name);
        running.then(|| self.handle_for(name))
    }

    async fn launch(&self, spec: TaskSpec) -> Result<TaskHandle, HostError> {
        if self.fail_launches.load(Ordering::SeqCst) {
            return Err(HostError::message("shell not found"));
        }
        let handle = self.handle_for(&spec.name);
        let mut book = self.book.lock();
        book.running.push(spec.name.clone());
        book.launched.push(spec);
        Ok(handle)
    }

    fn on_task_ended(&self, handler: NameHandler) -> Subscription {
        self.ended.subscribe(handler)
    }
}

pub struct FakeEditor {
    active: Mutex<Option<DocumentRef>>,
    documents: ListenerSet<DocumentHandler>,
    terminals: ListenerSet<NameHandler>,
}

impl FakeEditor {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            documents: ListenerSet::new(),
            terminals: ListenerSet::new(),
        }
    }

    pub fn set_active(&self, document: Option<DocumentRef>) {
        *self.active.lock() = document;
    }

    pub fn change_document(&self, document: Option<DocumentRef>) {
        self.set_active(document.clone());
        self.documents.emit(document);
    }

    pub fn close_terminal(&self, name: &str) {
        self.terminals.emit(name);
    }

    pub fn document_listeners(&self) -> usize {
        self.documents.len()
    }

    pub fn terminal_listeners(&self) -> usize {
        self.terminals.len()
    }
}

impl EditorHost for FakeEditor {
    fn active_document(&self) -> Option<DocumentRef> {
        self.active.lock().clone()
    }

    fn on_active_document_changed(&self, handler: DocumentHandler) -> Subscription {
        self.documents.subscribe(handler)
    }

    fn on_terminal_closed(&self, handler: NameHandler) -> Subscription {
        self.terminals.subscribe(handler)
    }
}

pub struct FakePreview {
    opened: Mutex<Vec<String>>,
    last_options: Mutex<Option<OpenOptions>>,
    open: AtomicBool,
    fail: AtomicBool,
    next_open_delay: Mutex<Option<Duration>>,
}

impl FakePreview {
    pub fn new() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            last_options: Mutex::new(None),
            open: AtomicBool::new(false),
            fail: AtomicBool::new(false),
            next_open_delay: Mutex::new(None),
        }
    }

    /// The next open waits `delay` before it is recorded.
    pub fn delay_next_open(&self, delay: Duration) {
        *self.next_open_delay.lock() = Some(delay);
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn fail_opens(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    pub fn last_options(&self) -> Option<OpenOptions> {
        *self.last_options.lock()
    }
}

#[async_trait]
impl PreviewSurface for FakePreview {
    async fn open(&self, url: &str, options: OpenOptions) -> Result<(), HostError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HostError::message("preview command rejected"));
        }
        let delay = self.next_open_delay.lock().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.opened.lock().push(url.to_string());
        *self.last_options.lock() = Some(options);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn has_preview_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct BadgeLog {
    history: Vec<StatusAppearance>,
    visible: bool,
    disposed: bool,
}

pub struct FakeStatusBar {
    log: Arc<Mutex<BadgeLog>>,
}

impl FakeStatusBar {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(BadgeLog::default())),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.log
            .lock()
            .history
            .iter()
            .map(|a| a.text.clone())
            .collect()
    }

    pub fn current(&self) -> Option<StatusAppearance> {
        self.log.lock().history.last().cloned()
    }

    pub fn is_visible(&self) -> bool {
        self.log.lock().visible
    }

    pub fn is_disposed(&self) -> bool {
        self.log.lock().disposed
    }
}

struct FakeBadge {
    log: Arc<Mutex<BadgeLog>>,
}

impl StatusBar for FakeStatusBar {
    fn create(&self) -> Box<dyn StatusBarItem> {
        Box::new(FakeBadge {
            log: self.log.clone(),
        })
    }
}

impl StatusBarItem for FakeBadge {
    fn show(&mut self) {
        self.log.lock().visible = true;
    }

    fn update(&mut self, appearance: &StatusAppearance) {
        self.log.lock().history.push(appearance.clone());
    }

    fn dispose(self: Box<Self>) {
        let mut log = self.log.lock();
        log.visible = false;
        log.disposed = true;
    }
}

pub struct FakeProbe {
    failures_before_ready: Option<u32>,
    attempts: AtomicU32,
}

impl FakeProbe {
    pub fn ready() -> Self {
        Self::failing_times(0)
    }

    pub fn failing_times(failures: u32) -> Self {
        Self {
            failures_before_ready: Some(failures),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            failures_before_ready: None,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for FakeProbe {
    async fn probe(&self, _url: &str) -> Result<(), HostError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.failures_before_ready {
            Some(failures) if attempt > failures => Ok(()),
            _ => Err(HostError::message("connection refused")),
        }
    }
}

pub struct FakeCommand {
    calls: AtomicU32,
    fail: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeCommand {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Makes `command()` wait until the returned notify fires.
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl CommandProvider for FakeCommand {
    async fn command(&self) -> Result<ShellCommand, HostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(HostError::message("no package.json"));
        }
        Ok(ShellCommand::new("npm run dev"))
    }
}

/// Maps `/site/<page>.md` to `http://x/<page>`, root to `http://x/`.
pub struct FakeUrls {
    fail_root: AtomicBool,
}

impl FakeUrls {
    pub fn new() -> Self {
        Self {
            fail_root: AtomicBool::new(false),
        }
    }

    pub fn fail_root(&self, fail: bool) {
        self.fail_root.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UrlResolver for FakeUrls {
    async fn resolve(&self, document: Option<&DocumentRef>) -> Result<Option<String>, HostError> {
        let Some(document) = document else {
            if self.fail_root.load(Ordering::SeqCst) {
                return Err(HostError::message("no server address"));
            }
            return Ok(Some("http://x/".to_string()));
        };

        let Ok(relative) = document.path.strip_prefix(Path::new("/site")) else {
            return Ok(None);
        };
        let page = relative.with_extension("");
        let page = page.to_string_lossy();
        let url = match page.strip_suffix("index") {
            Some(dir) => format!("http://x/{dir}"),
            None => format!("http://x/{page}"),
        };
        Ok(Some(url))
    }
}

/// One of each fake, wired into a session on demand
pub struct Fakes {
    pub tasks: Arc<FakeTaskRunner>,
    pub editor: Arc<FakeEditor>,
    pub preview: Arc<FakePreview>,
    pub status_bar: Arc<FakeStatusBar>,
    pub probe: Arc<FakeProbe>,
    pub command: Arc<FakeCommand>,
    pub urls: Arc<FakeUrls>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with_probe(FakeProbe::ready())
    }

    pub fn with_probe(probe: FakeProbe) -> Self {
        Self {
            tasks: Arc::new(FakeTaskRunner::new()),
            editor: Arc::new(FakeEditor::new()),
            preview: Arc::new(FakePreview::new()),
            status_bar: Arc::new(FakeStatusBar::new()),
            probe: Arc::new(probe),
            command: Arc::new(FakeCommand::new()),
            urls: Arc::new(FakeUrls::new()),
        }
    }

    pub fn options(&self) -> SessionOptions {
        let mut options = SessionOptions::new("dev");
        options.status_bar = Some(StatusBarSpec::default());
        options
    }

    pub fn providers(&self) -> Providers {
        Providers {
            command: self.command.clone(),
            url: self.urls.clone(),
        }
    }

    pub fn host(&self) -> Host {
        Host {
            tasks: self.tasks.clone(),
            editor: self.editor.clone(),
            preview: self.preview.clone(),
            status_bar: self.status_bar.clone(),
            probe: self.probe.clone(),
        }
    }

    pub fn session(&self) -> Arc<ServerSession> {
        self.session_with(self.options())
    }

    pub fn session_with(&self, options: SessionOptions) -> Arc<ServerSession> {
        ServerSession::new(options, self.providers(), self.host())
    }
}
