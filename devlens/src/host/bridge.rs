//! Editor bridge
//!
//! Editors report their active document and closed terminals over a Unix
//! socket; the same socket exposes the session's start/stop/toggle/status
//! commands to `devlens ctl`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devlens_core::{
    DocumentHandler, DocumentRef, EditorHost, ListenerSet, NameHandler, ServerSession,
    Subscription,
};
use devlens_socket::{FrameError, serve_connection};
use parking_lot::RwLock;
use tokio::net::UnixListener;

use crate::protocol::{Command, Response};

/// Editor state as last reported over the bridge
pub struct EditorBridge {
    project_dir: PathBuf,
    active: RwLock<Option<DocumentRef>>,
    documents: ListenerSet<DocumentHandler>,
    terminals: ListenerSet<NameHandler>,
}

impl EditorBridge {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            active: RwLock::new(None),
            documents: ListenerSet::new(),
            terminals: ListenerSet::new(),
        }
    }

    /// Records the active document and notifies subscribers.
    ///
    /// Relative paths are taken relative to the project directory.
    pub fn set_active_document(&self, path: Option<PathBuf>) -> Option<DocumentRef> {
        let document = path.map(|path| {
            if path.is_absolute() {
                DocumentRef::new(path)
            } else {
                DocumentRef::new(self.project_dir.join(path))
            }
        });
        *self.active.write() = document.clone();
        self.documents.emit(document.clone());
        document
    }

    pub fn terminal_closed(&self, name: &str) {
        self.terminals.emit(name);
    }

    pub async fn handle(&self, session: &ServerSession, command: Command) -> Response {
        match command {
            Command::ActiveDocument { path } => {
                let document = self.set_active_document(path);
                Response::ok(serde_json::json!({ "active": document.map(|d| d.path) }))
            }
            Command::TerminalClosed { name } => {
                self.terminal_closed(&name);
                Response::ok(session.status())
            }
            Command::Start => match session.start().await {
                Ok(outcome) => Response::ok(outcome),
                Err(e) => Response::error(e.to_string()),
            },
            Command::Stop => {
                session.stop();
                Response::ok(session.status())
            }
            Command::Toggle => match session.toggle().await {
                Ok(outcome) => Response::ok(outcome),
                Err(e) => Response::error(e.to_string()),
            },
            Command::Status => Response::ok(session.status()),
        }
    }
}

impl EditorHost for EditorBridge {
    fn active_document(&self) -> Option<DocumentRef> {
        self.active.read().clone()
    }

    fn on_active_document_changed(&self, handler: DocumentHandler) -> Subscription {
        self.documents.subscribe(handler)
    }

    fn on_terminal_closed(&self, handler: NameHandler) -> Subscription {
        self.terminals.subscribe(handler)
    }
}

/// Unix socket server for the editor bridge
pub struct BridgeServer {
    path: PathBuf,
}

fn prepare_socket_path(path: &Path) -> Result<(), std::io::Error> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(())
}

impl BridgeServer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Binds the socket. Kept separate from `serve` so callers learn about
    /// bind failures before the accept loop is spawned.
    pub fn bind(&self) -> Result<UnixListener, std::io::Error> {
        prepare_socket_path(&self.path)?;
        let listener = UnixListener::bind(&self.path)?;
        tracing::info!("Editor bridge listening on {}", self.path.display());
        Ok(listener)
    }

    pub async fn serve(
        listener: UnixListener,
        bridge: Arc<EditorBridge>,
        session: Arc<ServerSession>,
    ) -> Result<(), std::io::Error> {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let bridge = bridge.clone();
                    let session = session.clone();
                    tokio::spawn(async move {
                        let result = serve_connection(
                            stream,
                            |command: Command| {
                                let bridge = bridge.clone();
                                let session = session.clone();
                                async move {
                                    tracing::debug!(?command, "Bridge command");
                                    bridge.handle(&session, command).await
                                }
                            },
                            |e: &FrameError| Response::error(format!("Invalid command: {}", e)),
                        )
                        .await;
                        if let Err(e) = result {
                            tracing::error!("Bridge connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Bridge accept error: {}", e);
                }
            }
        }
    }
}
