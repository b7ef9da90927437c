//! Devlens core
//!
//! Lifecycle controller for an externally spawned dev server, kept in sync
//! with the editor's active document and a status badge:
//! - [`ServerSession`]: start/stop/toggle state machine and event wiring
//! - [`StatusIndicator`]: three-state badge driven by the session
//! - [`ReadinessPoller`]: waits for the server to answer HTTP
//! - [`Navigator`]: opens preview URLs, skipping redundant opens
//!
//! Everything outside the controller (process runner, editor, browser,
//! status bar) is reached through the traits in [`host`].

pub mod defaults;
mod error;
pub mod host;
mod navigator;
mod readiness;
mod session;
mod status;

#[cfg(test)]
mod testing;

pub use error::{HostError, SessionError};
pub use host::{
    CommandProvider, DocumentHandler, DocumentRef, EditorHost, ListenerSet, NameHandler,
    OpenOptions, Placement, PreviewSurface, Reveal, ShellCommand, StatusBar, StatusBarItem,
    Subscription, TaskHandle, TaskRunner, TaskSpec, UrlResolver,
};
pub use navigator::{Navigation, Navigator};
pub use readiness::{HttpProbe, Probe, Readiness, ReadinessPoller};
pub use session::{
    Host, Providers, ServerSession, SessionOptions, SessionState, SessionStatus, StartOutcome,
    ToggleOutcome,
};
pub use status::{StatusAppearance, StatusBarSpec, StatusIndicator};
