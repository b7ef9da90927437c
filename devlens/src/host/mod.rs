//! Host collaborators for running outside an editor process

mod bridge;
mod browser;
mod routes;
mod runner;
mod status_line;

pub use bridge::{BridgeServer, EditorBridge};
pub use browser::BrowserPreview;
pub use routes::{ConfiguredCommand, RouteResolver};
pub use runner::ProcessTaskRunner;
pub use status_line::TerminalStatusBar;
