//! Status badge reflecting the session state

use serde::{Deserialize, Serialize};

use crate::host::{StatusBar, StatusBarItem};
use crate::session::SessionState;

/// Visual configuration for one session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAppearance {
    pub text: String,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
}

impl StatusAppearance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Appearance for each of the three session states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBarSpec {
    pub started: StatusAppearance,
    pub spinning: StatusAppearance,
    pub stopped: StatusAppearance,
}

impl StatusBarSpec {
    pub fn appearance(&self, state: SessionState) -> &StatusAppearance {
        match state {
            SessionState::Started => &self.started,
            SessionState::Spinning => &self.spinning,
            SessionState::Stopped => &self.stopped,
        }
    }
}

impl Default for StatusBarSpec {
    fn default() -> Self {
        Self {
            started: StatusAppearance::new("● Preview running")
                .with_tooltip("Stop the dev server")
                .with_command("devlens.toggle")
                .with_color("green"),
            spinning: StatusAppearance::new("◌ Starting preview")
                .with_tooltip("Waiting for the dev server")
                .with_color("yellow"),
            stopped: StatusAppearance::new("○ Preview stopped")
                .with_tooltip("Start the dev server")
                .with_command("devlens.toggle"),
        }
    }
}

/// Drives a single status bar item. Holds no session logic.
pub struct StatusIndicator {
    item: Box<dyn StatusBarItem>,
    spec: StatusBarSpec,
}

impl StatusIndicator {
    /// Creates the item, renders the stopped appearance and shows it.
    pub fn new(status_bar: &dyn StatusBar, spec: StatusBarSpec) -> Self {
        let mut item = status_bar.create();
        item.update(&spec.stopped);
        item.show();
        Self { item, spec }
    }

    pub fn enter(&mut self, state: SessionState) {
        self.item.update(self.spec.appearance(state));
    }

    pub fn dispose(self) {
        self.item.dispose();
    }
}
