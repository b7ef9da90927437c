use std::sync::Arc;

use crate::host::{OpenOptions, PreviewSurface};

/// Result of a navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Same URL as last time and the preview is still showing.
    Unchanged,
    /// The preview was opened. `record` tells the caller to remember the URL.
    Opened { record: bool },
    Failed,
}

/// Opens URLs in the preview surface, skipping redundant opens.
pub struct Navigator {
    surface: Arc<dyn PreviewSurface>,
}

impl Navigator {
    pub fn new(surface: Arc<dyn PreviewSurface>) -> Self {
        Self { surface }
    }

    pub async fn open(&self, url: &str, last_opened: Option<&str>, server_started: bool) -> Navigation {
        if last_opened == Some(url) && self.surface.has_preview_open() {
            tracing::debug!(url = %url, "Preview already showing");
            return Navigation::Unchanged;
        }

        match self.surface.open(url, OpenOptions::default()).await {
            Ok(()) => {
                tracing::debug!(url = %url, "Opened preview");
                Navigation::Opened {
                    record: server_started,
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open preview");
                Navigation::Failed
            }
        }
    }
}
