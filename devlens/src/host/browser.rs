//! Browser preview - hands URLs to a system opener

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use devlens_core::{HostError, OpenOptions, PreviewSurface};
use tokio::process::Command;

/// Opens preview URLs with an external program.
///
/// The URL is appended as the last argument. Once any open succeeds the
/// preview is considered open for the rest of the process.
pub struct BrowserPreview {
    opener: Vec<String>,
    opened: AtomicBool,
}

pub fn default_opener() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["open".to_string()]
    } else if cfg!(windows) {
        ["cmd", "/C", "start", ""].iter().map(|s| s.to_string()).collect()
    } else {
        vec!["xdg-open".to_string()]
    }
}

impl BrowserPreview {
    pub fn new(opener: Option<Vec<String>>) -> Self {
        Self {
            opener: opener.unwrap_or_else(default_opener),
            opened: AtomicBool::new(false),
        }
    }

    pub fn opener(&self) -> &[String] {
        &self.opener
    }
}

#[async_trait]
impl PreviewSurface for BrowserPreview {
    async fn open(&self, url: &str, options: OpenOptions) -> Result<(), HostError> {
        let Some((program, args)) = self.opener.split_first() else {
            return Err(HostError::message("No preview opener configured"));
        };

        tracing::debug!(
            url = %url,
            placement = ?options.placement,
            preserve_focus = options.preserve_focus,
            "Opening preview"
        );

        let status = Command::new(program)
            .args(args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(HostError::message(format!(
                "{} exited with {}",
                program, status
            )));
        }

        self.opened.store(true, Ordering::Release);
        Ok(())
    }

    fn has_preview_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }
}
