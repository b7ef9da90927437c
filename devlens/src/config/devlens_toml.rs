use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devlens_core::{
    SessionOptions, ShellCommand, StatusAppearance, StatusBarSpec, defaults::READINESS_TIMEOUT,
};

use super::error::{ConfigError, Result};

pub const CONFIG_FILE_NAME: &str = "devlens.toml";

/// Root configuration from devlens.toml
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DevlensToml {
    /// [server] section - the dev server task
    pub server: ServerSection,

    /// [preview] section - URL mapping and browser
    pub preview: PreviewSection,

    /// [status_bar.*] sections - per-state badge overrides
    #[serde(default)]
    pub status_bar: StatusBarOverrides,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Task display name, also used to detect an already-running task
    pub task: String,

    /// Shell command line that starts the dev server
    pub command: String,

    /// Working directory, relative to the config file
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub auto_start: bool,

    /// Readiness check timeout in milliseconds (0 = don't wait)
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PreviewSection {
    /// Root URL of the dev server
    pub base_url: String,

    /// Directory that maps onto the URL space, relative to the config file
    #[serde(default)]
    pub content_root: Option<PathBuf>,

    /// Extensions dropped when building a URL from a document path
    #[serde(default = "default_strip_extensions")]
    pub strip_extensions: Vec<String>,

    /// Browser command; the URL is appended as the last argument
    #[serde(default)]
    pub opener: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StatusBarOverrides {
    pub started: Option<StatusAppearance>,
    pub spinning: Option<StatusAppearance>,
    pub stopped: Option<StatusAppearance>,
}

fn default_readiness_timeout_ms() -> u64 {
    READINESS_TIMEOUT.as_millis() as u64
}

fn default_strip_extensions() -> Vec<String> {
    ["html", "md", "mdx"].iter().map(|s| s.to_string()).collect()
}

impl DevlensToml {
    /// Load devlens.toml from a directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Err(ConfigError::Validation(format!(
                "Missing {} at {}",
                CONFIG_FILE_NAME,
                path.display()
            )));
        }
        Self::load_from_file(&path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(path.as_ref().to_path_buf(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: DevlensToml = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.task.trim().is_empty() {
            return Err(ConfigError::Validation(
                "[server] task must not be empty".to_string(),
            ));
        }
        if self.server.command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "[server] command must not be empty".to_string(),
            ));
        }

        let base_url = self.preview.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "[preview] base_url '{}' must start with http:// or https://",
                self.preview.base_url
            )));
        }

        if let Some(opener) = &self.preview.opener
            && opener.first().is_none_or(|program| program.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "[preview] opener must name a program".to_string(),
            ));
        }

        Ok(())
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.server.readiness_timeout_ms)
    }

    pub fn status_bar_spec(&self) -> StatusBarSpec {
        let mut spec = StatusBarSpec::default();
        let overrides = &self.status_bar;
        if let Some(started) = &overrides.started {
            spec.started = started.clone();
        }
        if let Some(spinning) = &overrides.spinning {
            spec.spinning = spinning.clone();
        }
        if let Some(stopped) = &overrides.stopped {
            spec.stopped = stopped.clone();
        }
        spec
    }

    pub fn session_options(&self) -> SessionOptions {
        let mut options = SessionOptions::new(self.server.task.clone());
        options.auto_start = self.server.auto_start;
        options.readiness_timeout = self.readiness_timeout();
        options.status_bar = Some(self.status_bar_spec());
        options
    }

    /// Shell command for the dev server, with `cwd` resolved against `project_dir`.
    pub fn shell_command(&self, project_dir: &Path) -> ShellCommand {
        let cwd = match &self.server.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            Some(cwd) => project_dir.join(cwd),
            None => project_dir.to_path_buf(),
        };
        ShellCommand {
            command_line: self.server.command.clone(),
            cwd: Some(cwd),
            env: self.server.env.clone(),
        }
    }
}
