//! Project providers: the configured server command and document-to-URL routing

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use devlens_core::{CommandProvider, DocumentRef, HostError, ShellCommand, UrlResolver};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::config::DevlensToml;

/// Characters escaped inside a single URL path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Command taken verbatim from devlens.toml
pub struct ConfiguredCommand {
    command: ShellCommand,
}

impl ConfiguredCommand {
    pub fn new(command: ShellCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl CommandProvider for ConfiguredCommand {
    async fn command(&self) -> Result<ShellCommand, HostError> {
        Ok(self.command.clone())
    }
}

/// Maps documents under the content root onto the dev server's URL space.
///
/// `about.md` becomes `/about`, `blog/index.html` becomes `/blog/`, and files
/// whose extension is not stripped keep their name. Documents outside the
/// content root have no URL.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    base_url: String,
    project_dir: PathBuf,
    content_root: PathBuf,
    strip_extensions: Vec<String>,
}

impl RouteResolver {
    pub fn new(
        base_url: &str,
        project_dir: impl Into<PathBuf>,
        content_root: Option<&Path>,
        strip_extensions: Vec<String>,
    ) -> Self {
        let project_dir = project_dir.into();
        let content_root = match content_root {
            Some(root) if root.is_absolute() => root.to_path_buf(),
            Some(root) => project_dir.join(root),
            None => project_dir.clone(),
        };
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            project_dir,
            content_root,
            strip_extensions,
        }
    }

    pub fn from_config(config: &DevlensToml, project_dir: &Path) -> Self {
        Self::new(
            &config.preview.base_url,
            project_dir,
            config.preview.content_root.as_deref(),
            config.preview.strip_extensions.clone(),
        )
    }

    pub fn root_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn url_for(&self, path: &Path) -> Option<String> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        };
        let relative = path.strip_prefix(&self.content_root).ok()?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let file_name = segments.pop()?;
        let page = self.page_name(&file_name);
        let dir = segments
            .iter()
            .map(|s| utf8_percent_encode(s, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");

        if page == "index" {
            return Some(if dir.is_empty() {
                self.root_url()
            } else {
                format!("{}/{}/", self.base_url, dir)
            });
        }

        let page = utf8_percent_encode(&page, PATH_SEGMENT).to_string();
        Some(if dir.is_empty() {
            format!("{}/{}", self.base_url, page)
        } else {
            format!("{}/{}/{}", self.base_url, dir, page)
        })
    }

    fn page_name(&self, file_name: &str) -> String {
        let path = Path::new(file_name);
        let stripped = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.strip_extensions
                    .iter()
                    .any(|strip| strip.trim_start_matches('.').eq_ignore_ascii_case(ext))
            });

        match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) if stripped => stem.to_string(),
            _ => file_name.to_string(),
        }
    }
}

#[async_trait]
impl UrlResolver for RouteResolver {
    async fn resolve(&self, document: Option<&DocumentRef>) -> Result<Option<String>, HostError> {
        Ok(match document {
            None => Some(self.root_url()),
            Some(document) => self.url_for(&document.path),
        })
    }
}
