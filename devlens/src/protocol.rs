//! Editor bridge protocol
//!
//! Requests and responses exchanged over the bridge socket, one JSON object
//! per line.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Commands an editor (or `devlens ctl`) can send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// The active document changed; no path means no document is active
    ActiveDocument {
        #[serde(default)]
        path: Option<PathBuf>,
    },

    /// A terminal with this name was closed
    TerminalClosed { name: String },

    Start,

    Stop,

    Toggle,

    Status,
}

/// Response from the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { data: serde_json::Value },

    Error { message: String },
}

impl Response {
    pub fn ok(data: impl Serialize) -> Self {
        Self::Ok {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Ok { data } => Some(data),
            Self::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Ok { .. } => None,
            Self::Error { message } => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_active_document_command() {
        let cmd: Command =
            serde_json::from_str(r#"{"command": "active_document", "path": "/site/index.md"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            Command::ActiveDocument {
                path: Some(PathBuf::from("/site/index.md"))
            }
        );
    }

    #[test]
    fn active_document_without_path_means_none() {
        let cmd: Command = serde_json::from_str(r#"{"command": "active_document"}"#).unwrap();
        assert_eq!(cmd, Command::ActiveDocument { path: None });
    }

    #[test]
    fn parses_terminal_closed_command() {
        let cmd: Command =
            serde_json::from_str(r#"{"command": "terminal_closed", "name": "dev"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::TerminalClosed {
                name: "dev".to_string()
            }
        );
    }

    #[test]
    fn parses_unit_commands() {
        for (json, expected) in [
            (r#"{"command": "start"}"#, Command::Start),
            (r#"{"command": "stop"}"#, Command::Stop),
            (r#"{"command": "toggle"}"#, Command::Toggle),
            (r#"{"command": "status"}"#, Command::Status),
        ] {
            assert_eq!(serde_json::from_str::<Command>(json).unwrap(), expected);
        }
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(serde_json::from_str::<Command>(r#"{"command": "deploy"}"#).is_err());
    }

    #[test]
    fn serializes_responses() {
        let ok = serde_json::to_string(&Response::ok(serde_json::json!({"state": "started"})))
            .unwrap();
        assert!(ok.contains(r#""status":"ok""#));
        assert!(ok.contains("started"));

        let err = Response::error("not running");
        assert!(!err.is_ok());
        assert_eq!(err.error_message(), Some("not running"));
        assert!(serde_json::to_string(&err).unwrap().contains(r#""status":"error""#));
    }
}
