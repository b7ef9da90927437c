use std::path::{Path, PathBuf};

use crate::cli::{CtlAction, CtlArgs};
use crate::output;
use crate::paths;
use crate::protocol::{Command, Response};

pub async fn run(args: CtlArgs) -> Result<(), Box<dyn std::error::Error>> {
    let socket = match args.socket {
        Some(socket) => socket,
        None => paths::default_socket_path()?,
    };
    let command = to_command(args.action, &std::env::current_dir()?);

    let response: Response = devlens_socket::request(&socket, &command)
        .await
        .map_err(|e| format!("Could not reach devlens at {}: {}", socket.display(), e))?;

    if let Some(message) = response.error_message() {
        return Err(message.into());
    }

    let data = response.data().cloned().unwrap_or_default();
    output::success(&summary(&data));
    if output::is_verbose() {
        output::muted(&serde_json::to_string_pretty(&data)?);
    }
    Ok(())
}

fn to_command(action: CtlAction, cwd: &Path) -> Command {
    match action {
        CtlAction::Start => Command::Start,
        CtlAction::Stop => Command::Stop,
        CtlAction::Toggle => Command::Toggle,
        CtlAction::Status => Command::Status,
        CtlAction::Open { path } => Command::ActiveDocument {
            path: Some(absolute(path, cwd)),
        },
        CtlAction::Closed { name } => Command::TerminalClosed { name },
    }
}

fn absolute(path: PathBuf, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// One-line description of a bridge response payload.
fn summary(data: &serde_json::Value) -> String {
    if let Some(state) = data.get("state").and_then(|v| v.as_str()) {
        let url = data
            .get("last_opened_url")
            .and_then(|v| v.as_str())
            .map(|url| format!(" ({url})"))
            .unwrap_or_default();
        return format!("Server {state}{url}");
    }
    if let Some(outcome) = data.get("outcome").and_then(|v| v.as_str()) {
        return match outcome {
            "already_running" => "Server already running".to_string(),
            _ => match data.pointer("/readiness/result").and_then(|v| v.as_str()) {
                Some("timed_out") => "Server started (not answering yet)".to_string(),
                _ => "Server started".to_string(),
            },
        };
    }
    if let Some(action) = data.get("action").and_then(|v| v.as_str()) {
        return format!("Server {action}");
    }
    if let Some(active) = data.get("active") {
        return match active.as_str() {
            Some(path) => format!("Active document {path}"),
            None => "No active document".to_string(),
        };
    }
    "Done".to_string()
}
