use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use devlens_core::{Host, HttpProbe, Providers, ServerSession};

use crate::cli::RunArgs;
use crate::config::{CONFIG_FILE_NAME, DevlensToml};
use crate::host::{
    BridgeServer, BrowserPreview, ConfiguredCommand, EditorBridge, ProcessTaskRunner,
    RouteResolver, TerminalStatusBar,
};
use crate::output;
use crate::paths;

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config_path = resolve_config_path(args.config.as_deref(), &cwd);
    let project_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.clone());

    let config = if config_path.file_name() == Some(OsStr::new(CONFIG_FILE_NAME)) {
        DevlensToml::load_from_dir(&project_dir)?
    } else {
        DevlensToml::load_from_file(&config_path)?
    };
    let socket = match args.socket {
        Some(socket) => socket,
        None => paths::default_socket_path()?,
    };

    let mut options = config.session_options();
    if args.no_auto_start && options.auto_start {
        output::warning("auto_start is set but --no-auto-start was given; not starting");
        options.auto_start = false;
    }

    let bridge = Arc::new(EditorBridge::new(project_dir.clone()));
    let preview = Arc::new(BrowserPreview::new(config.preview.opener.clone()));
    tracing::debug!(opener = ?preview.opener(), "Preview opener");
    let host = Host {
        tasks: Arc::new(ProcessTaskRunner::new()),
        editor: bridge.clone(),
        preview,
        status_bar: Arc::new(TerminalStatusBar),
        probe: Arc::new(HttpProbe::new()?),
    };
    let providers = Providers {
        command: Arc::new(ConfiguredCommand::new(config.shell_command(&project_dir))),
        url: Arc::new(RouteResolver::from_config(&config, &project_dir)),
    };

    tracing::debug!(config = %config_path.display(), task = %options.task_name, "Loaded config");
    let session = ServerSession::new(options, providers, host);

    let server = BridgeServer::new(socket.clone());
    let listener = server.bind()?;
    output::step(&format!(
        "Editor bridge on {}",
        output::brand_accent(socket.display())
    ));
    output::muted("Press Ctrl-C to stop");

    let mut serving = tokio::spawn(BridgeServer::serve(
        listener,
        bridge.clone(),
        session.clone(),
    ));
    let starting = {
        let session = session.clone();
        tokio::spawn(async move { session.auto_start().await })
    };

    let result: Result<(), Box<dyn std::error::Error>> = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down");
            Ok(())
        }
        served = &mut serving => match served {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(e.into()),
        },
    };

    session.dispose();
    starting.abort();
    serving.abort();
    if let Err(e) = std::fs::remove_file(server.path())
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("Failed to remove socket {}: {}", server.path().display(), e);
    }

    result
}

fn resolve_config_path(config: Option<&Path>, cwd: &Path) -> PathBuf {
    match config {
        Some(path) if path.is_dir() => cwd.join(path).join(CONFIG_FILE_NAME),
        Some(path) => cwd.join(path),
        None => cwd.join(CONFIG_FILE_NAME),
    }
}
