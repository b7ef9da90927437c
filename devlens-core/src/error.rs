use thiserror::Error;

/// Failure reported by one of the host collaborators.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl HostError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Reasons a session start did not reach the running state
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to resolve the server command: {0}")]
    CommandProvider(#[source] HostError),

    #[error("Failed to launch task: {0}")]
    TaskLaunch(#[source] HostError),

    #[error("Start was interrupted by a stop")]
    Superseded,

    #[error("Session has been disposed")]
    Disposed,
}
