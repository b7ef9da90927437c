use std::path::PathBuf;
#[cfg(test)]
use std::sync::{Mutex, MutexGuard, OnceLock};

pub const SOCKET_FILE_NAME: &str = "devlens.sock";

/// Devlens' home directory: `$DEVLENS_HOME`, or `~/.devlens`.
pub fn devlens_home_dir() -> Result<PathBuf, std::io::Error> {
    if let Ok(v) = std::env::var("DEVLENS_HOME")
        && !v.trim().is_empty()
    {
        return Ok(PathBuf::from(v));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        )
    })?;

    Ok(home.join(".devlens"))
}

/// Editor bridge socket used when `--socket` is not given.
pub fn default_socket_path() -> Result<PathBuf, std::io::Error> {
    Ok(devlens_home_dir()?.join(SOCKET_FILE_NAME))
}

#[cfg(test)]
pub(crate) fn test_home_env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
