use std::time::Duration;

pub const READINESS_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
