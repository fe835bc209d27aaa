use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

/// Current unix time in seconds.
pub fn unix_now() -> Result<u64, SystemTimeError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
