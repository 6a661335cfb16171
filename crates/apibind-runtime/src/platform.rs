//! Thread-local OS error state
//!
//! Failure sentinels returned by native calls are ordinary values; the
//! reason behind them is read separately, right after the call, from the
//! calling thread's last-error slot (`GetLastError` on Windows, `errno`
//! elsewhere).

/// Last OS error code of the calling thread, uninterpreted
pub fn last_error() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Human-readable text for an OS error code
pub fn describe_error(code: i32) -> String {
    std::io::Error::from_raw_os_error(code).to_string()
}
