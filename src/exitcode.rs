//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// The service rejected the request (non-zero status sentinel)
pub const FAILURE: i32 = 1;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Service unavailable (network failure)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Remote error in protocol (unexpected response body)
pub const PROTOCOL: i32 = 76;

/// Permission denied (login refused)
pub const NOPERM: i32 = 77;

/// Configuration error (missing credentials, bad config file)
pub const CONFIG: i32 = 78;
