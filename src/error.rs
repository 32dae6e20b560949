use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

/// Raised when the passive fingerprint source never produced a usable
/// result for a client within the allowed wait.
///
/// This is the only enrichment failure that aborts a check. Every other
/// lookup degrades to a sentinel instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no passive fingerprint for {client} after {waited:?} ({attempts} attempts)")]
pub struct FingerprintUnavailable {
    pub client: IpAddr,
    pub waited: Duration,
    pub attempts: u32,
}

/// Failure of one of the best-effort network ownership lookups.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup database is not loaded")]
    DatabaseMissing,

    #[error("no record for {0}")]
    NotFound(IpAddr),

    #[error("lookup failed: {0}")]
    Backend(String),

    #[error("resolver i/o error: {0}")]
    Io(#[from] std::io::Error),
}
