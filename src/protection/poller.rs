use std::net::IpAddr;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::error::FingerprintUnavailable;
use crate::models::fingerprint::PassiveFingerprint;
use crate::sources::FingerprintSource;

use super::normalizer::normalize_fingerprint;

/// Ask `source` about `client` until it answers with something, sleeping
/// `poll_interval` between attempts.
///
/// `max_wait` is a hard ceiling: a query still in flight at the deadline
/// is abandoned and the last sleep is cut short. No lock is held here, and
/// dropping the future stops polling immediately.
pub async fn poll(
    source: &dyn FingerprintSource,
    client: IpAddr,
    max_wait: Duration,
    poll_interval: Duration,
) -> Result<PassiveFingerprint, FingerprintUnavailable> {
    let started = Instant::now();
    let deadline = started + max_wait;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());

        match timeout(remaining, source.query(client)).await {
            Ok(Some(raw)) if !raw.is_empty() => {
                debug!(ip = %client, attempts = attempts, "Passive fingerprint received");
                return Ok(normalize_fingerprint(&raw));
            }
            Ok(_) => {}
            Err(_) => break,
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(poll_interval.min(deadline - now)).await;
    }

    let waited = started.elapsed();
    debug!(ip = %client, attempts = attempts, waited_ms = waited.as_millis() as u64, "Gave up waiting for passive fingerprint");
    Err(FingerprintUnavailable {
        client,
        waited,
        attempts,
    })
}
