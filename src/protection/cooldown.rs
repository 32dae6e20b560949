use parking_lot::{Mutex, MutexGuard};

/// Remembers when a probing service last gave itself away.
///
/// One instance is shared by every request handler. The timestamp is epoch
/// seconds and starts at 0, so a fresh timer is never inside any sane
/// window. Nothing clears it; it only moves forward when a check fires.
pub struct DisclosureCooldown {
    last_disclosure_epoch: Mutex<i64>,
}

impl DisclosureCooldown {
    pub fn new() -> Self {
        Self {
            last_disclosure_epoch: Mutex::new(0),
        }
    }

    /// Record a disclosure at the current wall-clock second.
    #[cfg(test)]
    pub fn observe_now(&self) {
        self.observe_at(chrono::Utc::now().timestamp());
    }

    #[cfg(test)]
    pub fn observe_at(&self, epoch: i64) {
        *self.last_disclosure_epoch.lock() = epoch;
    }

    pub fn is_within_window(&self, now: i64, window_secs: u64) -> bool {
        window_contains(*self.last_disclosure_epoch.lock(), now, window_secs)
    }

    pub fn last_disclosure_epoch(&self) -> i64 {
        *self.last_disclosure_epoch.lock()
    }

    /// Hold the timer for a read-then-maybe-write sequence.
    pub(crate) fn lock(&self) -> CooldownGuard<'_> {
        CooldownGuard {
            inner: self.last_disclosure_epoch.lock(),
        }
    }
}

impl Default for DisclosureCooldown {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to the timer. Other handlers wait until it drops.
pub(crate) struct CooldownGuard<'a> {
    inner: MutexGuard<'a, i64>,
}

impl CooldownGuard<'_> {
    pub fn last_disclosure_epoch(&self) -> i64 {
        *self.inner
    }

    pub fn observe_at(&mut self, epoch: i64) {
        *self.inner = epoch;
    }
}

/// `now < last + window`, saturating instead of overflowing.
pub(crate) fn window_contains(last: i64, now: i64, window_secs: u64) -> bool {
    let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
    now < last.saturating_add(window)
}
