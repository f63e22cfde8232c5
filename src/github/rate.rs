use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

/// Remaining calls below which the governor starts blocking.
const LOW_WATER_MARK: u64 = 10;

/// Slack added past the reset instant before resuming.
const RESET_SLACK: Duration = Duration::from_secs(1);

/// Rate-limit state read from `x-ratelimit-remaining` /
/// `x-ratelimit-reset` response headers.
#[derive(Debug, Clone, Copy, Default)]
struct RateState {
    /// None until the first response has been observed
    remaining: Option<u64>,
    /// Unix epoch seconds at which the quota window resets
    reset_epoch: u64,
}

/// Pre-empts GitHub rate-limit exhaustion by sleeping until the quota
/// window resets once the remaining-call budget runs low.
///
/// The governor never retries and never treats exhaustion as an error; it
/// only inserts a blocking delay before the next call. It is consulted by
/// bulk traversal loops and fed header state opportunistically by every
/// fetch.
#[derive(Debug, Default)]
pub struct RateGovernor {
    state: Mutex<RateState>,
}

impl RateGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the rate-limit headers of a response.
    pub fn observe(&self, remaining: u64, reset_epoch: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.remaining = Some(remaining);
        state.reset_epoch = reset_epoch;
        debug!(remaining, reset_epoch, "rate limit state updated");
    }

    /// Sleep until just past the reset instant if the remaining budget is
    /// nearly exhausted. A no-op before the first `observe`, when the
    /// budget is comfortable, or when the reset instant has passed.
    pub async fn pause_if_needed(&self) {
        let state = *self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = unix_now();

        if let Some(delay) = required_delay(state.remaining, state.reset_epoch, now) {
            info!(
                delay_secs = delay.as_secs(),
                "rate limit nearly exhausted, pausing until reset"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Delay the next call must wait, if any. Pure so the arithmetic is
/// testable without a clock or a sleep.
fn required_delay(remaining: Option<u64>, reset_epoch: u64, now: u64) -> Option<Duration> {
    let remaining = remaining?;
    if remaining >= LOW_WATER_MARK || reset_epoch <= now {
        return None;
    }
    Some(Duration::from_secs(reset_epoch - now) + RESET_SLACK)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_budget_blocks_until_reset_plus_slack() {
        // remaining = 9, reset 5 seconds out: block ~6 seconds
        let delay = required_delay(Some(9), 1005, 1000).unwrap();
        assert_eq!(delay, Duration::from_secs(6));
    }

    #[test]
    fn test_comfortable_budget_never_blocks() {
        assert!(required_delay(Some(50), u64::MAX, 1000).is_none());
        assert!(required_delay(Some(10), 2000, 1000).is_none());
    }

    #[test]
    fn test_past_reset_never_blocks() {
        assert!(required_delay(Some(0), 999, 1000).is_none());
        assert!(required_delay(Some(3), 1000, 1000).is_none());
    }

    #[test]
    fn test_unobserved_state_never_blocks() {
        assert!(required_delay(None, 0, 1000).is_none());
    }

    #[tokio::test]
    async fn test_pause_is_noop_with_fresh_governor() {
        // Must return promptly; a hang here would fail the test run.
        let governor = RateGovernor::new();
        governor.pause_if_needed().await;
        governor.observe(5000, 0);
        governor.pause_if_needed().await;
    }
}
