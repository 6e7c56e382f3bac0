/// Oldest acceptable delivery, in seconds before now.
pub const MAX_WEBHOOK_AGE_SECS: i64 = 300;

/// Clock-skew tolerance for deliveries stamped in the future.
pub const MAX_CLOCK_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("timestamp {0:?} is not a Unix timestamp")]
    Unparseable(String),
    #[error("timestamp {claimed} is {age}s old")]
    Expired { claimed: i64, age: i64 },
    #[error("timestamp {claimed} is {ahead}s in the future")]
    FromFuture { claimed: i64, ahead: i64 },
}

/// Acceptance window around the current time for a delivery's claimed timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayWindow {
    pub max_age_secs: i64,
    pub max_skew_secs: i64,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self {
            max_age_secs: MAX_WEBHOOK_AGE_SECS,
            max_skew_secs: MAX_CLOCK_SKEW_SECS,
        }
    }
}

impl ReplayWindow {
    /// Parse `claimed` and check it against `now` (both Unix seconds).
    /// Both bounds are inclusive.
    pub fn check(&self, claimed: &str, now: i64) -> Result<i64, ReplayError> {
        let ts: i64 = claimed
            .parse()
            .map_err(|_| ReplayError::Unparseable(claimed.to_string()))?;

        let age = now.saturating_sub(ts);
        if age > self.max_age_secs {
            return Err(ReplayError::Expired { claimed: ts, age });
        }
        let ahead = ts.saturating_sub(now);
        if ahead > self.max_skew_secs {
            return Err(ReplayError::FromFuture { claimed: ts, ahead });
        }
        Ok(ts)
    }
}
