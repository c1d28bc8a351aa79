use chrono::{DateTime, Utc};

/// Source of "now" for every time-dependent rule (OTP windows, daily
/// swipe boundaries, premium expiry).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
