use chrono::{DateTime, Utc};

/// Source of the current instant. Services take this instead of calling
/// `Utc::now()` directly so time-sensitive rules (the reschedule lockout
/// window in particular) can be pinned in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
