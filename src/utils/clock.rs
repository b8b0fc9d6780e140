use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
pub trait Clock: Sync + Send + 'static {
    /// Wall clock time. Used for entry timestamps.
    fn time(&self) -> DateTime<Utc>;

    /// Monotonic time. Used for measuring how long a test ran.
    fn instant(&self) -> Instant;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}
