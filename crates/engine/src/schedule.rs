use std::time::Duration;

/// Time left until the next multiple of `period`, counted from loop start.
///
/// A pass that ends exactly on a boundary waits a full period. A pass that overruns one or more
/// periods waits for the next boundary after it ends; missed passes are not made up.
pub fn time_until_next_tick(elapsed: Duration, period: Duration) -> Duration {
    let period_ns = period.as_nanos();
    if period_ns == 0 {
        return Duration::ZERO;
    }
    let into_period = elapsed.as_nanos() % period_ns;
    let wait = period_ns - into_period;
    Duration::from_nanos(u64::try_from(wait).unwrap_or(u64::MAX))
}
