//! Wall-clock source for version timestamps.

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The system clock, via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // Clocks set before 1970 clamp to zero; minting still moves forward.
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Picks a timestamp strictly after `latest` and as close to `now` as possible.
///
/// Commits landing in the same millisecond (or a clock that stepped backwards)
/// get `latest + 1`.
pub fn next_timestamp(now: u64, latest: Option<u64>) -> u64 {
    match latest {
        Some(latest) if now <= latest => latest.saturating_add(1),
        _ => now,
    }
}
