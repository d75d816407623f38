// crates/fraud-orchestrator/src/deadline.rs
// ============================================================================
// Module: Request deadline
// Description: Tracks the total per-request latency budget so the
//              orchestrator can decide when to background persistence and
//              publication instead of extending the caller's critical path.
// Purpose: Implement `spec.md` §4.1 step 7 / §9 "Background vs. hot path":
//          losing a background task drops observability data but never
//          changes the caller-visible decision.
// Dependencies: tokio
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

/// How close to the total budget a request must be before remaining
/// persistence/publication work is moved to a background task
/// (`spec.md` §9: "within 10 ms of the total budget").
pub const BACKGROUND_MARGIN: Duration = Duration::from_millis(10);

/// A single request's total latency budget, measured from the first
/// handler instruction (`spec.md` §4.1: "measured from the first handler
/// instruction").
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    /// When the request began.
    started_at: Instant,
    /// The total budget allotted to this request.
    total: Duration,
}

impl Deadline {
    /// Starts a new deadline of `total` duration from now.
    #[must_use]
    pub fn start(total: Duration) -> Self {
        Self { started_at: Instant::now(), total }
    }

    /// Wall-clock time elapsed since the deadline started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time remaining before the total budget is exhausted, or `Duration::ZERO`
    /// if it already has been.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed())
    }

    /// `true` iff fewer than `margin` remains in the total budget.
    #[must_use]
    pub fn is_near_exhaustion(&self, margin: Duration) -> bool {
        self.remaining() <= margin
    }

    /// Elapsed time in whole milliseconds, for stamping onto a [`Decision`](fraud_core::Decision).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "A single request never runs anywhere near u64::MAX milliseconds.")]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fresh_deadline_is_not_near_exhaustion() {
        let deadline = Deadline::start(Duration::from_millis(100));
        assert!(!deadline.is_near_exhaustion(BACKGROUND_MARGIN));
        assert_eq!(deadline.remaining(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_nears_exhaustion_after_time_advances() {
        let deadline = Deadline::start(Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(95)).await;
        assert!(deadline.is_near_exhaustion(BACKGROUND_MARGIN));
        assert_eq!(deadline.remaining(), Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_saturates_at_zero_past_budget() {
        let deadline = Deadline::start(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }
}
