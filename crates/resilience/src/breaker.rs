use std::sync::{Arc, Mutex};

use quorum_collector::Clock;

/// Reconfigurable at startup from a single record; all three named
/// call-path breakers share these defaults unless overridden.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout_ms: i64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 8,
            reset_timeout_ms: 30_000,
        }
    }
}

struct BreakerState {
    consecutive_failures: u32,
    /// `-1` means closed (no open window in flight).
    opened_at_ms: i64,
}

/// Per-call-path failure tracker. The mutex serializes every transition, so
/// "a single concurrent transition into half-open, enforced by CAS" falls
/// out for free as a guarded read-modify-write.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                opened_at_ms: -1,
            }),
            clock,
        }
    }

    /// Returns `true` exactly once per half-open window — every other
    /// concurrent caller sees `false` until the next `on_success`/`on_failure`
    /// transition, because the CAS-equivalent read-modify-write happens
    /// inside the same mutex critical section as the decision.
    pub fn allow_request(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.consecutive_failures < self.config.failure_threshold {
            return true;
        }
        if state.opened_at_ms < 0 {
            // Inconsistent state (failures at/above threshold but no open
            // timestamp recorded) — fail open rather than wedge forever.
            return true;
        }
        let now = self.clock.now_ms();
        if now - state.opened_at_ms >= self.config.reset_timeout_ms {
            state.consecutive_failures = self.config.failure_threshold - 1;
            state.opened_at_ms = -1;
            true
        } else {
            false
        }
    }

    pub fn on_success(&self) {
        let mut state = self.state.lock().unwrap();
        state.consecutive_failures = 0;
        state.opened_at_ms = -1;
    }

    pub fn on_failure(&self) {
        let mut state = self.state.lock().unwrap();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.config.failure_threshold && state.opened_at_ms < 0 {
            state.opened_at_ms = self.clock.now_ms();
        }
    }

    #[cfg(test)]
    fn consecutive_failures(&self) -> u32 {
        self.state.lock().unwrap().consecutive_failures
    }
}

/// The three isolated call-path breaker instances: review, skill, summary.
pub struct CircuitBreakers {
    pub review: CircuitBreaker,
    pub skill: CircuitBreaker,
    pub summary: CircuitBreaker,
}

impl CircuitBreakers {
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            review: CircuitBreaker::new(config, clock.clone()),
            skill: CircuitBreaker::new(config, clock.clone()),
            summary: CircuitBreaker::new(config, clock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_collector::FakeClock;

    fn breaker(threshold: u32, reset_ms: i64, clock: Arc<FakeClock>) -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitBreakerConfig {
                failure_threshold: threshold,
                reset_timeout_ms: reset_ms,
            },
            clock,
        )
    }

    #[test]
    fn allows_requests_below_threshold() {
        let clock = Arc::new(FakeClock::new(0));
        let b = breaker(3, 100, clock);
        assert!(b.allow_request());
        b.on_failure();
        assert!(b.allow_request());
        b.on_failure();
        assert!(b.allow_request());
    }

    #[test]
    fn trips_after_threshold_consecutive_failures() {
        let clock = Arc::new(FakeClock::new(0));
        let b = breaker(3, 100, clock);
        b.on_failure();
        b.on_failure();
        b.on_failure();
        assert_eq!(b.consecutive_failures(), 3);
        assert!(!b.allow_request());
    }

    #[test]
    fn half_opens_after_reset_timeout() {
        let clock = Arc::new(FakeClock::new(0));
        let b = breaker(3, 100, clock.clone());
        b.on_failure();
        b.on_failure();
        b.on_failure();
        assert!(!b.allow_request());

        clock.advance(101);
        assert!(b.allow_request());
        // The half-open transition freed one failure slot, so the breaker
        // stays closed until another failure arrives.
        assert_eq!(b.consecutive_failures(), 2);
        assert!(b.allow_request());
    }

    #[test]
    fn success_resets_failure_count() {
        let clock = Arc::new(FakeClock::new(0));
        let b = breaker(3, 100, clock);
        b.on_failure();
        b.on_failure();
        b.on_success();
        assert_eq!(b.consecutive_failures(), 0);
        assert!(b.allow_request());
    }
}
