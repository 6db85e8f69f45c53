use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Failure raised by the policy itself rather than by the wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    CircuitOpen,
    DeadlineExceeded,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CircuitOpen => f.write_str("Circuit breaker is open"),
            Self::DeadlineExceeded => f.write_str("Execution exceeded the configured deadline"),
        }
    }
}

impl std::error::Error for PolicyError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Deadline applied to the primary call. `None` disables the check
    /// entirely; the policy never interrupts a running call either way, an
    /// overrun is only recorded after the call returns.
    pub execution_timeout: Option<Duration>,
    /// Consecutive failures that open the circuit. Normalized to at least 1.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before allowing a trial.
    pub open_interval: Duration,
}

impl PolicyConfig {
    pub fn without_timeout(failure_threshold: u32, open_interval: Duration) -> Self {
        Self {
            execution_timeout: None,
            failure_threshold,
            open_interval,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Explicit fallback/circuit-breaker wrapper: runs a primary operation and,
/// on any failure the primary did not recover itself, dispatches a fallback
/// with the triggering failure. While the circuit is open the primary is
/// skipped and the fallback receives [`PolicyError::CircuitOpen`].
#[derive(Debug)]
pub struct FallbackPolicy {
    config: PolicyConfig,
    state: Mutex<BreakerState>,
}

impl FallbackPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        let config = PolicyConfig {
            failure_threshold: config.failure_threshold.max(1),
            ..config
        };
        Self {
            config,
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn config(&self) -> PolicyConfig {
        self.config
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock().expect("poisoned breaker state");
        match state.opened_at {
            Some(opened_at) => opened_at.elapsed() < self.config.open_interval,
            None => false,
        }
    }

    pub fn execute<T, E, P, F>(&self, primary: P, fallback: F) -> Result<T, E>
    where
        E: From<PolicyError>,
        P: FnOnce() -> Result<T, E>,
        F: FnOnce(&E) -> Result<T, E>,
    {
        if self.reject_call() {
            let failure = E::from(PolicyError::CircuitOpen);
            return fallback(&failure);
        }

        let started_at = Instant::now();
        match primary() {
            Ok(value) => {
                if let Some(limit) = self.config.execution_timeout {
                    if started_at.elapsed() > limit {
                        self.record_failure();
                        let failure = E::from(PolicyError::DeadlineExceeded);
                        return fallback(&failure);
                    }
                }
                self.record_success();
                Ok(value)
            }
            Err(failure) => {
                self.record_failure();
                fallback(&failure)
            }
        }
    }

    fn reject_call(&self) -> bool {
        let mut state = self.state.lock().expect("poisoned breaker state");
        match state.opened_at {
            Some(opened_at) if opened_at.elapsed() < self.config.open_interval => true,
            Some(_) => {
                // Half-open: let one trial call through. The failure count is
                // still at the threshold, so a failing trial reopens the
                // circuit immediately.
                state.opened_at = None;
                false
            }
            None => false,
        }
    }

    fn record_failure(&self) {
        let mut state = self.state.lock().expect("poisoned breaker state");
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.config.failure_threshold {
            state.opened_at = Some(Instant::now());
        }
    }

    fn record_success(&self) {
        let mut state = self.state.lock().expect("poisoned breaker state");
        state.consecutive_failures = 0;
        state.opened_at = None;
    }
}
