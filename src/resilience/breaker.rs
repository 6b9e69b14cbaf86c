//! Circuit breaker
//!
//! Tracks the failure ratio of completed operations over a rolling sampling
//! window. Once the window holds at least `minimum_throughput` samples and
//! the failure ratio exceeds `failure_ratio`, the circuit opens and every
//! call fails fast for `break_duration`. After the cool-down a single probe
//! call is let through: success closes the circuit, failure re-opens it and
//! restarts the cool-down.

use crate::metrics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Circuit breaker configuration
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Failure ratio above which the circuit opens
    pub failure_ratio: f64,

    /// Minimum samples in the window before the breaker may trip
    pub minimum_throughput: usize,

    /// Rolling window over which outcomes are sampled
    pub sampling_window: Duration,

    /// How long the circuit stays open before allowing a probe
    pub break_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_ratio: 0.2,
            minimum_throughput: 20,
            sampling_window: Duration::from_secs(30),
            break_duration: Duration::from_secs(20),
        }
    }
}

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

struct BreakerInner {
    state: CircuitState,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    /// When the in-flight probe was admitted. A probe whose caller was
    /// cancelled never reports back, so an older-than-cool-down probe is
    /// considered abandoned and a new one may replace it.
    probe_started: Option<Instant>,
    /// (completion time, success) samples within the rolling window
    window: VecDeque<(Instant, bool)>,
}

/// Ratio-over-rolling-window circuit breaker
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                opened_at: None,
                probe_in_flight: false,
                probe_started: None,
                window: VecDeque::new(),
            }),
        }
    }

    /// Current state, for health reporting and tests
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Ask permission to run one operation.
    ///
    /// Returns false when the circuit is open (or a half-open probe is
    /// already in flight); the caller must fail fast without touching the
    /// downstream.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|t| t.elapsed() >= self.config.break_duration)
                    .unwrap_or(true);
                if cooled_down {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.probe_in_flight = true;
                    inner.probe_started = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                let abandoned = inner
                    .probe_started
                    .map(|t| t.elapsed() >= self.config.break_duration)
                    .unwrap_or(true);
                if inner.probe_in_flight && !abandoned {
                    false
                } else {
                    inner.probe_in_flight = true;
                    inner.probe_started = Some(Instant::now());
                    true
                }
            }
        }
    }

    /// Record the aggregate outcome of one permitted operation.
    pub fn record(&self, success: bool) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.probe_in_flight = false;
                inner.probe_started = None;
                if success {
                    inner.window.clear();
                    self.transition(&mut inner, CircuitState::Closed);
                } else {
                    inner.opened_at = Some(Instant::now());
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::Closed => {
                let now = Instant::now();
                inner.window.push_back((now, success));
                let horizon = now.checked_sub(self.config.sampling_window);
                if let Some(horizon) = horizon {
                    while inner.window.front().is_some_and(|(t, _)| *t < horizon) {
                        inner.window.pop_front();
                    }
                }
                let total = inner.window.len();
                if total >= self.config.minimum_throughput {
                    let failures = inner.window.iter().filter(|(_, ok)| !ok).count();
                    if failures as f64 / total as f64 > self.config.failure_ratio {
                        inner.opened_at = Some(now);
                        inner.window.clear();
                        self.transition(&mut inner, CircuitState::Open);
                    }
                }
            }
            // An operation admitted before the trip finished late; its
            // sample no longer matters.
            CircuitState::Open => {}
        }
    }

    fn transition(&self, inner: &mut BreakerInner, next: CircuitState) {
        if inner.state != next {
            tracing::info!(from = inner.state.as_str(), to = next.as_str(), "circuit transition");
            metrics::try_record_breaker_transition(next.as_str());
            inner.state = next;
        }
    }
}
