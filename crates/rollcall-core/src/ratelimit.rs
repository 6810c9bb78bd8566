//! Per-actor sliding-window rate limiter.
//!
//! In-memory only — a restart resets all limits. Constructed explicitly and
//! injected into whatever holds shared state; there is no process-wide
//! instance with implicit lifecycle.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Mutex, PoisonError},
  time::{Duration, Instant},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tuning knobs for [`RateLimiter`].
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
  /// Trailing window over which requests are counted.
  pub window:      Duration,
  /// Maximum admitted requests per actor within `window`.
  pub burst:       usize,
  /// How often stale actor entries are swept out.
  pub gc_interval: Duration,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      window:      Duration::from_millis(1000),
      burst:       5,
      gc_interval: Duration::from_secs(30),
    }
  }
}

// ─── Limiter ─────────────────────────────────────────────────────────────────

struct Inner {
  actors:  HashMap<String, VecDeque<Instant>>,
  last_gc: Instant,
}

/// Sliding-window request throttle, keyed by actor id.
///
/// `admit` takes the current instant as a parameter so callers control the
/// clock; nothing here reads wall time.
pub struct RateLimiter {
  config: RateLimitConfig,
  inner:  Mutex<Inner>,
}

impl RateLimiter {
  pub fn new(config: RateLimitConfig) -> Self {
    Self {
      config,
      inner: Mutex::new(Inner { actors: HashMap::new(), last_gc: Instant::now() }),
    }
  }

  /// Admit the request and record `now` if this actor has made fewer than
  /// `burst` admitted requests within the trailing window; otherwise reject
  /// without recording. Never fails for an actor under the limit.
  pub fn admit(&self, actor_id: &str, now: Instant) -> bool {
    let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

    if now.duration_since(inner.last_gc) >= self.config.gc_interval {
      inner.last_gc = now;
      let window = self.config.window;
      inner.actors.retain(|_, stamps| {
        while stamps.front().is_some_and(|&t| now.duration_since(t) >= window) {
          stamps.pop_front();
        }
        !stamps.is_empty()
      });
    }

    let stamps = inner.actors.entry(actor_id.to_owned()).or_default();
    while stamps
      .front()
      .is_some_and(|&t| now.duration_since(t) >= self.config.window)
    {
      stamps.pop_front();
    }

    if stamps.len() < self.config.burst {
      stamps.push_back(now);
      true
    } else {
      false
    }
  }

  /// Number of actors currently tracked. Test observability.
  pub fn tracked_actors(&self) -> usize {
    self
      .inner
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .actors
      .len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> RateLimitConfig {
    RateLimitConfig {
      window:      Duration::from_millis(1000),
      burst:       5,
      gc_interval: Duration::from_secs(30),
    }
  }

  #[test]
  fn burst_plus_one_within_window_is_rejected() {
    let limiter = RateLimiter::new(config());
    let t0 = Instant::now();

    for i in 0..5 {
      assert!(
        limiter.admit("sup-1", t0 + Duration::from_millis(i * 10)),
        "request {i} should be admitted"
      );
    }
    assert!(!limiter.admit("sup-1", t0 + Duration::from_millis(60)));
  }

  #[test]
  fn admitted_again_after_window_elapses() {
    let limiter = RateLimiter::new(config());
    let t0 = Instant::now();

    for _ in 0..5 {
      assert!(limiter.admit("sup-1", t0));
    }
    assert!(!limiter.admit("sup-1", t0 + Duration::from_millis(500)));
    assert!(limiter.admit("sup-1", t0 + Duration::from_millis(1001)));
  }

  #[test]
  fn rejected_requests_are_not_recorded() {
    let limiter = RateLimiter::new(config());
    let t0 = Instant::now();

    for _ in 0..5 {
      limiter.admit("sup-1", t0);
    }
    // Hammering while limited must not extend the penalty.
    for i in 0..20 {
      limiter.admit("sup-1", t0 + Duration::from_millis(10 + i));
    }
    assert!(limiter.admit("sup-1", t0 + Duration::from_millis(1001)));
  }

  #[test]
  fn actors_are_limited_independently() {
    let limiter = RateLimiter::new(config());
    let t0 = Instant::now();

    for _ in 0..5 {
      assert!(limiter.admit("sup-1", t0));
    }
    assert!(!limiter.admit("sup-1", t0));
    assert!(limiter.admit("sup-2", t0));
  }

  #[test]
  fn gc_sweeps_stale_actors() {
    let limiter = RateLimiter::new(RateLimitConfig {
      gc_interval: Duration::from_secs(30),
      ..config()
    });
    let t0 = Instant::now();

    limiter.admit("sup-1", t0);
    limiter.admit("sup-2", t0);
    assert_eq!(limiter.tracked_actors(), 2);

    // First request after the GC interval sweeps both stale entries and
    // records the new actor.
    limiter.admit("sup-3", t0 + Duration::from_secs(31));
    assert_eq!(limiter.tracked_actors(), 1);
  }
}
