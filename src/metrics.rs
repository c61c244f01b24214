//! Per-validator telemetry bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Thread-safe telemetry accumulator shared by a validator and its key resolver.
#[derive(Debug, Default)]
pub struct ValidatorMetrics {
	validations_total: AtomicU64,
	accepted_total: AtomicU64,
	key_cache_hits: AtomicU64,
	key_cache_misses: AtomicU64,
	fetch_successes: AtomicU64,
	fetch_errors: AtomicU64,
}
impl ValidatorMetrics {
	/// Create a new telemetry accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a completed validation and whether the token was accepted.
	pub fn record_validation(&self, accepted: bool) {
		self.validations_total.fetch_add(1, Ordering::Relaxed);
		if accepted {
			self.accepted_total.fetch_add(1, Ordering::Relaxed);
		}
	}

	/// Record a key lookup served from the cached snapshot.
	pub fn record_key_hit(&self) {
		self.key_cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a key lookup that missed the cached snapshot.
	pub fn record_key_miss(&self) {
		self.key_cache_misses.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a successful key-endpoint fetch.
	pub fn record_fetch_success(&self) {
		self.fetch_successes.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a failed key-endpoint fetch.
	pub fn record_fetch_error(&self) {
		self.fetch_errors.fetch_add(1, Ordering::Relaxed);
	}

	/// Take a point-in-time snapshot for diagnostics.
	pub fn snapshot(&self) -> ValidatorMetricsSnapshot {
		ValidatorMetricsSnapshot {
			validations_total: self.validations_total.load(Ordering::Relaxed),
			accepted_total: self.accepted_total.load(Ordering::Relaxed),
			key_cache_hits: self.key_cache_hits.load(Ordering::Relaxed),
			key_cache_misses: self.key_cache_misses.load(Ordering::Relaxed),
			fetch_successes: self.fetch_successes.load(Ordering::Relaxed),
			fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
		}
	}
}

/// Read-only snapshot of validator telemetry counters.
#[derive(Clone, Debug)]
pub struct ValidatorMetricsSnapshot {
	/// Total validations observed.
	pub validations_total: u64,
	/// Validations that produced a `Valid` outcome.
	pub accepted_total: u64,
	/// Key lookups served from the cached snapshot.
	pub key_cache_hits: u64,
	/// Key lookups that missed the cached snapshot.
	pub key_cache_misses: u64,
	/// Successful key-endpoint fetches.
	pub fetch_successes: u64,
	/// Failed key-endpoint fetches.
	pub fetch_errors: u64,
}
impl ValidatorMetricsSnapshot {
	/// Ratio of key lookups served without I/O.
	pub fn key_hit_rate(&self) -> f64 {
		let total = self.key_cache_hits + self.key_cache_misses;

		if total == 0 { 0.0 } else { self.key_cache_hits as f64 / total as f64 }
	}

	/// Ratio of validations that accepted the token.
	pub fn acceptance_rate(&self) -> f64 {
		if self.validations_total == 0 {
			0.0
		} else {
			self.accepted_total as f64 / self.validations_total as f64
		}
	}
}
