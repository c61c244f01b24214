//! Cache-or-fetch resolution of signing keys by key identifier.

// crates.io
use tokio::sync::Mutex;
// self
use crate::{
	_prelude::*,
	keys::{
		fetch::{FetchError, KeyFetcher},
		store::{KeySet, KeyStore, SigningKey},
	},
	metrics::ValidatorMetrics,
	policy::ValidatorConfig,
};

/// Failure to resolve a signing key for a token.
///
/// The two variants are deliberately distinct: `UnknownKey` means the token references a
/// key the server does not currently publish, while `FetchFailed` means the server could
/// not be consulted at all.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
	/// The server's freshly fetched key set does not contain the requested key.
	#[error("signing key '{key_id}' is not published by the authorization server")]
	UnknownKey {
		/// Key identifier the token declared.
		key_id: String,
	},
	/// The key set could not be refreshed.
	#[error("failed to refresh signing keys: {0}")]
	FetchFailed(#[from] FetchError),
}

/// Resolves signing keys against the cached snapshot, refreshing on miss.
///
/// Concurrent misses coalesce into at most one in-flight fetch; the result is shared by
/// all waiters so a key rotation cannot produce a thundering herd against the server.
#[derive(Clone, Debug)]
pub struct TokenKeyResolver {
	store: Arc<KeyStore>,
	fetcher: Arc<KeyFetcher>,
	single_flight: Arc<Mutex<()>>,
	metrics: Arc<ValidatorMetrics>,
}
impl TokenKeyResolver {
	/// Build a resolver with its own store, fetcher, and metrics.
	pub fn new(config: &ValidatorConfig) -> Result<Self> {
		let fetcher = KeyFetcher::new(config)?;

		Ok(Self::with_parts(Arc::new(KeyStore::new()), Arc::new(fetcher), ValidatorMetrics::new()))
	}

	/// Build a resolver from shared parts.
	pub fn with_parts(
		store: Arc<KeyStore>,
		fetcher: Arc<KeyFetcher>,
		metrics: Arc<ValidatorMetrics>,
	) -> Self {
		Self { store, fetcher, single_flight: Arc::new(Mutex::new(())), metrics }
	}

	/// The underlying snapshot store.
	pub fn store(&self) -> &Arc<KeyStore> {
		&self.store
	}

	/// The shared telemetry accumulator.
	pub fn metrics(&self) -> Arc<ValidatorMetrics> {
		self.metrics.clone()
	}

	/// Resolve the signing key named by a token's `kid` header.
	///
	/// The common case is an O(1) cache hit with no I/O. On a miss the key set is
	/// refreshed once and the lookup retried against the fresh snapshot; a key still
	/// absent after that refresh is unknown. Unknown-key results are never cached, so a
	/// legitimately new key is picked up on the next call.
	#[tracing::instrument(skip(self), fields(kid = key_id))]
	pub async fn resolve(&self, key_id: &str) -> std::result::Result<Arc<SigningKey>, ResolveError> {
		let snapshot = self.store.current().await;

		if let Some(key) = snapshot.get(key_id) {
			self.metrics.record_key_hit();

			return Ok(key);
		}

		self.metrics.record_key_miss();
		tracing::debug!("key not cached; treating miss as potential rotation");

		let refreshed = self.refresh_coalesced(&snapshot).await?;

		refreshed
			.get(key_id)
			.ok_or_else(|| ResolveError::UnknownKey { key_id: key_id.to_string() })
	}

	/// Refresh the snapshot, coalescing with any refresh already in flight.
	///
	/// `observed` is the snapshot the caller based its miss on; if a different snapshot
	/// is current once the guard is acquired, that refresh already ran and its result is
	/// shared instead of fetching again.
	async fn refresh_coalesced(
		&self,
		observed: &Arc<KeySet>,
	) -> std::result::Result<Arc<KeySet>, ResolveError> {
		let _guard = self.single_flight.lock().await;
		let current = self.store.current().await;

		if !Arc::ptr_eq(&current, observed) {
			return Ok(current);
		}

		let fetcher = self.fetcher.clone();
		let store = self.store.clone();
		// Detached so a cancelled waiter cannot abort the fetch other waiters share.
		let refresh = tokio::spawn(async move {
			let set = fetcher.fetch().await?;

			Ok::<_, FetchError>(store.replace(set).await)
		});

		match refresh.await {
			Ok(Ok(set)) => {
				self.metrics.record_fetch_success();

				Ok(set)
			},
			Ok(Err(err)) => {
				self.metrics.record_fetch_error();
				tracing::warn!(error = %err, "key refresh failed");

				Err(ResolveError::FetchFailed(err))
			},
			Err(err) => {
				self.metrics.record_fetch_error();
				tracing::warn!(error = %err, "key refresh task failed");

				Err(ResolveError::FetchFailed(FetchError::Unreachable {
					detail: "refresh task aborted before completion".into(),
				}))
			},
		}
	}
}
