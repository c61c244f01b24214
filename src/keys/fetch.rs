//! Network retrieval of the authorization server's published signing keys.

// std
use std::{collections::HashMap, time::Instant};
// crates.io
use jsonwebtoken::jwk::JwkSet;
use reqwest::{Client, redirect::Policy};
// self
use crate::{
	_prelude::*,
	keys::store::{KeySet, SigningKey},
	policy::ValidatorConfig,
};

/// Failure of a single key-endpoint request.
///
/// No retries happen at this layer; retry policy belongs to the caller.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
	/// The endpoint could not be reached or did not serve keys.
	#[error("key endpoint unreachable: {detail}")]
	Unreachable {
		/// Transport- or status-level description of the failure.
		detail: String,
	},
	/// The request exceeded the configured timeout.
	#[error("key endpoint request timed out after {limit:?}")]
	Timeout {
		/// Timeout that was applied to the request.
		limit: Duration,
	},
	/// The endpoint answered with a payload that is not a usable key set.
	#[error("key endpoint response malformed: {detail}")]
	MalformedResponse {
		/// Description of what failed to parse.
		detail: String,
	},
}

/// Fetches and parses the key-publishing endpoint into [`KeySet`] snapshots.
#[derive(Clone, Debug)]
pub struct KeyFetcher {
	client: Client,
	keys_url: url::Url,
	request_timeout: Duration,
	max_response_bytes: u64,
}
impl KeyFetcher {
	/// Build a fetcher with the default reqwest client.
	pub fn new(config: &ValidatorConfig) -> Result<Self> {
		config.validate()?;

		let client = Client::builder()
			.redirect(Policy::limited(10))
			.user_agent(format!("token-validator/{}", env!("CARGO_PKG_VERSION")))
			.connect_timeout(Duration::from_secs(5))
			.build()?;

		Ok(Self::with_client(config, client))
	}

	/// Build a fetcher using the supplied HTTP client (primarily for tests).
	pub fn with_client(config: &ValidatorConfig, client: Client) -> Self {
		Self {
			client,
			keys_url: config.keys_url.clone(),
			request_timeout: config.request_timeout,
			max_response_bytes: config.max_response_bytes,
		}
	}

	/// Endpoint this fetcher pulls keys from.
	pub fn keys_url(&self) -> &url::Url {
		&self.keys_url
	}

	/// Perform a single request against the key endpoint and parse the response.
	///
	/// Entries without a `kid` or with unusable material are skipped; the remaining
	/// entries still form one complete snapshot.
	pub async fn fetch(&self) -> std::result::Result<KeySet, FetchError> {
		let start = Instant::now();
		let response = self
			.client
			.get(self.keys_url.clone())
			.timeout(self.request_timeout)
			.send()
			.await
			.map_err(|err| self.classify(err))?;
		let status = response.status();

		if !status.is_success() {
			return Err(FetchError::Unreachable {
				detail: format!("key endpoint returned HTTP {status}"),
			});
		}

		let bytes = response.bytes().await.map_err(|err| self.classify(err))?;

		if bytes.len() as u64 > self.max_response_bytes {
			return Err(FetchError::MalformedResponse {
				detail: format!(
					"response size {size} bytes exceeds the configured guard of {limit} bytes",
					size = bytes.len(),
					limit = self.max_response_bytes
				),
			});
		}

		let jwks: JwkSet = serde_json::from_slice(&bytes)
			.map_err(|err| FetchError::MalformedResponse { detail: err.to_string() })?;
		let fetched_at = Utc::now();
		let mut keys = HashMap::with_capacity(jwks.keys.len());

		for jwk in &jwks.keys {
			match SigningKey::from_jwk(jwk, fetched_at) {
				Ok(key) => {
					keys.insert(key.key_id.clone(), Arc::new(key));
				},
				Err(err) => {
					tracing::warn!(error = %err, "skipping unusable published key");
				},
			}
		}

		tracing::debug!(
			url = %self.keys_url,
			status = %status,
			keys = keys.len(),
			elapsed = ?start.elapsed(),
			"key fetch complete"
		);

		Ok(KeySet::new(keys, self.keys_url.clone(), fetched_at))
	}

	fn classify(&self, err: reqwest::Error) -> FetchError {
		if err.is_timeout() {
			FetchError::Timeout { limit: self.request_timeout }
		} else {
			FetchError::Unreachable { detail: err.to_string() }
		}
	}
}
