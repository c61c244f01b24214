//! Validation policy and validator configuration.
//!
//! Both types are immutable once handed to [`TokenValidator::new`](crate::TokenValidator::new);
//! every knob is checked up front so a misconfigured check can never degrade into a silent
//! runtime pass-through.

// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::_prelude::*;

/// Default clock-skew tolerance applied to lifetime checks.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);
/// Default timeout for a single key-endpoint request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default size guard for key-endpoint responses (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;

/// Claim-validation policy for incoming bearer tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationPolicy {
	/// Issuer the token's `iss` claim must match exactly (case-sensitive).
	pub expected_issuer: Option<String>,
	/// Audience that must appear in the token's `aud` claim; `None` means no restriction.
	pub expected_audience: Option<String>,
	/// Whether the issuer check is enabled.
	#[serde(default = "default_true")]
	pub validate_issuer: bool,
	/// Whether the audience check is enabled.
	#[serde(default = "default_true")]
	pub validate_audience: bool,
	/// Whether the lifetime check is enabled.
	#[serde(default = "default_true")]
	pub validate_lifetime: bool,
	/// Permitted slack when comparing token timestamps to the local clock.
	#[serde(default = "default_clock_skew")]
	pub clock_skew: Duration,
}
impl ValidationPolicy {
	/// Construct a policy with all checks enabled for the given issuer.
	pub fn new(expected_issuer: impl Into<String>) -> Self {
		Self { expected_issuer: Some(expected_issuer.into()), ..Default::default() }
	}

	/// Restrict accepted tokens to the given audience.
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.expected_audience = Some(audience.into());

		self
	}

	/// Adjust the clock-skew tolerance.
	pub fn with_clock_skew(mut self, skew: Duration) -> Self {
		self.clock_skew = skew;

		self
	}

	/// Validate the policy against the documented constraints.
	///
	/// An enabled check with missing configuration is a construction-time error,
	/// never a runtime skip.
	pub fn validate(&self) -> Result<()> {
		if self.validate_issuer
			&& self.expected_issuer.as_deref().map(str::is_empty).unwrap_or(true)
		{
			return Err(Error::Validation {
				field: "expected_issuer",
				reason: "Must be set and non-empty while issuer validation is enabled.".into(),
			});
		}
		if let Some(audience) = &self.expected_audience
			&& audience.is_empty()
		{
			return Err(Error::Validation {
				field: "expected_audience",
				reason: "Must be non-empty when set.".into(),
			});
		}

		Ok(())
	}
}
impl Default for ValidationPolicy {
	fn default() -> Self {
		Self {
			expected_issuer: None,
			expected_audience: None,
			validate_issuer: true,
			validate_audience: true,
			validate_lifetime: true,
			clock_skew: DEFAULT_CLOCK_SKEW,
		}
	}
}

/// Configuration for a [`TokenValidator`](crate::TokenValidator).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidatorConfig {
	/// URL of the authorization server's key-publishing (JWKS) endpoint.
	pub keys_url: Url,
	/// Whether HTTPS is required for key retrieval.
	#[serde(default = "default_true")]
	pub require_https: bool,
	/// Timeout applied to each key-endpoint request.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// Maximum size allowed for key-endpoint responses in bytes.
	#[serde(default = "default_max_response_bytes")]
	pub max_response_bytes: u64,
	/// Claim-validation policy.
	pub policy: ValidationPolicy,
}
impl ValidatorConfig {
	/// Construct a configuration for the given key endpoint and policy.
	pub fn new(keys_url: impl AsRef<str>, policy: ValidationPolicy) -> Result<Self> {
		let keys_url = Url::parse(keys_url.as_ref())?;

		Ok(Self {
			keys_url,
			require_https: true,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
			policy,
		})
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Adjust the key-endpoint request timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Validate the configuration against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		if self.require_https && self.keys_url.scheme() != "https" {
			return Err(Error::Security(format!(
				"Key endpoint {} must use HTTPS.",
				self.keys_url
			)));
		}
		if self.keys_url.host_str().is_none() {
			return Err(Error::Validation {
				field: "keys_url",
				reason: "Must include a host component.".into(),
			});
		}
		if self.request_timeout < Duration::from_millis(100) {
			return Err(Error::Validation {
				field: "request_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}
		if self.max_response_bytes == 0 {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}

		self.policy.validate()
	}
}

fn default_true() -> bool {
	true
}

fn default_clock_skew() -> Duration {
	DEFAULT_CLOCK_SKEW
}

fn default_request_timeout() -> Duration {
	DEFAULT_REQUEST_TIMEOUT
}

fn default_max_response_bytes() -> u64 {
	DEFAULT_MAX_RESPONSE_BYTES
}
