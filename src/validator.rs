//! Validation coordinator composing key resolution, signature verification, and claim
//! checks into overall accept/reject semantics.

// std
use std::collections::HashSet;
// crates.io
use jsonwebtoken::{Validation, decode, decode_header, errors::ErrorKind};
use serde::{Deserialize, Serialize};
// self
use crate::{
	_prelude::*,
	claims::{ClaimsError, ClaimsValidator, TokenClaims},
	keys::{
		fetch::KeyFetcher,
		resolver::{ResolveError, TokenKeyResolver},
		store::KeyStore,
	},
	metrics::ValidatorMetrics,
	policy::ValidatorConfig,
};

/// Outcome of validating one bearer token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ValidationOutcome {
	/// Every enabled check passed.
	Valid,
	/// The token could not be parsed.
	MalformedToken,
	/// The token references a key the server does not currently publish.
	UnknownKey,
	/// The key set could not be refreshed to resolve the token's key.
	FetchFailed,
	/// The signature does not verify under the resolved key, or the token is unsigned.
	InvalidSignature,
	/// The issuer claim does not satisfy policy.
	IssuerMismatch,
	/// The audience claim does not satisfy policy.
	AudienceMismatch,
	/// The token expired beyond the skew tolerance.
	Expired,
	/// The token is not yet valid beyond the skew tolerance.
	NotYetValid,
}

/// Result of one validation call: a specific outcome plus a diagnostic detail.
///
/// The detail is for logging only and never contains key material; host-boundary
/// behavior stays binary via [`is_valid`](Self::is_valid).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationResult {
	/// Specific pass/fail outcome.
	pub outcome: ValidationOutcome,
	/// Human-readable diagnostic for rejections.
	pub detail: Option<String>,
}
impl ValidationResult {
	/// Whether the token was accepted.
	pub fn is_valid(&self) -> bool {
		self.outcome == ValidationOutcome::Valid
	}

	fn valid() -> Self {
		Self { outcome: ValidationOutcome::Valid, detail: None }
	}

	fn rejected(outcome: ValidationOutcome, detail: impl Into<String>) -> Self {
		Self { outcome, detail: Some(detail.into()) }
	}
}
impl From<ClaimsError> for ValidationResult {
	fn from(err: ClaimsError) -> Self {
		let outcome = match err {
			ClaimsError::IssuerMismatch { .. } => ValidationOutcome::IssuerMismatch,
			ClaimsError::AudienceMismatch { .. } => ValidationOutcome::AudienceMismatch,
			ClaimsError::Expired { .. } => ValidationOutcome::Expired,
			ClaimsError::NotYetValid { .. } => ValidationOutcome::NotYetValid,
		};

		Self::rejected(outcome, err.to_string())
	}
}

/// Validates bearer tokens end to end: key resolution, signature, then claims.
///
/// Capabilities are composed explicitly at construction and never mutated afterwards;
/// hosts that drive their own token-parsing layer can reach the individual callback
/// points through [`resolver`](Self::resolver) and
/// [`claims_validator`](Self::claims_validator).
#[derive(Clone, Debug)]
pub struct TokenValidator {
	config: Arc<ValidatorConfig>,
	resolver: TokenKeyResolver,
	claims: ClaimsValidator,
	metrics: Arc<ValidatorMetrics>,
}
impl TokenValidator {
	/// Build a validator with the default reqwest client.
	///
	/// Fails when the configuration is invalid; an enabled check with missing
	/// configuration is refused here rather than skipped at runtime.
	pub fn new(config: ValidatorConfig) -> Result<Self> {
		config.validate()?;

		let fetcher = KeyFetcher::new(&config)?;

		Ok(Self::with_fetcher(config, fetcher))
	}

	/// Build a validator using the supplied HTTP client (primarily for tests).
	pub fn with_client(config: ValidatorConfig, client: reqwest::Client) -> Result<Self> {
		config.validate()?;

		let fetcher = KeyFetcher::with_client(&config, client);

		Ok(Self::with_fetcher(config, fetcher))
	}

	fn with_fetcher(config: ValidatorConfig, fetcher: KeyFetcher) -> Self {
		let policy = Arc::new(config.policy.clone());
		let metrics = ValidatorMetrics::new();
		let resolver = TokenKeyResolver::with_parts(
			Arc::new(KeyStore::new()),
			Arc::new(fetcher),
			metrics.clone(),
		);

		Self {
			config: Arc::new(config),
			resolver,
			claims: ClaimsValidator::new(policy),
			metrics,
		}
	}

	/// The configuration this validator was built from.
	pub fn config(&self) -> &ValidatorConfig {
		&self.config
	}

	/// Signing-key resolution callback point.
	pub fn resolver(&self) -> &TokenKeyResolver {
		&self.resolver
	}

	/// Claim-check callback point.
	pub fn claims_validator(&self) -> &ClaimsValidator {
		&self.claims
	}

	/// The shared telemetry accumulator.
	pub fn metrics(&self) -> Arc<ValidatorMetrics> {
		self.metrics.clone()
	}

	/// Validate a raw bearer token.
	///
	/// Checks run in order: structure, key resolution, signature, then issuer,
	/// audience, and lifetime, short-circuiting on the first failure so callers see
	/// signature failures distinguished from policy failures. Every failure surfaces
	/// as a specific outcome; nothing is downgraded to `Valid` by an internal error.
	#[tracing::instrument(skip_all)]
	pub async fn validate(&self, raw_token: &str) -> ValidationResult {
		let result = self.validate_inner(raw_token).await;

		self.metrics.record_validation(result.is_valid());

		if !result.is_valid() {
			tracing::debug!(outcome = ?result.outcome, detail = ?result.detail, "token rejected");
		}

		result
	}

	async fn validate_inner(&self, raw_token: &str) -> ValidationResult {
		let segments = raw_token.split('.').count();

		if segments != 3 {
			return ValidationResult::rejected(
				ValidationOutcome::MalformedToken,
				format!("token must have three segments, found {segments}"),
			);
		}
		// An empty third segment is an unsigned (alg "none" style) token.
		if raw_token.rsplit('.').next().unwrap_or_default().is_empty() {
			return ValidationResult::rejected(
				ValidationOutcome::InvalidSignature,
				"token carries no signature",
			);
		}

		let header = match decode_header(raw_token) {
			Ok(header) => header,
			Err(err) =>
				return ValidationResult::rejected(ValidationOutcome::MalformedToken, err.to_string()),
		};
		let Some(kid) = header.kid else {
			return ValidationResult::rejected(
				ValidationOutcome::MalformedToken,
				"token header carries no kid",
			);
		};
		let key = match self.resolver.resolve(&kid).await {
			Ok(key) => key,
			Err(err @ ResolveError::UnknownKey { .. }) =>
				return ValidationResult::rejected(ValidationOutcome::UnknownKey, err.to_string()),
			Err(err @ ResolveError::FetchFailed(_)) =>
				return ValidationResult::rejected(ValidationOutcome::FetchFailed, err.to_string()),
		};

		if !key.accepts(header.alg) {
			return ValidationResult::rejected(
				ValidationOutcome::InvalidSignature,
				format!("token algorithm {:?} is incompatible with key '{kid}'", header.alg),
			);
		}

		let claims =
			match decode::<TokenClaims>(raw_token, &key.decoding_key, &signature_only(header.alg)) {
				Ok(data) => data.claims,
				Err(err) => return signature_failure(err),
			};

		match self.claims.check_all(&claims, Utc::now()) {
			Ok(()) => ValidationResult::valid(),
			Err(err) => err.into(),
		}
	}
}

/// Validation settings that verify the signature only; claim policy is applied by
/// [`ClaimsValidator`] so each failing check yields its specific outcome.
fn signature_only(algorithm: jsonwebtoken::Algorithm) -> Validation {
	let mut validation = Validation::new(algorithm);

	validation.validate_exp = false;
	validation.validate_nbf = false;
	validation.validate_aud = false;
	validation.required_spec_claims = HashSet::new();

	validation
}

fn signature_failure(err: jsonwebtoken::errors::Error) -> ValidationResult {
	match err.kind() {
		ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::InvalidToken =>
			ValidationResult::rejected(ValidationOutcome::MalformedToken, err.to_string()),
		// Everything else, including unexpected verification errors, rejects the
		// signature; an internal error must never surface as acceptance.
		_ => ValidationResult::rejected(ValidationOutcome::InvalidSignature, err.to_string()),
	}
}
