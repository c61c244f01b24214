//! Token claims and policy-driven claim checks.

// crates.io
use serde::Deserialize;
// self
use crate::{_prelude::*, policy::ValidationPolicy};

/// Audience claim; servers publish it as a single string or an array of strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
	/// No audience claim present.
	#[default]
	None,
	/// A single audience value.
	Single(String),
	/// Multiple audience values.
	Multiple(Vec<String>),
}
impl Audience {
	/// Whether the given audience appears in the claim.
	pub fn contains(&self, audience: &str) -> bool {
		match self {
			Self::None => false,
			Self::Single(value) => value == audience,
			Self::Multiple(values) => values.iter().any(|value| value == audience),
		}
	}
}

/// Parsed subset of a bearer token's payload; created per validation call.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenClaims {
	/// Issuer (`iss`).
	#[serde(rename = "iss")]
	pub issuer: Option<String>,
	/// Audience(s) (`aud`).
	#[serde(rename = "aud", default)]
	pub audience: Audience,
	/// Expiry as Unix seconds (`exp`).
	#[serde(rename = "exp")]
	pub expiry: Option<i64>,
	/// Not-before as Unix seconds (`nbf`).
	#[serde(rename = "nbf")]
	pub not_before: Option<i64>,
	/// Subject (`sub`), retained for diagnostics only.
	#[serde(rename = "sub")]
	pub subject: Option<String>,
}

/// A claim check that did not pass, naming the check that failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsError {
	/// The `iss` claim does not match the expected issuer.
	#[error("issuer mismatch: expected '{expected}', token carries {actual:?}")]
	IssuerMismatch {
		/// Issuer the policy expects.
		expected: String,
		/// Issuer the token carried, if any.
		actual: Option<String>,
	},
	/// The expected audience is absent from the `aud` claim.
	#[error("audience mismatch: token does not list '{expected}'")]
	AudienceMismatch {
		/// Audience the policy expects.
		expected: String,
	},
	/// The token expired beyond the skew tolerance, or carries no expiry at all.
	#[error("token expired (exp: {expired_at:?})")]
	Expired {
		/// Expiry the token carried, if any.
		expired_at: Option<i64>,
	},
	/// The token's `nbf` lies in the future beyond the skew tolerance.
	#[error("token not yet valid (nbf: {not_before})")]
	NotYetValid {
		/// Not-before the token carried.
		not_before: i64,
	},
}

/// Validates issuer, audience, and lifetime claims against a [`ValidationPolicy`].
///
/// Each check is an independent predicate; disabled checks always pass, and a failing
/// check reports which one failed so the coordinator can produce a specific outcome.
#[derive(Clone, Debug)]
pub struct ClaimsValidator {
	policy: Arc<ValidationPolicy>,
}
impl ClaimsValidator {
	/// Build a validator over the given policy.
	pub fn new(policy: Arc<ValidationPolicy>) -> Self {
		Self { policy }
	}

	/// Exact, case-sensitive match of the `iss` claim against the expected issuer.
	pub fn check_issuer(&self, claims: &TokenClaims) -> std::result::Result<(), ClaimsError> {
		if !self.policy.validate_issuer {
			return Ok(());
		}

		// Construction-time validation guarantees an expected issuer while the check is
		// enabled; an absent one here still fails closed.
		let expected = self.policy.expected_issuer.as_deref().unwrap_or_default();

		if claims.issuer.as_deref() == Some(expected) && !expected.is_empty() {
			Ok(())
		} else {
			Err(ClaimsError::IssuerMismatch {
				expected: expected.to_string(),
				actual: claims.issuer.clone(),
			})
		}
	}

	/// Passes when no audience restriction is configured or the expected audience is
	/// listed in the token's `aud` claim.
	pub fn check_audience(&self, claims: &TokenClaims) -> std::result::Result<(), ClaimsError> {
		if !self.policy.validate_audience {
			return Ok(());
		}

		match &self.policy.expected_audience {
			None => Ok(()),
			Some(expected) if claims.audience.contains(expected) => Ok(()),
			Some(expected) => Err(ClaimsError::AudienceMismatch { expected: expected.clone() }),
		}
	}

	/// Passes when `now` lies within `[nbf - skew, exp + skew]`, both bounds inclusive.
	pub fn check_lifetime(
		&self,
		claims: &TokenClaims,
		now: DateTime<Utc>,
	) -> std::result::Result<(), ClaimsError> {
		if !self.policy.validate_lifetime {
			return Ok(());
		}

		let now = now.timestamp();
		let skew = self.policy.clock_skew.as_secs().min(i64::MAX as u64) as i64;

		if let Some(not_before) = claims.not_before
			&& now + skew < not_before
		{
			return Err(ClaimsError::NotYetValid { not_before });
		}

		match claims.expiry {
			Some(expiry) if now - skew <= expiry => Ok(()),
			Some(expiry) => Err(ClaimsError::Expired { expired_at: Some(expiry) }),
			// Lifetime validation demands an expiry; a token without one never passes.
			None => Err(ClaimsError::Expired { expired_at: None }),
		}
	}

	/// Run all enabled checks in issuer, audience, lifetime order, short-circuiting on
	/// the first failure.
	pub fn check_all(
		&self,
		claims: &TokenClaims,
		now: DateTime<Utc>,
	) -> std::result::Result<(), ClaimsError> {
		self.check_issuer(claims)?;
		self.check_audience(claims)?;
		self.check_lifetime(claims, now)
	}
}
