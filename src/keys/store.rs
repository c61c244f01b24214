//! Key store holding the current signing-key snapshot.
//!
//! The store only ever publishes whole, immutable [`KeySet`] snapshots; there is no partial
//! update operation. Concurrent readers clone an `Arc` to the snapshot and are never exposed
//! to a half-written state while a refresh swaps it out.

// std
use std::{
	collections::HashMap,
	fmt::{Debug, Formatter, Result as FmtResult},
};
// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey,
	jwk::{AlgorithmParameters, Jwk, KeyAlgorithm},
};
use tokio::sync::RwLock;
use url::Url;
// self
use crate::_prelude::*;

/// Cryptographic family of a published signing key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyFamily {
	/// RSA public key (RS*/PS* token algorithms).
	Rsa,
	/// Elliptic-curve public key (ES* token algorithms).
	EllipticCurve,
	/// Symmetric octet key (HS* token algorithms).
	Hmac,
	/// Octet key pair (EdDSA token algorithms).
	OctetKeyPair,
}
impl KeyFamily {
	/// Family a token-header algorithm belongs to.
	pub fn of(algorithm: Algorithm) -> Self {
		match algorithm {
			Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Self::Hmac,
			Algorithm::ES256 | Algorithm::ES384 => Self::EllipticCurve,
			Algorithm::RS256
			| Algorithm::RS384
			| Algorithm::RS512
			| Algorithm::PS256
			| Algorithm::PS384
			| Algorithm::PS512 => Self::Rsa,
			Algorithm::EdDSA => Self::OctetKeyPair,
		}
	}
}
impl From<&AlgorithmParameters> for KeyFamily {
	fn from(value: &AlgorithmParameters) -> Self {
		match value {
			AlgorithmParameters::RSA(_) => Self::Rsa,
			AlgorithmParameters::EllipticCurve(_) => Self::EllipticCurve,
			AlgorithmParameters::OctetKey(_) => Self::Hmac,
			AlgorithmParameters::OctetKeyPair(_) => Self::OctetKeyPair,
		}
	}
}

/// A signing key published by the authorization server.
///
/// Immutable once constructed. The key identifier is unique within one fetch but may be
/// reused across key rotations, so no global uniqueness across time is assumed.
#[derive(Clone)]
pub struct SigningKey {
	/// Key identifier (`kid`) naming this key in token headers.
	pub key_id: String,
	/// Cryptographic family of the key material.
	pub family: KeyFamily,
	/// Exact token algorithm advertised by the server, when present.
	pub algorithm: Option<Algorithm>,
	/// Verification key material.
	pub decoding_key: DecodingKey,
	/// When this key was fetched from the server.
	pub fetched_at: DateTime<Utc>,
}
impl SigningKey {
	/// Build a signing key from a published JWK entry.
	///
	/// Fails when the entry carries no `kid` or its material cannot be turned into a
	/// verification key.
	pub fn from_jwk(jwk: &Jwk, fetched_at: DateTime<Utc>) -> Result<Self> {
		let key_id = jwk.common.key_id.clone().ok_or(Error::Validation {
			field: "jwk",
			reason: "Published key entry is missing a kid.".into(),
		})?;
		let decoding_key = DecodingKey::from_jwk(jwk)?;
		let family = KeyFamily::from(&jwk.algorithm);
		let algorithm = jwk.common.key_algorithm.and_then(signing_algorithm);

		Ok(Self { key_id, family, algorithm, decoding_key, fetched_at })
	}

	/// Whether tokens declaring the given algorithm may be verified with this key.
	///
	/// When the server advertised an exact algorithm the match is exact; otherwise any
	/// algorithm of the key's family is accepted.
	pub fn accepts(&self, algorithm: Algorithm) -> bool {
		match self.algorithm {
			Some(expected) => expected == algorithm,
			None => self.family == KeyFamily::of(algorithm),
		}
	}
}
// Omits key material.
impl Debug for SigningKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("SigningKey")
			.field("key_id", &self.key_id)
			.field("family", &self.family)
			.field("algorithm", &self.algorithm)
			.field("fetched_at", &self.fetched_at)
			.finish_non_exhaustive()
	}
}

/// One complete, internally consistent snapshot of the server's published keys.
#[derive(Clone, Debug, Default)]
pub struct KeySet {
	keys: HashMap<String, Arc<SigningKey>>,
	/// When this snapshot was fetched; `None` for the never-fetched empty set.
	pub fetched_at: Option<DateTime<Utc>>,
	/// Endpoint the snapshot was fetched from.
	pub source_url: Option<Url>,
}
impl KeySet {
	/// Assemble a snapshot from one fetch.
	pub fn new(
		keys: HashMap<String, Arc<SigningKey>>,
		source_url: Url,
		fetched_at: DateTime<Utc>,
	) -> Self {
		Self { keys, fetched_at: Some(fetched_at), source_url: Some(source_url) }
	}

	/// Look up a key by identifier.
	pub fn get(&self, key_id: &str) -> Option<Arc<SigningKey>> {
		self.keys.get(key_id).cloned()
	}

	/// Number of keys in the snapshot.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the snapshot holds no keys.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Whether this snapshot came from a completed fetch.
	pub fn is_fetched(&self) -> bool {
		self.fetched_at.is_some()
	}

	/// Identifiers of every key in the snapshot.
	pub fn key_ids(&self) -> impl Iterator<Item = &str> {
		self.keys.keys().map(String::as_str)
	}
}

/// Holds the latest [`KeySet`] snapshot and swaps it atomically on refresh.
#[derive(Debug, Default)]
pub struct KeyStore {
	inner: RwLock<Arc<KeySet>>,
}
impl KeyStore {
	/// Create an empty store that has never been fetched into.
	pub fn new() -> Self {
		Self::default()
	}

	/// Latest snapshot, possibly the never-fetched empty set.
	pub async fn current(&self) -> Arc<KeySet> {
		self.inner.read().await.clone()
	}

	/// Atomically swap in a new snapshot, returning the shared handle to it.
	pub async fn replace(&self, set: KeySet) -> Arc<KeySet> {
		let set = Arc::new(set);
		let mut inner = self.inner.write().await;

		*inner = set.clone();

		set
	}
}

fn signing_algorithm(value: KeyAlgorithm) -> Option<Algorithm> {
	match value {
		KeyAlgorithm::HS256 => Some(Algorithm::HS256),
		KeyAlgorithm::HS384 => Some(Algorithm::HS384),
		KeyAlgorithm::HS512 => Some(Algorithm::HS512),
		KeyAlgorithm::ES256 => Some(Algorithm::ES256),
		KeyAlgorithm::ES384 => Some(Algorithm::ES384),
		KeyAlgorithm::RS256 => Some(Algorithm::RS256),
		KeyAlgorithm::RS384 => Some(Algorithm::RS384),
		KeyAlgorithm::RS512 => Some(Algorithm::RS512),
		KeyAlgorithm::PS256 => Some(Algorithm::PS256),
		KeyAlgorithm::PS384 => Some(Algorithm::PS384),
		KeyAlgorithm::PS512 => Some(Algorithm::PS512),
		KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
		// Encryption algorithms carry no signature semantics.
		_ => None,
	}
}
