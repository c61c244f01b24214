//! Shared helpers: mock key endpoints and locally signed tokens.

// std
use std::time::{SystemTime, UNIX_EPOCH};
// crates.io
use base64::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use token_validator::{Result, TokenValidator, ValidationPolicy, ValidatorConfig};

/// Secret backing the mock server's published `oct` keys.
pub const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
/// A different secret, for tokens the published keys must reject.
pub const OTHER_SECRET: &[u8] = b"fedcba9876543210fedcba9876543210";
pub const ISSUER: &str = "https://uaa.example.com/oauth/token";
pub const AUDIENCE: &str = "api";
pub const KEYS_PATH: &str = "/token_keys";

pub fn oct_jwk(kid: &str, secret: &[u8]) -> serde_json::Value {
	serde_json::json!({
		"kty": "oct",
		"use": "sig",
		"kid": kid,
		"alg": "HS256",
		"k": BASE64_URL_SAFE_NO_PAD.encode(secret),
	})
}

pub fn jwks_body(keys: &[serde_json::Value]) -> String {
	serde_json::json!({ "keys": keys }).to_string()
}

pub fn now_secs() -> i64 {
	SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before epoch").as_secs() as i64
}

pub fn sign_token(kid: &str, secret: &[u8], claims: &serde_json::Value) -> String {
	let mut header = Header::new(Algorithm::HS256);

	header.kid = Some(kid.to_string());

	encode(&header, claims, &EncodingKey::from_secret(secret)).expect("token")
}

pub fn standard_claims(now: i64) -> serde_json::Value {
	serde_json::json!({
		"iss": ISSUER,
		"aud": AUDIENCE,
		"sub": "user-1",
		"exp": now + 600,
		"nbf": now - 60,
	})
}

pub fn standard_policy() -> ValidationPolicy {
	ValidationPolicy::new(ISSUER).with_audience(AUDIENCE)
}

pub fn make_validator(server_uri: &str, policy: ValidationPolicy) -> Result<TokenValidator> {
	let config = ValidatorConfig::new(format!("{server_uri}{KEYS_PATH}"), policy)?
		.with_require_https(false);

	TokenValidator::new(config)
}
