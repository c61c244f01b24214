//! End-to-end validation outcomes against a mock key endpoint.

// std
use std::time::Duration;
// crates.io
use token_validator::{Result, ValidationOutcome, ValidationPolicy};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::common;

async fn serve_standard_jwks(server: &MockServer, expected_requests: u64) {
	Mock::given(method("GET"))
		.and(path(common::KEYS_PATH))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_string(common::jwks_body(&[common::oct_jwk("primary", common::SECRET)]))
				.insert_header("content-type", "application/json"),
		)
		.expect(expected_requests)
		.mount(server)
		.await;
}

#[tokio::test]
async fn valid_token_is_accepted_and_keys_are_cached() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	serve_standard_jwks(&server, 1).await;

	let validator = common::make_validator(&server.uri(), common::standard_policy())?;
	let token =
		common::sign_token("primary", common::SECRET, &common::standard_claims(common::now_secs()));

	let first = validator.validate(&token).await;
	let second = validator.validate(&token).await;

	assert!(first.is_valid(), "expected Valid, got {:?}", first);
	assert!(second.is_valid(), "expected Valid, got {:?}", second);

	let snapshot = validator.metrics().snapshot();

	assert_eq!(snapshot.validations_total, 2);
	assert_eq!(snapshot.accepted_total, 2);
	assert_eq!(snapshot.key_cache_hits, 1, "second validation must hit the cache");

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected_beyond_skew() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	serve_standard_jwks(&server, 1).await;

	let policy = common::standard_policy().with_clock_skew(Duration::ZERO);
	let validator = common::make_validator(&server.uri(), policy)?;
	let now = common::now_secs();
	let mut claims = common::standard_claims(now);

	claims["exp"] = serde_json::json!(now - 10);

	let result =
		validator.validate(&common::sign_token("primary", common::SECRET, &claims)).await;

	assert_eq!(result.outcome, ValidationOutcome::Expired);
	Ok(())
}

#[tokio::test]
async fn not_before_exactly_now_is_accepted() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	serve_standard_jwks(&server, 1).await;

	let policy = common::standard_policy().with_clock_skew(Duration::ZERO);
	let validator = common::make_validator(&server.uri(), policy)?;
	let now = common::now_secs();
	let mut claims = common::standard_claims(now);

	claims["nbf"] = serde_json::json!(now);

	let result =
		validator.validate(&common::sign_token("primary", common::SECRET, &claims)).await;

	assert!(result.is_valid(), "nbf == now must be accepted, got {:?}", result);
	Ok(())
}

#[tokio::test]
async fn issuer_mismatch_is_reported_specifically() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	serve_standard_jwks(&server, 1).await;

	let validator = common::make_validator(
		&server.uri(),
		ValidationPolicy::new("https://other.example.com/oauth/token"),
	)?;
	let token =
		common::sign_token("primary", common::SECRET, &common::standard_claims(common::now_secs()));
	let result = validator.validate(&token).await;

	assert_eq!(result.outcome, ValidationOutcome::IssuerMismatch);
	Ok(())
}

#[tokio::test]
async fn audience_flag_is_independently_effective() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	serve_standard_jwks(&server, 2).await;

	let now = common::now_secs();
	let mut claims = common::standard_claims(now);

	claims["aud"] = serde_json::json!("somewhere-else");

	let token = common::sign_token("primary", common::SECRET, &claims);

	// Audience validation on: mismatched audience rejects.
	let strict = common::make_validator(&server.uri(), common::standard_policy())?;
	let rejected = strict.validate(&token).await;

	assert_eq!(rejected.outcome, ValidationOutcome::AudienceMismatch);

	// Audience validation off: the same token is accepted, all else equal.
	let mut relaxed_policy = common::standard_policy();

	relaxed_policy.validate_audience = false;

	let relaxed = common::make_validator(&server.uri(), relaxed_policy)?;
	let accepted = relaxed.validate(&token).await;

	assert!(accepted.is_valid(), "expected Valid, got {:?}", accepted);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn tampered_signature_is_rejected() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	serve_standard_jwks(&server, 1).await;

	let validator = common::make_validator(&server.uri(), common::standard_policy())?;
	let forged = common::sign_token(
		"primary",
		common::OTHER_SECRET,
		&common::standard_claims(common::now_secs()),
	);
	let result = validator.validate(&forged).await;

	assert_eq!(result.outcome, ValidationOutcome::InvalidSignature);
	Ok(())
}

#[tokio::test]
async fn declared_algorithm_must_match_published_key() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	serve_standard_jwks(&server, 1).await;

	let validator = common::make_validator(&server.uri(), common::standard_policy())?;
	// The published key advertises HS256; an HS512 token must not verify against it.
	let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS512);

	header.kid = Some("primary".into());

	let token = jsonwebtoken::encode(
		&header,
		&common::standard_claims(common::now_secs()),
		&jsonwebtoken::EncodingKey::from_secret(common::SECRET),
	)
	.expect("token");
	let result = validator.validate(&token).await;

	assert_eq!(result.outcome, ValidationOutcome::InvalidSignature);
	Ok(())
}
