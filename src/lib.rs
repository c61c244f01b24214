//! Strict OAuth2/OIDC bearer-token validation with cached remote signing keys: immutable
//! snapshots, single-flight JWKS refresh, and fail-closed semantics.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod claims;
pub mod keys;
pub mod metrics;
pub mod policy;
pub mod validator;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, Utc};

	pub use crate::{Error, Result};
}

pub use crate::{
	claims::{Audience, ClaimsError, ClaimsValidator, TokenClaims},
	error::{Error, Result},
	keys::{
		fetch::{FetchError, KeyFetcher},
		resolver::{ResolveError, TokenKeyResolver},
		store::{KeyFamily, KeySet, KeyStore, SigningKey},
	},
	metrics::{ValidatorMetrics, ValidatorMetricsSnapshot},
	policy::{ValidationPolicy, ValidatorConfig},
	validator::{TokenValidator, ValidationOutcome, ValidationResult},
};
