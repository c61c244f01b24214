//! Integration test harness.

mod common;
mod token_validation;
