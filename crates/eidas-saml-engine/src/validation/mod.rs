//! Message validation after parsing.
//!
//! - [`suite`] - named structural and business rule suites
//! - [`response`] - semantic rules for received responses and assertions

pub mod response;
pub mod suite;

pub use response::{
    apply_skew, extract_response_status, extract_verified_assertion, find_attribute_statement,
    verify_assertion, verify_conditions,
};
pub use suite::{
    SamlMessage, ValidatorRegistry, ValidatorSuite, CORE_SCHEMA_VALIDATOR_ID, REQUEST_VALIDATOR_ID,
    RESPONSE_VALIDATOR_ID,
};
