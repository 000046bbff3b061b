//! Validation and filtering of request payloads
//!
//! Payload types declare their rules with `validator` derives; the custom
//! rules live in [`validators`] and the pre-deserialization clean-up in
//! [`filters`].

pub mod extractor;
pub mod filters;
pub mod validators;

pub use extractor::{Validated, validate_payload};
