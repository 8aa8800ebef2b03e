//! Configuration loading and validation.
//!
//! The document is JSON. It is supplied inline, from a file (`@path`) or from
//! stdin (`@-`); without a source the built-in defaults apply.

pub mod duration;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    duration::parse_duration,
    error::{Error, Result},
    loader::{ConfigSource, load, parse_config},
    schema::{ConditionConfig, MurmurConfig, UtteranceConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
