//! Error plumbing shared by every murmur crate.

pub mod error;

pub use error::FromMessage;
