//! Slack as a murmur message source.
//!
//! Messages arrive over Socket Mode, so no public HTTP endpoint is needed.
//! Channel and user names are loaded through the Web API at connect time and
//! refreshed in the background.

pub mod config;
pub mod directory;
pub mod error;
pub mod socket;

pub use {
    config::SlackConfig,
    error::{Error, Result},
    socket::SlackSource,
};
