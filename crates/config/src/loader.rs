use std::{
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use tracing::debug;

use crate::{
    error::{Context, Error, Result},
    schema::MurmurConfig,
    validate::validate,
};

/// Where the config document comes from, as given to `-d`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// No document; use [`MurmurConfig::default`].
    #[default]
    Defaults,
    /// The JSON document itself.
    Inline(String),
    /// `@<path>`: read the document from a file.
    File(PathBuf),
    /// `@-`: read the document from stdin.
    Stdin,
}

impl FromStr for ConfigSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.strip_prefix('@') {
            Some("-") => Self::Stdin,
            Some(path) => Self::File(PathBuf::from(path)),
            None if s.trim().is_empty() => Self::Defaults,
            None => Self::Inline(s.to_owned()),
        })
    }
}

/// Load, parse and validate the config from `source`.
///
/// Validation errors are fatal; warnings are logged.
pub fn load(source: &ConfigSource) -> Result<MurmurConfig> {
    let config = match source {
        ConfigSource::Defaults => {
            debug!("no config document given, using defaults");
            MurmurConfig::default()
        },
        ConfigSource::Inline(raw) => parse_config(raw)?,
        ConfigSource::File(path) => load_file(path)?,
        ConfigSource::Stdin => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read config from stdin")?;
            parse_config(&raw)?
        },
    };

    let report = validate(&config);
    report.log_warnings();
    if report.has_errors() {
        return Err(Error::invalid(&report));
    }
    Ok(config)
}

fn load_file(path: &Path) -> Result<MurmurConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!(path = %path.display(), "loading config");
    parse_config(&raw)
}

/// Parse a JSON document without validating it.
pub fn parse_config(raw: &str) -> Result<MurmurConfig> {
    Ok(serde_json::from_str(raw)?)
}
