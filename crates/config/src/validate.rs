//! Semantic validation of a parsed config.
//!
//! Every problem is collected so the operator sees all of them at once;
//! anything of [`Severity::Error`] prevents startup.

use std::{collections::HashSet, fmt, time::Duration};

use tracing::warn;

use crate::{
    error::Result,
    schema::{ConditionConfig, MurmurConfig},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "keyword.yomi".
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn log_warnings(&self) {
        for d in self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
        {
            warn!(path = %d.path, "{}", d.message);
        }
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        sorted.sort_by_key(|d| d.severity);
        for (i, d) in sorted.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {d}")?;
        }
        Ok(())
    }
}

/// Validate a parsed config.
#[must_use]
pub fn validate(config: &MurmurConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (name, condition) in [
        ("channel", &config.channel),
        ("user", &config.user),
        ("keyword", &config.keyword),
    ] {
        check_condition(name, condition, &mut result);
    }

    check_duration("timeout", config.timeout(), &mut result);
    check_duration("flush_interval", config.flush_interval(), &mut result);

    if config.utterance.unknown.trim().is_empty() {
        result.push(
            Severity::Warning,
            "utterance.unknown",
            "empty placeholder; unresolved names will be silent",
        );
    }

    result
}

fn check_condition(name: &str, condition: &ConditionConfig, result: &mut ValidationResult) {
    if condition.yomi.len() % 2 == 1 {
        result.push(
            Severity::Error,
            format!("{name}.yomi"),
            format!(
                "odd number of entries ({}); yomi must be a list of find/replace pairs",
                condition.yomi.len()
            ),
        );
    }

    for (i, find) in condition.yomi.iter().step_by(2).enumerate() {
        if find.is_empty() {
            result.push(
                Severity::Warning,
                format!("{name}.yomi[{}]", i * 2),
                "empty find text; the pair is ignored",
            );
        }
    }

    let excluded: HashSet<&str> = condition.excludes.iter().map(String::as_str).collect();
    for value in &condition.includes {
        if excluded.contains(value.as_str()) {
            result.push(
                Severity::Warning,
                format!("{name}.includes"),
                format!("{value:?} is also excluded; the include wins"),
            );
        }
    }
}

fn check_duration(path: &str, parsed: Result<Duration>, result: &mut ValidationResult) {
    match parsed {
        Ok(d) if d.is_zero() => result.push(Severity::Error, path, "must be greater than zero"),
        Ok(_) => {},
        Err(e) => result.push(Severity::Error, path, e.to_string()),
    }
}
