use log::debug;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?([0-9]+)\.([0-9]+)\.([0-9]+)(?:-(.*))?$").expect("version regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty version string")]
    Empty,
    #[error("Invalid semantic version format: '{0}' - expected [v]MAJOR.MINOR.PATCH[-LABEL]")]
    Malformed(String),
    #[error("Version component '{component}' of '{raw}' is out of range")]
    OutOfRange { raw: String, component: String },
    #[error("Invalid prerelease label: '{0}'")]
    InvalidLabel(String),
}

/// A parsed `MAJOR.MINOR.PATCH[-PRERELEASE]` version.
///
/// Equality takes the prerelease into account; ordering between tags is done
/// on [`SemanticVersion::core`] only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<String>,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion { major, minor, patch, prerelease: None }
    }

    /// Returns a copy carrying `label` as its prerelease
    pub fn with_prerelease(self, label: impl Into<String>) -> Result<Self, ParseError> {
        let label = label.into();
        if !is_valid_label(&label) {
            return Err(ParseError::InvalidLabel(label));
        }
        Ok(SemanticVersion { prerelease: Some(label), ..self })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    /// The numeric triple used to rank versions against each other
    pub fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && !label.chars().any(char::is_whitespace)
}

/// Parses a tag name such as `v1.2.3`, `1.2.3` or `V1.2.3-rc1`.
pub fn parse(raw: &str) -> Result<SemanticVersion, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    let captures = VERSION_REGEX
        .captures(raw)
        .ok_or_else(|| ParseError::Malformed(raw.to_string()))?;

    let component = |index: usize| -> Result<u64, ParseError> {
        let digits = &captures[index];
        digits.parse::<u64>().map_err(|_| ParseError::OutOfRange {
            raw: raw.to_string(),
            component: digits.to_string(),
        })
    };

    let version = SemanticVersion::new(component(1)?, component(2)?, component(3)?);
    let version = match captures.get(4) {
        Some(label) => version.with_prerelease(label.as_str())?,
        None => version,
    };

    debug!("Parsed version: {} from '{}'", version, raw);
    Ok(version)
}

/// Canonical tag form; the `v` prefix is always emitted.
pub fn format(version: &SemanticVersion) -> String {
    version.to_string()
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(prerelease) = &self.prerelease {
            write!(f, "-{}", prerelease)?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
