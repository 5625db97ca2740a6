use crate::version::{self, SemanticVersion};
use log::debug;
use std::fmt;
use thiserror::Error;

/// Which component of the version to bump
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncrementError {
    #[error("Invalid prerelease label: '{0}'")]
    InvalidLabel(String),
    #[error("Cannot bump {kind} version of {current}: component overflow")]
    Overflow { kind: BumpKind, current: String },
}

/// Picks the highest semantic version out of `tags`.
///
/// Tags that do not parse are skipped. Among tags sharing the same numeric
/// triple the first one in input order is returned.
pub fn select_latest<S: AsRef<str>>(tags: &[S]) -> Option<SemanticVersion> {
    debug!("Selecting latest version from {} tags", tags.len());

    tags.iter()
        .filter_map(|tag| {
            let tag = tag.as_ref();
            match version::parse(tag) {
                Ok(version) => Some(version),
                Err(e) => {
                    debug!("Skipping non-semantic tag '{}': {}", tag, e);
                    None
                }
            }
        })
        .reduce(|best, candidate| if candidate.core() > best.core() { candidate } else { best })
}

/// Computes the version following `current`.
///
/// A missing `current` is treated as `0.0.0`. The previous prerelease never
/// carries over; `label`, when given, becomes the new one.
pub fn increment(
    current: Option<&SemanticVersion>,
    kind: BumpKind,
    explicit_value: Option<u64>,
    label: Option<&str>,
) -> Result<SemanticVersion, IncrementError> {
    let (major, minor, patch) = current.map(SemanticVersion::core).unwrap_or((0, 0, 0));

    let bumped = |value: u64| -> Result<u64, IncrementError> {
        match explicit_value {
            Some(explicit) => Ok(explicit),
            None => value.checked_add(1).ok_or_else(|| IncrementError::Overflow {
                kind,
                current: SemanticVersion::new(major, minor, patch).to_string(),
            }),
        }
    };

    let next = match kind {
        BumpKind::Major => SemanticVersion::new(bumped(major)?, 0, 0),
        BumpKind::Minor => SemanticVersion::new(major, bumped(minor)?, 0),
        BumpKind::Patch => SemanticVersion::new(major, minor, bumped(patch)?),
    };

    let next = match label {
        Some(label) => next
            .with_prerelease(label)
            .map_err(|_| IncrementError::InvalidLabel(label.to_string()))?,
        None => next,
    };

    debug!(
        "Incrementing {} version from {} -> {}",
        kind,
        current.map(ToString::to_string).unwrap_or_else(|| "<none>".to_string()),
        next
    );
    Ok(next)
}
