//! Computes the next version tag of a repository and publishes it.
//!
//! Everything the run needs arrives through [`ReleaseConfig`]; the only side
//! effects go through the [`TagRepository`] handed to [`run`].

use anyhow::{Context, Result};
use log::{debug, info, warn};
use thiserror::Error;

use crate::git::TagRepository;
use crate::selector::{self, BumpKind};
use crate::version::{self, SemanticVersion};

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_RELEASE_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("Not on a release branch ({found}); expected one of {expected}. Use --force to tag anyway")]
    NotOnReleaseBranch { found: String, expected: String },
    #[error("Working tree has uncommitted changes. Use --force to tag anyway")]
    DirtyWorkingTree,
    #[error("Tag '{0}' already exists")]
    TagExists(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    pub bump: BumpKind,
    /// Replaces the bumped component instead of adding one to it
    pub explicit_value: Option<u64>,
    pub label: Option<String>,
    /// Version to bump from; skips tag discovery when set
    pub base: Option<String>,
    pub remote: String,
    pub release_branches: Vec<String>,
    pub force: bool,
    pub pull: bool,
    pub push: bool,
    pub dry_run: bool,
}

impl ReleaseConfig {
    pub fn new(bump: BumpKind) -> Self {
        ReleaseConfig {
            bump,
            explicit_value: None,
            label: None,
            base: None,
            remote: DEFAULT_REMOTE.to_string(),
            release_branches: DEFAULT_RELEASE_BRANCHES.iter().map(|b| b.to_string()).collect(),
            force: false,
            pull: false,
            push: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub previous: Option<SemanticVersion>,
    pub next: SemanticVersion,
    pub tag: String,
    pub created: bool,
    pub pushed: bool,
}

pub fn run(repo: &impl TagRepository, config: &ReleaseConfig) -> Result<ReleaseOutcome> {
    debug!("Release configuration: {:?}", config);

    check_branch(repo, config)?;
    check_clean(repo, config)?;

    if config.pull {
        if config.dry_run {
            info!("Dry run: skipping pull from '{}'", config.remote);
        } else {
            repo.pull(&config.remote)
                .with_context(|| format!("Failed to pull from '{}'", config.remote))?;
        }
    }

    let existing_tags = repo.list_tags().context("Failed to list tags")?;
    let previous = match &config.base {
        Some(base) => {
            let base = version::parse(base)
                .with_context(|| format!("Invalid base version '{}'", base))?;
            info!("Using explicit base version {}", base);
            Some(base)
        }
        None => {
            let latest = selector::select_latest(&existing_tags);
            match &latest {
                Some(latest) => info!("Latest tag: {}", latest),
                None => info!("No semantic version tags found, starting from v0.0.0"),
            }
            latest
        }
    };

    let next = selector::increment(
        previous.as_ref(),
        config.bump,
        config.explicit_value,
        config.label.as_deref(),
    )?;
    let tag = version::format(&next);
    info!("New version: {}", tag);

    if existing_tags.iter().any(|existing| *existing == tag) {
        return Err(ReleaseError::TagExists(tag).into());
    }

    let mut outcome = ReleaseOutcome { previous, next, tag, created: false, pushed: false };

    if config.dry_run {
        info!("Dry run: would create tag {}", outcome.tag);
        if config.push {
            info!("Dry run: would push tag {} to '{}'", outcome.tag, config.remote);
        }
        return Ok(outcome);
    }

    repo.create_tag(&outcome.tag)?;
    outcome.created = true;

    if config.push {
        repo.push_tag(&config.remote, &outcome.tag)?;
        outcome.pushed = true;
    } else {
        debug!("Skipping push (not requested)");
    }

    Ok(outcome)
}

fn check_branch(repo: &impl TagRepository, config: &ReleaseConfig) -> Result<()> {
    let branch = repo.current_branch().context("Failed to determine current branch")?;
    if let Some(branch) = &branch {
        if config.release_branches.iter().any(|b| b == branch) {
            debug!("On release branch {}", branch);
            return Ok(());
        }
    }

    let found = match branch {
        Some(branch) => format!("branch '{}'", branch),
        None => "detached HEAD".to_string(),
    };
    warn!("You are on {}, not on {}", found, config.release_branches.join("/"));

    if config.force {
        return Ok(());
    }
    Err(ReleaseError::NotOnReleaseBranch {
        found,
        expected: config.release_branches.join(", "),
    }
    .into())
}

fn check_clean(repo: &impl TagRepository, config: &ReleaseConfig) -> Result<()> {
    if repo.is_clean().context("Failed to read working tree status")? {
        return Ok(());
    }

    warn!("Working tree has uncommitted changes");
    if config.force {
        return Ok(());
    }
    Err(ReleaseError::DirtyWorkingTree.into())
}
