use clap::{ArgAction, ArgGroup, Parser};
use log::LevelFilter;
use thiserror::Error;

use crate::release::{DEFAULT_RELEASE_BRANCHES, DEFAULT_REMOTE, ReleaseConfig};
use crate::selector::BumpKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("One of --major, --minor or --patch is required")]
    MissingBumpKind,
    #[error("Only one of --major, --minor or --patch may be given")]
    ConflictingBumpKinds,
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about,
    bin_name = "semtagger",
    group(ArgGroup::new("bump").required(true).args(["major", "minor", "patch"])),
    after_help = "Examples:\n  \
        semtagger -p          Increment patch version (1.0.0 -> 1.0.1)\n  \
        semtagger -m          Increment minor version (1.0.0 -> 1.1.0)\n  \
        semtagger -M          Increment major version (1.0.0 -> 2.0.0)\n  \
        semtagger -p 7        Set patch version explicitly (1.0.0 -> 1.0.7)\n  \
        semtagger -p -l rc1   Increment patch and add label (1.0.0 -> 1.0.1-rc1)\n  \
        semtagger -p -u       Increment patch and push to remote\n  \
        semtagger -p -vv      Increment patch with debug logging"
)]
pub struct Arguments {
    /// Increment major version (MAJOR.0.0), or set it to VALUE
    #[arg(long, short = 'M', value_name = "VALUE", num_args = 0..=1)]
    pub major: Option<Option<u64>>,
    /// Increment minor version (x.MINOR.0), or set it to VALUE
    #[arg(long, short = 'm', value_name = "VALUE", num_args = 0..=1)]
    pub minor: Option<Option<u64>>,
    /// Increment patch version (x.x.PATCH), or set it to VALUE
    #[arg(long, short = 'p', value_name = "VALUE", num_args = 0..=1)]
    pub patch: Option<Option<u64>>,
    /// Add a prerelease label to the new version (e.g. -l rc1 creates v1.0.0-rc1)
    #[arg(long, short)]
    pub label: Option<String>,
    /// Bump from this version instead of the latest tag
    #[arg(long, short, value_name = "VERSION")]
    pub base: Option<String>,
    /// Push the new tag to the remote
    #[arg(long = "push", short = 'u')]
    pub push: bool,
    /// Pull from the remote before reading tags
    #[arg(long)]
    pub pull: bool,
    /// Print the new tag without creating, pulling or pushing anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,
    /// Tag even when not on a release branch or when the working tree is dirty
    #[arg(long, short)]
    pub force: bool,
    #[arg(long, short, default_value = DEFAULT_REMOTE)]
    pub remote: String,
    /// Branches that releases may be tagged from
    #[arg(long = "release-branch", value_name = "BRANCH", default_values = DEFAULT_RELEASE_BRANCHES)]
    pub release_branches: Vec<String>,
    #[arg(long, default_value = "./")]
    pub path: String,
    /// Verbosity (-v for INFO, -vv for DEBUG)
    #[arg(long, short, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Arguments {
    /// The requested bump kind and its explicit value, if any
    pub fn bump(&self) -> Result<(BumpKind, Option<u64>), UsageError> {
        match (self.major, self.minor, self.patch) {
            (Some(value), None, None) => Ok((BumpKind::Major, value)),
            (None, Some(value), None) => Ok((BumpKind::Minor, value)),
            (None, None, Some(value)) => Ok((BumpKind::Patch, value)),
            (None, None, None) => Err(UsageError::MissingBumpKind),
            _ => Err(UsageError::ConflictingBumpKinds),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    pub fn release_config(&self) -> Result<ReleaseConfig, UsageError> {
        let (bump, explicit_value) = self.bump()?;
        Ok(ReleaseConfig {
            bump,
            explicit_value,
            label: self.label.clone(),
            base: self.base.clone(),
            remote: self.remote.clone(),
            release_branches: self.release_branches.clone(),
            force: self.force,
            pull: self.pull,
            push: self.push,
            dry_run: self.dry_run,
        })
    }
}
