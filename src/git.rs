use anyhow::{Context, Result, bail};
use git2::{
    Cred, CredentialType, FetchOptions, PushOptions, RemoteCallbacks, Repository,
    Signature, StatusOptions, build::CheckoutBuilder,
};
use log::{debug, info, warn};
use std::cell::Cell;
use std::path::Path;

/// The version-control operations a release needs.
pub trait TagRepository {
    /// Names of every tag in the repository, without the `refs/tags/` prefix
    fn list_tags(&self) -> Result<Vec<String>>;

    /// The checked out branch, or `None` when HEAD is detached or unborn
    fn current_branch(&self) -> Result<Option<String>>;

    /// Whether tracked files are free of staged or unstaged changes
    fn is_clean(&self) -> Result<bool>;

    /// Fetches the current branch and all tags from `remote`, then fast-forwards
    fn pull(&self, remote_name: &str) -> Result<()>;

    /// Creates an annotated tag on HEAD
    fn create_tag(&self, tag_name: &str) -> Result<()>;

    fn push_tag(&self, remote_name: &str, tag_name: &str) -> Result<()>;
}

pub struct GitTracker {
    pub repository: Repository,
}

impl GitTracker {
    /// Opens an existing repository at, or above, the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repository = Repository::discover(path)
            .with_context(|| format!("Failed to find git repository at {:?}", path))?;

        debug!("Opened repository at {:?}", repository.path());

        Ok(GitTracker { repository })
    }

    /// Creates authentication callbacks that use local git credentials
    fn create_auth_callbacks() -> RemoteCallbacks<'static> {
        let mut callbacks = RemoteCallbacks::new();
        let attempts = Cell::new(0u32);

        callbacks.credentials(move |url, username_from_url, allowed_types| {
            let attempt = attempts.get() + 1;
            attempts.set(attempt);
            debug!(
                "Credentials callback attempt {}: url={}, username_from_url={:?}, allowed_types={:?}",
                attempt, url, username_from_url, allowed_types
            );

            // libgit2 keeps asking as long as we hand out credentials
            if attempt > 5 {
                warn!("Too many credential attempts, authentication likely failing");
                return Err(git2::Error::from_str("authentication failed after multiple attempts"));
            }

            let username = username_from_url.unwrap_or("git");

            // Try SSH agent first if SSH is allowed
            if allowed_types.contains(CredentialType::SSH_KEY) {
                debug!("Trying SSH agent authentication");
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }

                // Fall back to the usual key files in ~/.ssh
                if let Some(home) = dirs::home_dir() {
                    let ssh_dir = home.join(".ssh");
                    for key_name in &["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let private_key = ssh_dir.join(key_name);
                        let public_key = ssh_dir.join(format!("{}.pub", key_name));

                        if private_key.exists() {
                            debug!("Trying SSH key: {:?}", private_key);
                            if let Ok(cred) = Cred::ssh_key(
                                username,
                                if public_key.exists() { Some(public_key.as_path()) } else { None },
                                &private_key,
                                None,
                            ) {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            // Try credential helper for HTTPS
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                debug!("Trying credential helper");
                if let Ok(cred) = Cred::credential_helper(
                    &git2::Config::open_default()?,
                    url,
                    username_from_url,
                ) {
                    return Ok(cred);
                }
            }

            // Try default credentials as last resort
            if allowed_types.contains(CredentialType::DEFAULT) {
                debug!("Trying default credentials");
                return Cred::default();
            }

            Err(git2::Error::from_str("no suitable credentials found"))
        });

        callbacks
    }

    /// Gets the repository signature from local git config
    fn get_signature(&self) -> Result<Signature<'_>> {
        self.repository.signature()
            .context("Failed to get git signature. Please configure user.name and user.email in git config")
    }

    fn find_remote(&self, remote_name: &str) -> Result<git2::Remote<'_>> {
        self.repository.find_remote(remote_name)
            .with_context(|| format!("Remote '{}' not found", remote_name))
    }

    /// Fetches `branch` and all tags from the remote, then fast-forwards the local branch.
    ///
    /// The incoming tree is checked out in safe mode before the branch moves, so a
    /// local edit the new commits would overwrite aborts the pull and leaves both the
    /// working tree and the branch where they were.
    fn fast_forward(&self, remote_name: &str, branch: &str) -> Result<()> {
        let mut remote = self.find_remote(remote_name)?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(Self::create_auth_callbacks());

        let tracking_name = format!("refs/remotes/{}/{}", remote_name, branch);
        let branch_refspec = format!("+refs/heads/{}:{}", branch, tracking_name);
        remote.fetch(
            &[branch_refspec.as_str(), "refs/tags/*:refs/tags/*"],
            Some(&mut fetch_options),
            None,
        ).with_context(|| format!("Failed to fetch {}/{}", remote_name, branch))?;

        let tracking = self.repository.find_reference(&tracking_name)?;
        let fetch_commit = self.repository.reference_to_annotated_commit(&tracking)?;
        let (analysis, _) = self.repository.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            info!("Already up to date with {}/{}", remote_name, branch);
            return Ok(());
        }

        if !analysis.is_fast_forward() {
            bail!(
                "Local branch '{}' has diverged from {}/{}; merge or rebase manually",
                branch, remote_name, branch
            );
        }

        let target = self.repository.find_object(fetch_commit.id(), Some(git2::ObjectType::Commit))?;
        self.repository.checkout_tree(&target, Some(CheckoutBuilder::default().safe()))
            .with_context(|| format!(
                "Cannot fast-forward {} to {}/{}: local changes would be overwritten",
                branch, remote_name, branch
            ))?;

        let reference_name = format!("refs/heads/{}", branch);
        let mut reference = self.repository.find_reference(&reference_name)?;
        reference.set_target(
            fetch_commit.id(),
            &format!("pull: fast-forward to {}/{}", remote_name, branch),
        )?;
        self.repository.set_head(&reference_name)?;

        info!("Fast-forwarded {} to {}", branch, fetch_commit.id());
        Ok(())
    }
}

impl TagRepository for GitTracker {
    fn list_tags(&self) -> Result<Vec<String>> {
        let mut tags = Vec::new();

        self.repository.tag_foreach(|_oid, name| {
            if let Ok(name_str) = std::str::from_utf8(name) {
                let tag_name = name_str.trim_start_matches("refs/tags/");
                tags.push(tag_name.to_string());
            }
            true
        })?;

        debug!("Found {} total tags", tags.len());
        Ok(tags)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        if self.repository.head_detached().unwrap_or(false) {
            return Ok(None);
        }

        let head = match self.repository.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e).context("Failed to read HEAD"),
        };

        Ok(head.shorthand().map(str::to_string))
    }

    fn is_clean(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);

        let statuses = self.repository.statuses(Some(&mut options))?;
        debug!("{} tracked files with changes", statuses.len());
        Ok(statuses.is_empty())
    }

    fn pull(&self, remote_name: &str) -> Result<()> {
        let branch = self
            .current_branch()?
            .ok_or_else(|| anyhow::anyhow!("Cannot pull with a detached HEAD"))?;

        info!("Pulling {} from remote '{}'", branch, remote_name);
        self.fast_forward(remote_name, &branch)?;
        info!("Successfully pulled latest changes");
        Ok(())
    }

    fn create_tag(&self, tag_name: &str) -> Result<()> {
        info!("Creating tag: {}", tag_name);

        let sig = self.get_signature()?;
        let head = self.repository.head()
            .context("Cannot tag a repository without commits")?
            .peel(git2::ObjectType::Commit)?;

        self.repository.tag(
            tag_name,
            &head,
            &sig,
            &format!("Release {}", tag_name),
            false,
        ).with_context(|| format!("Failed to create tag '{}'", tag_name))?;

        info!("Created tag: {}", tag_name);
        Ok(())
    }

    fn push_tag(&self, remote_name: &str, tag_name: &str) -> Result<()> {
        info!("Pushing tag {} to {}", tag_name, remote_name);

        let mut remote = self.find_remote(remote_name)?;

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(Self::create_auth_callbacks());

        let refspec = format!("refs/tags/{}:refs/tags/{}", tag_name, tag_name);
        remote.push(&[&refspec], Some(&mut push_options))
            .with_context(|| format!("Failed to push tag '{}' to '{}'", tag_name, remote_name))?;

        info!("Pushed tag {} to {}", tag_name, remote_name);
        Ok(())
    }
}
