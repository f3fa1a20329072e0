//! Git operations for syncing documentation sources.
//!
//! Network operations (clone, checkout) go through the `git` binary so
//! user credentials and ssh config apply; local inspection uses `gix`.

use crate::utils::exec::SILENT_FILTER;
use crate::{exec, log};
use anyhow::{Context, Result, bail};
use std::path::Path;

/// Clone `url` into `dest` and check out `branch`.
///
/// `dest` must not exist or be an empty directory.
pub fn clone_branch(url: &str, dest: &Path, branch: &str) -> Result<()> {
    if branch.trim().is_empty() {
        bail!("Branch name cannot be empty");
    }

    log!("git"; "cloning {url}");
    exec!(["git"]; "clone", "--quiet", url, dest)
        .with_context(|| format!("Failed to clone `{url}`"))?;
    exec!(filter=&SILENT_FILTER; dest; ["git"]; "checkout", branch)
        .with_context(|| format!("Failed to checkout `{branch}`"))?;

    log!("git"; "{branch} at {}", head_short_id(dest)?);
    Ok(())
}

/// Abbreviated id of the commit HEAD points to.
pub fn head_short_id(root: &Path) -> Result<String> {
    let repo = gix::open(root).with_context(|| format!("Not a git repository: {}", root.display()))?;
    let id = repo.head_id().context("Repository has no HEAD commit")?;
    Ok(id.to_hex_with_len(8).to_string())
}
