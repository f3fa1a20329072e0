//! Source sync and the build root symlink farm.
//!
//! ```text
//! <build root>/
//! ├── index.rst  -> <checkout>/index.rst
//! ├── sale       -> <checkout>/sale/doc/<lang>
//! ├── account    -> <addons>/account/doc/<lang>
//! ├── _static/      (copied from [build.static])
//! └── conf.py       (rendered template)
//! ```

use crate::config::SourceConfig;
use crate::log;
use crate::utils::{
    fs::{copy_dir, make_link, replace_dir},
    git,
};
use anyhow::{Context, Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Fill `dest` with the main documentation tree.
pub fn sync(source: &SourceConfig, dest: &Path) -> Result<()> {
    match (&source.repo, &source.path) {
        (Some(repo), _) => git::clone_branch(repo, dest, &source.branch),
        (None, Some(path)) => {
            log!("build"; "copying sources from {}", path.display());
            copy_dir(path, dest)
        }
        (None, None) => bail!("[build.source] needs a `repo` or a `path`"),
    }
}

/// Link every `<origin>/<module>/doc/<lang>` as `<root>/<module>`, keeping
/// links that already exist. Returns the number of new links.
pub fn link_modules(origin: &Path, root: &Path, lang: &str) -> Result<usize> {
    let entries = fs::read_dir(origin)
        .with_context(|| format!("Failed to read modules in {}", origin.display()))?;

    let mut modules: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.join("doc").join(lang).is_dir())
        .collect();
    modules.sort();

    let mut linked = 0;
    for module in &modules {
        let Some(name) = module.file_name() else {
            continue;
        };
        if make_link(&module.join("doc").join(lang), &root.join(name))? {
            linked += 1;
        }
    }
    Ok(linked)
}

/// Link the checkout's `index.rst` into the build root.
pub fn link_index(checkout: &Path, root: &Path) -> Result<()> {
    let index = checkout.join("index.rst");
    if !index.is_file() {
        bail!("Documentation sources have no index.rst: {}", checkout.display());
    }
    make_link(&index, &root.join("index.rst"))?;
    Ok(())
}

/// Copy `static_dir` to `<root>/_static`, replacing any previous copy.
/// Creates an empty `_static` when `static_dir` does not exist.
pub fn install_static(static_dir: &Path, root: &Path) -> Result<PathBuf> {
    let target = root.join("_static");
    if static_dir.is_dir() {
        replace_dir(static_dir, &target)?;
    } else {
        log!("build"; "no static dir at {}, using an empty one", static_dir.display());
        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
    }
    Ok(target)
}
