//! Documentation build orchestration.
//!
//! # Pipeline
//!
//! ```text
//! run()
//!     │
//!     ├── Workspace::create()      temp checkout + temp build root
//!     ├── sources::sync()          git clone or local copy
//!     ├── sources::link_*()        <module>/doc/<lang> symlink farm, index.rst
//!     ├── sources::install_static()
//!     ├── conf::write()            conf.py from the template
//!     ├── generate()               <command> -b <format> -E -a ...
//!     └── transform::run()         reference resolution over the output
//! ```
//!
//! Every step failing aborts the build.

mod conf;
mod modules;
mod sources;

pub use conf::ConfContext;
pub use modules::order_by_depth;

use crate::config::DocConfig;
use crate::metadata::{Deployment, MetadataSource};
use crate::{exec, log, transform};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Temporary directories of one build.
struct Workspace {
    checkout: PathBuf,
    root: PathBuf,
    /// Deleted on drop; empty when the directories are kept.
    _guards: Vec<TempDir>,
}

impl Workspace {
    fn create(project: &str, keep: bool) -> Result<Self> {
        let checkout_parent = tempfile::Builder::new()
            .prefix("odoodoc-")
            .tempdir()
            .context("Failed to create the temporary checkout directory")?;
        let root = tempfile::Builder::new()
            .prefix("odoodoc-build-")
            .tempdir()
            .context("Failed to create the temporary build root")?;
        let checkout_name = format!("{}_doc", project.to_lowercase().replace(' ', "_"));

        if keep {
            let checkout = checkout_parent.keep().join(checkout_name);
            let root = root.keep();
            log!("build"; "keeping {} and {}", checkout.display(), root.display());
            return Ok(Self {
                checkout,
                root,
                _guards: Vec::new(),
            });
        }

        Ok(Self {
            checkout: checkout_parent.path().join(checkout_name),
            root: root.path().to_path_buf(),
            _guards: vec![checkout_parent, root],
        })
    }
}

/// Run the whole build with an already connected `source`.
pub fn run<S>(config: &DocConfig, source: &S) -> Result<()>
where
    S: MetadataSource + Deployment,
{
    let build = &config.build;
    let workspace = Workspace::create(&config.base.project, build.keep_temp)?;

    sources::sync(&build.source, &workspace.checkout)?;
    assemble(config, &workspace.checkout, &workspace.root)?;

    let logo = write_logo(source, &workspace.root)?;
    let installed = source
        .installed_modules()
        .context("Failed to list installed modules")?;
    let context = conf_context(config, order_by_depth(&installed), logo.as_deref());
    conf::write(&build.template, &workspace.root.join("conf.py"), &context)?;

    generate(config, &workspace.root)?;
    transform::run(&build.output, source, config)
}

/// Fill the build root: module links, index and static files.
fn assemble(config: &DocConfig, checkout: &Path, root: &Path) -> Result<()> {
    let lang = &config.build.lang;
    let mut linked = sources::link_modules(checkout, root, lang)?;
    for addons in &config.build.addons {
        linked += sources::link_modules(addons, root, lang)?;
    }
    sources::link_index(checkout, root)?;
    sources::install_static(&config.build.static_dir, root)?;

    log!("build"; "linked {linked} module docs ({lang})");
    Ok(())
}

/// Store the company logo as `_static/customer_logo.png`.
fn write_logo(source: &dyn Deployment, root: &Path) -> Result<Option<PathBuf>> {
    let Some(logo) = source.company_logo().context("Failed to read the company logo")? else {
        return Ok(None);
    };
    let path = root.join("_static").join("customer_logo.png");
    fs::write(&path, logo).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}

fn conf_context(config: &DocConfig, installed_modules: Vec<String>, logo: Option<&Path>) -> ConfContext {
    ConfContext {
        project: config.base.project.clone(),
        version: config.base.version.clone(),
        installed_modules,
        odoo_server: config.odoo.server.clone(),
        odoo_db: config.odoo.db.clone(),
        odoo_user: config.odoo.user.clone(),
        odoo_pwd: config.odoo.password.clone(),
        odoo_lang: config.odoo.lang.clone(),
        customer_logo: logo.map_or_else(|| "None".to_owned(), |p| p.display().to_string()),
    }
}

/// Invoke the generator with a forced full rebuild.
fn generate(config: &DocConfig, root: &Path) -> Result<()> {
    let build = &config.build;
    let output = &build.output;
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let doctrees = output.join(".doctrees");

    log!("build"; "running {} ({})", build.command.join(" "), build.format);
    exec!(&build.command; "-b", &build.format, "-E", "-a", "-d", &doctrees, root, output)
        .context("Documentation generator failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ModuleInfo;
    use crate::metadata::stub::StubSource;

    #[test]
    fn test_workspace_removed_on_drop() {
        let workspace = Workspace::create("Innubo Docs", false).unwrap();
        assert!(workspace.checkout.ends_with("innubo_docs_doc"));
        assert!(!workspace.checkout.exists());
        assert!(workspace.root.is_dir());

        let root = workspace.root.clone();
        drop(workspace);
        assert!(!root.exists());
    }

    #[test]
    fn test_workspace_kept() {
        let workspace = Workspace::create("Innubo", true).unwrap();
        let root = workspace.root.clone();
        let parent = workspace.checkout.parent().unwrap().to_path_buf();
        drop(workspace);
        assert!(root.is_dir());
        fs::remove_dir_all(root).unwrap();
        fs::remove_dir_all(parent).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_assemble_build_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let checkout = dir.path().join("innubo_doc");
        let addons = dir.path().join("addons");
        let assets = dir.path().join("assets");
        let root = dir.path().join("build");
        for doc in [checkout.join("sale/doc/es"), addons.join("stock/doc/es")] {
            fs::create_dir_all(doc).unwrap();
        }
        fs::create_dir_all(&assets).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(checkout.join("index.rst"), "Index").unwrap();

        let mut config = DocConfig::default();
        config.build.addons = vec![addons];
        config.build.static_dir = assets;
        assemble(&config, &checkout, &root).unwrap();

        assert!(root.join("sale").is_dir());
        assert!(root.join("stock").is_dir());
        assert!(root.join("index.rst").is_file());
        assert!(root.join("_static").is_dir());
    }

    #[test]
    fn test_logo_and_context() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("_static")).unwrap();

        let mut source = StubSource::new();
        assert_eq!(write_logo(&source, dir.path()).unwrap(), None);

        source.logo = Some(b"\x89PNG".to_vec());
        source.modules = vec![ModuleInfo {
            name: "base".into(),
            depends: Vec::new(),
        }];
        let logo = write_logo(&source, dir.path()).unwrap().unwrap();
        assert_eq!(fs::read(&logo).unwrap(), b"\x89PNG");

        let mut config = DocConfig::default();
        config.odoo.db = "innubo".into();
        let installed = order_by_depth(&source.installed_modules().unwrap());
        let context = conf_context(&config, installed, Some(&logo));
        assert_eq!(context.installed_modules, ["base"]);
        assert_eq!(context.odoo_db, "innubo");
        assert!(context.customer_logo.ends_with("_static/customer_logo.png"));
        assert_eq!(conf_context(&config, Vec::new(), None).customer_logo, "None");
    }
}
