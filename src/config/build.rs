//! `[build]` section configuration.
//!
//! Where documentation sources come from, how the build root is assembled
//! and which generator renders it.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Builders whose output the transform pass can rewrite.
pub const HTML_FORMATS: &[&str] = &["html", "dirhtml", "singlehtml"];

/// `[build]` section in odoodoc.toml.
///
/// # Example
/// ```toml
/// [build]
/// lang = "es"                       # <module>/doc/<lang> folders to link
/// format = "html"
/// output = "build/html"
/// template = "conf.py.template"
/// static = "_static"
/// addons = ["/opt/odoo/addons", "/opt/custom"]
/// command = ["sphinx-build"]
///
/// [build.source]
/// repo = "git@example.com:docs/innubo_doc.git"
/// branch = "8.0"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Documentation language folder (`<module>/doc/<lang>`).
    #[serde(default = "defaults::build::lang")]
    #[educe(Default = defaults::build::lang())]
    pub lang: String,

    /// Generator builder name (`-b` argument), one of [`HTML_FORMATS`].
    #[serde(default = "defaults::build::format")]
    #[educe(Default = defaults::build::format())]
    pub format: String,

    /// Output directory of the rendered documentation.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Generator config template (Jinja syntax), rendered to `conf.py`.
    #[serde(default = "defaults::build::template")]
    #[educe(Default = defaults::build::template())]
    pub template: PathBuf,

    /// Static files copied to `<build root>/_static`.
    #[serde(rename = "static", default = "defaults::build::static_dir")]
    #[educe(Default = defaults::build::static_dir())]
    pub static_dir: PathBuf,

    /// Addons paths scanned for per-module documentation folders.
    #[serde(default)]
    pub addons: Vec<PathBuf>,

    /// Generator command and leading arguments.
    #[serde(default = "defaults::build::command")]
    #[educe(Default = defaults::build::command())]
    pub command: Vec<String>,

    /// Keep the temporary checkout and build root after the run.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub keep_temp: bool,

    /// Main documentation sources.
    #[serde(default)]
    pub source: SourceConfig,
}

/// `[build.source]` section - main documentation tree.
///
/// Exactly one of `repo` or `path` must be set.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Git URL cloned into the temporary checkout.
    pub repo: Option<String>,

    /// Branch checked out after cloning.
    #[serde(default = "defaults::build::source::branch")]
    #[educe(Default = defaults::build::source::branch())]
    pub branch: String,

    /// Local directory copied into the temporary checkout instead of cloning.
    pub path: Option<PathBuf>,
}
