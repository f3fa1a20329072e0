//! Generator config rendered from a Jinja template.

use anyhow::{Context, Result};
use minijinja::Environment;
use serde::Serialize;
use std::{fs, path::Path};

/// Variables available to the `conf.py` template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ConfContext {
    pub project: String,
    pub version: String,
    pub installed_modules: Vec<String>,
    pub odoo_server: String,
    pub odoo_db: String,
    pub odoo_user: String,
    pub odoo_pwd: String,
    pub odoo_lang: String,
    /// Path of the company logo, or `None` (Python literal) without one.
    pub customer_logo: String,
}

pub fn render(template: &str, context: &ConfContext) -> Result<String> {
    let env = Environment::new();
    env.render_str(template, context)
        .context("Failed to render the generator config template")
}

/// Render `template_path` into `dest`.
pub fn write(template_path: &Path, dest: &Path, context: &ConfContext) -> Result<()> {
    let template = fs::read_to_string(template_path)
        .with_context(|| format!("Failed to read template {}", template_path.display()))?;
    let rendered = render(&template, context)?;
    fs::write(dest, rendered).with_context(|| format!("Failed to write {}", dest.display()))
}
