//! Configuration management for `odoodoc.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                        |
//! |---------------|------------------------------------------------|
//! | `[base]`      | Project name and version for the generator     |
//! | `[odoo]`      | Server connection and lookup locale            |
//! | `[build]`     | Sources, addons paths, template, generator     |
//! | `[reference]` | Reference pattern and presentational classes   |
//! | `[serve]`     | Documentation server (port, prefix, caching)   |
//!
//! # Example
//!
//! ```toml
//! [base]
//! project = "Innubo"
//!
//! [odoo]
//! server = "http://localhost:8069"
//! db = "innubo"
//! user = "admin"
//!
//! [build]
//! addons = ["/opt/odoo/addons"]
//!
//! [build.source]
//! repo = "/srv/git/innubo_doc"
//! branch = "8.0"
//!
//! [reference]
//! plaintext = true
//! ```

mod base;
mod build;
pub mod defaults;
mod error;
mod odoo;
mod reference;
mod serve;

pub use reference::ReferenceConfig;

use base::BaseConfig;
pub use build::{BuildConfig, SourceConfig};
use error::ConfigError;
pub use odoo::OdooConfig;
use serve::ServeConfig;

use crate::cli::{Cli, Commands, OdooArgs};
use crate::reference::ReferencePattern;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing odoodoc.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DocConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub base: BaseConfig,

    #[serde(default)]
    pub odoo: OdooConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub reference: ReferenceConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl DocConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: DocConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config named by the CLI (defaults when the file is absent)
    /// and apply CLI overrides.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.config_path = Self::normalize_path(&config_path);
        config.update_with_cli(cli, root);
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli, root: &Path) {
        self.cli = Some(cli);

        match &cli.command {
            Commands::Build {
                odoo,
                lang,
                format,
                output,
                keep_temp,
                plaintext,
            } => {
                self.update_odoo(odoo);
                Self::update_option(&mut self.build.lang, lang.as_ref());
                Self::update_option(&mut self.build.format, format.as_ref());
                Self::update_option(&mut self.build.output, output.as_ref());
                Self::update_option(&mut self.reference.plaintext, plaintext.as_ref());
                self.build.keep_temp |= *keep_temp;
            }
            Commands::Transform {
                odoo, plaintext, ..
            } => {
                self.update_odoo(odoo);
                Self::update_option(&mut self.reference.plaintext, plaintext.as_ref());
            }
            Commands::Serve {
                interface,
                port,
                output,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.build.output, output.as_ref());
            }
        }

        self.update_path_with_root(root);
    }

    fn update_odoo(&mut self, args: &OdooArgs) {
        Self::update_option(&mut self.odoo.server, args.server.as_ref());
        Self::update_option(&mut self.odoo.db, args.db.as_ref());
        Self::update_option(&mut self.odoo.user, args.user.as_ref());
        Self::update_option(&mut self.odoo.password, args.password.as_ref());
        Self::update_option(&mut self.odoo.lang, args.odoo_lang.as_ref());
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths against `root` and normalize them to absolute paths
    fn update_path_with_root(&mut self, root: &Path) {
        let root = Self::normalize_path(root);

        let resolve = |path: &Path| {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            let path = PathBuf::from(expanded);
            if path.is_relative() {
                Self::normalize_path(&root.join(path))
            } else {
                Self::normalize_path(&path)
            }
        };

        self.build.output = resolve(&self.build.output);
        self.build.template = resolve(&self.build.template);
        self.build.static_dir = resolve(&self.build.static_dir);
        self.build.addons = self.build.addons.iter().map(|p| resolve(p)).collect();
        if let Some(path) = self.build.source.path.as_deref() {
            self.build.source.path = Some(resolve(path));
        }

        self.root = root;
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        ReferencePattern::new(&self.reference.pattern)
            .map_err(|err| ConfigError::Validation(err.to_string()))?;

        let Some(cli) = self.cli else {
            return Ok(());
        };

        match &cli.command {
            Commands::Build { .. } => {
                self.validate_connection()?;
                self.validate_build()?;
            }
            Commands::Transform { .. } => self.validate_connection()?,
            Commands::Serve { .. } => {
                if !self.serve.prefix.starts_with('/') {
                    bail!(ConfigError::Validation(format!(
                        "[serve.prefix] must start with `/`: {}",
                        self.serve.prefix
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_connection(&self) -> Result<()> {
        for (key, value) in [
            ("server", &self.odoo.server),
            ("db", &self.odoo.db),
            ("user", &self.odoo.user),
            ("password", &self.odoo.password),
        ] {
            if value.trim().is_empty() {
                bail!(ConfigError::Validation(format!("[odoo.{key}] is required")));
            }
        }
        Ok(())
    }

    fn validate_build(&self) -> Result<()> {
        let source = &self.build.source;
        match (&source.repo, &source.path) {
            (Some(_), Some(_)) => bail!(ConfigError::Validation(
                "[build.source] accepts either `repo` or `path`, not both".into()
            )),
            (None, None) => bail!(ConfigError::Validation(
                "[build.source] needs a `repo` or a `path`".into()
            )),
            (None, Some(path)) if !path.is_dir() => bail!(ConfigError::Validation(format!(
                "[build.source.path] is not a directory: {}",
                path.display()
            ))),
            _ => {}
        }

        if !build::HTML_FORMATS.contains(&self.build.format.as_str()) {
            bail!(ConfigError::Validation(format!(
                "[build.format] must be one of {}, got `{}`: references are only resolved in HTML output",
                build::HTML_FORMATS.join(", "),
                self.build.format
            )));
        }
        if self.build.command.is_empty() {
            bail!(ConfigError::Validation("[build.command] cannot be empty".into()));
        }
        if !self.build.template.is_file() {
            bail!(ConfigError::Validation(format!(
                "[build.template] not found: {}",
                self.build.template.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn leak_cli(args: &[&str]) -> &'static Cli {
        Box::leak(Box::new(Cli::parse_from(args)))
    }

    #[test]
    fn test_empty_config_is_valid_toml() {
        let config = DocConfig::from_str("").unwrap();
        assert_eq!(config.reference.pattern, "@(.|[^@]+)@");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pattern_with_two_groups_rejected() {
        let config = DocConfig::from_str(
            r#"
            [reference]
            pattern = "@(\\w+):(\\w+)@"
        "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exactly one capture group"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = DocConfig::from_str("[reference]\npattern = \"@([^@]+@\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_and_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        fs::write(
            dir.path().join("odoodoc.toml"),
            r#"
            [odoo]
            db = "from_file"
            user = "admin"
            password = "admin"

            [build]
            output = "out"
            addons = ["addons"]
        "#,
        )
        .unwrap();

        let cli = leak_cli(&[
            "odoodoc", "--root", root, "build", "--db", "from_cli", "--lang", "en",
        ]);
        let config = DocConfig::load(cli).unwrap();

        assert_eq!(config.odoo.db, "from_cli");
        assert_eq!(config.odoo.user, "admin");
        assert_eq!(config.build.lang, "en");
        assert!(config.build.output.is_absolute());
        assert!(config.build.output.ends_with("out"));
        assert!(config.build.addons[0].ends_with("addons"));
    }

    #[test]
    fn test_build_requires_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("conf.py.template"), "project = '{{ PROJECT }}'").unwrap();
        fs::write(
            dir.path().join("odoodoc.toml"),
            r#"
            [odoo]
            db = "innubo"
            user = "admin"
            password = "admin"
        "#,
        )
        .unwrap();

        let cli = leak_cli(&["odoodoc", "--root", dir.path().to_str().unwrap(), "build"]);
        let config = DocConfig::load(cli).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[build.source]"));
    }

    #[test]
    fn test_build_rejects_non_html_format() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("conf.py.template"), "project = '{{ PROJECT }}'").unwrap();
        fs::write(
            dir.path().join("odoodoc.toml"),
            r#"
            [odoo]
            db = "innubo"
            user = "admin"
            password = "admin"

            [build.source]
            path = "docs"
        "#,
        )
        .unwrap();
        let root = dir.path().to_str().unwrap();

        let cli = leak_cli(&["odoodoc", "--root", root, "build", "--format", "latex"]);
        let err = DocConfig::load(cli).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("[build.format]"));

        let cli = leak_cli(&["odoodoc", "--root", root, "build", "--format", "dirhtml"]);
        DocConfig::load(cli).unwrap().validate().unwrap();
    }

    #[test]
    fn test_transform_requires_credentials() {
        let dir = TempDir::new().unwrap();
        let cli = leak_cli(&["odoodoc", "--root", dir.path().to_str().unwrap(), "transform"]);
        let config = DocConfig::load(cli).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[odoo.db] is required"));
    }

    #[test]
    fn test_serve_prefix_must_be_absolute() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("odoodoc.toml"), "[serve]\nprefix = \"dochelp\"").unwrap();
        let cli = leak_cli(&["odoodoc", "--root", dir.path().to_str().unwrap(), "serve"]);
        let config = DocConfig::load(cli).unwrap();
        assert!(config.validate().is_err());
    }
}
