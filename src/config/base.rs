//! `[base]` section configuration.
//!
//! Project identity passed to the generator config template.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[base]` section in odoodoc.toml.
///
/// # Example
/// ```toml
/// [base]
/// project = "Innubo"
/// version = "1.0"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BaseConfig {
    /// Project name shown by the generated documentation.
    #[serde(default = "defaults::base::project")]
    #[educe(Default = defaults::base::project())]
    pub project: String,

    /// Documentation version string.
    #[serde(default = "defaults::base::version")]
    #[educe(Default = defaults::base::version())]
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::super::DocConfig;

    #[test]
    fn test_base_config() {
        let config = r#"
            [base]
            project = "Acme ERP"
            version = "2.1"
        "#;
        let config: DocConfig = toml::from_str(config).unwrap();

        assert_eq!(config.base.project, "Acme ERP");
        assert_eq!(config.base.version, "2.1");
    }

    #[test]
    fn test_base_config_defaults() {
        let config: DocConfig = toml::from_str("").unwrap();

        assert_eq!(config.base.project, "Innubo");
        assert_eq!(config.base.version, "1.0");
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [base]
            title = "should_fail"
        "#;
        assert!(toml::from_str::<DocConfig>(config).is_err());
    }
}
