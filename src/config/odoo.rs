//! `[odoo]` section configuration.
//!
//! Connection parameters of the server the references are resolved against.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[odoo]` section in odoodoc.toml.
///
/// # Example
/// ```toml
/// [odoo]
/// server = "http://localhost:8069"
/// db = "innubo"
/// user = "admin"
/// password = "admin"
/// lang = "es_ES"   # locale of every lookup
/// timeout = 30     # seconds per remote call
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct OdooConfig {
    /// Base URL of the server (the `/jsonrpc` endpoint is appended).
    #[serde(default = "defaults::odoo::server")]
    #[educe(Default = defaults::odoo::server())]
    pub server: String,

    /// Database name.
    #[serde(default)]
    pub db: String,

    /// Login of the user performing the lookups.
    #[serde(default)]
    pub user: String,

    /// Password of `user`. Prefer `--password` or `ODOODOC_PASSWORD`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Odoo language code used to localize labels, help texts and menus.
    #[serde(default = "defaults::odoo::lang")]
    #[educe(Default = defaults::odoo::lang())]
    pub lang: String,

    /// Timeout of each remote call in seconds.
    #[serde(default = "defaults::odoo::timeout")]
    #[educe(Default = defaults::odoo::timeout())]
    pub timeout: u64,
}

impl OdooConfig {
    /// Full URL of the JSON-RPC endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/jsonrpc", self.server.trim_end_matches('/'))
    }
}
