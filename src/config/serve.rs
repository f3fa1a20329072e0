//! `[serve]` section configuration.
//!
//! Contains documentation server settings.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[serve]` section in odoodoc.toml - static documentation server.
///
/// # Example
/// ```toml
/// [serve]
/// interface = "0.0.0.0"  # Listen on all interfaces
/// port = 8070
/// prefix = "/dochelp"    # URL path the documentation is mounted at
/// max_age = 10           # Cache-Control max-age in seconds
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Network interface to bind.
    #[serde(default = "defaults::serve::interface")]
    #[educe(Default = defaults::serve::interface())]
    pub interface: String,

    /// HTTP port number (default: 8070).
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,

    /// URL prefix of the documentation.
    #[serde(default = "defaults::serve::prefix")]
    #[educe(Default = defaults::serve::prefix())]
    pub prefix: String,

    /// Seconds clients may cache a page before revalidating.
    #[serde(default = "defaults::serve::max_age")]
    #[educe(Default = defaults::serve::max_age())]
    pub max_age: u32,
}
