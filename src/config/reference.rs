//! `[reference]` section configuration.
//!
//! Controls how embedded metadata references are recognized and how the
//! resolved values are presented.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[reference]` section in odoodoc.toml.
///
/// # Example
/// ```toml
/// [reference]
/// pattern = "@(.|[^@]+)@"    # exactly one capture group
/// plaintext = true           # resolve references in every text node
/// menu_separator = " ‣ "
/// menu_class = "odoodocmenu"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceConfig {
    /// Delimiter regular expression; its single group captures `kind:content[:option]`.
    #[serde(default = "defaults::reference::pattern")]
    #[educe(Default = defaults::reference::pattern())]
    pub pattern: String,

    /// Apply the whole-document pass, not only explicit inline markup.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub plaintext: bool,

    /// Glyph replacing `/` between menu breadcrumb segments.
    #[serde(default = "defaults::reference::menu_separator")]
    #[educe(Default = defaults::reference::menu_separator())]
    pub menu_separator: String,

    #[serde(default = "defaults::reference::menu_class")]
    #[educe(Default = defaults::reference::menu_class())]
    pub menu_class: String,

    #[serde(default = "defaults::reference::field_class")]
    #[educe(Default = defaults::reference::field_class())]
    pub field_class: String,

    #[serde(default = "defaults::reference::model_class")]
    #[educe(Default = defaults::reference::model_class())]
    pub model_class: String,

    #[serde(default = "defaults::reference::fieldlist_class")]
    #[educe(Default = defaults::reference::fieldlist_class())]
    pub fieldlist_class: String,
}
