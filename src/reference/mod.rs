//! Embedded metadata references.
//!
//! A reference is the text captured by the configured [`ReferencePattern`],
//! shaped `kind:content[:option]`:
//!
//! | Capture                         | Resolves to                      |
//! |---------------------------------|----------------------------------|
//! | `field:res.partner/name`        | label of `res.partner.name`      |
//! | `field:res.partner/name:help`   | help text of the same field      |
//! | `menu:sale/menu_sale_quotations`| full breadcrumb of the menu      |
//! | `menu:sale/menu_sale:nameonly`  | the menu entry name only         |
//! | anything else                   | the captured text, unchanged     |

mod resolver;

pub use resolver::{Resolver, ResolverSettings};

use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing or resolving references.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("invalid reference pattern: {0}")]
    Pattern(String),

    #[error("reference pattern must have exactly one capture group, found {0}: {1}")]
    PatternGroups(usize, String),

    #[error("malformed reference `{raw}`: {reason}")]
    Malformed { raw: String, reason: &'static str },

    #[error("reference substitution did not settle after {0} replacements with pattern `{1}`")]
    Runaway(usize, String),
}

// ============================================================================
// Pattern
// ============================================================================

/// Compiled delimiter pattern with exactly one capture group.
#[derive(Debug, Clone)]
pub struct ReferencePattern(Regex);

impl ReferencePattern {
    /// Compile and validate `pattern`.
    pub fn new(pattern: &str) -> Result<Self, ReferenceError> {
        let regex = Regex::new(pattern).map_err(|e| ReferenceError::Pattern(e.to_string()))?;
        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(ReferenceError::PatternGroups(groups, pattern.to_owned()));
        }
        Ok(Self(regex))
    }

    /// Leftmost match in `text`: the whole span and the captured reference.
    pub fn find<'t>(&self, text: &'t str) -> Option<(std::ops::Range<usize>, &'t str)> {
        let caps = self.0.captures(text)?;
        let whole = caps.get(0)?;
        let raw = caps.get(1).map_or("", |m| m.as_str());
        Some((whole.range(), raw))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

// ============================================================================
// Reference
// ============================================================================

/// Which text of a field is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldText {
    Label,
    Help,
}

/// Which text of a menu entry is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuText {
    /// Full path, segments separated by `/`.
    Breadcrumb,
    NameOnly,
}

/// A parsed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<'a> {
    Field {
        model: &'a str,
        field: &'a str,
        text: FieldText,
    },
    Menu {
        module: &'a str,
        menu: &'a str,
        text: MenuText,
    },
    /// Not a metadata reference; the captured text stands for itself.
    Literal(&'a str),
}

impl<'a> Reference<'a> {
    /// Parse a captured `kind:content[:option]` string.
    ///
    /// Captures without a `:` and unknown kinds are literals. A `field` or
    /// `menu` reference whose content is not exactly `a/b`, or which carries
    /// more than one option, is malformed.
    pub fn parse(raw: &'a str) -> Result<Self, ReferenceError> {
        let mut parts = raw.split(':');
        let kind = parts.next().unwrap_or_default();
        let Some(content) = parts.next() else {
            return Ok(Self::Literal(raw));
        };
        let option = parts.next();
        let extra = parts.next().is_some();

        match kind {
            "field" | "menu" if extra => Err(ReferenceError::Malformed {
                raw: raw.to_owned(),
                reason: "expected `kind:content[:option]`",
            }),
            "field" => Self::field(content, option == Some("help")).map_err(|e| e.with_raw(raw)),
            "menu" => Self::menu(content, option == Some("nameonly")).map_err(|e| e.with_raw(raw)),
            _ => Ok(Self::Literal(raw)),
        }
    }

    /// Field reference from inline markup content (`model/field`).
    pub fn field(content: &'a str, help: bool) -> Result<Self, ReferenceError> {
        let (model, field) = split_pair(content)?;
        Ok(Self::Field {
            model,
            field,
            text: if help { FieldText::Help } else { FieldText::Label },
        })
    }

    /// Menu reference from inline markup content (`module/menu_xmlid`).
    pub fn menu(content: &'a str, name_only: bool) -> Result<Self, ReferenceError> {
        let (module, menu) = split_pair(content)?;
        Ok(Self::Menu {
            module,
            menu,
            text: if name_only {
                MenuText::NameOnly
            } else {
                MenuText::Breadcrumb
            },
        })
    }
}

impl fmt::Display for Reference<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { model, field, text } => {
                write!(f, "field:{model}/{field}")?;
                if *text == FieldText::Help {
                    f.write_str(":help")?;
                }
                Ok(())
            }
            Self::Menu { module, menu, text } => {
                write!(f, "menu:{module}/{menu}")?;
                if *text == MenuText::NameOnly {
                    f.write_str(":nameonly")?;
                }
                Ok(())
            }
            Self::Literal(raw) => f.write_str(raw),
        }
    }
}

/// Split `a/b` into exactly two parts.
fn split_pair(content: &str) -> Result<(&str, &str), ReferenceError> {
    let mut parts = content.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(ReferenceError::Malformed {
            raw: content.to_owned(),
            reason: "expected exactly one `/` between the two names",
        }),
    }
}

impl ReferenceError {
    fn with_raw(self, raw: &str) -> Self {
        match self {
            Self::Malformed { reason, .. } => Self::Malformed {
                raw: raw.to_owned(),
                reason,
            },
            other => other,
        }
    }
}
