//! Repeated find/splice/rescan resolution of references in a text.

use super::{Reference, ReferenceError, ReferencePattern};
use crate::config::DocConfig;
use crate::debug;
use crate::metadata::MetadataSource;
use std::borrow::Cow;
use thiserror::Error;

/// Options every resolution step needs, compiled once per run.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub pattern: ReferencePattern,
    /// Locale passed to every lookup.
    pub locale: String,
    /// Whether the whole-document pass runs.
    pub plaintext: bool,
    pub menu_separator: String,
    pub menu_class: String,
    pub field_class: String,
    pub model_class: String,
    pub fieldlist_class: String,
}

impl ResolverSettings {
    pub fn from_config(config: &DocConfig) -> Result<Self, ReferenceError> {
        let reference = &config.reference;
        Ok(Self {
            pattern: ReferencePattern::new(&reference.pattern)?,
            locale: config.odoo.lang.clone(),
            plaintext: reference.plaintext,
            menu_separator: reference.menu_separator.clone(),
            menu_class: reference.menu_class.clone(),
            field_class: reference.field_class.clone(),
            model_class: reference.model_class.clone(),
            fieldlist_class: reference.fieldlist_class.clone(),
        })
    }
}

/// Result of resolving a text that contained at least one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    /// Every reference that resolved to nothing.
    pub misses: Vec<Miss>,
}

/// A reference that resolved to nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miss {
    /// Canonical form of the reference.
    pub reference: String,
    /// Newlines in the text before the reference.
    pub line_offset: usize,
}

/// A [`ReferenceError`] raised while resolving a text.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{error}")]
pub struct TextError {
    /// Newlines in the text before the offending match.
    pub line_offset: usize,
    pub error: ReferenceError,
}

fn line_offset(text: &str, at: usize) -> usize {
    text[..at].bytes().filter(|&b| b == b'\n').count()
}

/// Resolves references through a [`MetadataSource`].
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    source: &'a dyn MetadataSource,
    settings: &'a ResolverSettings,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn MetadataSource, settings: &'a ResolverSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &'a ResolverSettings {
        self.settings
    }

    pub fn source(&self) -> &'a dyn MetadataSource {
        self.source
    }

    /// Resolve every reference in `text`, splicing looked-up values as-is.
    ///
    /// Returns `None` when the pattern never matched, so callers can leave
    /// the text untouched.
    pub fn resolve_text(&self, text: &str) -> Result<Option<Resolution>, TextError> {
        self.resolve_with(text, |value| Cow::Borrowed(value))
    }

    /// Like [`Self::resolve_text`], passing every looked-up value through
    /// `encode` before splicing it. Literal captures are spliced verbatim.
    ///
    /// Line offsets are counted in the text as it stands when the match is
    /// made, so they only drift when an earlier value spans several lines.
    pub fn resolve_with<F>(&self, text: &str, encode: F) -> Result<Option<Resolution>, TextError>
    where
        F: for<'v> Fn(&'v str) -> Cow<'v, str>,
    {
        let pattern = &self.settings.pattern;
        let limit = text.len() + 1;

        let mut current = text.to_owned();
        let mut misses = Vec::new();
        let mut count = 0usize;

        while let Some((range, raw)) = pattern.find(&current) {
            let at = || line_offset(&current, range.start);
            if count == limit {
                return Err(TextError {
                    line_offset: at(),
                    error: ReferenceError::Runaway(limit, pattern.as_str().to_owned()),
                });
            }
            count += 1;

            let reference = Reference::parse(raw).map_err(|error| TextError {
                line_offset: at(),
                error,
            })?;
            let replacement = match reference {
                Reference::Literal(raw) => raw.to_owned(),
                _ => match self.lookup(&reference) {
                    Some(value) => encode(&value).into_owned(),
                    None => {
                        misses.push(Miss {
                            reference: reference.to_string(),
                            line_offset: at(),
                        });
                        String::new()
                    }
                },
            };
            current.replace_range(range, &replacement);
        }

        Ok((count > 0).then_some(Resolution {
            text: current,
            misses,
        }))
    }

    /// Look up the display text of a field or menu reference.
    ///
    /// Every lookup failure is reported as not found; the cause is only
    /// visible with `--verbose`. Menu breadcrumbs come back with the
    /// configured separator between segments.
    pub fn lookup(&self, reference: &Reference<'_>) -> Option<String> {
        let locale = self.settings.locale.as_str();
        let result = match *reference {
            Reference::Field { model, field, text } => {
                self.source.lookup_field(model, field, text, locale)
            }
            Reference::Menu { module, menu, text } => self
                .source
                .lookup_menu(module, menu, text, locale)
                .map(|path| self.menu_path(&path)),
            Reference::Literal(raw) => return Some(raw.to_owned()),
        };

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("resolve"; "{reference}: {err}");
                None
            }
        }
    }

    /// Human-readable name of a model, `None` when it cannot be found.
    pub fn lookup_model(&self, model: &str) -> Option<String> {
        self.source
            .lookup_model(model, &self.settings.locale)
            .inspect_err(|err| debug!("resolve"; "model {model}: {err}"))
            .ok()
    }

    /// Replace the `/` between breadcrumb segments with the separator glyph.
    pub fn menu_path(&self, path: &str) -> String {
        path.replace('/', &self.settings.menu_separator)
    }
}
