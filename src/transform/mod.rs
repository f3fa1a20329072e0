//! Reference resolution over rendered pages.
//!
//! Each page goes through two passes:
//!
//! 1. **Inline markup**: every `<odoo-*>` element is replaced by its
//!    rendered HTML, or removed with a warning when it resolves to nothing.
//! 2. **Whole document** (`[reference] plaintext`): references in every text
//!    node outside literal regions are resolved and spliced in place.
//!
//! A malformed reference is an error: the page is left as it was and the
//! run fails once every page has been reported.
//!
//! The pass runs on the generator's HTML output, after the search index has
//! been written. Search therefore matches the raw reference tokens, not the
//! resolved labels.

mod inline;

pub use inline::{Inline, render};

use crate::config::DocConfig;
use crate::doctree::{Document, escape};
use crate::metadata::MetadataSource;
use crate::reference::{Resolver, ResolverSettings};
use crate::utils::fs::collect_files;
use crate::utils::log::ProgressBars;
use crate::{debug, log};
use anyhow::{Context, Result, bail};
use std::{
    convert::Infallible,
    fmt, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found on a page, anchored at its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.message)
    }
}

impl Diagnostic {
    fn new(path: &Path, line: usize, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            line,
            severity,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn report(&self) {
        match self.severity {
            Severity::Warning => log!("warn"; "{}", self),
            Severity::Error => log!("error"; "{}", self),
        }
    }
}

/// Result of transforming one page.
#[derive(Debug, Default)]
pub struct PageOutcome {
    /// New content, `None` when the page must be left as it is.
    pub html: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PageOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Run both passes on the page `source` read from `path`.
pub fn transform_page(path: &Path, source: &str, resolver: &Resolver<'_>) -> PageOutcome {
    let mut outcome = PageOutcome::default();
    let diagnostics = &mut outcome.diagnostics;

    let mut doc = match Document::parse(source) {
        Ok(doc) => doc,
        Err(crate::doctree::HtmlError::Syntax { line, message }) => {
            diagnostics.push(Diagnostic::new(path, line, Severity::Error, message));
            return outcome;
        }
    };

    let Ok(replaced) = doc.replace_elements(|element| -> Result<_, Infallible> {
        match render(element, resolver) {
            Ok(None) => Ok(None),
            Ok(Some(Inline::Html(html))) => Ok(Some(html)),
            Ok(Some(Inline::Missing(message))) => {
                diagnostics.push(Diagnostic::new(path, element.line(), Severity::Warning, message));
                Ok(Some(String::new()))
            }
            Err(err) => {
                diagnostics.push(Diagnostic::new(
                    path,
                    element.line(),
                    Severity::Error,
                    err.to_string(),
                ));
                Ok(None)
            }
        }
    });

    let mut rewritten = 0;
    if resolver.settings().plaintext {
        let Ok(()) = doc.visit_texts_mut(|text, literal| -> Result<(), Infallible> {
            if literal {
                return Ok(());
            }
            match resolver.resolve_with(text.raw(), |value| escape(value)) {
                Ok(None) => {}
                Ok(Some(resolution)) => {
                    for miss in &resolution.misses {
                        diagnostics.push(Diagnostic::new(
                            path,
                            text.line() + miss.line_offset,
                            Severity::Warning,
                            format!("Reference \"{}\" not found.", miss.reference),
                        ));
                    }
                    rewritten += 1;
                    text.set_raw(resolution.text);
                }
                Err(err) => diagnostics.push(Diagnostic::new(
                    path,
                    text.line() + err.line_offset,
                    Severity::Error,
                    err.to_string(),
                )),
            }
            Ok(())
        });
    }

    if !outcome.has_errors() && replaced + rewritten > 0 {
        outcome.html = Some(doc.to_html());
    }
    outcome
}

/// Totals of a directory run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub pages: usize,
    pub rewritten: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Transform every `.html` page under `dir` in place, printing diagnostics
/// after the progress bar finishes.
pub fn transform_dir(dir: &Path, resolver: &Resolver<'_>) -> Result<Summary> {
    let pages = collect_files(dir, "html");
    let progress = ProgressBars::new(&[("pages", pages.len())]);
    let mut summary = Summary {
        pages: pages.len(),
        ..Summary::default()
    };
    let mut diagnostics = Vec::new();

    for page in &pages {
        let source = fs::read_to_string(page)
            .with_context(|| format!("Failed to read {}", page.display()))?;
        let display = page.strip_prefix(dir).unwrap_or(page);
        let outcome = transform_page(display, &source, resolver);

        if let Some(html) = &outcome.html {
            fs::write(page, html).with_context(|| format!("Failed to write {}", page.display()))?;
            summary.rewritten += 1;
            debug!("transform"; "rewrote {}", display.display());
        }
        diagnostics.extend(outcome.diagnostics);
        progress.inc(0);
    }
    progress.finish();

    for diagnostic in &diagnostics {
        diagnostic.report();
        match diagnostic.severity {
            Severity::Warning => summary.warnings += 1,
            Severity::Error => summary.errors += 1,
        }
    }

    log!(
        "transform";
        "{} pages, {} rewritten, {} warnings, {} errors",
        summary.pages, summary.rewritten, summary.warnings, summary.errors
    );
    Ok(summary)
}

/// Transform the rendered pages in `dir`, failing when any page has errors.
pub fn run(dir: &Path, source: &dyn MetadataSource, config: &DocConfig) -> Result<()> {
    if !dir.is_dir() {
        bail!("Rendered documentation not found: {}", dir.display());
    }
    let settings = ResolverSettings::from_config(config)?;
    let summary = transform_dir(dir, &Resolver::new(source, &settings))?;
    if summary.pages == 0 {
        log!("warn"; "no .html pages under {}, nothing was resolved", dir.display());
    }
    if summary.errors > 0 {
        bail!("{} malformed references left pages untransformed", summary.errors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::stub::StubSource;
    use tempfile::TempDir;

    fn source() -> StubSource {
        StubSource::new()
            .field("res.partner", "name", "Name & Surname", None)
            .menu("sale", "menu_quotations", "Sales/Quotations")
    }

    fn settings(plaintext: bool) -> ResolverSettings {
        let mut config = DocConfig::default();
        config.reference.plaintext = plaintext;
        ResolverSettings::from_config(&config).unwrap()
    }

    fn transform(page: &str, plaintext: bool) -> PageOutcome {
        let source = source();
        let settings = settings(plaintext);
        transform_page(Path::new("index.html"), page, &Resolver::new(&source, &settings))
    }

    #[test]
    fn test_page_without_references_left_alone() {
        let outcome = transform("<html><body><p>plain</p></body></html>", true);
        assert_eq!(outcome.html, None);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_document_pass_escapes_values() {
        let outcome = transform("<p>Field @field:res.partner/name@.</p>", true);
        assert_eq!(outcome.html.as_deref(), Some("<p>Field Name &amp; Surname.</p>"));
    }

    #[test]
    fn test_document_pass_skips_literals() {
        let page = "<p>@menu:sale/menu_quotations@</p>\n<pre>@menu:sale/menu_quotations@</pre>";
        let outcome = transform(page, true);
        assert_eq!(
            outcome.html.as_deref(),
            Some("<p>Sales ‣ Quotations</p>\n<pre>@menu:sale/menu_quotations@</pre>")
        );
    }

    #[test]
    fn test_document_pass_disabled() {
        let outcome = transform("<p>@field:res.partner/name@</p>", false);
        assert_eq!(outcome.html, None);
    }

    #[test]
    fn test_inline_markup_runs_without_plaintext() {
        let outcome = transform("<p><odoo-field>res.partner/name</odoo-field></p>", false);
        assert_eq!(
            outcome.html.as_deref(),
            Some(r#"<p><code class="odoodocfield">Name &amp; Surname</code></p>"#)
        );
    }

    #[test]
    fn test_missing_references_warn() {
        let page = "<p>\n<odoo-menu>sale/nope</odoo-menu>\n@field:res.partner/vat@ x</p>";
        let outcome = transform(page, true);
        assert_eq!(outcome.html.as_deref(), Some("<p>\n\n x</p>"));

        let messages: Vec<_> = outcome.diagnostics.iter().map(|d| (d.line, d.severity, d.message.as_str())).collect();
        assert_eq!(
            messages,
            [
                (2, Severity::Warning, "Menu entry \"sale/nope\" not found."),
                (3, Severity::Warning, "Reference \"field:res.partner/vat\" not found."),
            ]
        );
    }

    #[test]
    fn test_document_pass_lines_point_at_reference() {
        let page = "<p>line one\nline two\nline three @field:res.partner/nope@</p>\n<p>\n\n@menu:sale@</p>";
        let outcome = transform(page, true);
        let lines: Vec<_> = outcome.diagnostics.iter().map(|d| (d.line, d.severity)).collect();
        assert_eq!(lines, [(3, Severity::Warning), (6, Severity::Error)]);
    }

    #[test]
    fn test_malformed_reference_keeps_page() {
        let outcome = transform("<p>@field:res.partner@ and @field:res.partner/name@</p>", true);
        assert!(outcome.has_errors());
        assert_eq!(outcome.html, None);
        assert_eq!(outcome.diagnostics[0].to_string(), "index.html:1: malformed reference `field:res.partner`: expected exactly one `/` between the two names");
    }

    #[test]
    fn test_transform_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sale")).unwrap();
        fs::write(dir.path().join("index.html"), "<p>@field:res.partner/name@</p>").unwrap();
        fs::write(dir.path().join("sale/quotations.html"), "<p>@field:res.partner@</p>").unwrap();
        fs::write(dir.path().join("plain.html"), "<p>nothing</p>").unwrap();
        fs::write(dir.path().join("notes.txt"), "@field:res.partner/name@").unwrap();

        let source = source();
        let settings = settings(true);
        let summary = transform_dir(dir.path(), &Resolver::new(&source, &settings)).unwrap();

        assert_eq!(
            summary,
            Summary {
                pages: 3,
                rewritten: 1,
                warnings: 0,
                errors: 1
            }
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("index.html")).unwrap(),
            "<p>Name &amp; Surname</p>"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("sale/quotations.html")).unwrap(),
            "<p>@field:res.partner@</p>"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
            "@field:res.partner/name@"
        );
    }

    #[test]
    fn test_run_fails_on_errors() {
        let dir = TempDir::new().unwrap();
        let source = source();
        let config = DocConfig::default();
        assert!(run(&dir.path().join("missing"), &source, &config).is_err());

        fs::write(dir.path().join("index.html"), "<p>@field:res.partner/name@</p>").unwrap();
        run(dir.path(), &source, &config).unwrap();

        fs::write(dir.path().join("broken.html"), "<p><odoo-field>res.partner</odoo-field></p>").unwrap();
        let err = run(dir.path(), &source, &config).unwrap_err();
        assert!(err.to_string().contains("1 malformed"));
    }
}
