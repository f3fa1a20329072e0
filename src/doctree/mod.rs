//! Owned tree of a rendered HTML page.
//!
//! The tree keeps the source text of every tag, so serializing an untouched
//! [`Document`] reproduces the page byte for byte. Text leaves hold raw
//! (still escaped) markup.
//!
//! ```ignore
//! let mut doc = Document::parse(&html)?;
//! doc.visit_texts_mut(|text, literal| {
//!     if !literal { text.set_raw(text.raw().replace("foo", "bar")); }
//!     Ok::<_, ()>(())
//! })?;
//! let html = doc.to_html();
//! ```

mod html;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HtmlError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Elements whose text is never rewritten.
const LITERAL_TAGS: &[&str] = &["pre", "code", "tt", "kbd", "samp", "textarea"];

/// Classes marking preformatted blocks and inline literals.
const LITERAL_CLASSES: &[&str] = &["highlight", "literal-block", "literal"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(Text),
    /// Markup kept verbatim: comments, doctype, `script`/`style` blocks,
    /// stray end tags and generated replacements.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    start: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    /// `None` for void, self-closing and implicitly closed elements.
    end: Option<String>,
    line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    raw: String,
    line: usize,
}

/// A parsed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn parse(source: &str) -> Result<Self, HtmlError> {
        html::parse(source).map(|nodes| Self { nodes })
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        html::write_nodes(&self.nodes, &mut out);
        out
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Offer every element to `replace`, outermost first. `Some(html)`
    /// swaps the element and its subtree for `html`; `None` descends into
    /// its children. Returns the number of replaced elements.
    pub fn replace_elements<E, F>(&mut self, mut replace: F) -> Result<usize, E>
    where
        F: FnMut(&Element) -> Result<Option<String>, E>,
    {
        let mut count = 0;
        replace_in(&mut self.nodes, &mut replace, &mut count)?;
        Ok(count)
    }

    /// Visit every text leaf mutably. The flag tells whether the leaf sits
    /// inside a literal region.
    pub fn visit_texts_mut<E, F>(&mut self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&mut Text, bool) -> Result<(), E>,
    {
        visit_in(&mut self.nodes, false, &mut visit)
    }
}

fn replace_in<E, F>(nodes: &mut [Node], replace: &mut F, count: &mut usize) -> Result<(), E>
where
    F: FnMut(&Element) -> Result<Option<String>, E>,
{
    for node in nodes.iter_mut() {
        let replacement = match node {
            Node::Element(element) => replace(element)?,
            _ => continue,
        };
        match replacement {
            Some(html) => {
                *node = Node::Raw(html);
                *count += 1;
            }
            None => {
                if let Node::Element(element) = node {
                    replace_in(&mut element.children, replace, count)?;
                }
            }
        }
    }
    Ok(())
}

fn visit_in<E, F>(nodes: &mut [Node], literal: bool, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&mut Text, bool) -> Result<(), E>,
{
    for node in nodes.iter_mut() {
        match node {
            Node::Text(text) => visit(text, literal)?,
            Node::Element(element) => {
                let literal = literal || element.is_literal();
                visit_in(&mut element.children, literal, visit)?;
            }
            Node::Raw(_) => {}
        }
    }
    Ok(())
}

impl Element {
    /// Lowercased tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source line of the start tag.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Unescaped attribute value; flag attributes have an empty value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    pub fn is_literal(&self) -> bool {
        LITERAL_TAGS.contains(&self.name.as_str())
            || self.classes().any(|class| LITERAL_CLASSES.contains(&class))
    }

    /// Unescaped concatenation of all descendant text.
    pub fn text_content(&self) -> String {
        fn collect(nodes: &[Node], out: &mut String) {
            for node in nodes {
                match node {
                    Node::Text(text) => out.push_str(&text.unescaped()),
                    Node::Element(element) => collect(&element.children, out),
                    Node::Raw(_) => {}
                }
            }
        }
        let mut out = String::new();
        collect(&self.children, &mut out);
        out
    }
}

impl Text {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn set_raw(&mut self, raw: String) {
        self.raw = raw;
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn unescaped(&self) -> Cow<'_, str> {
        unescape(&self.raw)
    }
}

/// Resolve character and HTML5 entity references; unknown ones are kept.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    unescape_with(raw, resolve_html5_entity).unwrap_or(Cow::Borrowed(raw))
}

/// Escape text for use in element content or a quoted attribute.
pub fn escape(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="es">
  <head>
    <meta charset="utf-8" />
    <link rel="stylesheet" href="_static/basic.css">
    <script>if (a < b && c) { document.write("<p>"); }</script>
  </head>
  <body>
    <!-- generated -->
    <p>Campo&nbsp;@field:res.partner/name@ &amp; más</p>
    <pre>@field:res.partner/name@</pre>
    <div class="highlight-python notranslate"><div class="highlight"><span>@x@</span></div></div>
    <p>Code <code class="docutils literal"><span class="pre">@x@</span></code> done<br>next</p>
    <input type=checkbox checked disabled>
  </body>
</html>
"#;

    fn texts(doc: &mut Document) -> Vec<(String, bool, usize)> {
        let mut out = Vec::new();
        doc.visit_texts_mut(|text, literal| {
            if !text.raw().trim().is_empty() {
                out.push((text.raw().to_owned(), literal, text.line()));
            }
            Ok::<_, ()>(())
        })
        .unwrap();
        out
    }

    #[test]
    fn test_untouched_page_is_byte_identical() {
        let doc = Document::parse(PAGE).unwrap();
        assert_eq!(doc.to_html(), PAGE);
    }

    #[test]
    fn test_text_nodes_and_literal_regions() {
        let mut doc = Document::parse(PAGE).unwrap();
        let texts = texts(&mut doc);

        let (raw, literal, line) = &texts[0];
        assert_eq!(raw, "Campo&nbsp;@field:res.partner/name@ &amp; más");
        assert!(!literal);
        assert_eq!(*line, 10);

        let literal: Vec<_> = texts.iter().filter(|(_, lit, _)| *lit).map(|(raw, ..)| raw.as_str()).collect();
        assert_eq!(literal, ["@field:res.partner/name@", "@x@", "@x@"]);

        // script bodies never show up as text
        assert!(texts.iter().all(|(raw, ..)| !raw.contains("document.write")));
    }

    #[test]
    fn test_text_rewrite() {
        let mut doc = Document::parse("<p>a @x@ b</p><pre>@x@</pre>").unwrap();
        doc.visit_texts_mut(|text, literal| {
            if !literal {
                let raw = text.raw().replace("@x@", "X");
                text.set_raw(raw);
            }
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(doc.to_html(), "<p>a X b</p><pre>@x@</pre>");
    }

    #[test]
    fn test_replace_elements() {
        let source = r#"<p>See <odoo-field help class="big">res.partner/name</odoo-field>.</p>"#;
        let mut doc = Document::parse(source).unwrap();
        let mut seen = Vec::new();
        let count = doc
            .replace_elements(|element| {
                if element.name() != "odoo-field" {
                    return Ok::<_, ()>(None);
                }
                seen.push((
                    element.text_content(),
                    element.has_attr("help"),
                    element.attr("class").map(str::to_owned),
                ));
                Ok(Some("<code>Name</code>".to_owned()))
            })
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(seen, [("res.partner/name".to_owned(), true, Some("big".to_owned()))]);
        assert_eq!(doc.to_html(), "<p>See <code>Name</code>.</p>");
    }

    #[test]
    fn test_flag_and_unquoted_attributes() {
        let doc = Document::parse("<input type=checkbox checked>").unwrap();
        let Node::Element(input) = &doc.nodes()[0] else {
            panic!("expected an element");
        };
        assert_eq!(input.attr("type"), Some("checkbox"));
        assert_eq!(input.attr("checked"), Some(""));
        assert!(input.children().is_empty());
    }

    #[test]
    fn test_unbalanced_end_tags_preserved() {
        let source = "<div><p>one<p>two</div></span>tail";
        let doc = Document::parse(source).unwrap();
        assert_eq!(doc.to_html(), source);
        assert!(matches!(doc.nodes().last(), Some(Node::Text(_))));
    }

    #[test]
    fn test_unterminated_script_kept_raw() {
        let source = "<p>x</p><script>var a = '<b>'";
        let doc = Document::parse(source).unwrap();
        assert_eq!(doc.to_html(), source);
        assert!(matches!(doc.nodes().last(), Some(Node::Raw(raw)) if raw.starts_with("<script>")));
    }

    #[test]
    fn test_uppercase_tags() {
        let source = "<DIV CLASS=\"highlight\"><P>@x@</P></DIV><STYLE>p > a {}</STYLE>";
        let mut doc = Document::parse(source).unwrap();
        assert_eq!(doc.to_html(), source);
        assert_eq!(texts(&mut doc), [("@x@".to_owned(), true, 1)]);
    }

    #[test]
    fn test_unescape_and_escape() {
        assert_eq!(unescape("a &amp; b&nbsp;c &#233;"), "a & b\u{a0}c é");
        assert_eq!(unescape("&bogus; stays"), "&bogus; stays");
        assert_eq!(escape("R&D <x>"), "R&amp;D &lt;x&gt;");
    }
}
