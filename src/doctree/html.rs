//! Lenient HTML reader building the [`Node`](super::Node) tree.
//!
//! quick-xml does the tokenizing; the raw byte span of each event is cut out
//! of the source so nothing is re-encoded. `script` and `style` bodies are
//! skipped by scanning for their end tag, since they are not markup.

use super::{Element, HtmlError, Node, Text, unescape};
use quick_xml::{Reader, events::BytesStart, events::Event};

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn create_reader(content: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);
    // each segment starts with an empty stack, and pages are not XML
    reader.config_mut().allow_unmatched_ends = true;
    reader.config_mut().allow_dangling_amp = true;
    reader
}

pub(super) fn parse(source: &str) -> Result<Vec<Node>, HtmlError> {
    let lines = LineIndex::new(source);
    let mut tree = TreeBuilder::default();
    // start of the next unconsumed byte
    let mut cursor = 0;

    'segments: while cursor < source.len() {
        let offset = cursor;
        let mut reader = create_reader(&source[offset..]);

        loop {
            let event = reader.read_event().map_err(|err| HtmlError::Syntax {
                line: lines.line(offset + reader.error_position() as usize),
                message: err.to_string(),
            })?;
            let mut end = offset + reader.buffer_position() as usize;
            let start = cursor;
            let line = lines.line(start);

            match event {
                Event::Eof => break 'segments,
                Event::Start(tag) => {
                    let name = tag_name(&tag);
                    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                        let close = find_close_tag(source, end, &name);
                        tree.push(Node::Raw(source[start..close].to_owned()));
                        cursor = close;
                        continue 'segments;
                    }
                    let element = Element {
                        attrs: attributes(&tag),
                        start: source[start..end].to_owned(),
                        children: Vec::new(),
                        end: None,
                        line,
                        name,
                    };
                    if VOID_ELEMENTS.contains(&element.name.as_str()) {
                        tree.push(Node::Element(element));
                    } else {
                        tree.open(element);
                    }
                }
                Event::Empty(tag) => tree.push(Node::Element(Element {
                    name: tag_name(&tag),
                    attrs: attributes(&tag),
                    start: source[start..end].to_owned(),
                    children: Vec::new(),
                    end: None,
                    line,
                })),
                Event::End(tag) => {
                    let name = String::from_utf8_lossy(tag.name().as_ref()).to_ascii_lowercase();
                    tree.close(&name, &source[start..end]);
                }
                Event::Comment(_)
                | Event::CData(_)
                | Event::Decl(_)
                | Event::PI(_)
                | Event::DocType(_) => tree.push(Node::Raw(source[start..end].to_owned())),
                // text and entity references
                _ => {
                    // the reader may already have consumed the `<` of the next tag
                    if source[start..end].ends_with('<') {
                        end -= 1;
                    }
                    tree.text(&source[start..end], line);
                }
            }
            cursor = end;
        }
    }

    // bytes the reader left behind (a dangling `<`)
    if cursor < source.len() {
        tree.text(&source[cursor..], lines.line(cursor));
    }

    Ok(tree.finish())
}

pub(super) fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(element) => {
                out.push_str(&element.start);
                write_nodes(&element.children, out);
                if let Some(end) = &element.end {
                    out.push_str(end);
                }
            }
            Node::Text(text) => out.push_str(&text.raw),
            Node::Raw(raw) => out.push_str(raw),
        }
    }
}

fn tag_name(tag: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).to_ascii_lowercase()
}

fn attributes(tag: &BytesStart<'_>) -> Vec<(String, String)> {
    tag.html_attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = String::from_utf8_lossy(&attr.value);
            (key, unescape(&value).into_owned())
        })
        .collect()
}

/// Offset just past the `</name>` closing a raw text element, or the end of
/// the source when it is never closed.
fn find_close_tag(source: &str, from: usize, name: &str) -> usize {
    // ASCII lowercasing keeps byte offsets
    let haystack = source[from..].to_ascii_lowercase();
    let needle = format!("</{name}");
    let mut search = 0;

    while let Some(found) = haystack[search..].find(&needle) {
        let after = search + found + needle.len();
        match haystack.as_bytes().get(after) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' => {
                return haystack[after..]
                    .find('>')
                    .map_or(source.len(), |gt| from + after + gt + 1);
            }
            Some(_) => search = after,
            None => break,
        }
    }
    source.len()
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn children(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(element) => &mut element.children,
            None => &mut self.root,
        }
    }

    fn push(&mut self, node: Node) {
        self.children().push(node);
    }

    fn text(&mut self, raw: &str, line: usize) {
        if raw.is_empty() {
            return;
        }
        let children = self.children();
        if let Some(Node::Text(text)) = children.last_mut() {
            text.raw.push_str(raw);
        } else {
            children.push(Node::Text(Text {
                raw: raw.to_owned(),
                line,
            }));
        }
    }

    fn open(&mut self, element: Element) {
        self.open.push(element);
    }

    /// Close the innermost open `name`, implicitly closing everything
    /// opened after it. An end tag with no open element stays as raw text.
    fn close(&mut self, name: &str, raw: &str) {
        let Some(index) = self.open.iter().rposition(|element| element.name == name) else {
            self.push(Node::Raw(raw.to_owned()));
            return;
        };
        while self.open.len() > index + 1 {
            self.pop();
        }
        if let Some(mut element) = self.open.pop() {
            element.end = Some(raw.to_owned());
            self.push(Node::Element(element));
        }
    }

    fn pop(&mut self) {
        if let Some(element) = self.open.pop() {
            self.push(Node::Element(element));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.open.is_empty() {
            self.pop();
        }
        self.root
    }
}

/// Maps byte offsets to 1-based line numbers.
struct LineIndex(Vec<usize>);

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self(starts)
    }

    fn line(&self, offset: usize) -> usize {
        self.0.partition_point(|&start| start <= offset)
    }
}
