//! Locates custom block spans in serialized post content.
//!
//! Markers of the configured namespace are tokenized with one regex, then
//! folded into a tree by recursive descent. An opener pairs with the first
//! closer of the same name at the same depth; anything that does not pair
//! stays literal text, so unrelated content is never touched.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Open,
    SelfClosing,
    Close,
}

#[derive(Debug, Clone, Copy)]
struct Marker<'a> {
    kind: MarkerKind,
    name: &'a str,
    attrs: &'a str,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
pub enum Node<'a> {
    Text(&'a str),
    Block(Block<'a>),
}

/// One located block occurrence.
#[derive(Debug, Clone)]
pub struct Block<'a> {
    /// Type name without namespace (`h3`, `p-compare`).
    pub name: &'a str,
    /// Raw attribute payload, possibly empty.
    pub attrs: &'a str,
    /// `None` for self-closing blocks.
    pub children: Option<Vec<Node<'a>>>,
    /// Exact source text of the whole occurrence.
    pub raw: &'a str,
    open: &'a str,
    close: &'a str,
    inner: &'a str,
}

impl<'a> Block<'a> {
    pub fn is_self_closing(&self) -> bool {
        self.children.is_none()
    }

    /// Raw content between the open and close markers.
    pub fn inner(&self) -> &'a str {
        self.inner
    }

    pub fn open_marker(&self) -> &'a str {
        self.open
    }

    pub fn close_marker(&self) -> &'a str {
        self.close
    }

    /// Level suffix of the heading family (`h1`..`h6`).
    pub fn heading_level(&self) -> Option<u8> {
        let digit = self.name.strip_prefix('h')?;
        match digit.parse::<u8>() {
            Ok(level @ 1..=6) if digit.len() == 1 => Some(level),
            _ => None,
        }
    }

    /// Direct child blocks named `name`, in source order.
    pub fn child_blocks(&self, name: &str) -> Vec<&Block<'a>> {
        self.children
            .iter()
            .flatten()
            .filter_map(|n| match n {
                Node::Block(b) if b.name == name => Some(b),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Scanner {
    namespace: String,
    marker_re: Regex,
}

impl Scanner {
    pub fn new(namespace: &str) -> Self {
        let pattern = format!(
            r"(?s)<!--\s*(/)?wp:{}/([a-z][a-z0-9_-]*)(?:\s+(.*?))?\s*(/)?-->",
            regex::escape(namespace)
        );
        Scanner {
            namespace: namespace.to_string(),
            // namespace is escaped, the pattern is always valid
            marker_re: Regex::new(&pattern).unwrap(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Cheap pre-check before building a tree.
    pub fn has_markers(&self, text: &str) -> bool {
        text.contains(&format!("wp:{}/", self.namespace))
    }

    pub fn parse<'a>(&self, text: &'a str) -> Vec<Node<'a>> {
        let markers = self.tokenize(text);
        build(text, &markers, 0, markers.len(), 0, text.len())
    }

    /// Every located occurrence, outermost first, left to right.
    pub fn occurrences<'a>(&self, text: &'a str) -> impl Iterator<Item = Block<'a>> {
        let mut stack: Vec<Node<'a>> = self.parse(text);
        stack.reverse();
        std::iter::from_fn(move || loop {
            match stack.pop()? {
                Node::Text(_) => continue,
                Node::Block(block) => {
                    if let Some(children) = &block.children {
                        stack.extend(children.iter().rev().cloned());
                    }
                    return Some(block);
                }
            }
        })
    }

    fn tokenize<'a>(&self, text: &'a str) -> Vec<Marker<'a>> {
        self.marker_re
            .captures_iter(text)
            .map(|caps| {
                let whole = caps.get(0).unwrap();
                let kind = if caps.get(1).is_some() {
                    MarkerKind::Close
                } else if caps.get(4).is_some() {
                    MarkerKind::SelfClosing
                } else {
                    MarkerKind::Open
                };
                Marker {
                    kind,
                    name: caps.get(2).map_or("", |m| m.as_str()),
                    attrs: caps.get(3).map_or("", |m| m.as_str().trim()),
                    start: whole.start(),
                    end: whole.end(),
                }
            })
            .collect()
    }
}

/// Build nodes for `text[from..to]` using `markers[lo..hi]`.
fn build<'a>(
    text: &'a str,
    markers: &[Marker<'a>],
    lo: usize,
    hi: usize,
    from: usize,
    to: usize,
) -> Vec<Node<'a>> {
    let mut nodes = Vec::new();
    let mut cursor = from;
    let mut i = lo;

    while i < hi {
        let m = markers[i];
        match m.kind {
            MarkerKind::SelfClosing => {
                push_text(&mut nodes, &text[cursor..m.start]);
                nodes.push(Node::Block(Block {
                    name: m.name,
                    attrs: m.attrs,
                    children: None,
                    raw: &text[m.start..m.end],
                    open: &text[m.start..m.end],
                    close: "",
                    inner: "",
                }));
                cursor = m.end;
                i += 1;
            }
            MarkerKind::Open => match find_close(markers, i, hi) {
                Some(j) => {
                    let close = markers[j];
                    push_text(&mut nodes, &text[cursor..m.start]);
                    let children = build(text, markers, i + 1, j, m.end, close.start);
                    nodes.push(Node::Block(Block {
                        name: m.name,
                        attrs: m.attrs,
                        children: Some(children),
                        raw: &text[m.start..close.end],
                        open: &text[m.start..m.end],
                        close: &text[close.start..close.end],
                        inner: &text[m.end..close.start],
                    }));
                    cursor = close.end;
                    i = j + 1;
                }
                // unpaired opener stays in the surrounding text
                None => i += 1,
            },
            MarkerKind::Close => i += 1,
        }
    }

    push_text(&mut nodes, &text[cursor..to]);
    nodes
}

fn find_close(markers: &[Marker<'_>], open: usize, hi: usize) -> Option<usize> {
    let name = markers[open].name;
    let mut depth = 0usize;
    for (j, m) in markers.iter().enumerate().take(hi).skip(open + 1) {
        if m.name != name {
            continue;
        }
        match m.kind {
            MarkerKind::Open => depth += 1,
            MarkerKind::Close if depth == 0 => return Some(j),
            MarkerKind::Close => depth -= 1,
            MarkerKind::SelfClosing => {}
        }
    }
    None
}

fn push_text<'a>(nodes: &mut Vec<Node<'a>>, s: &'a str) {
    if !s.is_empty() {
        nodes.push(Node::Text(s));
    }
}

/// Reassemble nodes into text; used to check that parsing is lossless.
#[cfg(test)]
pub fn render(nodes: &[Node<'_>]) -> String {
    nodes
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.to_string(),
            Node::Block(b) => match &b.children {
                None => b.raw.to_string(),
                Some(children) => format!("{}{}{}", b.open, render(children), b.close),
            },
        })
        .collect()
}
