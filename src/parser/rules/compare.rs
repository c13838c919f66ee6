use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::escape;
use crate::parser::html;
use crate::parser::markers::{Block, Node};
use crate::parser::markup::{self, BlockAttrs};

const COMPARE_CLASS: &str = "slgb-compare-converted";
const COLUMN_CLASS: &str = "slgb-compare-column";

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<h[1-6][^>]*>(.*?)</h[1-6]\s*>").unwrap());

/// `p-compare` → `wp:columns`, one `wp:column` per nested compare column.
pub fn convert(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    let children = block.children.as_ref()?;
    let mut columns = Vec::new();
    for node in children {
        match node {
            Node::Block(b) if b.name == "p-compare-column" => columns.push(column(b)),
            Node::Text(t) if t.trim().is_empty() => {}
            _ => {
                debug!("compare block has content outside its columns");
                return None;
            }
        }
    }
    if columns.is_empty() {
        return None;
    }

    let attrs = Attrs::parse(block.attrs);
    let class = markup::resolve_class(attrs.class_name(), COMPARE_CLASS);
    Some(markup::wrap(
        "columns",
        &BlockAttrs::new().set("className", class.as_str()),
        &format!(
            "<div class=\"{}\">\n{}\n</div>",
            escape::attr(&markup::classes(["wp-block-columns", class.as_str()])),
            columns.join("\n")
        ),
    ))
}

fn column(block: &Block<'_>) -> String {
    let attrs = Attrs::parse(block.attrs);
    let class = markup::resolve_class(attrs.class_name(), COLUMN_CLASS);
    let rendered = html::div_with_class(block.inner(), "gb-compare__column");

    // (whole heading element, its text)
    let heading = rendered
        .and_then(|r| HEADING_RE.captures(r))
        .and_then(|caps| Some((caps.get(0)?.as_str(), present(Some(caps[1].to_string()))?)));
    let title = present(attrs.html("title")).or_else(|| heading.as_ref().map(|(_, text)| text.clone()));

    let body = match rendered.and_then(|r| html::div_with_class(r, "gb-compare__content")) {
        Some(content) => content.trim().to_string(),
        None => {
            let inner = block.inner();
            match heading {
                // the heading already became the column title
                Some((element, text)) if title.as_deref() == Some(text.as_str()) => {
                    inner.replacen(element, "", 1).trim().to_string()
                }
                _ => inner.trim().to_string(),
            }
        }
    };

    let mut parts = Vec::new();
    if let Some(title) = title {
        parts.push(markup::heading(4, &title, BlockAttrs::new(), None, None));
    }
    if !body.is_empty() {
        if body.starts_with("<!-- wp:") {
            parts.push(body);
        } else {
            parts.push(markup::html_block(&body));
        }
    }

    markup::wrap(
        "column",
        &BlockAttrs::new().set("className", class.as_str()),
        &format!(
            "<div class=\"{}\">\n{}\n</div>",
            escape::attr(&markup::classes(["wp-block-column", class.as_str()])),
            parts.join("\n")
        ),
    )
}
