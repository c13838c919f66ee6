use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::html;
use crate::parser::markers::Block;
use crate::parser::markup::{self, Button, ButtonStyle};

static DIV_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)</?div\b[^>]*>").unwrap());

const JUSTIFY: &[&str] = &["left", "center", "right", "space-between"];

/// `p-btns` → `wp:buttons`, one button per anchor in the rendered content.
/// Anchors without an href become label-only buttons. Anything besides
/// anchors and wrapper divs keeps the block as it is.
pub fn convert(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if block.is_self_closing() {
        return None;
    }
    let inner = block.inner();
    let rest = html::without_elements(inner, "a");
    if !DIV_TAG_RE.replace_all(&rest, "").trim().is_empty() {
        debug!("p-btns with content besides its anchors");
        return None;
    }
    let items: Vec<Button> = html::elements(inner, "a")
        .into_iter()
        .filter_map(|(tag, label)| {
            let href = present(html::attr(tag, "href"));
            if href.is_none() && label.trim().is_empty() {
                return None;
            }
            let outline = html::has_class(tag, "outline") || html::has_class(tag, "secondary");
            Some(Button {
                label: label.trim().to_string(),
                href,
                new_tab: html::attr(tag, "target").as_deref() == Some("_blank"),
                style: if outline {
                    ButtonStyle::Outline
                } else {
                    ButtonStyle::Fill
                },
            })
        })
        .collect();
    if items.iter().all(|b| b.href.is_none()) {
        return None;
    }

    let attrs = Attrs::parse(block.attrs);
    let justify = attrs
        .text("align")
        .map(|a| a.trim().to_ascii_lowercase())
        .filter(|a| JUSTIFY.contains(&a.as_str()));
    let class = attrs.class_name();
    Some(markup::buttons(&items, justify.as_deref(), class.as_deref()))
}
