//! Blocks that become a paragraph or a group of core blocks.

use serde_json::json;
use tracing::debug;

use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::escape;
use crate::parser::html;
use crate::parser::markers::Block;
use crate::parser::markup::{self, BlockAttrs, Button, ButtonStyle};

const EMPH_CLASS: &str = "slgb-emph";
const SUBSCRIBE_CLASS: &str = "slgb-subscribe-converted";
const CTA_CLASS: &str = "slgb-cta-converted";
const GB_EMPH_CLASS: &str = "slgb-gb-emph-converted";

/// `emph` → paragraph with a bold lead-in.
pub fn emph(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if !block.is_self_closing() {
        return None;
    }
    let attrs = Attrs::parse(block.attrs);
    let title = present(attrs.html("title"));
    let text = present(attrs.html("text"));
    let html = match (title, text) {
        (Some(title), Some(text)) => format!("<strong>{}</strong> {}", title, text),
        (Some(title), None) => format!("<strong>{}</strong>", title),
        (None, Some(text)) => text,
        (None, None) => return None,
    };
    let class = markup::resolve_class(attrs.class_name(), EMPH_CLASS);
    Some(markup::paragraph(
        &html,
        BlockAttrs::new().set("className", class.as_str()),
        &class,
    ))
}

/// `gb-subscribe` → group with a centered lead paragraph and one button.
pub fn subscribe(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if !block.is_self_closing() {
        return None;
    }
    let attrs = Attrs::parse(block.attrs);
    let class = markup::resolve_class(attrs.class_name(), SUBSCRIBE_CLASS);

    let mut parts = Vec::new();
    if let Some(title) = present(attrs.html("title")) {
        parts.push(markup::wrap(
            "paragraph",
            &BlockAttrs::new()
                .set("align", "center")
                .set("style", json!({"typography": {"fontWeight": "500"}})),
            &format!(
                "<p class=\"has-text-align-center\" style=\"font-weight:500\">{}</p>",
                title
            ),
        ));
    }
    if let Some(text) = present(attrs.html("text")) {
        parts.push(centered_paragraph(&text));
    }
    let label = present(attrs.text("btn_text")).unwrap_or_else(|| "Subscribe".to_string());
    parts.push(markup::buttons(
        &[Button {
            label: escape::text(&label).into_owned(),
            href: present(attrs.text("btn_link")),
            new_tab: attrs.flag("btn_blank"),
            style: ButtonStyle::Fill,
        }],
        Some("center"),
        None,
    ));

    Some(markup::group(&class, &parts.join("\n\n")))
}

/// `gb-cta` / `cta` → group with heading, description and up to two buttons.
pub fn cta(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if !block.is_self_closing() {
        return None;
    }
    let attrs = Attrs::parse(block.attrs);
    let class = markup::resolve_class(attrs.class_name(), CTA_CLASS);

    let mut parts = Vec::new();
    if let Some(title) = present(attrs.html("title")) {
        parts.push(markup::heading(
            2,
            &title,
            BlockAttrs::new().set("textAlign", "center"),
            Some("has-text-align-center"),
            None,
        ));
    }
    if let Some(description) = present(attrs.html("description")) {
        parts.push(centered_paragraph(&description));
    }

    let primary_label = present(attrs.text("btn_text")).unwrap_or_else(|| "Learn More".to_string());
    let mut buttons = vec![Button {
        label: escape::text(&primary_label).into_owned(),
        href: Some(present(attrs.text("btn_link")).unwrap_or_else(|| "#".to_string())),
        new_tab: attrs.flag("btn_blank"),
        style: ButtonStyle::Fill,
    }];
    if let Some(label) = present(attrs.text("btn2_text")) {
        buttons.push(Button {
            label: escape::text(&label).into_owned(),
            href: present(attrs.text("btn2_link")),
            new_tab: attrs.flag("btn2_blank"),
            style: ButtonStyle::Outline,
        });
    }
    parts.push(markup::buttons(&buttons, Some("center"), None));

    Some(markup::group(&class, &parts.join("\n\n")))
}

/// `gb-emph` → group around the content of its `gb-emph` div.
pub fn gb_emph(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if block.is_self_closing() {
        return None;
    }
    let Some((before, content, after)) = html::split_div_with_class(block.inner(), "gb-emph") else {
        debug!("gb-emph without its content div");
        return None;
    };
    if !before.trim().is_empty() || !after.trim().is_empty() {
        debug!("gb-emph with content outside its div");
        return None;
    }
    let attrs = Attrs::parse(block.attrs);
    let class = markup::resolve_class(attrs.class_name(), GB_EMPH_CLASS);
    Some(markup::group(&class, content.trim()))
}

fn centered_paragraph(html: &str) -> String {
    markup::paragraph(
        html,
        BlockAttrs::new().set("align", "center"),
        "has-text-align-center",
    )
}
