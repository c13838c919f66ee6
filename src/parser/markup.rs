//! Core block output: comment delimiters with serialized attributes, and the
//! HTML of the handful of core blocks the rules synthesize.

use std::fmt::Write;

use itertools::Itertools;
use serde_json::{Map, Value};

use super::escape;

/// Attribute object under construction, insertion-ordered.
#[derive(Debug, Default, Clone)]
pub struct BlockAttrs(Map<String, Value>);

impl BlockAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comment-safe JSON, escaped the way the editor serializes attributes.
    pub fn to_comment_json(&self) -> String {
        let mut out = String::new();
        write_value(&Value::Object(self.0.clone()), &mut out);
        out
    }
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '<' | '>' | '&' => unicode_escape(c, out),
            // "--" would end the comment
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                unicode_escape('-', out);
                unicode_escape('-', out);
            }
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => unicode_escape(c, out),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn unicode_escape(c: char, out: &mut String) {
    let _ = write!(out, "\\u{:04x}", c as u32);
}

/// `<!-- wp:name {attrs} -->`
pub fn open(name: &str, attrs: &BlockAttrs) -> String {
    if attrs.is_empty() {
        format!("<!-- wp:{} -->", name)
    } else {
        format!("<!-- wp:{} {} -->", name, attrs.to_comment_json())
    }
}

pub fn close(name: &str) -> String {
    format!("<!-- /wp:{} -->", name)
}

/// Block delimiters around `html`, each on its own line.
pub fn wrap(name: &str, attrs: &BlockAttrs, html: &str) -> String {
    format!("{}\n{}\n{}", open(name, attrs), html, close(name))
}

/// Join non-empty class fragments with single spaces.
pub fn classes<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(str::split_whitespace)
        .unique()
        .join(" ")
}

/// `class="..."` prefixed with a space, or nothing.
pub fn class_attr(class: &str) -> String {
    if class.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", escape::attr(class))
    }
}

/// The source class list when present, otherwise the rule's default.
pub fn resolve_class(source: Option<String>, default: &str) -> String {
    source.unwrap_or_else(|| default.to_string())
}

// ── Core blocks ──

pub fn heading(level: u8, html: &str, attrs: BlockAttrs, class: Option<&str>, anchor: Option<&str>) -> String {
    let attrs = BlockAttrs::new().set("level", level).merge(attrs);
    let id = anchor.map(|a| format!(" id=\"{}\"", escape::attr(a))).unwrap_or_default();
    wrap(
        "heading",
        &attrs,
        &format!(
            "<h{level}{}{id}>{html}</h{level}>",
            class_attr(class.unwrap_or_default())
        ),
    )
}

pub fn paragraph(html: &str, attrs: BlockAttrs, class: &str) -> String {
    wrap("paragraph", &attrs, &format!("<p{}>{}</p>", class_attr(class), html))
}

pub fn group(class: &str, inner: &str) -> String {
    wrap(
        "group",
        &BlockAttrs::new().set_opt("className", non_empty(class)),
        &format!(
            "<div{}>\n{}\n</div>",
            class_attr(&classes(["wp-block-group", class])),
            inner
        ),
    )
}

pub fn html_block(html: &str) -> String {
    wrap("html", &BlockAttrs::new(), html)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Fill,
    Outline,
}

impl ButtonStyle {
    fn class(self) -> &'static str {
        match self {
            ButtonStyle::Fill => "is-style-fill",
            ButtonStyle::Outline => "is-style-outline",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Button {
    /// Label HTML, emitted as-is.
    pub label: String,
    pub href: Option<String>,
    pub new_tab: bool,
    pub style: ButtonStyle,
}

impl Button {
    fn render(&self) -> String {
        let href = self
            .href
            .as_deref()
            .map(escape::url)
            .filter(|h| !h.is_empty())
            .map(|h| format!(" href=\"{}\"", h))
            .unwrap_or_default();
        let target = if self.new_tab {
            " target=\"_blank\" rel=\"noreferrer noopener\""
        } else {
            ""
        };
        wrap(
            "button",
            &BlockAttrs::new().set("className", self.style.class()),
            &format!(
                "<div class=\"wp-block-button {}\"><a class=\"wp-block-button__link wp-element-button\"{}{}>{}</a></div>",
                self.style.class(),
                href,
                target,
                self.label
            ),
        )
    }
}

/// `justify` is the flex `justifyContent` value (`center`, `left`...).
pub fn buttons(items: &[Button], justify: Option<&str>, class: Option<&str>) -> String {
    let mut attrs = BlockAttrs::new().set_opt("className", class);
    if let Some(j) = justify {
        let mut layout = Map::new();
        layout.insert("type".into(), "flex".into());
        layout.insert("justifyContent".into(), j.into());
        attrs = attrs.set("layout", Value::Object(layout));
    }
    let inner = items.iter().map(Button::render).join("\n");
    wrap(
        "buttons",
        &attrs,
        &format!(
            "<div{}>\n{}\n</div>",
            class_attr(&classes(["wp-block-buttons", class.unwrap_or_default()])),
            inner
        ),
    )
}

/// A `wp:image` figure.
#[derive(Debug, Clone, Default)]
pub struct Figure {
    pub src: String,
    pub alt: String,
    pub id: i64,
    pub width: i64,
    pub height: i64,
    pub link: Option<String>,
    pub new_tab: bool,
    /// Figcaption HTML, emitted as-is.
    pub caption: Option<String>,
    pub class: Option<String>,
    pub align: Option<String>,
    pub size: &'static str,
}

impl Figure {
    /// `None` when the source URL is empty or unsafe.
    pub fn render(&self) -> Option<String> {
        let src = escape::url(&self.src);
        if src.is_empty() {
            return None;
        }
        let sized = self.width > 0 && self.height > 0;
        let size = if self.size.is_empty() { "full" } else { self.size };
        let link = self.link.as_deref().map(escape::url).filter(|l| !l.is_empty());

        let mut attrs = BlockAttrs::new();
        if self.id > 0 {
            attrs = attrs.set("id", self.id);
        }
        attrs = attrs.set("sizeSlug", size);
        if sized {
            attrs = attrs.set("width", self.width).set("height", self.height);
        }
        if link.is_some() {
            attrs = attrs.set("linkDestination", "custom");
        }
        attrs = attrs
            .set_opt("align", self.align.as_deref())
            .set_opt("className", self.class.as_deref());

        let mut img = format!("<img src=\"{}\" alt=\"{}\"", src, escape::attr(&self.alt));
        if self.id > 0 {
            let _ = write!(img, " class=\"wp-image-{}\"", self.id);
        }
        if sized {
            let _ = write!(img, " width=\"{}\" height=\"{}\"", self.width, self.height);
        }
        img.push_str("/>");

        if let Some(href) = link {
            let target = if self.new_tab {
                " target=\"_blank\" rel=\"noreferrer noopener\""
            } else {
                ""
            };
            img = format!("<a href=\"{}\"{}>{}</a>", href, target, img);
        }

        let caption = self
            .caption
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("<figcaption class=\"wp-element-caption\">{}</figcaption>", c))
            .unwrap_or_default();

        let align = self.align.as_deref().map(|a| format!("align{}", a)).unwrap_or_default();
        let size_class = format!("size-{}", size);
        let class = classes([
            "wp-block-image",
            align.as_str(),
            size_class.as_str(),
            self.class.as_deref().unwrap_or_default(),
        ]);

        Some(wrap(
            "image",
            &attrs,
            &format!("<figure class=\"{}\">{}{}</figure>", escape::attr(&class), img, caption),
        ))
    }
}

impl BlockAttrs {
    /// Keys of `other` appended after ours.
    pub fn merge(mut self, other: BlockAttrs) -> Self {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
        self
    }
}

pub fn non_empty(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_json_escapes_like_the_editor() {
        let attrs = BlockAttrs::new()
            .set("level", 3)
            .set("className", "a--b <x> & \"q\"");
        let json = attrs.to_comment_json();
        assert!(json.starts_with("{\"level\":3,\"className\":\""));
        assert!(!json.contains("--"));
        assert!(!json.contains('<'));
        assert!(!json.contains('&'));
        // decodes back to the original value
        let v: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["className"], "a--b <x> & \"q\"");
    }

    #[test]
    fn triple_dash_round_trips() {
        let json = BlockAttrs::new().set("a", "x---y").to_comment_json();
        assert!(!json.contains("--"));
        let v: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["a"], "x---y");
    }

    #[test]
    fn empty_attrs_omitted() {
        assert_eq!(open("html", &BlockAttrs::new()), "<!-- wp:html -->");
        assert_eq!(close("html"), "<!-- /wp:html -->");
    }

    #[test]
    fn classes_dedupe_and_skip_empty() {
        assert_eq!(classes(["wp-block-group", "", "foo  bar", "foo"]), "wp-block-group foo bar");
    }

    #[test]
    fn heading_level_always_serialized() {
        let h = heading(2, "Hi", BlockAttrs::new(), None, None);
        assert!(h.starts_with("<!-- wp:heading {\"level\":2} -->"));
        assert!(h.contains("<h2>Hi</h2>"));
        let h4 = heading(4, "Hi", BlockAttrs::new(), Some("x"), Some("sec-1"));
        assert!(h4.starts_with("<!-- wp:heading {\"level\":4} -->"));
        assert!(h4.contains("<h4 class=\"x\" id=\"sec-1\">Hi</h4>"));
    }

    #[test]
    fn buttons_render_targets() {
        let html = buttons(
            &[
                Button {
                    label: "Go".into(),
                    href: Some("https://example.com".into()),
                    new_tab: true,
                    style: ButtonStyle::Fill,
                },
                Button {
                    label: "Later".into(),
                    href: None,
                    new_tab: false,
                    style: ButtonStyle::Outline,
                },
            ],
            Some("center"),
            None,
        );
        assert!(html.contains(r#"{"layout":{"type":"flex","justifyContent":"center"}}"#));
        assert!(html.contains(r#"href="https://example.com" target="_blank" rel="noreferrer noopener">Go</a>"#));
        assert!(html.contains(r#"<a class="wp-block-button__link wp-element-button">Later</a>"#));
        assert_eq!(html.matches("<!-- wp:button ").count(), 2);
    }

    #[test]
    fn figure_drops_partial_dimensions() {
        let fig = Figure {
            src: "https://x.test/a.png".into(),
            alt: "A".into(),
            id: 12,
            width: 640,
            ..Default::default()
        };
        let html = fig.render().unwrap();
        assert!(html.starts_with("<!-- wp:image {\"id\":12,\"sizeSlug\":\"full\"} -->"));
        assert!(html.contains(r#"<img src="https://x.test/a.png" alt="A" class="wp-image-12"/>"#));
        assert!(!html.contains("width"));
    }

    #[test]
    fn figure_rejects_unsafe_src() {
        let fig = Figure {
            src: "javascript:alert(1)".into(),
            ..Default::default()
        };
        assert!(fig.render().is_none());
    }
}
