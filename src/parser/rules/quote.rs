use serde_json::Value;

use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::escape;
use crate::parser::html;
use crate::parser::markers::Block;
use crate::parser::markup::{self, BlockAttrs, Figure};

const QUOTE_CLASS: &str = "slgb-quote-converted";
const LARGE_STYLE: &str = "is-style-large";

struct Author {
    name: String,
    link: Option<String>,
}

/// `quote` / `p-quote` → `wp:quote` with an optional photo and citation.
pub fn convert(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    let attrs = Attrs::parse(block.attrs);
    let text = present(attrs.html("text")).or_else(|| quote_body(block.inner()))?;

    let class = markup::resolve_class(attrs.class_name(), QUOTE_CLASS);
    let class = if attrs.flag("featured") {
        markup::classes([class.as_str(), LARGE_STYLE])
    } else {
        class
    };

    let mut parts = Vec::new();
    if let Some(photo) = photo(&attrs, block.inner()).and_then(|f| f.render()) {
        parts.push(photo);
    }
    parts.push(markup::paragraph(&text, BlockAttrs::new(), ""));
    if let Some(author) = author(&attrs) {
        let name = match author.link.as_deref().map(escape::url).filter(|l| !l.is_empty()) {
            Some(href) => format!("<a href=\"{}\">{}</a>", href, author.name),
            None => author.name,
        };
        parts.push(format!("<cite>{}</cite>", name));
    }

    Some(markup::wrap(
        "quote",
        &BlockAttrs::new().set("className", class.as_str()),
        &format!(
            "<blockquote class=\"{}\">\n{}\n</blockquote>",
            escape::attr(&markup::classes(["wp-block-quote", class.as_str()])),
            parts.join("\n")
        ),
    ))
}

/// First paragraph of the rendered blockquote, or its whole trimmed body.
fn quote_body(inner: &str) -> Option<String> {
    let quote = html::inner(inner, "blockquote")?;
    let body = html::inner(quote, "p").unwrap_or(quote);
    present(Some(body.to_string()))
}

fn author(attrs: &Attrs) -> Option<Author> {
    if let Some(object) = attrs.object("author") {
        return Some(Author {
            name: present(object.html("name"))?,
            link: present(object.text_any(&["link", "url"])),
        });
    }
    match attrs.value("author") {
        Some(Value::String(_)) => Some(Author {
            name: present(attrs.html("author"))?,
            link: present(attrs.text("authorLink")),
        }),
        _ => None,
    }
}

fn photo(attrs: &Attrs, inner: &str) -> Option<Figure> {
    let from_attrs = match attrs.object("photo") {
        Some(object) => present(object.text_any(&["url", "src"]))
            .map(|src| (src, object.text("alt").unwrap_or_default())),
        None => present(attrs.text("photo")).map(|src| (src, String::new())),
    };
    let (src, alt) = from_attrs.or_else(|| {
        let tag = html::tag(inner, "img")?;
        Some((present(html::attr(tag, "src"))?, html::attr(tag, "alt").unwrap_or_default()))
    })?;
    Some(Figure {
        src,
        alt,
        size: "thumbnail",
        class: Some("slgb-quote-photo".to_string()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::rules::testing::convert_first;

    #[test]
    fn quote_with_author() {
        let out = convert_first(
            r#"<!-- wp:slgb/p-quote {"text":"Stay u003cemu003ehungryu003c/emu003e","author":"Tom &amp; Jerry"} --><!-- /wp:slgb/p-quote -->"#,
            convert,
        )
        .unwrap();
        assert_eq!(
            out,
            concat!(
                "<!-- wp:quote {\"className\":\"slgb-quote-converted\"} -->\n",
                "<blockquote class=\"wp-block-quote slgb-quote-converted\">\n",
                "<!-- wp:paragraph -->\n<p>Stay <em>hungry</em></p>\n<!-- /wp:paragraph -->\n",
                "<cite>Tom & Jerry</cite>\n",
                "</blockquote>\n",
                "<!-- /wp:quote -->"
            )
        );
    }

    #[test]
    fn no_author_no_cite() {
        for input in [
            r#"<!-- wp:slgb/quote {"text":"Hi","author":""} /-->"#,
            r#"<!-- wp:slgb/quote {"text":"Hi"} /-->"#,
        ] {
            let out = convert_first(input, convert).unwrap();
            assert!(!out.contains("<cite"), "{out}");
            assert!(!out.contains("<footer"), "{out}");
        }
    }

    #[test]
    fn featured_keeps_source_class() {
        let out = convert_first(
            r#"<!-- wp:slgb/quote {"text":"Hi","featured":true,"className":"foo bar"} /-->"#,
            convert,
        )
        .unwrap();
        assert!(out.contains("<blockquote class=\"wp-block-quote foo bar is-style-large\">"));
    }

    #[test]
    fn text_and_photo_from_inner_html() {
        let out = convert_first(
            concat!(
                r#"<!-- wp:slgb/p-quote {"author":{"name":"Ann","link":"https://ann.test"}} -->"#,
                r#"<div class="p-quote"><img src="/ann.jpg" alt="Ann"/><blockquote><p>Less is more</p></blockquote></div>"#,
                "<!-- /wp:slgb/p-quote -->"
            ),
            convert,
        )
        .unwrap();
        assert!(out.contains("<p>Less is more</p>"));
        assert!(out.contains(r#"<img src="/ann.jpg" alt="Ann"/>"#));
        assert!(out.contains("size-thumbnail slgb-quote-photo"));
        assert!(out.contains(r#"<cite><a href="https://ann.test">Ann</a></cite>"#));
        assert_eq!(out.matches("<cite>").count(), 1);
    }

    #[test]
    fn nothing_to_quote_is_kept() {
        assert_eq!(
            convert_first(r#"<!-- wp:slgb/p-quote {"author":"Ann"} --><p></p><!-- /wp:slgb/p-quote -->"#, convert),
            None
        );
    }
}
