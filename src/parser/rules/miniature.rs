//! Post cards. Every field resolves on its own, first source wins: the
//! block's attributes, its `postInfo` object, the referenced post in the
//! store, then whatever the rendered card already shows.

use std::fmt::Write;

use tracing::debug;

use super::{present, Context, PostCard};
use crate::parser::attrs::Attrs;
use crate::parser::escape;
use crate::parser::html;
use crate::parser::markers::Block;
use crate::parser::markup::{self, class_attr};

const MINIATURE_CLASS: &str = "slgb-miniature-converted";

/// `miniature` / `p-miniature` → raw HTML post card.
pub fn convert(block: &Block<'_>, ctx: &Context<'_>) -> Option<String> {
    let attrs = Attrs::parse(block.attrs);
    let info = attrs.object_any(&["postInfo", "post_info"]);

    let referenced = post_id(&attrs, info.as_ref())
        .and_then(|id| ctx.post_card(id))
        .unwrap_or_default();

    let card = from_attrs(&attrs)
        .or(info.as_ref().map(from_attrs).unwrap_or_default())
        .or(referenced)
        .or(from_html(block.inner()));

    let Some(title) = card.title.as_deref() else {
        debug!(block = block.name, "miniature without a title");
        return None;
    };
    let class = markup::resolve_class(attrs.class_name(), MINIATURE_CLASS);
    let excerpt = present(attrs.html("text"))
        .or_else(|| info.as_ref().and_then(|i| present(i.html("text"))));

    Some(markup::html_block(&render(title, &card, excerpt.as_deref(), &class)))
}

fn post_id(attrs: &Attrs, info: Option<&Attrs>) -> Option<i64> {
    ["postId", "post_id", "id"]
        .iter()
        .map(|k| attrs.int(k))
        .chain(info.map(|i| i.int("id")))
        .find(|id| *id > 0)
}

/// Card fields carried by a set of attributes, either the block's own or
/// its nested post info.
fn from_attrs(attrs: &Attrs) -> PostCard {
    let image = attrs
        .object_any(&["image", "img"])
        .and_then(|o| present(o.text_any(&["src", "url"])))
        .or_else(|| present(attrs.text_any(&["image", "img", "thumbnail"])));
    let author = attrs
        .object("author")
        .and_then(|o| present(o.html("name")))
        .or_else(|| present(attrs.html("author")).filter(|a| !a.starts_with('{')));
    PostCard {
        title: present(attrs.html("title")),
        permalink: present(attrs.text_any(&["link", "url", "permalink"])),
        thumbnail: image,
        author,
        category: present(attrs.html("category")),
    }
}

fn from_html(inner: &str) -> PostCard {
    let link = html::elements(inner, "a")
        .into_iter()
        .find(|(_, body)| body.contains("<strong"))
        .or_else(|| html::elements(inner, "a").into_iter().next())
        .and_then(|(tag, _)| present(html::attr(tag, "href")));
    PostCard {
        title: html::inner(inner, "strong").and_then(|s| present(Some(s.to_string()))),
        permalink: link,
        thumbnail: html::tag(inner, "img").and_then(|t| present(html::attr(t, "src"))),
        ..Default::default()
    }
}

fn render(title: &str, card: &PostCard, excerpt: Option<&str>, class: &str) -> String {
    let href = card
        .permalink
        .as_deref()
        .map(escape::url)
        .filter(|h| !h.is_empty());
    let linked = |body: &str, class: &str| match &href {
        Some(h) => format!("<a class=\"{}\" href=\"{}\">{}</a>", class, h, body),
        None => format!("<span class=\"{}\">{}</span>", class, body),
    };

    let mut out = format!("<div{}>\n", class_attr(class));
    if let Some(src) = card.thumbnail.as_deref().map(escape::url).filter(|s| !s.is_empty()) {
        let img = format!("<img src=\"{}\" alt=\"{}\"/>", src, escape::attr(title));
        let _ = writeln!(out, "{}", linked(&img, "slgb-miniature__image"));
    }
    out.push_str("<div class=\"slgb-miniature__body\">\n");
    if let Some(category) = &card.category {
        let _ = writeln!(out, "<span class=\"slgb-miniature__category\">{}</span>", category);
    }
    let _ = writeln!(
        out,
        "{}",
        linked(&format!("<strong>{}</strong>", title), "slgb-miniature__title")
    );
    if let Some(text) = excerpt {
        let _ = writeln!(out, "<p class=\"slgb-miniature__text\">{}</p>", text);
    }
    if let Some(author) = &card.author {
        let _ = writeln!(out, "<span class=\"slgb-miniature__author\">{}</span>", author);
    }
    out.push_str("</div>\n</div>");
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::parser::rules::testing::on_first;
    use crate::parser::rules::PostLookup;

    struct Posts(HashMap<i64, PostCard>);

    impl PostLookup for Posts {
        fn post_card(&self, id: i64) -> Option<PostCard> {
            self.0.get(&id).cloned()
        }
    }

    fn run(text: &str, lookup: Option<&dyn PostLookup>) -> Option<String> {
        on_first(text, |b| convert(b, &Context { lookup }))
    }

    fn stored() -> Posts {
        Posts(HashMap::from([(
            7,
            PostCard {
                title: Some("Stored title".into()),
                permalink: Some("https://blog.test/stored".into()),
                thumbnail: Some("https://blog.test/stored.jpg".into()),
                author: Some("Ann".into()),
                category: Some("Guides".into()),
            },
        )]))
    }

    #[test]
    fn direct_attrs_win_over_lookup() {
        let posts = stored();
        let out = run(
            r#"<!-- wp:slgb/miniature {"postId":7,"title":"Own title","text":"Short u0026 sweet"} /-->"#,
            Some(&posts),
        )
        .unwrap();
        assert!(out.contains("<strong>Own title</strong>"));
        assert!(out.contains(r#"href="https://blog.test/stored""#));
        assert!(out.contains(r#"<img src="https://blog.test/stored.jpg" alt="Own title"/>"#));
        assert!(out.contains("<span class=\"slgb-miniature__category\">Guides</span>"));
        assert!(out.contains("<span class=\"slgb-miniature__author\">Ann</span>"));
        assert!(out.contains("<p class=\"slgb-miniature__text\">Short & sweet</p>"));
        assert!(out.starts_with("<!-- wp:html -->\n<div class=\"slgb-miniature-converted\">"));
    }

    #[test]
    fn post_info_then_inner_html() {
        let out = run(
            concat!(
                r#"<!-- wp:slgb/p-miniature {"className":"card","postInfo":{"title":"Guide","link":"/guide"}} -->"#,
                r#"<div><img src="/thumb.png"/><a href="/other"><strong>Old</strong></a></div>"#,
                "<!-- /wp:slgb/p-miniature -->"
            ),
            None,
        )
        .unwrap();
        assert!(out.contains("<div class=\"card\">"));
        assert!(out.contains(r#"<a class="slgb-miniature__title" href="/guide"><strong>Guide</strong></a>"#));
        assert!(out.contains(r#"<img src="/thumb.png" alt="Guide"/>"#));
    }

    #[test]
    fn lookup_through_post_info_id() {
        let posts = stored();
        let out = run(r#"<!-- wp:slgb/p-miniature {"postInfo":{"id":7}} /-->"#, Some(&posts)).unwrap();
        assert!(out.contains("<strong>Stored title</strong>"));
    }

    #[test]
    fn unknown_post_without_title_is_kept() {
        let posts = stored();
        assert_eq!(run(r#"<!-- wp:slgb/miniature {"postId":99} /-->"#, Some(&posts)), None);
        assert_eq!(run(r#"<!-- wp:slgb/miniature {"postId":7} /-->"#, None), None);
    }
}
