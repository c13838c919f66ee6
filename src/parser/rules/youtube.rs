use std::sync::LazyLock;

use regex::Regex;

use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::escape;
use crate::parser::html;
use crate::parser::markers::Block;
use crate::parser::markup::{self, BlockAttrs};

static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/embed/|/shorts/|/v/|/live/|youtu\.be/|[?&]v=)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)").unwrap()
});

static BARE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

const ASPECT_CLASSES: &str = "wp-embed-aspect-16-9 wp-has-aspect-ratio";

/// Video id from any URL form or a bare id.
pub fn video_id(s: &str) -> Option<String> {
    let s = s.trim();
    if BARE_ID_RE.is_match(s) {
        return Some(s.to_string());
    }
    VIDEO_URL_RE.captures(s).map(|caps| caps[1].to_string())
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// `youtube` / `p-youtube` → responsive `wp:embed`.
pub fn convert(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    let attrs = Attrs::parse(block.attrs);
    let iframe_src = html::tag(block.inner(), "iframe").and_then(|t| html::attr(t, "src"));

    let id = ["url", "src", "videoId", "id"]
        .iter()
        .filter_map(|k| attrs.text(k))
        .chain(iframe_src)
        .find_map(|candidate| video_id(&candidate))?;
    let url = watch_url(&id);

    let class = markup::classes([attrs.class_name().as_deref().unwrap_or_default(), ASPECT_CLASSES]);
    let caption = present(attrs.html("caption"))
        .or_else(|| html::inner(block.inner(), "figcaption").and_then(|c| present(Some(c.to_string()))))
        .map(|c| format!("<figcaption class=\"wp-element-caption\">{}</figcaption>", c))
        .unwrap_or_default();

    let block_attrs = BlockAttrs::new()
        .set("url", url.as_str())
        .set("type", "video")
        .set("providerNameSlug", "youtube")
        .set("responsive", true)
        .set("className", class.as_str());

    Some(markup::wrap(
        "embed",
        &block_attrs,
        &format!(
            "<figure class=\"wp-block-embed is-type-video is-provider-youtube wp-block-embed-youtube {}\"><div class=\"wp-block-embed__wrapper\">\n{}\n</div>{}</figure>",
            escape::attr(&class), url, caption
        ),
    ))
}
