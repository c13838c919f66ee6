use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::html;
use crate::parser::markers::Block;
use crate::parser::markup::Figure;

/// `image` → `wp:image`. The source URL may come from an image object, a
/// plain `url`/`src` attribute, or the `<img>` already rendered inside.
pub fn convert(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    let attrs = Attrs::parse(block.attrs);
    let object = attrs.object_any(&["img", "image"]);
    let tag = html::tag(block.inner(), "img");

    let src = object
        .as_ref()
        .and_then(|o| present(o.text_any(&["src", "url"])))
        .or_else(|| present(attrs.text_any(&["url", "src"])))
        .or_else(|| tag.and_then(|t| present(html::attr(t, "src"))))?;

    let dimension = |key: &str| {
        let from_object = object.as_ref().map(|o| o.int(key)).unwrap_or(0);
        if from_object > 0 {
            return from_object;
        }
        let from_attrs = attrs.int(key);
        if from_attrs > 0 {
            return from_attrs;
        }
        tag.and_then(|t| html::attr(t, key))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    };

    let alt = object
        .as_ref()
        .and_then(|o| o.text("alt"))
        .or_else(|| attrs.text("alt"))
        .or_else(|| tag.and_then(|t| html::attr(t, "alt")))
        .unwrap_or_default();

    let id = match attrs.int("id") {
        0 => object.as_ref().map(|o| o.int("id")).unwrap_or(0),
        id => id,
    };

    let figure = Figure {
        src,
        alt,
        id,
        width: dimension("width"),
        height: dimension("height"),
        link: present(attrs.text("link")),
        new_tab: attrs.flag("openInNewTab"),
        caption: caption(present(attrs.html("caption")), present(attrs.html("source"))),
        class: attrs.class_name(),
        align: present(attrs.text("align")),
        size: "full",
    };
    figure.render()
}

fn caption(caption: Option<String>, source: Option<String>) -> Option<String> {
    match (caption, source) {
        (Some(caption), Some(source)) => Some(format!("{} <cite>{}</cite>", caption, source)),
        (Some(caption), None) => Some(caption),
        (None, Some(source)) => Some(format!("<cite>{}</cite>", source)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::rules::testing::convert_first;

    #[test]
    fn paired_image_reads_inner_img() {
        let out = convert_first(
            r#"<!-- wp:slgb/image {"id":"42","link":"https://x.test/big","openInNewTab":true,"className":"wide"} --><img src="https://x.test/a.png" width="640" height="480" alt="Chart"/><!-- /wp:slgb/image -->"#,
            convert,
        )
        .unwrap();
        assert_eq!(
            out,
            concat!(
                "<!-- wp:image {\"id\":42,\"sizeSlug\":\"full\",\"width\":640,\"height\":480,\"linkDestination\":\"custom\",\"className\":\"wide\"} -->\n",
                "<figure class=\"wp-block-image size-full wide\"><a href=\"https://x.test/big\" target=\"_blank\" rel=\"noreferrer noopener\">",
                "<img src=\"https://x.test/a.png\" alt=\"Chart\" class=\"wp-image-42\" width=\"640\" height=\"480\"/></a></figure>\n",
                "<!-- /wp:image -->"
            )
        );
    }

    #[test]
    fn object_source_and_combined_caption() {
        let out = convert_first(
            r#"<!-- wp:slgb/image {"img":{"src":"/up/b.jpg","width":300},"caption":"Sunset","source":"NASA","align":"center"} /-->"#,
            convert,
        )
        .unwrap();
        assert!(out.contains("<figure class=\"wp-block-image aligncenter size-full\">"));
        assert!(out.contains("<img src=\"/up/b.jpg\" alt=\"\"/>"));
        assert!(out.contains("<figcaption class=\"wp-element-caption\">Sunset <cite>NASA</cite></figcaption>"));
        assert!(!out.contains("\"width\""));
    }

    #[test]
    fn no_source_is_kept() {
        assert_eq!(
            convert_first(r#"<!-- wp:slgb/image {"caption":"lost"} --><p>no image</p><!-- /wp:slgb/image -->"#, convert),
            None
        );
    }
}
