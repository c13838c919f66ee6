use tracing::debug;

use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::markers::Block;
use crate::parser::markup::{self, BlockAttrs};

/// `h1`..`h6` → `wp:heading`. The payload must decode as a whole object with
/// a `text` key; anything less keeps the original.
pub fn convert(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    let level = block.heading_level()?;
    if !block.is_self_closing() {
        return None;
    }
    let Some(attrs) = Attrs::strict(block.attrs) else {
        debug!(block = block.name, "heading payload did not decode");
        return None;
    };
    if !attrs.has("text") {
        return None;
    }

    let text = attrs.html("text").unwrap_or_default();
    let content = match present(attrs.html("number")) {
        Some(number) => format!("{} {}", number, text),
        None => text,
    };
    let class = attrs.class_name();
    let anchor = present(attrs.text("anchor"));

    let mut extra = BlockAttrs::new()
        .set_opt("className", class.clone())
        .set_opt("anchor", anchor.clone());
    if attrs.flag("chapter") {
        extra = extra.set("chapter", true);
    }

    Some(markup::heading(
        level,
        &content,
        extra,
        class.as_deref(),
        anchor.as_deref(),
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::parser::rules::testing::convert_first;

    #[test]
    fn decodes_pseudo_escapes_into_heading() {
        let out = convert_first(r#"<!-- wp:slgb/h3 {"text":"Hello u0026 World"} /-->"#, convert).unwrap();
        assert_eq!(
            out,
            "<!-- wp:heading {\"level\":3} -->\n<h3>Hello & World</h3>\n<!-- /wp:heading -->"
        );
    }

    #[rstest]
    #[case(1, "<h1>T</h1>")]
    #[case(2, "<h2>T</h2>")]
    #[case(4, "<h4>T</h4>")]
    #[case(6, "<h6>T</h6>")]
    fn every_level(#[case] level: u8, #[case] expected: &str) {
        let input = format!(r#"<!-- wp:slgb/h{} {{"text":"T"}} /-->"#, level);
        let out = convert_first(&input, convert).unwrap();
        assert!(out.starts_with(&format!("<!-- wp:heading {{\"level\":{}}} -->", level)), "{out}");
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn malformed_payload_is_kept() {
        assert_eq!(convert_first(r#"<!-- wp:slgb/h2 {"text":"Hello" /-->"#, convert), None);
    }

    #[test]
    fn missing_text_is_kept() {
        assert_eq!(convert_first(r#"<!-- wp:slgb/h2 {"className":"x"} /-->"#, convert), None);
    }

    #[test]
    fn prefix_anchor_chapter_and_class() {
        let out = convert_first(
            r#"<!-- wp:slgb/h2 {"text":"Intro","number":"1.","anchor":"intro","chapter":true,"className":"foo bar"} /-->"#,
            convert,
        )
        .unwrap();
        assert_eq!(
            out,
            concat!(
                "<!-- wp:heading {\"level\":2,\"className\":\"foo bar\",\"anchor\":\"intro\",\"chapter\":true} -->\n",
                "<h2 class=\"foo bar\" id=\"intro\">1. Intro</h2>\n",
                "<!-- /wp:heading -->"
            )
        );
    }

    #[test]
    fn out_of_range_level_is_not_a_heading() {
        assert_eq!(convert_first(r#"<!-- wp:slgb/h7 {"text":"x"} /-->"#, convert), None);
    }
}
