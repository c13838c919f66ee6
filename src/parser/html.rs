//! Lookups inside the already-rendered HTML some blocks carry as inner
//! content. Only the handful of shapes the rules need, nothing general.

use std::sync::LazyLock;

use regex::Regex;

use super::escape::decode_entities;

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<([a-z][a-z0-9]*)\b[^>]*>").unwrap());

static TAG_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\s([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static CLOSE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</([a-z][a-z0-9]*)\s*>").unwrap());

/// First opening tag `<name ...>`, whole tag text.
pub fn tag<'a>(html: &'a str, name: &str) -> Option<&'a str> {
    find_open(html, name, |_| true).map(|m| m.as_str())
}

/// Attribute value from a single tag, entities resolved.
pub fn attr(tag: &str, name: &str) -> Option<String> {
    TAG_ATTR_RE
        .captures_iter(tag)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| decode_entities(m.as_str()))
}

/// Inner HTML of the first `<name>...</name>` element (non-nesting).
pub fn inner<'a>(html: &'a str, name: &str) -> Option<&'a str> {
    elements(html, name).into_iter().next().map(|(_, inner)| inner)
}

/// Every `<name>...</name>` element as `(opening tag, inner html)`.
pub fn elements<'a>(html: &'a str, name: &str) -> Vec<(&'a str, &'a str)> {
    element_spans(html, name)
        .into_iter()
        .map(|(start, open_end, close_start, _)| (&html[start..open_end], &html[open_end..close_start]))
        .collect()
}

/// `html` with every `<name>...</name>` element cut out.
pub fn without_elements(html: &str, name: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for (start, _, _, end) in element_spans(html, name) {
        out.push_str(&html[last..start]);
        last = end;
    }
    out.push_str(&html[last..]);
    out
}

/// Inner HTML of the first `<div>` whose class list contains `class`,
/// up to the last `</div>` in `html`.
pub fn div_with_class<'a>(html: &'a str, class: &str) -> Option<&'a str> {
    split_div_with_class(html, class).map(|(_, inner, _)| inner)
}

/// Like [`div_with_class`], also returning the text before the opening tag
/// and after the closing one.
pub fn split_div_with_class<'a>(html: &'a str, class: &str) -> Option<(&'a str, &'a str, &'a str)> {
    let open = find_open(html, "div", |tag| {
        attr(tag, "class")
            .map(|c| c.split_whitespace().any(|cls| cls == class))
            .unwrap_or(false)
    })?;
    let close = CLOSE_TAG_RE
        .captures_iter(&html[open.end()..])
        .filter(|caps| caps[1].eq_ignore_ascii_case("div"))
        .last()?
        .get(0)?;
    let (close_start, close_end) = (open.end() + close.start(), open.end() + close.end());
    Some((&html[..open.start()], &html[open.end()..close_start], &html[close_end..]))
}

/// True when `tag` carries a class containing `needle`.
pub fn has_class(tag: &str, needle: &str) -> bool {
    attr(tag, "class")
        .map(|c| c.split_whitespace().any(|cls| cls.contains(needle)))
        .unwrap_or(false)
}

/// First opening `<name ...>` tag accepted by `keep`.
fn find_open<'a>(html: &'a str, name: &str, keep: impl Fn(&str) -> bool) -> Option<regex::Match<'a>> {
    OPEN_TAG_RE
        .captures_iter(html)
        .filter(|caps| caps[1].eq_ignore_ascii_case(name))
        .filter_map(|caps| caps.get(0))
        .find(|m| keep(m.as_str()))
}

/// `(start, end of opening tag, start of closing tag, end)` for each
/// `<name>...</name>`, pairing every opener with the next closer.
fn element_spans(html: &str, name: &str) -> Vec<(usize, usize, usize, usize)> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(open) = find_open(&html[from..], name, |_| true) {
        let (start, open_end) = (from + open.start(), from + open.end());
        let Some(close) = CLOSE_TAG_RE
            .captures_iter(&html[open_end..])
            .find(|caps| caps[1].eq_ignore_ascii_case(name))
            .and_then(|caps| caps.get(0))
        else {
            break;
        };
        let (close_start, end) = (open_end + close.start(), open_end + close.end());
        spans.push((start, open_end, close_start, end));
        from = end;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_img_attributes() {
        let html = r#"<p>x</p><img src="/a.png?x=1&amp;y=2" width='640' alt="A &quot;pic&quot;" />"#;
        let img = tag(html, "img").unwrap();
        assert_eq!(attr(img, "src").as_deref(), Some("/a.png?x=1&y=2"));
        assert_eq!(attr(img, "width").as_deref(), Some("640"));
        assert_eq!(attr(img, "alt").as_deref(), Some("A \"pic\""));
        assert_eq!(attr(img, "height"), None);
    }

    #[test]
    fn attr_name_must_be_whole() {
        let tag = r#"<a data-href="/no" href="/yes">"#;
        assert_eq!(attr(tag, "href").as_deref(), Some("/yes"));
    }

    #[test]
    fn lists_anchors_in_order() {
        let html = r#"<a href="/1">One</a> and <a class="btn outline" href="/2"><b>Two</b></a>"#;
        let anchors = elements(html, "a");
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[1].1, "<b>Two</b>");
        assert!(has_class(anchors[1].0, "outline"));
        assert!(!has_class(anchors[0].0, "outline"));
    }

    #[test]
    fn div_with_class_spans_nested_divs() {
        let html = r#"<div class="gb-emph"><div>a</div><p>b</p></div>"#;
        assert_eq!(div_with_class(html, "gb-emph"), Some("<div>a</div><p>b</p>"));
        assert_eq!(div_with_class(html, "gb-emp"), None);
    }

    #[test]
    fn split_div_keeps_surrounding_text() {
        let html = "<p>Lead</p>\n<div class=\"box gb-emph\"><p>In</p></div>\ntail";
        assert_eq!(
            split_div_with_class(html, "gb-emph"),
            Some(("<p>Lead</p>\n", "<p>In</p>", "\ntail"))
        );
    }

    #[test]
    fn tag_name_must_be_whole() {
        let html = r#"<abbr title="x">A</abbr><a href="/y">Y</a>"#;
        assert_eq!(tag(html, "a"), Some(r#"<a href="/y">"#));
        assert_eq!(elements(html, "a"), vec![(r#"<a href="/y">"#, "Y")]);
    }

    #[test]
    fn cuts_out_elements() {
        let html = r#"<a href="/a">A</a> <p>Note</p><A href="/b">B</A>"#;
        assert_eq!(without_elements(html, "a"), " <p>Note</p>");
    }

    #[test]
    fn inner_of_first_element() {
        assert_eq!(inner("<blockquote><p>Q</p></blockquote>", "p"), Some("Q"));
        assert_eq!(inner("<div></div>", "p"), None);
    }
}
