//! Text normalization shared by every rule: the pseudo-unicode-escape table,
//! string-literal decoding, and destination-specific output escaping.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::{Captures, Regex};

/// Escapes that lost their backslash upstream (`<` stored as `u003c`).
const PSEUDO_ESCAPES: &[(&str, &str)] = &[
    ("003c", "<"),
    ("003e", ">"),
    ("0026", "&"),
    ("0022", "\""),
    ("0027", "'"),
    ("003d", "="),
    ("0020", " "),
    ("002d", "-"),
];

static PSEUDO_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let codes: Vec<&str> = PSEUDO_ESCAPES.iter().map(|(code, _)| *code).collect();
    Regex::new(&format!(r"(?i)\\?u({})", codes.join("|"))).unwrap()
});

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").unwrap());

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "ftp"];

const URL_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Replace every known pseudo-escape token with its character.
pub fn normalize_escapes(s: &str) -> Cow<'_, str> {
    PSEUDO_ESCAPE_RE.replace_all(s, |caps: &Captures| {
        let code = caps[1].to_ascii_lowercase();
        PSEUDO_ESCAPES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, ch)| *ch)
            .unwrap_or_default()
            .to_string()
    })
}

/// Decode remaining JSON string escapes (`\n`, `\t`, unicode escapes) by
/// re-quoting the text and parsing it as a string literal. Text that does not
/// decode is returned unchanged.
pub fn decode_literal(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    let mut escaped = false;
    for c in s.chars() {
        match c {
            '"' if !escaped => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
        escaped = c == '\\' && !escaped;
    }
    quoted.push('"');

    serde_json::from_str::<String>(&quoted).unwrap_or_else(|_| s.to_string())
}

/// Full pipeline for a raw attribute string: pseudo-escapes, then literal
/// escapes.
pub fn decode_value(raw: &str) -> String {
    decode_literal(&normalize_escapes(raw))
}

pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

/// Escape for a double-quoted HTML attribute.
pub fn attr(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// Escape for an HTML text node.
pub fn text(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

/// Make a URL safe for `href`/`src`. Unknown schemes (`javascript:` and
/// friends) yield an empty string.
pub fn url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Some(caps) = SCHEME_RE.captures(trimmed) {
        let scheme = caps[1].to_ascii_lowercase();
        if !SAFE_SCHEMES.contains(&scheme.as_str()) {
            return String::new();
        }
    }
    let encoded = utf8_percent_encode(trimmed, URL_UNSAFE).to_string();
    attr(&encoded).into_owned()
}
