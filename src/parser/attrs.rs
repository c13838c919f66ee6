//! Best-effort decoding of block attribute payloads.
//!
//! Payloads are JSON object literals whose unicode escapes may have lost their
//! backslash. Fields are decoded lazily, one at a time, through a
//! priority-ordered list of extractors so a malformed payload still yields
//! whatever fields can be recovered.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::escape::{decode_entities, decode_value, normalize_escapes};

static BARE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,])\s*([A-Za-z0-9_]+)\s*:").unwrap());

static QUOTED_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([A-Za-z0-9_-]+)"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});

static BARE_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([A-Za-z0-9_-]+)"\s*:\s*(true|false|-?\d+(?:\.\d+)?)"#).unwrap()
});

static OBJECT_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([A-Za-z0-9_-]+)"\s*:\s*\{"#).unwrap());

type Extractor = fn(&Attrs, &str) -> Option<Value>;

/// Whole-object lookup first, then direct pattern extraction on the raw text.
const FIELD_EXTRACTORS: &[Extractor] = &[Attrs::from_object, Attrs::from_quoted, Attrs::from_bare];

type ObjectExtractor = fn(&Attrs, &str) -> Option<Attrs>;

const OBJECT_EXTRACTORS: &[ObjectExtractor] =
    &[Attrs::nested_object, Attrs::nested_json_string, Attrs::nested_fragment];

#[derive(Debug, Clone, Default)]
pub struct Attrs {
    raw: String,
    object: Option<Map<String, Value>>,
}

impl Attrs {
    /// Lenient decode: never fails, falls back to pattern extraction.
    pub fn parse(raw: &str) -> Self {
        Attrs {
            raw: raw.to_string(),
            object: decode_object(raw),
        }
    }

    /// Only succeeds when the payload is a well-formed object.
    pub fn strict(raw: &str) -> Option<Self> {
        let object = decode_object(raw)?;
        Some(Attrs {
            raw: raw.to_string(),
            object: Some(object),
        })
    }

    fn from_map(map: Map<String, Value>) -> Self {
        Attrs {
            raw: Value::Object(map.clone()).to_string(),
            object: Some(map),
        }
    }

    pub fn is_decoded(&self) -> bool {
        self.object.is_some()
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        FIELD_EXTRACTORS.iter().find_map(|extract| extract(self, key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// The field as it appears in the payload, before any decoding.
    pub fn raw_str(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Decoded text for attribute contexts (URLs, class names, ids).
    pub fn text(&self, key: &str) -> Option<String> {
        self.raw_str(key).map(|s| decode_value(&s))
    }

    /// Decoded text for literal HTML output, entities resolved.
    pub fn html(&self, key: &str) -> Option<String> {
        self.text(key).map(|s| decode_entities(&s))
    }

    /// First non-empty decoded text among `keys`.
    pub fn text_any(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.text(k))
            .find(|s| !s.trim().is_empty())
    }

    /// Integer field, 0 when absent or not numeric.
    pub fn int(&self, key: &str) -> i64 {
        match self.value(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Boolean field, `false` when absent.
    pub fn flag(&self, key: &str) -> bool {
        self.flag_or(key, false)
    }

    pub fn flag_or(&self, key: &str, default: bool) -> bool {
        match self.value(key) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) if s == "true" => true,
            Some(Value::String(s)) if s == "false" => false,
            _ => default,
        }
    }

    /// Source class list, trimmed; `None` when missing or blank.
    pub fn class_name(&self) -> Option<String> {
        self.text("className")
            .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|c| !c.is_empty())
    }

    /// Nested structured field (`{"src":...}`), decoded leniently so sub-keys
    /// remain reachable by pattern extraction when the object is malformed.
    pub fn object(&self, key: &str) -> Option<Attrs> {
        OBJECT_EXTRACTORS.iter().find_map(|extract| extract(self, key))
    }

    pub fn object_any(&self, keys: &[&str]) -> Option<Attrs> {
        keys.iter().find_map(|k| self.object(k))
    }

    // ── Field extractors ──

    fn from_object(&self, key: &str) -> Option<Value> {
        self.object
            .as_ref()?
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn from_quoted(&self, key: &str) -> Option<Value> {
        if self.object.is_some() {
            return None;
        }
        let caps = field_captures(&QUOTED_FIELD_RE, &self.raw, key)?;
        Some(Value::String(caps[2].to_string()))
    }

    fn from_bare(&self, key: &str) -> Option<Value> {
        if self.object.is_some() {
            return None;
        }
        let caps = field_captures(&BARE_FIELD_RE, &self.raw, key)?;
        serde_json::from_str(&caps[2]).ok()
    }

    // ── Object extractors ──

    fn nested_object(&self, key: &str) -> Option<Attrs> {
        match self.from_object(key)? {
            Value::Object(map) => Some(Attrs::from_map(map)),
            _ => None,
        }
    }

    fn nested_json_string(&self, key: &str) -> Option<Attrs> {
        let raw = self.raw_str(key)?;
        let normalized = normalize_escapes(&raw);
        let trimmed = normalized.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        Some(Attrs::parse(trimmed))
    }

    fn nested_fragment(&self, key: &str) -> Option<Attrs> {
        if self.object.is_some() {
            return None;
        }
        let m = field_captures(&OBJECT_FIELD_RE, &self.raw, key)?.get(0)?;
        let start = m.end() - 1;
        let fragment = balanced_braces(&self.raw[start..])?;
        Some(Attrs::parse(fragment))
    }
}

/// First match of a `"key": ...` pattern whose key is `key`.
fn field_captures<'a>(re: &Regex, raw: &'a str, key: &str) -> Option<Captures<'a>> {
    re.captures_iter(raw).find(|caps| &caps[1] == key)
}

/// Decode a payload as a JSON object, retrying with bare keys quoted.
/// An empty payload is an empty object.
fn decode_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(Map::new());
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }
    let quoted = BARE_KEY_RE.replace_all(trimmed, r#"$1"$2":"#);
    match serde_json::from_str::<Value>(&quoted) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Prefix of `s` (which starts with `{`) up to the matching `}`, skipping
/// braces inside string literals.
fn balanced_braces(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
