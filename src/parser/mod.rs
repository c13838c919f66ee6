pub mod attrs;
pub mod escape;
pub mod html;
pub mod markers;
pub mod markup;
pub mod rules;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use markers::{Node, Scanner};
use rules::{Context, PostLookup, Rule, CATALOG};

/// Occurrence counts keyed by rule key (conversions) or type name (scans).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally(BTreeMap<String, usize>);

impl Tally {
    pub fn add(&mut self, key: &str, n: usize) {
        if n > 0 {
            *self.0.entry(key.to_string()).or_default() += n;
        }
    }

    pub fn get(&self, key: &str) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &Tally) {
        for (key, n) in &other.0 {
            self.add(key, *n);
        }
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Catalog rules in catalog order, then any other keys alphabetically.
    pub fn entries(&self) -> Vec<(&str, usize)> {
        let known = CATALOG
            .iter()
            .filter_map(|rule| self.0.get_key_value(rule.key))
            .map(|(k, n)| (k.as_str(), *n));
        let other = self
            .0
            .iter()
            .filter(|(k, _)| rules::find(k).is_none())
            .map(|(k, n)| (k.as_str(), *n));
        known.chain(other).collect()
    }
}

impl FromIterator<(String, usize)> for Tally {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for (key, n) in iter {
            tally.add(&key, n);
        }
        tally
    }
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub text: String,
    pub tally: Tally,
}

impl Conversion {
    pub fn changed(&self) -> bool {
        !self.tally.is_empty()
    }
}

/// Runs the rule catalog over serialized documents.
pub struct Converter<'l> {
    scanner: Scanner,
    lookup: Option<&'l dyn PostLookup>,
}

impl<'l> Converter<'l> {
    pub fn new(namespace: &str) -> Self {
        Converter {
            scanner: Scanner::new(namespace),
            lookup: None,
        }
    }

    /// Enables post lookups for cards that reference other posts.
    pub fn with_lookup(mut self, lookup: &'l dyn PostLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Apply every rule in catalog order; each rule sees the output of the
    /// ones before it.
    pub fn convert(&self, text: &str) -> Conversion {
        let mut tally = Tally::default();
        if !self.scanner.has_markers(text) {
            return Conversion {
                text: text.to_string(),
                tally,
            };
        }

        let ctx = Context {
            lookup: self.lookup,
        };
        let mut current = text.to_string();
        for rule in CATALOG {
            let (next, n) = self.run_rule(rule, &current, &ctx);
            if n > 0 {
                debug!(rule = rule.key, count = n, "converted");
                tally.add(rule.key, n);
                current = next;
            }
        }
        Conversion {
            text: current,
            tally,
        }
    }

    /// Occurrences per type name, nested ones included, converting nothing.
    pub fn census(&self, text: &str) -> Tally {
        let mut tally = Tally::default();
        for block in self.scanner.occurrences(text) {
            tally.add(block.name, 1);
        }
        tally
    }

    /// Repeats passes until one converts nothing: a block nested in a block of
    /// the same type only surfaces once its parent is rewritten. Every
    /// productive pass converts at least one of the blocks counted up front,
    /// so that count bounds the passes.
    fn run_rule(&self, rule: &Rule, text: &str, ctx: &Context<'_>) -> (String, usize) {
        let handled = self
            .scanner
            .occurrences(text)
            .filter(|b| rule.handles(b.name))
            .count();
        let mut current = text.to_string();
        let mut total = 0;
        for _ in 0..handled {
            let (out, n) = {
                let nodes = self.scanner.parse(&current);
                let mut out = String::with_capacity(current.len());
                let n = apply(rule, &nodes, ctx, &mut out);
                (out, n)
            };
            if n == 0 {
                break;
            }
            total += n;
            current = out;
        }
        (current, total)
    }
}

/// One pass of `rule` over a node list. Blocks the rule does not handle, or
/// declines, are written back marker for marker with their children
/// rewritten, so untouched text is reproduced exactly.
fn apply(rule: &Rule, nodes: &[Node<'_>], ctx: &Context<'_>, out: &mut String) -> usize {
    let mut count = 0;
    for node in nodes {
        let block = match node {
            Node::Text(text) => {
                out.push_str(text);
                continue;
            }
            Node::Block(block) => block,
        };

        if rule.handles(block.name) {
            if let Some(replacement) = (rule.convert)(block, ctx) {
                out.push_str(&replacement);
                count += 1;
                continue;
            }
            debug!(rule = rule.key, block = block.name, "kept original");
        }

        match &block.children {
            None => out.push_str(block.raw),
            Some(children) => {
                out.push_str(block.open_marker());
                count += apply(rule, children, ctx, out);
                out.push_str(block.close_marker());
            }
        }
    }
    count
}
