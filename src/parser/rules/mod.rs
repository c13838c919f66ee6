//! One conversion rule per custom block type, applied in catalog order.
//!
//! A rule receives one located occurrence and returns the replacement
//! markup, or `None` to leave the occurrence exactly as it was.

mod buttons;
mod compare;
mod groups;
mod heading;
mod image;
mod miniature;
mod quote;
mod tables;
mod youtube;

use super::markers::Block;

pub type ConvertFn = fn(&Block<'_>, &Context<'_>) -> Option<String>;

pub struct Rule {
    /// Tally key.
    pub key: &'static str,
    /// Plural label used in reports.
    pub label: &'static str,
    /// Type names handled, without namespace.
    pub blocks: &'static [&'static str],
    /// Core block(s) produced, for listings.
    pub target: &'static str,
    pub convert: ConvertFn,
}

impl Rule {
    pub fn handles(&self, name: &str) -> bool {
        self.blocks.contains(&name)
    }
}

/// Leaves before containers, so a container sees its children already
/// converted.
pub static CATALOG: &[Rule] = &[
    Rule {
        key: "heading",
        label: "heading blocks",
        blocks: &["h1", "h2", "h3", "h4", "h5", "h6"],
        target: "core/heading",
        convert: heading::convert,
    },
    Rule {
        key: "emph",
        label: "emphasis blocks",
        blocks: &["emph"],
        target: "core/paragraph",
        convert: groups::emph,
    },
    Rule {
        key: "image",
        label: "image blocks",
        blocks: &["image"],
        target: "core/image",
        convert: image::convert,
    },
    Rule {
        key: "youtube",
        label: "YouTube embeds",
        blocks: &["youtube", "p-youtube"],
        target: "core/embed",
        convert: youtube::convert,
    },
    Rule {
        key: "btns",
        label: "button groups",
        blocks: &["p-btns"],
        target: "core/buttons",
        convert: buttons::convert,
    },
    Rule {
        key: "table",
        label: "table blocks",
        blocks: &["table"],
        target: "core/html (table)",
        convert: tables::table,
    },
    Rule {
        key: "dos_donts",
        label: "do/don't tables",
        blocks: &["p-dos-donts"],
        target: "core/html (table)",
        convert: tables::dos_donts,
    },
    Rule {
        key: "subscribe",
        label: "subscribe blocks",
        blocks: &["gb-subscribe"],
        target: "core/group with paragraph and button",
        convert: groups::subscribe,
    },
    Rule {
        key: "cta",
        label: "CTA blocks",
        blocks: &["gb-cta", "cta"],
        target: "core/group with heading and buttons",
        convert: groups::cta,
    },
    Rule {
        key: "quote",
        label: "quote blocks",
        blocks: &["quote", "p-quote"],
        target: "core/quote",
        convert: quote::convert,
    },
    Rule {
        key: "miniature",
        label: "miniature blocks",
        blocks: &["miniature", "p-miniature"],
        target: "core/html (post card)",
        convert: miniature::convert,
    },
    Rule {
        key: "comparison",
        label: "comparison tables",
        blocks: &["p-comparison"],
        target: "core/html (table)",
        convert: tables::comparison,
    },
    Rule {
        key: "hints",
        label: "hints blocks",
        blocks: &["p-hints"],
        target: "core/html (table)",
        convert: tables::hints,
    },
    Rule {
        key: "compare",
        label: "compare blocks",
        blocks: &["p-compare"],
        target: "core/columns",
        convert: compare::convert,
    },
    Rule {
        key: "gb_emph",
        label: "gb-emph blocks",
        blocks: &["gb-emph"],
        target: "core/group",
        convert: groups::gb_emph,
    },
];

pub fn find(key: &str) -> Option<&'static Rule> {
    CATALOG.iter().find(|r| r.key == key)
}

/// Data about another stored post, used to fill in post cards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCard {
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub thumbnail: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
}

impl PostCard {
    /// Fill every field still missing from `other`.
    pub fn or(self, other: PostCard) -> PostCard {
        PostCard {
            title: self.title.or(other.title),
            permalink: self.permalink.or(other.permalink),
            thumbnail: self.thumbnail.or(other.thumbnail),
            author: self.author.or(other.author),
            category: self.category.or(other.category),
        }
    }
}

pub trait PostLookup {
    fn post_card(&self, id: i64) -> Option<PostCard>;
}

/// What a rule may consult beyond the occurrence itself.
#[derive(Clone, Copy, Default)]
pub struct Context<'a> {
    pub lookup: Option<&'a dyn PostLookup>,
}

impl<'a> Context<'a> {
    pub fn post_card(&self, id: i64) -> Option<PostCard> {
        if id <= 0 {
            return None;
        }
        self.lookup?.post_card(id)
    }
}

/// Non-blank trimmed value.
fn present(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
