//! Table-shaped blocks, all emitted as a hand-built `<table>` inside a raw
//! HTML block.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::{present, Context};
use crate::parser::attrs::Attrs;
use crate::parser::escape::{decode_literal, normalize_escapes};
use crate::parser::html;
use crate::parser::markers::{Block, Node};
use crate::parser::markup::{self, class_attr};

const TABLE_CLASS: &str = "slgb-table-converted";
const DOS_DONTS_CLASS: &str = "slgb-dos-donts-converted";
const COMPARISON_CLASS: &str = "slgb-comparison-converted";
const HINTS_CLASS: &str = "slgb-hints-converted";

static ROW_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\]\s*,\s*\[").unwrap());
static CELL_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cell HTML, emitted as-is.
    pub content: String,
    pub cols: i64,
    pub rows: i64,
}

impl Cell {
    pub fn new(content: impl Into<String>) -> Self {
        Cell {
            content: content.into(),
            cols: 1,
            rows: 1,
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let span = |key: &str| match map.get(key) {
                    Some(Value::Number(n)) => n.as_i64().unwrap_or(1),
                    Some(Value::String(s)) => s.trim().parse().unwrap_or(1),
                    _ => 1,
                };
                Cell {
                    content: map.get("content").map(value_text).unwrap_or_default(),
                    cols: span("cols"),
                    rows: span("rows"),
                }
            }
            other => Cell::new(value_text(other)),
        }
    }

    fn from_attrs(attrs: &Attrs, content: String) -> Self {
        Cell {
            content,
            cols: attrs.int("cols").max(1),
            rows: attrs.int("rows").max(1),
        }
    }
}

pub type Matrix = Vec<Vec<Cell>>;

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_escapes(s).into_owned(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `<table>` with every row in `<tbody>`; the first row uses `<th>` when
/// `header` is set. Spans are written only when greater than one.
pub fn render_table(matrix: &Matrix, class: &str, header: bool) -> String {
    let mut out = format!("<table{}><tbody>", class_attr(class));
    for (i, row) in matrix.iter().enumerate() {
        let tag = if header && i == 0 { "th" } else { "td" };
        out.push_str("<tr>");
        for cell in row {
            out.push('<');
            out.push_str(tag);
            if cell.cols > 1 {
                let _ = write!(out, " colspan=\"{}\"", cell.cols);
            }
            if cell.rows > 1 {
                let _ = write!(out, " rowspan=\"{}\"", cell.rows);
            }
            let _ = write!(out, ">{}</{}>", cell.content, tag);
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// The `cells` payload as a JSON array: a real array, a JSON string, or a
/// doubly escaped JSON string.
fn cells_array(attrs: &Attrs) -> Option<Vec<Value>> {
    if let Some(Value::Array(items)) = attrs.value("cells") {
        return Some(items);
    }
    let raw = attrs.raw_str("cells")?;
    let normalized = normalize_escapes(&raw);
    let attempts = [normalized.to_string(), decode_literal(&normalized)];
    attempts.iter().find_map(|s| match serde_json::from_str::<Value>(s.trim()) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    })
}

/// Rows of cells; a flat array of cells is a single row.
fn matrix_from(items: &[Value]) -> Matrix {
    if items.iter().any(Value::is_array) {
        items
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(Cell::from_value).collect(),
                other => vec![Cell::from_value(other)],
            })
            .collect()
    } else {
        vec![items.iter().map(Cell::from_value).collect()]
    }
}

/// Last resort for payloads that will not parse: split rows on `],[` and
/// read each `{...}` fragment as one cell.
fn matrix_from_fragments(attrs: &Attrs) -> Option<Matrix> {
    let raw = attrs.raw_str("cells")?;
    let normalized = normalize_escapes(&raw).replace("\\\"", "\"");
    let matrix: Matrix = ROW_BREAK_RE
        .split(&normalized)
        .map(|chunk| {
            CELL_FRAGMENT_RE
                .find_iter(chunk)
                .map(|m| {
                    let cell = Attrs::parse(m.as_str());
                    let content = cell.text("content").unwrap_or_default();
                    Cell::from_attrs(&cell, content)
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();
    if matrix.is_empty() {
        None
    } else {
        Some(matrix)
    }
}

/// `table` → raw HTML table.
pub fn table(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if !block.is_self_closing() {
        return None;
    }
    let attrs = Attrs::parse(block.attrs);
    let matrix = match cells_array(&attrs) {
        Some(items) => matrix_from(&items),
        None => {
            debug!("table cells did not decode, rebuilding from fragments");
            matrix_from_fragments(&attrs)?
        }
    };
    if matrix.is_empty() || matrix.iter().all(Vec::is_empty) {
        return None;
    }
    let class = markup::resolve_class(attrs.class_name(), TABLE_CLASS);
    Some(markup::html_block(&render_table(
        &matrix,
        &class,
        attrs.flag_or("headerRow", true),
    )))
}

/// `p-dos-donts` → two-column table under a Do / Don't header.
pub fn dos_donts(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if !block.is_self_closing() {
        return None;
    }
    let attrs = Attrs::parse(block.attrs);
    let items = cells_array(&attrs)?;
    if items.is_empty() {
        return None;
    }

    let mut matrix = vec![vec![
        Cell::new(present(attrs.html("doTitle")).unwrap_or_else(|| "Do".to_string())),
        Cell::new(present(attrs.html("dontTitle")).unwrap_or_else(|| "Don't".to_string())),
    ]];
    for item in &items {
        let Value::Object(map) = item else {
            debug!("dos-donts entry is not an object");
            return None;
        };
        let side = |key: &str| map.get(key).map(value_text).unwrap_or_default();
        matrix.push(vec![Cell::new(side("do")), Cell::new(side("dont"))]);
    }

    let class = markup::resolve_class(attrs.class_name(), DOS_DONTS_CLASS);
    Some(markup::html_block(&render_table(&matrix, &class, true)))
}

/// `p-comparison` with `p-comparison-row` children, one table row each.
pub fn comparison(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if block.is_self_closing() || has_stray_content(block, &["p-comparison-row"]) {
        return None;
    }
    let rows = block.child_blocks("p-comparison-row");
    if rows.is_empty() {
        return None;
    }
    let matrix = rows
        .iter()
        .map(|row| {
            let attrs = Attrs::parse(row.attrs);
            let items = cells_array(&attrs)?;
            Some(matrix_from(&items).into_iter().flatten().collect::<Vec<_>>())
        })
        .collect::<Option<Matrix>>()?;

    let attrs = Attrs::parse(block.attrs);
    let class = markup::resolve_class(attrs.class_name(), COMPARISON_CLASS);
    Some(markup::html_block(&render_table(
        &matrix,
        &class,
        attrs.flag_or("headerRow", true),
    )))
}

/// `p-hints` → table from nested rows and cells, or from the legacy table
/// rendered inside.
pub fn hints(block: &Block<'_>, _: &Context<'_>) -> Option<String> {
    if block.is_self_closing() {
        return None;
    }
    let attrs = Attrs::parse(block.attrs);
    let class = markup::resolve_class(attrs.class_name(), HINTS_CLASS);

    let rows = block.child_blocks("p-hints-row");
    if rows.is_empty() {
        let legacy = html::inner(block.inner(), "table")?;
        return Some(markup::html_block(&format!(
            "<table{}>{}</table>",
            class_attr(&class),
            legacy
        )));
    }
    if has_stray_content(block, &["p-hints-row"]) {
        return None;
    }
    if rows
        .iter()
        .any(|row| has_stray_content(row, &["p-hints-cell"]) || row.child_blocks("p-hints-cell").is_empty())
    {
        debug!("p-hints row with content besides its cells");
        return None;
    }

    let matrix: Matrix = rows
        .iter()
        .map(|row| {
            row.child_blocks("p-hints-cell")
                .into_iter()
                .map(|cell| {
                    let cell_attrs = Attrs::parse(cell.attrs);
                    let content = present(cell_attrs.html("content"))
                        .unwrap_or_else(|| cell.inner().trim().to_string());
                    Cell::from_attrs(&cell_attrs, content)
                })
                .collect()
        })
        .collect();

    Some(markup::html_block(&render_table(
        &matrix,
        &class,
        attrs.flag_or("headerRow", true),
    )))
}

/// Anything but whitespace and the expected child blocks.
fn has_stray_content(block: &Block<'_>, allowed: &[&str]) -> bool {
    block.children.iter().flatten().any(|node| match node {
        Node::Text(t) => !t.trim().is_empty(),
        Node::Block(b) => !allowed.contains(&b.name),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::rules::testing::convert_first;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn table_from_string_payload() {
        let input = concat!(
            r#"<!-- wp:slgb/table {"cells":"[[{u0022contentu0022:u0022Nameu0022},{u0022contentu0022:u0022Ageu0022}],"#,
            r#"[{u0022contentu0022:u0022Annu0022},{u0022contentu0022:u002230u0022}]]"} /-->"#
        );
        let out = convert_first(input, table).unwrap();
        assert_eq!(
            out,
            concat!(
                "<!-- wp:html -->\n",
                "<table class=\"slgb-table-converted\"><tbody>",
                "<tr><th>Name</th><th>Age</th></tr>",
                "<tr><td>Ann</td><td>30</td></tr>",
                "</tbody></table>\n",
                "<!-- /wp:html -->"
            )
        );
    }

    #[test]
    fn table_shape_and_spans() {
        let input = r#"<!-- wp:slgb/table {"className":"pricing","cells":[[{"content":"Plan","cols":2},{"content":"Price"}],[{"content":"Basic","rows":2},{"content":"A"},{"content":"$1"}],[{"content":"B"},{"content":"$2"}]]} /-->"#;
        let out = convert_first(input, table).unwrap();
        assert_eq!(count(&out, "<tr>"), 3);
        assert_eq!(count(&out, "<th"), 2);
        assert_eq!(count(&out, "<td"), 5);
        assert!(out.contains(r#"<th colspan="2">Plan</th>"#));
        assert!(out.contains(r#"<td rowspan="2">Basic</td>"#));
        assert!(out.contains(r#"<table class="pricing">"#));
        assert!(!out.contains("colspan=\"1\""));
    }

    #[test]
    fn header_row_can_be_disabled() {
        let input = r#"<!-- wp:slgb/table {"headerRow":false,"cells":[[{"content":"a"}],[{"content":"b"}]]} /-->"#;
        let out = convert_first(input, table).unwrap();
        assert_eq!(count(&out, "<th"), 0);
        assert_eq!(count(&out, "<td>"), 2);
    }

    #[test]
    fn table_falls_back_to_fragments() {
        // the outer cells array is never closed
        let input = concat!(
            r#"<!-- wp:slgb/table {"cells":"[[{u0022contentu0022:u0022Au0022,u0022colsu0022:2}],"#,
            r#"[{u0022contentu0022:u0022Bu0022},{u0022contentu0022:u0022Cu0022}]"#,
            r#"","className":"x"} /-->"#
        );
        let out = convert_first(input, table).unwrap();
        assert!(out.contains(r#"<tr><th colspan="2">A</th></tr><tr><td>B</td><td>C</td></tr>"#));
    }

    #[test]
    fn empty_table_is_kept() {
        assert_eq!(convert_first(r#"<!-- wp:slgb/table {"cells":"[]"} /-->"#, table), None);
        assert_eq!(convert_first(r#"<!-- wp:slgb/table {"title":"x"} /-->"#, table), None);
    }

    #[test]
    fn dos_donts_table() {
        let input = r#"<!-- wp:slgb/p-dos-donts {"doTitle":"Yes","cells":"[{u0022dou0022:u0022Sleepu0022,u0022dontu0022:u0022Skipu0022},{u0022dou0022:u0022Walku0022}]"} /-->"#;
        let out = convert_first(input, dos_donts).unwrap();
        assert!(out.contains(r#"<table class="slgb-dos-donts-converted">"#));
        assert!(out.contains("<tr><th>Yes</th><th>Don't</th></tr>"));
        assert!(out.contains("<tr><td>Sleep</td><td>Skip</td></tr>"));
        assert!(out.contains("<tr><td>Walk</td><td></td></tr>"));
    }

    #[test]
    fn comparison_rows() {
        let input = concat!(
            "<!-- wp:slgb/p-comparison -->\n",
            r#"<!-- wp:slgb/p-comparison-row {"cells":[{"content":""},{"content":"Pro"}]} /-->"#,
            "\n",
            r#"<!-- wp:slgb/p-comparison-row {"cells":[{"content":"Price"},{"content":"$9"}]} /-->"#,
            "\n<!-- /wp:slgb/p-comparison -->"
        );
        let out = convert_first(input, comparison).unwrap();
        assert!(out.contains("<tr><th></th><th>Pro</th></tr><tr><td>Price</td><td>$9</td></tr>"));
    }

    #[test]
    fn comparison_with_broken_row_is_kept() {
        let input = concat!(
            "<!-- wp:slgb/p-comparison -->",
            r#"<!-- wp:slgb/p-comparison-row {"cells":[{"content":"ok"}]} /-->"#,
            r#"<!-- wp:slgb/p-comparison-row {"title":"no cells"} /-->"#,
            "<!-- /wp:slgb/p-comparison -->"
        );
        assert_eq!(convert_first(input, comparison), None);
    }

    #[test]
    fn hints_from_nested_cells() {
        let input = concat!(
            "<!-- wp:slgb/p-hints {\"className\":\"tips\"} -->\n",
            "<!-- wp:slgb/p-hints-row -->",
            "<!-- wp:slgb/p-hints-cell {\"cols\":2} --> <b>Tip</b> <!-- /wp:slgb/p-hints-cell -->",
            "<!-- /wp:slgb/p-hints-row -->\n",
            "<!-- wp:slgb/p-hints-row -->",
            "<!-- wp:slgb/p-hints-cell {\"content\":\"Drink u0026 rest\"} --><!-- /wp:slgb/p-hints-cell -->",
            "<!-- wp:slgb/p-hints-cell -->Sleep<!-- /wp:slgb/p-hints-cell -->",
            "<!-- /wp:slgb/p-hints-row -->\n",
            "<!-- /wp:slgb/p-hints -->"
        );
        let out = convert_first(input, hints).unwrap();
        assert!(out.contains(
            "<table class=\"tips\"><tbody><tr><th colspan=\"2\"><b>Tip</b></th></tr><tr><td>Drink & rest</td><td>Sleep</td></tr></tbody></table>"
        ));
    }

    #[test]
    fn hints_from_legacy_table() {
        let input = "<!-- wp:slgb/p-hints --><div><table><tr><td>a</td></tr></table></div><!-- /wp:slgb/p-hints -->";
        let out = convert_first(input, hints).unwrap();
        assert!(out.contains("<table class=\"slgb-hints-converted\"><tr><td>a</td></tr></table>"));
    }

    #[test]
    fn hints_row_with_loose_text_is_kept() {
        let input = concat!(
            "<!-- wp:slgb/p-hints -->",
            "<!-- wp:slgb/p-hints-row -->loose text",
            "<!-- wp:slgb/p-hints-cell -->Sleep<!-- /wp:slgb/p-hints-cell -->",
            "<!-- /wp:slgb/p-hints-row -->",
            "<!-- /wp:slgb/p-hints -->"
        );
        assert_eq!(convert_first(input, hints), None);
    }

    #[test]
    fn hints_without_rows_or_table_is_kept() {
        assert_eq!(
            convert_first("<!-- wp:slgb/p-hints --><p>x</p><!-- /wp:slgb/p-hints -->", hints),
            None
        );
    }
}
