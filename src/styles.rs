/// Default look for the class names converted blocks fall back to.
pub const CONVERTED_BLOCKS_CSS: &str = r#".slgb-table-converted,
.slgb-hints-converted,
.slgb-dos-donts-converted,
.slgb-comparison-converted {
    border-collapse: collapse;
    width: 100%;
    margin-bottom: 1.5em;
}

.slgb-table-converted th,
.slgb-table-converted td,
.slgb-dos-donts-converted th,
.slgb-dos-donts-converted td,
.slgb-comparison-converted th,
.slgb-comparison-converted td {
    border: 1px solid #ddd;
    padding: 8px;
    text-align: left;
}

.slgb-table-converted th,
.slgb-hints-converted th,
.slgb-dos-donts-converted th,
.slgb-comparison-converted th {
    background-color: #f8f9fa;
    font-weight: bold;
}

.slgb-hints-converted th,
.slgb-hints-converted td {
    border: 1px solid #ddd;
    padding: 10px;
    vertical-align: top;
}

.slgb-subscribe-converted,
.slgb-cta-converted {
    background-color: #f8f9fa;
    padding: 20px;
    border-radius: 5px;
    text-align: center;
    margin: 1.5em 0;
}

.slgb-compare-converted {
    margin: 1.5em 0;
}

.slgb-compare-column {
    border: 1px solid #ddd;
    padding: 15px;
    border-radius: 5px;
}

.slgb-quote-converted {
    font-style: italic;
    border-left: 4px solid #888;
    padding-left: 1em;
}

.slgb-quote-photo img {
    border-radius: 50%;
    width: 64px;
    height: 64px;
    object-fit: cover;
}

.slgb-gb-emph-converted,
.slgb-emph {
    background-color: #f8f9fa;
    padding: 15px;
    border-left: 4px solid #0073aa;
    margin: 1.5em 0;
}

.slgb-miniature-converted {
    display: flex;
    gap: 1em;
    align-items: center;
    margin: 1.5em 0;
}

.slgb-miniature__image img {
    width: 120px;
    height: auto;
    border-radius: 5px;
}

.slgb-miniature__category,
.slgb-miniature__author {
    display: block;
    font-size: 0.85em;
    color: #666;
}

.slgb-miniature__text {
    margin: 0.5em 0;
}
"#;
