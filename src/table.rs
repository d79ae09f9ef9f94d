//! Raw table extraction.
//!
//! Converts a detail page's `<table>` markup into an ordered grid of cells
//! carrying their `rowspan`/`colspan` attributes, so the parsing strategies
//! never touch the DOM directly.

use scraper::{ElementRef, Html, Selector};

use crate::text::clean_text;

/// One table cell with its span attributes (default 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    pub text: String,
    pub rowspan: u32,
    pub colspan: u32,
}

impl RawCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rowspan: 1,
            colspan: 1,
        }
    }

    pub fn spanned(text: impl Into<String>, rowspan: u32, colspan: u32) -> Self {
        Self {
            text: text.into(),
            rowspan,
            colspan,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.rowspan > 1 || self.colspan > 1
    }
}

/// An ordered sequence of rows, scoped to one detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<RawCell>>) -> Self {
        Self { rows }
    }

    /// Build from a `<table>` element.
    pub fn from_element(table: ElementRef<'_>) -> Self {
        let row_sel = Selector::parse("tr").expect("tr selector");
        let cell_sel = Selector::parse("td, th").expect("cell selector");

        let rows = table
            .select(&row_sel)
            .map(|row| {
                row.select(&cell_sel)
                    .map(|cell| RawCell {
                        text: clean_text(&cell.text().collect::<String>()),
                        rowspan: span_attr(cell, "rowspan"),
                        colspan: span_attr(cell, "colspan"),
                    })
                    .collect()
            })
            .collect();

        Self { rows }
    }
}

fn span_attr(cell: ElementRef<'_>, attr: &str) -> u32 {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&v| v >= 1)
        .unwrap_or(1)
}

/// Tables on a detail page that look like penalty tables.
///
/// The site publishes Word-exported markup, so known classes are tried
/// first; failing that, any table is a candidate.
pub fn extract_penalty_tables(html: &str) -> Vec<RawTable> {
    let doc = Html::parse_document(html);
    let known = Selector::parse("table.MsoTableGrid, table.MsoNormalTable")
        .expect("table class selector");
    let any = Selector::parse("table").expect("table selector");

    let mut elements: Vec<ElementRef<'_>> = doc.select(&known).collect();
    if elements.is_empty() {
        elements = doc.select(&any).collect();
    }

    elements.into_iter().map(RawTable::from_element).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_element_reads_spans() {
        let html = r#"<table><tr><td rowspan="2">a</td><td>b</td></tr><tr><td>c</td></tr></table>"#;
        let tables = extract_penalty_tables(html);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], RawCell::spanned("a", 2, 1));
        assert_eq!(table.rows[0][1], RawCell::new("b"));
        assert!(table.rows[0][0].is_merged());
    }

    #[test]
    fn test_invalid_span_defaults_to_one() {
        let html = r#"<table><tr><td rowspan="x" colspan="0">a</td></tr></table>"#;
        let tables = extract_penalty_tables(html);
        assert_eq!(tables[0].rows[0][0], RawCell::new("a"));
    }

    #[test]
    fn test_known_class_preferred_over_first_table() {
        let html = r#"
            <table><tr><td>layout</td></tr></table>
            <table class="MsoNormalTable"><tr><td>当事人名称</td><td>某银行</td></tr></table>
        "#;
        let tables = extract_penalty_tables(html);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0][0].text, "当事人名称");
    }
}
