//! Table parsing strategies for penalty detail pages.
//!
//! The same site renders single-party decisions as two-column key-value
//! tables and multi-party decisions as wide grids, with no explicit type
//! marker, so a keyword-gated classifier picks the strategy.

pub mod fallback;
pub mod fields;
pub mod grid;
pub mod key_value;

use crate::models::FieldRecord;
use crate::table::RawTable;
use crate::text::clean_text;

/// The two table shapes the site produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// Two-column label/value rows describing one party.
    KeyValue,
    /// Header row plus one data row per party, possibly with merged cells.
    Grid,
}

/// Header fragments that mark a grid-shaped penalty table.
const GRID_HEADER_KEYWORDS: &[&str] = &["序号", "当事人", "违法", "处罚", "机关"];

/// Decide which parsing strategy fits `table`.
///
/// A wide first row alone is not enough: some key-value tables pad with
/// empty cells. The shape is a grid only when the first row also carries a
/// recognizable header keyword.
pub fn classify(table: &RawTable) -> TableShape {
    let Some(first_row) = table.rows.first() else {
        return TableShape::KeyValue;
    };
    if first_row.len() >= 3 {
        let has_header_keyword = first_row.iter().any(|cell| {
            GRID_HEADER_KEYWORDS
                .iter()
                .any(|keyword| cell.text.contains(keyword))
        });
        if has_header_keyword {
            return TableShape::Grid;
        }
    }
    TableShape::KeyValue
}

/// Parse one table into records with the appropriate strategy.
///
/// Returns an empty vector when the table has too few rows to carry data;
/// the caller falls through to text extraction in that case.
pub fn parse_table(table: &RawTable) -> Vec<FieldRecord> {
    if table.rows.len() < 2 {
        return Vec::new();
    }
    match classify(table) {
        TableShape::KeyValue => {
            let record = key_value::parse_kv(&table.rows);
            if record.is_blank() {
                Vec::new()
            } else {
                vec![record]
            }
        }
        TableShape::Grid => {
            let headers: Vec<String> = table.rows[0]
                .iter()
                .map(|cell| clean_text(&cell.text))
                .collect();
            grid::parse_grid(&headers, &table.rows[1..])
        }
    }
}
