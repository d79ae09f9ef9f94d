//! Grid table parsing, including merged-cell reconstruction.
//!
//! Multi-party decisions come as a header row plus one data row per party.
//! When the document shares a column across parties (one decision number
//! for the whole batch, say) the site emits `rowspan`/`colspan` merges, and
//! the physical rows no longer line up with the headers. Those tables are
//! rebuilt on a virtual grid before mapping.

use std::collections::HashMap;

use crate::models::FieldRecord;
use crate::parse::fields::match_label;
use crate::table::RawCell;
use crate::text::clean_text;

/// Parse a grid table's data rows into one record per party.
///
/// Single data row: one record, no sequence tag. Multiple rows: each row
/// becomes a record tagged with its 1-based position in the announcement;
/// the first is the primary, the rest inherit shared fields downstream.
pub fn parse_grid(headers: &[String], data_rows: &[Vec<RawCell>]) -> Vec<FieldRecord> {
    if headers.is_empty() || data_rows.is_empty() {
        return Vec::new();
    }

    if data_rows.len() == 1 {
        let texts: Vec<String> = data_rows[0]
            .iter()
            .map(|cell| clean_text(&cell.text))
            .collect();
        let record = map_row(headers, &texts);
        if record.is_blank() {
            return Vec::new();
        }
        return vec![record];
    }

    let has_merged = data_rows
        .iter()
        .any(|row| row.iter().any(RawCell::is_merged));
    if has_merged {
        return parse_merged(headers, data_rows);
    }

    let mut records = Vec::new();
    for (row_idx, row) in data_rows.iter().enumerate() {
        let texts: Vec<String> = row.iter().map(|cell| clean_text(&cell.text)).collect();
        let mut record = map_row(headers, &texts);
        if record.is_blank() {
            continue;
        }
        record.sequence = Some(row_idx as u32 + 1);
        records.push(record);
    }
    records
}

/// Map one reconstructed row of header/value pairs into a record. Empty
/// cells are skipped; unmatched headers are preserved verbatim.
fn map_row(headers: &[String], values: &[String]) -> FieldRecord {
    let mut record = FieldRecord::default();
    for (header, value) in headers.iter().zip(values.iter()) {
        if value.is_empty() {
            continue;
        }
        match match_label(header) {
            Some(field) => record.set(field, value.clone()),
            None => {
                record.extra.insert(header.clone(), value.clone());
            }
        }
    }
    record
}

/// A cell placed on the virtual grid, remembering where it came from and
/// how far down it reaches.
#[derive(Debug, Clone)]
struct ArenaCell {
    text: String,
    origin_row: usize,
    rowspan: u32,
}

/// Sparse 2-D arena indexed by `(row, col)`.
///
/// Source cells are laid out left to right, skipping positions already
/// claimed by an earlier merge, and each cell's text fills its whole
/// `rowspan × colspan` footprint.
struct GridArena {
    cols: usize,
    rows: usize,
    cells: HashMap<(usize, usize), ArenaCell>,
}

impl GridArena {
    fn build(cols: usize, data_rows: &[Vec<RawCell>]) -> Self {
        let rows = data_rows.len();
        let mut cells: HashMap<(usize, usize), ArenaCell> = HashMap::new();

        for (row_idx, row) in data_rows.iter().enumerate() {
            let mut col_idx = 0usize;
            for cell in row {
                // Skip positions occupied by merges from earlier rows.
                while cells.contains_key(&(row_idx, col_idx)) {
                    col_idx += 1;
                }
                if col_idx >= cols {
                    break;
                }

                let text = clean_text(&cell.text);
                let row_end = (row_idx + cell.rowspan as usize).min(rows);
                let col_end = (col_idx + cell.colspan as usize).min(cols);
                for r in row_idx..row_end {
                    for c in col_idx..col_end {
                        cells.entry((r, c)).or_insert_with(|| ArenaCell {
                            text: text.clone(),
                            origin_row: row_idx,
                            rowspan: cell.rowspan,
                        });
                    }
                }

                col_idx += cell.colspan as usize;
            }
        }

        Self { cols, rows, cells }
    }

    /// Text at a logical position. A missing position inherits the nearest
    /// earlier fill at that column whose span still covers this row.
    fn value_at(&self, row: usize, col: usize) -> Option<&str> {
        if let Some(cell) = self.cells.get(&(row, col)) {
            return Some(&cell.text);
        }
        for prev in (0..row).rev() {
            if let Some(cell) = self.cells.get(&(prev, col)) {
                if cell.origin_row + cell.rowspan as usize > row {
                    return Some(&cell.text);
                }
            }
        }
        None
    }
}

/// Reconstruct a merged-cell table and map each logical row to a record.
///
/// Rows whose party-name column is empty after reconstruction carry only
/// carryover from merged parent cells and are dropped, not reported.
fn parse_merged(headers: &[String], data_rows: &[Vec<RawCell>]) -> Vec<FieldRecord> {
    let arena = GridArena::build(headers.len(), data_rows);

    let mut records = Vec::new();
    for row in 0..arena.rows {
        let values: Vec<String> = (0..arena.cols)
            .map(|col| arena.value_at(row, col).unwrap_or_default().to_string())
            .collect();
        let mut record = map_row(headers, &values);
        if record.party_name.trim().is_empty() {
            continue;
        }
        record.sequence = Some(row as u32 + 1);
        records.push(record);
    }
    records
}
