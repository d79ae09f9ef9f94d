//! Key-value table parsing.
//!
//! Two-column tables describe exactly one penalty: cell 0 is the label,
//! cell 1 the value. Labels go through the canonical rule table; anything
//! unrecognized is preserved verbatim rather than dropped.

use crate::models::FieldRecord;
use crate::parse::fields::match_label;
use crate::table::RawCell;
use crate::text::clean_text;

/// Map label/value rows into a single record.
pub fn parse_kv(rows: &[Vec<RawCell>]) -> FieldRecord {
    let mut record = FieldRecord::default();

    for row in rows {
        if row.len() < 2 {
            continue;
        }
        let label = clean_text(&row[0].text);
        let value = clean_text(&row[1].text);
        if label.is_empty() || value.is_empty() {
            continue;
        }

        match match_label(&label) {
            Some(field) => record.set(field, value),
            None => {
                record.extra.insert(label, value);
            }
        }
    }

    record
}
