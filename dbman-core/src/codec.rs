//! Comma-delimited CSV codec shared by every adapter.
//!
//! The format is deliberately minimal: a header line, then one line per row,
//! values separated by a single comma. There is no quoting. Export escapes a
//! literal comma inside a value as `\,`; import splits naively and does not
//! undo that escape, so a value exported with a comma re-imports with the
//! two-character sequence `\,` in place of the comma.
//!
//! # Line handling
//! - `\r` is stripped so CRLF files decode like LF files
//! - only the terminator after the last row is dropped; every row including
//!   the last is written with a trailing newline
//! - entirely blank lines are skipped unless the header has a single field,
//!   where a blank line is a legitimate empty value

use crate::error::{DbManError, Result};
use crate::models::{FieldSet, TabularRecord};
use std::path::Path;

/// Field delimiter.
pub const DELIMITER: char = ',';

/// Escaped form of the delimiter inside exported values.
pub const ESCAPED_DELIMITER: &str = "\\,";

/// A decoded CSV file: header plus raw positional rows.
///
/// Rows are kept as read, without checking their width against the header;
/// strict and tolerant targets apply their own policy through
/// [`CsvTable::strict_records`] and [`CsvTable::record_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub header: FieldSet,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the file had a header but no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts one data row into a record, failing on a width mismatch.
    pub fn record_at(&self, index: usize) -> Result<TabularRecord> {
        let row = self.rows.get(index).ok_or_else(|| {
            DbManError::malformed(format!("row index {} out of range", index))
        })?;
        if row.len() != self.header.len() {
            return Err(DbManError::malformed(format!(
                "line {}: expected {} columns, found {}",
                data_line_number(index),
                self.header.len(),
                row.len()
            )));
        }
        TabularRecord::from_values(&self.header, row.clone())
    }

    /// Converts every row, stopping at the first width mismatch.
    ///
    /// Used by schema-on-write targets so that nothing is inserted from a
    /// file that contains a malformed row.
    pub fn strict_records(&self) -> Result<Vec<TabularRecord>> {
        (0..self.rows.len()).map(|i| self.record_at(i)).collect()
    }
}

/// 1-based file line of a data row (the header is line 1).
pub fn data_line_number(row_index: usize) -> usize {
    row_index.saturating_add(2)
}

/// Splits raw CSV text into lines of naive comma-separated cells.
///
/// No header interpretation happens here; key-value import reads pairs
/// positionally from these cells.
pub fn split_lines(text: &str) -> Vec<Vec<String>> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
        .into_iter()
        .map(|line| split_row(&line.replace('\r', "")))
        .collect()
}

fn split_row(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(str::to_string).collect()
}

/// Decodes CSV text into a header and data rows.
///
/// Fails with `MalformedInput` when the text is empty or the header repeats
/// a field name. Header names are trimmed; values are kept verbatim.
pub fn decode(text: &str) -> Result<CsvTable> {
    let mut lines = split_lines(text).into_iter();
    let header_cells = lines
        .next()
        .filter(|cells| !(cells.len() == 1 && cells[0].trim().is_empty()))
        .ok_or_else(|| DbManError::malformed("CSV input is empty, expected a header line"))?;

    let header = FieldSet::from_header(header_cells.iter().map(|c| c.trim().to_string()))?;
    let single_field = header.len() == 1;

    let rows = lines
        .filter(|cells| single_field || !(cells.len() == 1 && cells[0].is_empty()))
        .collect();

    Ok(CsvTable { header, rows })
}

/// Escapes the delimiter inside a value.
pub fn escape_value(value: &str) -> String {
    value.replace(DELIMITER, ESCAPED_DELIMITER)
}

/// Encodes positional rows under a header.
///
/// Every row must already be laid out in `fields` order.
pub fn encode_rows<R>(fields: &FieldSet, rows: &[R]) -> String
where
    R: AsRef<[String]>,
{
    let mut out = String::new();
    push_line(&mut out, fields.iter().map(String::as_str));
    for row in rows {
        push_line(&mut out, row.as_ref().iter().map(String::as_str));
    }
    out
}

/// Encodes records in `fields` order; fields a record lacks are written empty
/// and fields outside `fields` are dropped.
pub fn encode(fields: &FieldSet, records: &[TabularRecord]) -> String {
    let rows: Vec<Vec<String>> = records.iter().map(|r| r.values_for(fields)).collect();
    encode_rows(fields, &rows)
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(&escape_value(cell));
    }
    out.push('\n');
}

/// Reads and decodes a CSV file.
///
/// A missing file is reported as `NotFound`.
pub async fn read_csv_file(path: &Path) -> Result<CsvTable> {
    let text = read_text(path).await?;
    decode(&text)
}

/// Reads a CSV file as raw lines of cells, without header interpretation.
pub async fn read_csv_lines(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = read_text(path).await?;
    Ok(split_lines(&text))
}

async fn read_text(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DbManError::not_found("File", path.display().to_string()))
        }
        Err(e) => Err(DbManError::io(
            format!("Failed to read CSV file {}", path.display()),
            e,
        )),
    }
}

/// Writes encoded CSV text to `path`, replacing any existing file.
pub async fn write_csv_file(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents).await.map_err(|e| {
        DbManError::io(format!("Failed to write CSV file {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fields(names: &[&str]) -> FieldSet {
        FieldSet::from_header(names.iter().copied()).unwrap()
    }

    #[test]
    fn test_decode_basic() {
        let table = decode("name,age\nAna,30\nBo,25\n").unwrap();
        assert_eq!(table.header, fields(&["name", "age"]));
        assert_eq!(
            table.rows,
            vec![vec!["Ana".to_string(), "30".to_string()], vec![
                "Bo".to_string(),
                "25".to_string()
            ]]
        );
    }

    #[test]
    fn test_decode_crlf_and_missing_final_newline() {
        let table = decode("a,b\r\n1,2\r\n3,4").unwrap();
        assert_eq!(table.header, fields(&["a", "b"]));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["3".to_string(), "4".to_string()]);
    }

    #[test]
    fn test_decode_trims_header_names() {
        let table = decode(" name , age \nAna, 30\n").unwrap();
        assert_eq!(table.header, fields(&["name", "age"]));
        assert_eq!(table.rows[0][1], " 30");
    }

    #[test]
    fn test_decode_empty_input_is_malformed() {
        assert!(matches!(
            decode(""),
            Err(DbManError::MalformedInput { .. })
        ));
        assert!(matches!(
            decode("\n"),
            Err(DbManError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_decode_duplicate_header_is_malformed() {
        assert!(matches!(
            decode("a,a\n1,2\n"),
            Err(DbManError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_decode_skips_blank_lines_for_multi_field_header() {
        let table = decode("a,b\n1,2\n\n3,4\n\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_decode_keeps_blank_line_for_single_field_header() {
        let table = decode("a\nx\n\ny\n").unwrap();
        assert_eq!(
            table.rows,
            vec![vec!["x".to_string()], vec![String::new()], vec!["y".to_string()]]
        );
    }

    #[test]
    fn test_header_only_file() {
        let table = decode("name,age\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.header.len(), 2);
    }

    #[test]
    fn test_strict_records_reports_line_number() {
        let table = decode("a,b\n1,2\n3\n").unwrap();
        let err = table.strict_records().unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
        assert!(err.to_string().contains("expected 2 columns, found 1"));
    }

    #[test]
    fn test_encode_escapes_commas_and_terminates_every_row() {
        let set = fields(&["city", "note"]);
        let rows = vec![vec!["Paris".to_string(), "big, old".to_string()]];
        assert_eq!(encode_rows(&set, &rows), "city,note\nParis,big\\, old\n");
    }

    #[test]
    fn test_encode_header_only() {
        let set = fields(&["name", "age"]);
        let rows: Vec<Vec<String>> = Vec::new();
        assert_eq!(encode_rows(&set, &rows), "name,age\n");
    }

    #[test]
    fn test_encode_records_projects_onto_field_set() {
        let set = fields(&["a", "b"]);
        let records = vec![
            TabularRecord::from_pairs(vec![("b".into(), "2".into()), ("c".into(), "9".into())])
                .unwrap(),
        ];
        assert_eq!(encode(&set, &records), "a,b\n,2\n");
    }

    #[test]
    fn test_escape_is_not_reversed_on_import() {
        let set = fields(&["v"]);
        let encoded = encode_rows(&set, &[vec!["1,5".to_string()]]);
        let table = decode(&encoded).unwrap();
        // naive split: the escaped comma still splits the cell
        assert_eq!(table.rows[0], vec!["1\\".to_string(), "5".to_string()]);

        let set = fields(&["a", "b"]);
        let encoded = encode_rows(&set, &[vec!["x,y".to_string(), "z".to_string()]]);
        let table = decode(&encoded).unwrap();
        assert_eq!(table.rows[0][0], "x\\");
        assert!(table.rows[0].concat().contains('\\'));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_csv_file(&dir.path().join("nope.csv")).await;
        assert!(matches!(result, Err(DbManError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let set = fields(&["name", "age"]);
        write_csv_file(&path, &encode_rows(&set, &[vec![
            "Ana".to_string(),
            "30".to_string(),
        ]]))
        .await
        .unwrap();

        let table = read_csv_file(&path).await.unwrap();
        assert_eq!(table.header, set);
        assert_eq!(table.rows.len(), 1);
    }

    fn table_strategy() -> impl Strategy<Value = (Vec<String>, Vec<Vec<String>>)> {
        prop::collection::btree_set("[a-z][a-z0-9_]{0,6}", 1..6).prop_flat_map(|names| {
            let names: Vec<String> = names.into_iter().collect();
            let width = names.len();
            let rows = prop::collection::vec(
                prop::collection::vec("[A-Za-z0-9 _.:-]{0,10}", width),
                0..12,
            );
            (Just(names), rows)
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip_without_delimiter((names, rows) in table_strategy()) {
            // a multi-field row of all-empty values is encoded as delimiters
            // only, so it never collides with the blank-line rule
            let set = FieldSet::from_header(names.clone()).unwrap();
            let encoded = encode_rows(&set, &rows);
            let decoded = decode(&encoded).unwrap();
            prop_assert_eq!(decoded.header, set);
            prop_assert_eq!(decoded.rows, rows);
        }
    }
}
