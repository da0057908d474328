//! Rendering of `Any` row values as strings.

use sqlx::Row;
use sqlx::any::AnyRow;

/// Renders one column of a row, `None` for SQL NULL.
///
/// The `Any` driver exposes only a handful of value kinds, so the decoder
/// tries them in order of likelihood. Binary data is rendered as base64.
pub fn column_to_string(row: &AnyRow, index: usize) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(|b| b.to_string());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.map(|bytes| match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                use base64::Engine;
                format!(
                    "base64:{}",
                    base64::engine::general_purpose::STANDARD.encode(e.as_bytes())
                )
            }
        });
    }
    None
}

/// Renders every column of a row; NULL becomes the empty string.
pub fn row_to_strings(row: &AnyRow) -> Vec<String> {
    (0..row.len())
        .map(|i| column_to_string(row, i).unwrap_or_default())
        .collect()
}

/// Renders every column of a row for display; NULL becomes `NULL`.
pub fn row_to_display(row: &AnyRow) -> Vec<String> {
    (0..row.len())
        .map(|i| column_to_string(row, i).unwrap_or_else(|| "NULL".to_string()))
        .collect()
}
