//! BSON value rendering for CSV cells and describe reports.

use crate::models::{FieldSet, TabularRecord};
use mongodb::bson::{Bson, Document};

/// Short type name of a BSON value, as used by the MongoDB shell.
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::String(_) => "string",
        Bson::Int32(_) => "int32",
        Bson::Int64(_) => "int64",
        Bson::Double(_) => "double",
        Bson::Boolean(_) => "bool",
        Bson::DateTime(_) => "date",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => "javascript",
        Bson::Symbol(_) => "symbol",
        Bson::Decimal128(_) => "decimal",
        Bson::MinKey => "minKey",
        Bson::MaxKey => "maxKey",
        Bson::Undefined => "undefined",
        Bson::DbPointer(_) => "dbPointer",
    }
}

/// Renders a value as a flat string.
///
/// Scalars render plainly (strings unquoted, null empty); documents, arrays
/// and the remaining types render as relaxed extended JSON.
pub fn bson_to_string(value: &Bson) -> String {
    match value {
        Bson::String(s) | Bson::Symbol(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) => n.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::Null | Bson::Undefined => String::new(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

/// Renders a whole document as relaxed extended JSON.
pub fn document_to_json(doc: &Document) -> String {
    Bson::Document(doc.clone())
        .into_relaxed_extjson()
        .to_string()
}

/// Values of a document in `fields` order; missing fields are empty and
/// fields outside the set are dropped.
pub fn project_document(doc: &Document, fields: &FieldSet) -> Vec<String> {
    fields
        .iter()
        .map(|name| doc.get(name).map(bson_to_string).unwrap_or_default())
        .collect()
}

/// Builds a document whose values are the record's strings, verbatim.
pub fn record_to_document(record: &TabularRecord) -> Document {
    record
        .pairs()
        .iter()
        .map(|(k, v)| (k.clone(), Bson::String(v.clone())))
        .collect()
}
