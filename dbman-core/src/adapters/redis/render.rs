//! Rendering of key contents and command replies.

use crate::models::FieldDescription;
use redis::Value;

/// Contents of one key, read according to its type.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyContents {
    Scalar(String),
    List(Vec<String>),
    Set(Vec<String>),
    OrderedSet(Vec<(String, f64)>),
    Mapping(Vec<(String, String)>),
}

/// Value kinds with a rendering, as reported by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    List,
    Set,
    OrderedSet,
    Mapping,
}

impl ValueKind {
    /// Maps a `TYPE` reply; `None` for `none` and types without a rendering
    /// (streams, modules).
    pub fn from_type(redis_type: &str) -> Option<Self> {
        match redis_type {
            "string" => Some(Self::Scalar),
            "list" => Some(Self::List),
            "set" => Some(Self::Set),
            "zset" => Some(Self::OrderedSet),
            "hash" => Some(Self::Mapping),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::List => "list",
            Self::Set => "set",
            Self::OrderedSet => "ordered-set",
            Self::Mapping => "mapping",
        }
    }
}

impl KeyContents {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::List(_) => ValueKind::List,
            Self::Set(_) => ValueKind::Set,
            Self::OrderedSet(_) => ValueKind::OrderedSet,
            Self::Mapping(_) => ValueKind::Mapping,
        }
    }

    /// One entry per element; samples are complete, never truncated.
    ///
    /// Lists and sets are named by position, ordered sets by member (sample
    /// is the score) and mappings by field.
    pub fn describe(&self) -> Vec<FieldDescription> {
        let kind = self.kind().name();
        let entry = |name: String, value: String| FieldDescription {
            name,
            sample: Some(value),
            declared_type: Some(kind.to_string()),
        };
        match self {
            Self::Scalar(value) => vec![entry("value".to_string(), value.clone())],
            Self::List(items) | Self::Set(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| entry(i.to_string(), item.clone()))
                .collect(),
            Self::OrderedSet(members) => members
                .iter()
                .map(|(member, score)| entry(member.clone(), score.to_string()))
                .collect(),
            Self::Mapping(fields) => fields
                .iter()
                .map(|(field, value)| entry(field.clone(), value.clone()))
                .collect(),
        }
    }

    /// Renders the whole value on one line: scalars verbatim, collections as
    /// JSON.
    pub fn render(&self) -> String {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::List(items) | Self::Set(items) => serde_json::Value::from(items.clone()).to_string(),
            Self::OrderedSet(members) => {
                let map: serde_json::Map<String, serde_json::Value> = members
                    .iter()
                    .map(|(member, score)| (member.clone(), serde_json::Value::from(*score)))
                    .collect();
                serde_json::Value::Object(map).to_string()
            }
            Self::Mapping(fields) => {
                let map: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(field, value)| (field.clone(), serde_json::Value::from(value.as_str())))
                    .collect();
                serde_json::Value::Object(map).to_string()
            }
        }
    }
}

/// Flattens a command reply into printable records.
///
/// Arrays and sets yield one record per element; maps yield `key: value`
/// records; everything else is a single record.
pub fn reply_to_records(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) | Value::Set(items) => {
            if items.is_empty() {
                vec!["(empty)".to_string()]
            } else {
                items.iter().map(render_value).collect()
            }
        }
        Value::Map(pairs) => pairs
            .iter()
            .map(|(k, v)| format!("{}: {}", render_value(k), render_value(v)))
            .collect(),
        other => vec![render_value(other)],
    }
}

/// Renders a single reply value the way `redis-cli` prints it.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Nil => "(nil)".to_string(),
        Value::Int(n) => format!("(integer) {}", n),
        Value::Double(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Okay => "OK".to_string(),
        Value::SimpleString(s) => s.clone(),
        Value::BulkString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Array(items) | Value::Set(items) => {
            let parts: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Map(pairs) => {
            let parts: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}: {}", render_value(k), render_value(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        other => format!("{:?}", other),
    }
}
