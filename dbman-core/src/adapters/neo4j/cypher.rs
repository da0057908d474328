//! Cypher statement text.
//!
//! Labels and property names are validated identifiers before they reach
//! these functions; they are still backtick-quoted. Values always travel as
//! parameters.

use crate::inference::SAMPLE_BOUND;
use crate::models::FieldSet;

/// Labels present in the database, sorted.
pub const LIST_LABELS: &str = "CALL db.labels() YIELD label RETURN label ORDER BY label";

/// Removes every node together with its relationships.
pub const DETACH_DELETE_ALL: &str = "MATCH (n) DETACH DELETE n";

/// Round-trip used by ping.
pub const PING: &str = "RETURN 1 AS ok";

/// Quotes a label or property name with backticks.
pub fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Parameter name for the property at `index`.
pub fn param_name(index: usize) -> String {
    format!("p{}", index)
}

/// `CREATE` for one node with every field bound to a positional parameter.
pub fn create_node(label: &str, fields: &FieldSet) -> String {
    let properties: Vec<String> = fields
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}: ${}", quote(name), param_name(i)))
        .collect();
    if properties.is_empty() {
        format!("CREATE (n:{})", quote(label))
    } else {
        format!("CREATE (n:{} {{{}}})", quote(label), properties.join(", "))
    }
}

/// Property keys of the first nodes under a label, for field inference.
pub fn sample_keys(label: &str) -> String {
    format!(
        "MATCH (n:{}) RETURN keys(n) AS keys LIMIT {}",
        quote(label),
        SAMPLE_BOUND
    )
}

/// Property maps of every node under a label.
pub fn all_properties(label: &str) -> String {
    format!("MATCH (n:{}) RETURN properties(n) AS props", quote(label))
}

/// Keys and properties of one node under a label.
pub fn first_node(label: &str) -> String {
    format!(
        "MATCH (n:{}) RETURN keys(n) AS keys, properties(n) AS props LIMIT 1",
        quote(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node_binds_every_field() {
        let fields = FieldSet::from_header(["name", "age"]).unwrap();
        assert_eq!(
            create_node("Person", &fields),
            "CREATE (n:`Person` {`name`: $p0, `age`: $p1})"
        );
    }

    #[test]
    fn test_create_node_without_fields() {
        assert_eq!(create_node("Tag", &FieldSet::new()), "CREATE (n:`Tag`)");
    }

    #[test]
    fn test_quote_doubles_backticks() {
        assert_eq!(quote("a`b"), "`a``b`");
    }

    #[test]
    fn test_sample_is_bounded() {
        assert_eq!(
            sample_keys("users"),
            "MATCH (n:`users`) RETURN keys(n) AS keys LIMIT 100"
        );
    }
}
