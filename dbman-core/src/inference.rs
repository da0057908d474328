//! Field set inference for schemaless stores.
//!
//! Document and graph stores have no declared columns, so export derives its
//! header by sampling. The inferrer looks at up to [`SAMPLE_BOUND`] records,
//! unions their field names in first-seen order, drops backend-internal
//! identity fields and then freezes the result.
//!
//! # Known limitation
//! Fields that first appear after the sample bound are not part of the
//! frozen set. Records carrying them are truncated to the sampled fields on
//! export. Scanning the whole corpus would need a second full pass.

use crate::models::FieldSet;

/// Maximum number of records sampled before the field set is frozen.
pub const SAMPLE_BOUND: usize = 100;

/// Accumulates field names from sampled records.
#[derive(Debug, Clone)]
pub struct FieldSetInferrer {
    fields: FieldSet,
    excluded: Vec<String>,
    bound: usize,
    sampled: usize,
}

impl Default for FieldSetInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSetInferrer {
    /// Creates an inferrer with the default sample bound and no exclusions.
    pub fn new() -> Self {
        Self {
            fields: FieldSet::new(),
            excluded: Vec::new(),
            bound: SAMPLE_BOUND,
            sampled: 0,
        }
    }

    /// Excludes a backend-internal identity field such as `_id`.
    pub fn excluding(mut self, field: impl Into<String>) -> Self {
        self.excluded.push(field.into());
        self
    }

    /// True once the sample bound has been reached.
    fn is_saturated(&self) -> bool {
        self.sampled >= self.bound
    }

    /// Observes the field names of one record.
    ///
    /// Returns `false` without looking at the names once the bound is
    /// reached.
    pub fn observe<'a, I>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.is_saturated() {
            return false;
        }
        self.sampled = self.sampled.saturating_add(1);
        for name in names {
            if !self.excluded.iter().any(|e| e == name) {
                self.fields.insert(name);
            }
        }
        true
    }

    /// Freezes the accumulated field set.
    pub fn freeze(self) -> FieldSet {
        tracing::debug!(
            "Inferred {} fields from {} sampled records",
            self.fields.len(),
            self.sampled
        );
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(records: &[&[&str]], excluded: &[&str]) -> FieldSet {
        let mut inferrer = excluded
            .iter()
            .fold(FieldSetInferrer::new(), |inf, field| inf.excluding(*field));
        for names in records {
            if !inferrer.observe(names.iter().copied()) {
                break;
            }
        }
        inferrer.freeze()
    }

    #[test]
    fn test_union_in_first_seen_order() {
        let set = infer(&[&["b", "a"], &["c", "a"]], &[]);
        assert_eq!(set.names(), ["b", "a", "c"].map(String::from));
    }

    #[test]
    fn test_internal_id_excluded() {
        let set = infer(&[&["_id", "name"]], &["_id"]);
        assert_eq!(set.names(), ["name".to_string()]);
    }

    #[test]
    fn test_field_set_freezes_at_sample_bound() {
        let early: &[&str] = &["a", "b"];
        let late: &[&str] = &["c"];
        let mut records = vec![early; SAMPLE_BOUND];
        records.push(late);

        let set = infer(&records, &[]);
        assert_eq!(set.names(), ["a", "b"].map(String::from));
        assert!(!set.contains("c"));
    }

    #[test]
    fn test_observe_reports_saturation() {
        let mut inferrer = FieldSetInferrer::new();
        for _ in 0..SAMPLE_BOUND {
            assert!(inferrer.observe(["x"]));
        }
        assert!(inferrer.is_saturated());
        assert!(!inferrer.observe(["y"]));
        assert_eq!(inferrer.freeze().names(), ["x".to_string()]);
    }

    #[test]
    fn test_empty_sample_yields_empty_set() {
        let set = infer(&[], &["_id"]);
        assert!(set.is_empty());
    }
}
