//! Profile file loading.
//!
//! A profile file is a flat list of `label.key=value` lines (`:` is accepted
//! in place of `=`). Lines starting with `#` or `;` are comments. Each label
//! becomes one [`ConnectionProfile`], in order of first appearance.

use super::profile::ConnectionProfile;
use crate::error::{DbManError, Result};
use std::collections::HashMap;
use std::path::Path;

/// All profiles of one file, in file order.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: Vec<ConnectionProfile>,
}

impl ProfileSet {
    /// Parses profile file text.
    ///
    /// # Errors
    /// `Configuration` for a line without a separator, a key without a
    /// `label.` prefix, or any profile that fails validation.
    pub fn parse(text: &str) -> Result<Self> {
        let mut order: Vec<String> = Vec::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index.saturating_add(1);
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                tracing::debug!("Skipping section header on line {}", line_no);
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| {
                    DbManError::configuration(format!(
                        "line {}: expected 'label.key=value'",
                        line_no
                    ))
                })?;
            let (label, setting) = key.trim().split_once('.').ok_or_else(|| {
                DbManError::configuration(format!(
                    "line {}: key '{}' has no profile label prefix",
                    line_no,
                    key.trim()
                ))
            })?;
            let label = label.trim();
            if label.is_empty() {
                return Err(DbManError::configuration(format!(
                    "line {}: empty profile label",
                    line_no
                )));
            }

            if !sections.contains_key(label) {
                order.push(label.to_string());
            }
            sections
                .entry(label.to_string())
                .or_default()
                .insert(setting.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let profiles = order
            .iter()
            .map(|label| {
                let properties = sections.get(label).cloned().unwrap_or_default();
                ConnectionProfile::from_properties(label, &properties)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Parsed {} connection profiles", profiles.len());
        Ok(Self { profiles })
    }

    /// Reads and parses a profile file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DbManError::configuration(format!(
                    "profile file {} does not exist",
                    path.display()
                ))
            } else {
                DbManError::io(format!("Failed to read profile file {}", path.display()), e)
            }
        })?;
        Self::parse(&text)
    }

    /// Looks up a profile by label.
    pub fn get(&self, label: &str) -> Result<&ConnectionProfile> {
        self.profiles
            .iter()
            .find(|p| p.label() == label)
            .ok_or_else(|| DbManError::not_found("Profile", label))
    }

    /// Labels in file order.
    pub fn labels(&self) -> Vec<&str> {
        self.profiles.iter().map(ConnectionProfile::label).collect()
    }

    /// Iterates profiles in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, ConnectionProfile> {
        self.profiles.iter()
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when the file defined no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
