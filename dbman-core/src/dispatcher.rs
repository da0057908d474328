//! The operation set and its single mapping onto an adapter.
//!
//! Callers describe what to do as an [`Operation`] and get back an
//! [`OperationOutcome`]. Nothing here knows which backend is behind the
//! adapter.

use crate::Result;
use crate::adapters::{DataStoreAdapter, WipeConfirmation};
use crate::error::DbManError;
use crate::models::{
    BackendKind, ExportSummary, FieldSet, OperationReport, QueryOutput, StructureReport,
};
use std::path::PathBuf;

/// One of the seven operations with its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListContainers,
    CreateContainer {
        name: String,
        columns: Option<FieldSet>,
    },
    ImportCsv {
        path: PathBuf,
        container: Option<String>,
    },
    ExportCsv {
        container: String,
        /// Output file; [`default_export_path`] when absent.
        path: Option<PathBuf>,
    },
    DeleteAllContainers {
        confirmation: WipeConfirmation,
    },
    DescribeStructure {
        container: String,
    },
    ExecuteRawQuery {
        query: String,
    },
}

/// Operation names in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ListContainers,
    CreateContainer,
    ImportCsv,
    ExportCsv,
    DeleteAllContainers,
    DescribeStructure,
    ExecuteRawQuery,
}

impl OperationKind {
    /// Every operation, in menu order.
    pub const ALL: [Self; 7] = [
        Self::ListContainers,
        Self::CreateContainer,
        Self::ImportCsv,
        Self::ExportCsv,
        Self::DeleteAllContainers,
        Self::DescribeStructure,
        Self::ExecuteRawQuery,
    ];

    /// Menu label, worded for the backend's container noun.
    pub fn menu_label(self, kind: BackendKind) -> String {
        let noun = kind.container_noun();
        match self {
            Self::ListContainers => format!("List {}s", noun.to_lowercase()),
            Self::CreateContainer => format!("Create {}", noun.to_lowercase()),
            Self::ImportCsv => "Import CSV file".to_string(),
            Self::ExportCsv => "Export to CSV file".to_string(),
            Self::DeleteAllContainers => "Delete all data".to_string(),
            Self::DescribeStructure => format!("Describe {}", noun.to_lowercase()),
            Self::ExecuteRawQuery => "Run raw query".to_string(),
        }
    }
}

impl Operation {
    /// Maps a menu number (1 to 7) to an operation name.
    ///
    /// Returns `None` for anything else, including the exit entry the shell
    /// adds after the seven operations.
    pub fn parse_menu_choice(choice: &str) -> Option<OperationKind> {
        let index: usize = choice.trim().parse().ok()?;
        OperationKind::ALL.get(index.checked_sub(1)?).copied()
    }

    /// Name of the operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ListContainers => OperationKind::ListContainers,
            Self::CreateContainer { .. } => OperationKind::CreateContainer,
            Self::ImportCsv { .. } => OperationKind::ImportCsv,
            Self::ExportCsv { .. } => OperationKind::ExportCsv,
            Self::DeleteAllContainers { .. } => OperationKind::DeleteAllContainers,
            Self::DescribeStructure { .. } => OperationKind::DescribeStructure,
            Self::ExecuteRawQuery { .. } => OperationKind::ExecuteRawQuery,
        }
    }
}

/// Result of a dispatched operation, one variant per result shape.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Containers(Vec<String>),
    Created { name: String },
    Imported(OperationReport),
    Exported(ExportSummary),
    Wiped(OperationReport),
    Described(StructureReport),
    Queried(QueryOutput),
}

impl OperationOutcome {
    /// The one-line summary printed after every operation.
    pub fn summary_line(&self, kind: BackendKind) -> String {
        let noun = kind.container_noun().to_lowercase();
        match self {
            Self::Containers(names) => format!("{} {}(s) found", names.len(), noun),
            Self::Created { name } => format!("{} '{}' is ready", kind.container_noun(), name),
            Self::Imported(report) => format!(
                "Imported {} row(s){}, {} failed",
                report.succeeded,
                report
                    .container
                    .as_ref()
                    .map(|c| format!(" into '{}'", c))
                    .unwrap_or_default(),
                report.failures.len()
            ),
            Self::Exported(summary) => format!(
                "Exported {} row(s) from '{}' to {}",
                summary.rows_written,
                summary.container,
                summary.path.display()
            ),
            Self::Wiped(report) => format!(
                "Deleted {} {}(s), {} failed",
                report.succeeded,
                noun,
                report.failures.len()
            ),
            Self::Described(report) => match report.description.field_count() {
                Some(count) => format!("'{}' has {} field(s)", report.container, count),
                None => format!("No data found in '{}'", report.container),
            },
            Self::Queried(output) => format!("{} result row(s)", output.len()),
        }
    }
}

/// Default export file for a container: `<container>.csv`, with glob
/// stars spelled `all` for key-value patterns.
pub fn default_export_path(container: &str, kind: BackendKind) -> PathBuf {
    let stem = match kind {
        BackendKind::KeyValue => container.replace('*', "all"),
        _ => container.to_string(),
    };
    PathBuf::from(format!("{}.csv", stem))
}

/// Runs one operation against an adapter.
///
/// # Errors
/// Whatever the adapter returns; a blank container or query name is
/// rejected before the adapter is called.
pub async fn dispatch(
    adapter: &dyn DataStoreAdapter,
    operation: Operation,
) -> Result<OperationOutcome> {
    tracing::debug!("Dispatching {:?} to {}", operation.kind(), adapter.engine());
    match operation {
        Operation::ListContainers => adapter
            .list_containers()
            .await
            .map(OperationOutcome::Containers),
        Operation::CreateContainer { name, columns } => {
            let name = require_text(name, "container name")?;
            adapter.create_container(&name, columns.as_ref()).await?;
            Ok(OperationOutcome::Created { name })
        }
        Operation::ImportCsv { path, container } => {
            let container = container.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
            adapter
                .import_csv(&path, container.as_deref())
                .await
                .map(OperationOutcome::Imported)
        }
        Operation::ExportCsv { container, path } => {
            let container = require_text(container, "container name")?;
            let path =
                path.unwrap_or_else(|| default_export_path(&container, adapter.backend_kind()));
            adapter
                .export_csv(&container, &path)
                .await
                .map(OperationOutcome::Exported)
        }
        Operation::DeleteAllContainers { confirmation } => adapter
            .delete_all_containers(confirmation)
            .await
            .map(OperationOutcome::Wiped),
        Operation::DescribeStructure { container } => {
            let container = require_text(container, "container name")?;
            adapter
                .describe_structure(&container)
                .await
                .map(OperationOutcome::Described)
        }
        Operation::ExecuteRawQuery { query } => adapter
            .execute_raw_query(&query)
            .await
            .map(OperationOutcome::Queried),
    }
}

fn require_text(value: String, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DbManError::malformed(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_choices_map_in_order() {
        assert_eq!(
            Operation::parse_menu_choice("1"),
            Some(OperationKind::ListContainers)
        );
        assert_eq!(
            Operation::parse_menu_choice(" 4 \n"),
            Some(OperationKind::ExportCsv)
        );
        assert_eq!(
            Operation::parse_menu_choice("7"),
            Some(OperationKind::ExecuteRawQuery)
        );
    }

    #[test]
    fn test_menu_rejects_out_of_range() {
        for choice in ["0", "8", "-1", "", "two"] {
            assert_eq!(Operation::parse_menu_choice(choice), None, "{:?}", choice);
        }
    }

    #[test]
    fn test_default_export_paths() {
        assert_eq!(
            default_export_path("users", BackendKind::Relational),
            PathBuf::from("users.csv")
        );
        assert_eq!(
            default_export_path("user:*", BackendKind::KeyValue),
            PathBuf::from("user:all.csv")
        );
        assert_eq!(
            default_export_path("*", BackendKind::KeyValue),
            PathBuf::from("all.csv")
        );
    }

    #[test]
    fn test_menu_labels_use_container_noun() {
        assert_eq!(
            OperationKind::ListContainers.menu_label(BackendKind::Document),
            "List collections"
        );
        assert_eq!(
            OperationKind::DescribeStructure.menu_label(BackendKind::Graph),
            "Describe label"
        );
    }

    #[test]
    fn test_summary_lines() {
        let outcome = OperationOutcome::Containers(vec!["a".into(), "b".into()]);
        assert_eq!(outcome.summary_line(BackendKind::Relational), "2 table(s) found");

        let mut report = OperationReport::new("import", Some("users".into()));
        report.record_success();
        report.record_failure("line 3", "bad");
        assert_eq!(
            OperationOutcome::Imported(report).summary_line(BackendKind::Relational),
            "Imported 1 row(s) into 'users', 1 failed"
        );

        let described = OperationOutcome::Described(StructureReport::no_data("ghost"));
        assert_eq!(
            described.summary_line(BackendKind::Document),
            "No data found in 'ghost'"
        );
    }

    #[test]
    fn test_blank_names_rejected() {
        assert!(require_text("   ".into(), "container name").is_err());
        assert_eq!(require_text(" users ".into(), "x").unwrap(), "users");
    }
}
