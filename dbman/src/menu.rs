//! Interactive numbered menu over one open adapter.

use crate::output::render_outcome;
use dbman_core::adapters::{DataStoreAdapter, WipeConfirmation};
use dbman_core::dispatcher::{Operation, OperationKind, dispatch, default_export_path};
use dbman_core::models::{BackendKind, FieldSet};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Number of the exit entry, shown after the seven operations.
const EXIT_CHOICE: usize = OperationKind::ALL.len().saturating_add(1);

/// Prints `prompt` and reads one line. `None` on end of input.
pub fn read_line(prompt: &str) -> std::io::Result<Option<String>> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Asks the operator to confirm a wipe.
pub fn confirm_wipe(profile_label: &str) -> std::io::Result<Option<WipeConfirmation>> {
    let reply = read_line(&format!(
        "Are you sure you want to delete ALL data in '{}'? (yes/no): ",
        profile_label
    ))?;
    Ok(reply.and_then(|r| WipeConfirmation::from_operator_reply(&r)))
}

fn print_menu(kind: BackendKind, profile_label: &str) {
    println!();
    println!("{} [{}]", profile_label, kind);
    for (i, operation) in OperationKind::ALL.iter().enumerate() {
        println!("{}. {}", i.saturating_add(1), operation.menu_label(kind));
    }
    println!("{}. Exit", EXIT_CHOICE);
}

/// Collects the inputs an operation needs. `None` when the operator backs
/// out or input ends.
fn build_operation(
    kind: OperationKind,
    backend: BackendKind,
    profile_label: &str,
) -> anyhow::Result<Option<Operation>> {
    let noun = backend.container_noun().to_lowercase();
    let operation = match kind {
        OperationKind::ListContainers => Operation::ListContainers,
        OperationKind::CreateContainer => {
            let Some(name) = read_line(&format!("Enter the {} name: ", noun))? else {
                return Ok(None);
            };
            let columns = if backend == BackendKind::Relational {
                let Some(spec) = read_line("Enter column names separated by commas: ")? else {
                    return Ok(None);
                };
                parse_columns(&spec)?
            } else {
                None
            };
            Operation::CreateContainer { name, columns }
        }
        OperationKind::ImportCsv => {
            let Some(path) = read_line("Enter the CSV file name: ")? else {
                return Ok(None);
            };
            Operation::ImportCsv {
                path: PathBuf::from(path.trim()),
                container: None,
            }
        }
        OperationKind::ExportCsv => {
            let prompt = if backend == BackendKind::KeyValue {
                "Enter the pattern to match keys (e.g., user:*): ".to_string()
            } else {
                format!("Enter the {} name to export: ", noun)
            };
            let Some(container) = read_line(&prompt)? else {
                return Ok(None);
            };
            let path = default_export_path(container.trim(), backend);
            Operation::ExportCsv {
                container,
                path: Some(path),
            }
        }
        OperationKind::DeleteAllContainers => match confirm_wipe(profile_label)? {
            Some(confirmation) => Operation::DeleteAllContainers { confirmation },
            None => {
                println!("Operation cancelled.");
                return Ok(None);
            }
        },
        OperationKind::DescribeStructure => {
            let Some(container) = read_line(&format!("Enter the {} name: ", noun))? else {
                return Ok(None);
            };
            Operation::DescribeStructure { container }
        }
        OperationKind::ExecuteRawQuery => {
            let Some(query) = read_line("Enter your query:\n")? else {
                return Ok(None);
            };
            Operation::ExecuteRawQuery { query }
        }
    };
    Ok(Some(operation))
}

/// Parses a comma-separated column list; blank input means no columns.
pub fn parse_columns(spec: &str) -> dbman_core::Result<Option<FieldSet>> {
    if spec.trim().is_empty() {
        return Ok(None);
    }
    FieldSet::from_header(spec.split(',').map(|c| c.trim().to_string())).map(Some)
}

/// Formats a failed operation with its whole source chain, the way `main`
/// reports errors through anyhow.
fn error_line(error: dbman_core::DbManError) -> String {
    format!("Error: {:#}", anyhow::Error::new(error))
}

/// Runs the menu until the operator exits or input ends.
///
/// A failed operation is reported and the menu continues.
pub async fn run(adapter: &dyn DataStoreAdapter, profile_label: &str) -> anyhow::Result<()> {
    let backend = adapter.backend_kind();
    loop {
        print_menu(backend, profile_label);
        let Some(choice) = read_line("Choose an option: ")? else {
            break;
        };
        if choice.trim() == EXIT_CHOICE.to_string() {
            break;
        }
        let Some(kind) = Operation::parse_menu_choice(&choice) else {
            println!("Invalid choice. Please try again.");
            continue;
        };
        let Some(operation) = build_operation(kind, backend, profile_label)? else {
            continue;
        };

        match dispatch(adapter, operation).await {
            Ok(outcome) => {
                if let Some(body) = render_outcome(&outcome, backend) {
                    println!("{}", body);
                }
                println!("{}", outcome.summary_line(backend));
            }
            Err(e) => {
                tracing::debug!("Operation {:?} failed: {:?}", kind, e);
                println!("{}", error_line(e));
            }
        }
    }
    Ok(())
}
