//! Fixed-width console rendering of operation results.

use dbman_core::config::ProfileSet;
use dbman_core::dispatcher::OperationOutcome;
use dbman_core::models::{
    BackendKind, ItemFailure, QueryOutput, QueryResult, StructureDescription, StructureReport,
};
use tabled::builder::Builder;
use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Alignment, Modify, Style, width::Width};

/// Widest a single column may grow before its cells wrap.
const MAX_COLUMN_WIDTH: usize = 40;

fn render_table<I, R>(header: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut builder = Builder::default();
    builder.push_record(header.iter().map(|h| (*h).to_string()));
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::psql());
    for i in 0..header.len() {
        table.with(Modify::new(Columns::new(i..=i)).with(Width::wrap(MAX_COLUMN_WIDTH)));
    }
    table.with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

/// Configured profiles: label, engine and target, never credentials.
pub fn render_profiles(profiles: &ProfileSet) -> String {
    render_table(
        &["Profile", "Engine", "Target"],
        profiles.iter().map(|p| {
            let target = match (p.engine().is_networked(), p.database()) {
                (true, Some(db)) => format!("{}:{}/{}", p.host(), port_text(p.effective_port()), db),
                (true, None) => format!("{}:{}", p.host(), port_text(p.effective_port())),
                (false, db) => db.unwrap_or_default().to_string(),
            };
            vec![p.label().to_string(), p.engine().to_string(), target]
        }),
    )
}

fn port_text(port: Option<u16>) -> String {
    port.map(|p| p.to_string()).unwrap_or_default()
}

/// Renders an outcome body. Returns `None` when the summary line says it all.
pub fn render_outcome(outcome: &OperationOutcome, kind: BackendKind) -> Option<String> {
    match outcome {
        OperationOutcome::Containers(names) if names.is_empty() => None,
        OperationOutcome::Containers(names) => Some(render_table(
            &[kind.container_noun()],
            names.iter().map(|n| vec![n.clone()]),
        )),
        OperationOutcome::Created { .. } | OperationOutcome::Exported(_) => None,
        OperationOutcome::Imported(report) | OperationOutcome::Wiped(report) => {
            if report.failures.is_empty() {
                None
            } else {
                Some(render_failures(&report.failures))
            }
        }
        OperationOutcome::Described(report) => render_structure(report),
        OperationOutcome::Queried(output) => Some(render_query(output)),
    }
}

fn render_failures(failures: &[ItemFailure]) -> String {
    render_table(
        &["Item", "Error"],
        failures
            .iter()
            .map(|f| vec![f.item.clone(), f.message.clone()]),
    )
}

fn render_structure(report: &StructureReport) -> Option<String> {
    match &report.description {
        StructureDescription::NoData => None,
        StructureDescription::Fields(fields) => Some(render_table(
            &["Field", "Type", "Sample"],
            fields.iter().map(|f| {
                vec![
                    f.name.clone(),
                    f.declared_type.clone().unwrap_or_default(),
                    f.sample.clone().unwrap_or_else(|| "-".to_string()),
                ]
            }),
        )),
    }
}

fn render_query(output: &QueryOutput) -> String {
    match output {
        QueryOutput::Table(QueryResult { columns, rows }) if !columns.is_empty() => {
            let header: Vec<&str> = columns.iter().map(String::as_str).collect();
            render_table(&header, rows.iter().cloned())
        }
        QueryOutput::Table(_) => "(no rows)".to_string(),
        QueryOutput::Records(records) => records.join("\n"),
    }
}
