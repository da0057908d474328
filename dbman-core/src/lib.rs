//! Core library for dbman, a multi-database data manager.
//!
//! One operation contract (list, create, import, export, wipe, describe,
//! raw query) is mapped onto relational, document, graph and key-value
//! stores, with a shared CSV engine translating between flat rows and each
//! store's native shape.
//!
//! # Guarantees
//! - Credentials live in zeroizing containers and are redacted from every
//!   log line and error message
//! - Values reach the stores as parameters; interpolated names are validated
//!   identifiers
//! - Destructive wipes require a [`adapters::WipeConfirmation`] token
//!
//! # Architecture
//! - `config` resolves connection profiles from a profile file
//! - `adapters::open_adapter` picks the adapter once per profile
//! - `dispatcher` maps an [`Operation`] onto the adapter contract
//! - `codec` and `inference` are shared by every adapter

pub mod adapters;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod inference;
pub mod logging;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use adapters::{DataStoreAdapter, WipeConfirmation, open_adapter};
pub use config::{ConnectionProfile, Credentials, ProfileSet};
pub use dispatcher::{Operation, OperationKind, OperationOutcome, dispatch};
pub use error::{DbManError, Result};
pub use models::{
    BackendKind, Engine, ExportSummary, FieldDescription, FieldSet, ItemFailure, OperationReport,
    QueryOutput, QueryResult, StructureDescription, StructureReport, TabularRecord,
};
