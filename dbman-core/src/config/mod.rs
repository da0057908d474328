//! Connection configuration.
//!
//! This module is organized into focused submodules:
//! - `credentials`: zeroizing username/password container
//! - `profile`: resolved per-backend connection settings
//! - `loader`: flat `label.key=value` profile files

mod credentials;
mod loader;
mod profile;

pub use credentials::Credentials;
pub use loader::ProfileSet;
pub use profile::{ConnectionProfile, DEFAULT_KEY_PATTERN, DEFAULT_MAX_CONNECTIONS};
