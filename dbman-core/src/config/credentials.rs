//! Credential container with automatic memory zeroing.
//!
//! Usernames and passwords live in `Zeroizing` containers so they are
//! cleared when a profile is dropped. `Debug` never prints the password.

use zeroize::{Zeroize, Zeroizing};

/// Username and optional password for one backend.
///
/// # Example
///
/// ```rust
/// use dbman_core::config::Credentials;
///
/// let creds = Credentials::new("admin".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "admin");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Default, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// The username, empty when none was configured.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks for a password without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Returns a copy with the password replaced.
    pub fn with_password(&self, password: String) -> Self {
        Self::new(self.username.to_string(), Some(password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
