//! Credentials and the session token they are exchanged for

use std::fmt;

use chrono::{DateTime, Utc};

/// Account credentials for the vendor portal
///
/// Held in memory only. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session with the vendor portal
///
/// A token past `expires_at` is treated as absent and must not be reused.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub role: String,
    pub login_token: String,
    pub supervisor: bool,
    /// Value of the `JSESSIONID` cookie
    pub cookie: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Check whether the token may still be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("role", &self.role)
            .field("login_token", &"<redacted>")
            .field("supervisor", &self.supervisor)
            .field("cookie", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
