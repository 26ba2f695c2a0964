//! Credential handling with enforced redaction.
//!
//! Raw credential material only leaves this module through explicit
//! `expose()` / `transport_string()` calls; every `Display` and `Debug`
//! rendering substitutes a fixed marker instead.

use std::fmt;

/// Marker substituted for secret material in all rendered output.
pub const REDACTED: &str = "<redacted>";

/// An opaque secret string.
///
/// `Display` and `Debug` never print the wrapped value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value. Callers must not feed the result into any
    /// logging or status-rendering path.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

/// Operator-supplied credentials, provided once at startup.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Bearer/API token.
    Token(Secret),
    /// User and password pair (registry basic auth).
    Basic { user: String, password: Secret },
}

impl Credential {
    /// Basic-auth view: `(user, password)`. A token credential has no
    /// basic-auth form.
    pub fn basic(&self) -> Option<(&str, &str)> {
        match self {
            Credential::Basic { user, password } => Some((user, password.expose())),
            Credential::Token(_) => None,
        }
    }

    pub fn token(&self) -> Option<&Secret> {
        match self {
            Credential::Token(token) => Some(token),
            Credential::Basic { .. } => None,
        }
    }
}

/// A clone URL with an optional credential embedded as the userinfo segment.
///
/// The credential never appears in the `Display` form; only
/// `transport_string()` yields the real URL, and that string is handed to
/// the transport alone, never to a log line.
#[derive(Debug, Clone)]
pub struct AuthUrl {
    scheme: String,
    secret: Option<Secret>,
    rest: String,
}

impl AuthUrl {
    /// Embed `token` into `url` (`scheme://rest` becomes
    /// `scheme://token@rest`). A `None` token leaves the URL untouched.
    pub fn new(url: &str, token: Option<&Secret>) -> Self {
        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (scheme.to_string(), rest.to_string()),
            None => (String::new(), url.to_string()),
        };
        Self {
            scheme,
            secret: token.cloned(),
            rest,
        }
    }

    /// The real URL, credential included. Transport use only.
    pub fn transport_string(&self) -> String {
        self.render(|secret| secret.expose().to_string())
    }

    fn render(&self, secret: impl Fn(&Secret) -> String) -> String {
        let userinfo = match &self.secret {
            Some(s) => format!("{}@", secret(s)),
            None => String::new(),
        };
        if self.scheme.is_empty() {
            format!("{}{}", userinfo, self.rest)
        } else {
            format!("{}://{}{}", self.scheme, userinfo, self.rest)
        }
    }
}

impl fmt::Display for AuthUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|_| REDACTED.to_string()))
    }
}
