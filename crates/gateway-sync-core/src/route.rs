//! Route declarations.
//!
//! A [`Route`] is the local description of one API endpoint: the name the
//! gateway keys it by, the HTTP method, the path, and whether the JWT plugin
//! must be attached to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// HTTP methods a route can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl HttpMethod {
    /// Return the upper-case wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(CoreError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// A locally declared API route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Unique name, used as the gateway route key.
    pub name: String,
    /// HTTP method the route answers to.
    pub method: HttpMethod,
    /// URL path. A leading slash is added when the route is sent to the gateway.
    pub path: String,
    /// Whether the JWT plugin must be attached to this route.
    #[serde(default = "Route::default_auth")]
    pub auth: bool,
}

impl Route {
    /// Create a new route.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
        auth: bool,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            auth,
        }
    }

    const fn default_auth() -> bool {
        true
    }

    /// Path as the gateway should see it, see [`normalize_path`].
    #[must_use]
    pub fn gateway_path(&self) -> String {
        normalize_path(&self.path)
    }

    /// Check that the route can be keyed by the gateway.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyRouteName` if the name is blank.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::EmptyRouteName);
        }
        Ok(())
    }
}

/// Prefix `path` with `/` and collapse every run of slashes into one.
///
/// `"users/:id"` becomes `"/users/:id"` and `"//orders"` becomes `"/orders"`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');
    for c in path.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}
