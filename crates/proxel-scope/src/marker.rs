//! Scope marker token lists.
//!
//! A node targeted by one or more controllers carries a scope attribute
//! listing their tokens. Each entry is written as ` token ` (space padded) so
//! that a lookup for `tab` never matches `tabs`.

/// Attribute holding the scope marker.
pub const DEFAULT_SCOPE_ATTRIBUTE: &str = "data-scope";

/// Parsed scope marker attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMarker {
    raw: String,
}

impl ScopeMarker {
    /// Marker from the current attribute value (`None` when absent).
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        Self {
            raw: raw.unwrap_or_default().to_owned(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Append `token`.
    pub fn mark(&mut self, token: &str) {
        self.raw.push(' ');
        self.raw.push_str(token);
        self.raw.push(' ');
    }

    /// Remove the first occurrence of `token`. Returns whether one was found.
    pub fn unmark(&mut self, token: &str) -> bool {
        let padded = format!(" {token} ");
        match self.raw.find(&padded) {
            Some(at) => {
                self.raw.replace_range(at..at + padded.len(), "");
                true
            }
            None => false,
        }
    }

    /// Whether `token` is listed.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.raw.contains(&format!(" {token} "))
    }

    /// Whether no token remains.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.raw.split_whitespace()
    }
}
