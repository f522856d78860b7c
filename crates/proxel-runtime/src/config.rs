#![forbid(unsafe_code)]

//! Session configuration.
//!
//! Every field has a default, so an empty TOML or JSON document is a valid
//! configuration:
//!
//! ```toml
//! proxy_suffix = "proxy"
//! host_suffix = "element"
//! ref_suffix = "ref"
//! generic_ref_tag = "proxy-ref"
//! scope_attribute = "data-scope"
//! bootstrap_attribute = "data-props"
//! max_settle_ticks = 64
//! ```

use proxel_props::DEFAULT_BOOTSTRAP_ATTRIBUTE;
use proxel_scope::DEFAULT_SCOPE_ATTRIBUTE;
use serde::Deserialize;

use crate::error::ConfigError;

/// Tag names and attribute names a [`Session`](crate::Session) works with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// `{token}-{proxy_suffix}` targets its parent.
    pub proxy_suffix: String,
    /// `{token}-{host_suffix}` targets itself.
    pub host_suffix: String,
    /// `{token}-{ref_suffix}` is a marker with a fixed token.
    pub ref_suffix: String,
    /// Marker tag that reads its token from the `proxy` attribute.
    pub generic_ref_tag: String,
    pub scope_attribute: String,
    pub bootstrap_attribute: String,
    /// Upper bound on ticks run by [`Session::settle`](crate::Session::settle).
    pub max_settle_ticks: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            proxy_suffix: "proxy".to_owned(),
            host_suffix: "element".to_owned(),
            ref_suffix: "ref".to_owned(),
            generic_ref_tag: "proxy-ref".to_owned(),
            scope_attribute: DEFAULT_SCOPE_ATTRIBUTE.to_owned(),
            bootstrap_attribute: DEFAULT_BOOTSTRAP_ATTRIBUTE.to_owned(),
            max_settle_ticks: 64,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that tag names and attribute names are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("proxy_suffix", &self.proxy_suffix),
            ("host_suffix", &self.host_suffix),
            ("ref_suffix", &self.ref_suffix),
            ("generic_ref_tag", &self.generic_ref_tag),
            ("scope_attribute", &self.scope_attribute),
            ("bootstrap_attribute", &self.bootstrap_attribute),
        ];
        for (field, value) in names {
            if value.is_empty() {
                return Err(ConfigError::Empty(field));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(ConfigError::Whitespace {
                    field,
                    value: value.clone(),
                });
            }
        }
        let suffixes = [&self.proxy_suffix, &self.host_suffix, &self.ref_suffix];
        for (i, a) in suffixes.iter().enumerate() {
            if suffixes[i + 1..].contains(a) {
                return Err(ConfigError::DuplicateSuffix((*a).clone()));
            }
        }
        if self.scope_attribute == self.bootstrap_attribute {
            return Err(ConfigError::AttributeClash(self.scope_attribute.clone()));
        }
        if self.max_settle_ticks == 0 {
            return Err(ConfigError::ZeroSettleBound);
        }
        Ok(())
    }

    pub(crate) fn proxy_tag(&self, token: &str) -> String {
        format!("{token}-{}", self.proxy_suffix)
    }

    pub(crate) fn host_tag(&self, token: &str) -> String {
        format!("{token}-{}", self.host_suffix)
    }

    pub(crate) fn ref_tag(&self, token: &str) -> String {
        format!("{token}-{}", self.ref_suffix)
    }
}
