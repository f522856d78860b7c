//! Error types for session and configuration operations.

use proxel_dom::{DomError, NodeId};
use proxel_props::PropSpecError;
use thiserror::Error;

/// Errors from [`SessionConfig`](crate::SessionConfig) parsing and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("`{field}` must not contain whitespace (got {value:?})")]
    Whitespace { field: &'static str, value: String },

    /// Two tag suffixes are equal, so tags of different roles would collide.
    #[error("tag suffix `{0}` is used for more than one role")]
    DuplicateSuffix(String),

    #[error("scope and bootstrap attributes are both `{0}`")]
    AttributeClash(String),

    #[error("`max_settle_ticks` must be at least 1")]
    ZeroSettleBound,
}

/// Errors from [`Session`](crate::Session) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Spec(#[from] PropSpecError),

    /// The controller token is empty or contains whitespace.
    #[error("invalid controller token {0:?}")]
    InvalidToken(String),

    #[error("controller token `{0}` is already registered")]
    DuplicateToken(String),

    /// A tag derived from the token is already taken by another registration.
    #[error("tag `{0}` is already registered")]
    TagTaken(String),

    /// `create_controller` was given a tag that names no controller.
    #[error("`{0}` is not a registered controller tag")]
    UnknownTag(String),

    /// The node carries no controller.
    #[error("{0:?} is not a controller")]
    NotAController(NodeId),

    #[error("controller `{token}` declares no property `{key}`")]
    UnknownProperty { token: String, key: String },

    #[error("controller `{token}` declares no reference kind `{kind}`")]
    UnknownRefKind { token: String, kind: String },

    /// The queue still had work after `max_settle_ticks` turns.
    #[error("session did not settle within {0} ticks")]
    Unsettled(u32),
}
