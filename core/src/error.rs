//! Error types for the InvoiceXpress request core.
//!
//! # Design
//! `ApiError` is reserved for failures detected before any network activity:
//! missing configuration, method tokens that map to no rule, and arguments
//! that cannot be encoded. Everything that happens after the request leaves
//! the process (transport failures, HTML error pages, application errors) is
//! reported as data in `RequestOutcome` instead.

use thiserror::Error;

/// Errors raised synchronously by the dispatcher and request builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Credentials or the method token were missing when a request was built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The method token is not of the form `entity.action`.
    #[error("malformed method token `{0}`: expected `entity.action`")]
    MalformedMethodToken(String),

    /// The entity part of the method token names no known resource family.
    #[error("the methods for `{0}` are not implemented")]
    UnsupportedEntity(String),

    /// The action is not available for the entity.
    #[error("action `{action}` is not implemented for `{entity}`")]
    UnsupportedAction { entity: String, action: String },

    /// The resolved path needs a resource id and none was given.
    #[error("`{entity}.{action}` requires a resource id")]
    MissingResourceId { entity: String, action: String },

    /// A finder action was called without the value it searches for.
    #[error("`{entity}.{action}` requires a value for `{parameter}`")]
    MissingQueryValue {
        entity: String,
        action: String,
        parameter: String,
    },

    /// The base URL built from the credentials could not be parsed.
    #[error("invalid request url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The arguments could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

/// A connection, DNS, TLS or timeout failure reported by a `Transport`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
