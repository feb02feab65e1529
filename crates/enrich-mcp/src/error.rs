//! Error types for the MCP crate.

use enrich_core::ModelError;
use thiserror::Error;

/// Errors raised while building, validating or dispatching into an
/// [`EnrichApp`](crate::app::EnrichApp).
#[derive(Debug, Error)]
pub enum EnrichError {
    /// An entity declaration is incomplete.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// An entity with this name is already registered.
    #[error("entity '{0}' is already registered")]
    DuplicateEntity(String),

    /// No entity with this name is registered.
    #[error("entity '{0}' is not registered")]
    UnknownEntity(String),

    /// The entity has no relationship with this name.
    #[error("entity '{entity}' has no relationship '{field}'")]
    UnknownRelationship { entity: String, field: String },

    /// A relationship points at an entity that was never registered.
    #[error("relationship '{entity}.{field}' targets unregistered entity '{target}'")]
    UnknownRelationshipTarget {
        entity: String,
        field: String,
        target: String,
    },

    /// One or more relationships have no resolver bound.
    #[error(
        "the following relationships are missing resolvers: {}. Bind one with EnrichApp::resolver",
        .0.join(", ")
    )]
    UnresolvedRelationships(Vec<String>),

    /// A tool was registered without a description.
    #[error("tool '{name}' must have a description")]
    MissingToolDescription { name: String },

    /// A tool's input schema could not be compiled.
    #[error("invalid input schema for tool '{name}': {reason}")]
    InvalidToolSchema { name: String, reason: String },

    /// A tool with this name is already registered for a different target.
    #[error("tool '{name}' is already registered")]
    DuplicateTool { name: String },

    /// Tool not found.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    /// Invalid arguments for tool.
    #[error("invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// A resolver asked for an argument that could not be bound.
    #[error("resolver for '{entity}' is missing argument '{name}'")]
    MissingArgument { entity: String, name: String },

    /// A resolver argument is present but has the wrong shape.
    #[error("resolver for '{entity}' got an invalid '{name}': {reason}")]
    InvalidResolverArgument {
        entity: String,
        name: String,
        reason: String,
    },

    /// Fixture data is malformed.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Errors that can occur in the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Application error.
    #[error(transparent)]
    App(#[from] EnrichError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
