//! Error types for service-engine operations.
//!
//! Defines the error taxonomy shared by every layer:
//! - Spec translation (malformed port bindings)
//! - Service spec file loading
//! - Engine lifecycle operations (not-found normalization, runtime faults)

use thiserror::Error;

/// Errors raised while translating a service spec into runtime configuration.
///
/// Translation is local and deterministic, so these are never worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("Invalid port spec '{spec}': {reason}")]
    InvalidPortSpec { spec: String, reason: String },
}

impl TranslationError {
    pub(crate) fn port(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPortSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while loading a service spec file.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors returned by [`Engine`](crate::engine::Engine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("Container '{id}' not found")]
    InstanceNotFound { id: String },

    #[error("Runtime error: {0}")]
    Runtime(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Container runtime not available: {0}")]
    Connection(String),
}

impl EngineError {
    /// Wraps a runtime failure without inspecting it.
    pub fn runtime<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Runtime(Box::new(err))
    }

    /// Classifies a runtime failure that concerns the container `id`.
    ///
    /// Only failures the backend reports as "no such container" become
    /// [`EngineError::InstanceNotFound`]; everything else is kept as
    /// [`EngineError::Runtime`] with its source intact.
    pub fn for_container<E>(id: &str, err: E) -> Self
    where
        E: NotFound + std::error::Error + Send + Sync + 'static,
    {
        if err.is_not_found() {
            Self::InstanceNotFound { id: id.to_string() }
        } else {
            Self::runtime(err)
        }
    }

    /// Returns true for [`EngineError::InstanceNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InstanceNotFound { .. })
    }
}

/// Backend capability: does this runtime error mean the container is absent?
///
/// Each runtime integration implements this for its own error type so the
/// lifecycle logic stays backend-agnostic.
pub trait NotFound {
    fn is_not_found(&self) -> bool;
}
