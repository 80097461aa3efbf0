//! Container lifecycle contract.
//!
//! [`Engine`] is the capability interface every runtime backend implements.
//! Callers program against it; the Docker backend lives in
//! [`crate::docker`].
//!
//! # Cancellation
//!
//! Every operation is a single round trip to the runtime. Dropping the
//! returned future aborts the in-flight request and releases any stream it
//! holds, so deadlines are applied by the caller:
//!
//! ```ignore
//! use std::time::Duration;
//!
//! let id = tokio::time::timeout(
//!     Duration::from_secs(30),
//!     engine.create_container("web-0", &spec),
//! )
//! .await??;
//! ```
//!
//! No operation retries; retry policy belongs to the caller.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::error::EngineError;
use crate::spec::{Instance, ServiceSpec};

/// Label selection for [`Engine::list_containers`].
///
/// Bare keys require the label to be present with any value; key/value pairs
/// require an exact value. All conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilters {
    pub keys: BTreeSet<String>,
    pub key_values: BTreeMap<String, String>,
}

impl LabelFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_values.insert(key.into(), value.into());
        self
    }

    /// Parses `key` and `key=value` selectors, as accepted on the command line.
    pub fn from_selectors<S: AsRef<str>>(selectors: &[S]) -> Self {
        selectors
            .iter()
            .fold(Self::new(), |filters, selector| {
                match selector.as_ref().split_once('=') {
                    Some((key, value)) => filters.with_key_value(key, value),
                    None => filters.with_key(selector.as_ref()),
                }
            })
    }

    /// Renders the filters as runtime label expressions (`key`, `key=value`).
    pub fn expressions(&self) -> Vec<String> {
        self.keys
            .iter()
            .cloned()
            .chain(self.key_values.iter().map(|(k, v)| format!("{k}={v}")))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.key_values.is_empty()
    }
}

/// Uniform lifecycle interface over a container runtime.
///
/// Implementations hold no mutable shared state and can be used
/// concurrently through `&self`. Ordering of concurrent operations on the
/// same container is the caller's responsibility.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Creates a container named `name` from `spec` and returns its ID.
    ///
    /// The container joins the runtime's default network unless the spec's
    /// network mode says otherwise.
    async fn create_container(&self, name: &str, spec: &ServiceSpec) -> Result<String, EngineError>;

    /// Starts a created container.
    ///
    /// Returns [`EngineError::InstanceNotFound`] if the container does not exist.
    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Lists containers matching every label filter.
    ///
    /// With `include_stopped` false only running containers are returned.
    /// No match yields an empty vector.
    async fn list_containers(
        &self,
        key_filters: &BTreeSet<String>,
        key_and_value_filters: &BTreeMap<String, String>,
        include_stopped: bool,
    ) -> Result<Vec<Instance>, EngineError>;

    /// Stops a container using the runtime's default grace period.
    ///
    /// Returns [`EngineError::InstanceNotFound`] if the container does not
    /// exist; every other failure is an [`EngineError::Runtime`].
    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;

    /// Removes a container.
    ///
    /// Returns [`EngineError::InstanceNotFound`] if the container does not exist.
    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;

    /// Pulls an image, waiting for the pull to complete.
    async fn pull_image(&self, image: &str) -> Result<(), EngineError>;

    /// [`Engine::list_containers`] driven by a [`LabelFilters`] value.
    async fn list_matching(
        &self,
        filters: &LabelFilters,
        include_stopped: bool,
    ) -> Result<Vec<Instance>, EngineError> {
        self.list_containers(&filters.keys, &filters.key_values, include_stopped)
            .await
    }
}
