//! [`Engine`] implementation for Docker.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bollard::container::{
    CreateContainerOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use futures::StreamExt;
use tracing::debug;

use crate::config::EngineConfig;
use crate::docker::api::{BollardApi, DockerApi};
use crate::docker::convert::{container_config, container_record, image_options, list_options};
use crate::engine::{Engine, LabelFilters};
use crate::error::EngineError;
use crate::spec::{Instance, ServiceSpec};
use crate::translate::{to_instance, translate};

/// Docker-backed engine.
///
/// Owns the daemon connection. Cloning shares the underlying client, which
/// is safe for concurrent use.
#[derive(Debug, Clone)]
pub struct DockerEngine<A = BollardApi> {
    api: A,
}

impl DockerEngine<BollardApi> {
    /// Creates an engine connected to the daemon described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Connection`] if the client cannot be built.
    pub fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self::with_api(BollardApi::connect(config)?))
    }
}

impl<A: DockerApi> DockerEngine<A> {
    /// Creates an engine over an existing API handle.
    pub fn with_api(api: A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: DockerApi> Engine for DockerEngine<A> {
    async fn create_container(&self, name: &str, spec: &ServiceSpec) -> Result<String, EngineError> {
        let (process, host) = translate(spec)?;
        let config = container_config(process, host);
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        debug!(container = %name, image = %spec.image, "Creating container");
        let response = self
            .api
            .create_container(Some(options), config)
            .await
            .map_err(EngineError::runtime)?;

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        debug!(container = %id, "Starting container");
        self.api
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EngineError::for_container(id, e))
    }

    async fn list_containers(
        &self,
        key_filters: &BTreeSet<String>,
        key_and_value_filters: &BTreeMap<String, String>,
        include_stopped: bool,
    ) -> Result<Vec<Instance>, EngineError> {
        let filters = LabelFilters {
            keys: key_filters.clone(),
            key_values: key_and_value_filters.clone(),
        };
        let options = list_options(&filters, include_stopped);

        debug!(labels = ?filters.expressions(), all = include_stopped, "Listing containers");
        let containers = self
            .api
            .list_containers(Some(options))
            .await
            .map_err(EngineError::runtime)?;

        Ok(containers
            .into_iter()
            .map(|summary| to_instance(container_record(summary)))
            .collect())
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        debug!(container = %id, "Stopping container");
        self.api
            .stop_container(id, None::<StopContainerOptions>)
            .await
            .map_err(|e| EngineError::for_container(id, e))
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        debug!(container = %id, "Removing container");
        self.api
            .remove_container(id, None::<RemoveContainerOptions>)
            .await
            .map_err(|e| EngineError::for_container(id, e))
    }

    async fn pull_image(&self, image: &str) -> Result<(), EngineError> {
        let options = image_options(image);

        debug!(image = %options.from_image, tag = %options.tag, "Pulling image");
        // The stream is dropped, closing the response body, on every return path.
        let mut stream = self.api.create_image_stream(Some(options));
        while let Some(progress) = stream.next().await {
            progress.map_err(EngineError::runtime)?;
        }

        Ok(())
    }
}
