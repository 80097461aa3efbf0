//! The slice of the Docker API the engine consumes.
//!
//! [`DockerApi`] mirrors the bollard calls one-to-one so the lifecycle logic
//! in [`DockerEngine`](super::DockerEngine) can run against a live daemon
//! through [`BollardApi`] or against a test double.

use std::pin::Pin;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerCreateResponse, ContainerSummary, CreateImageInfo};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::Stream;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Progress stream returned by an image pull.
pub type ImageStream = Pin<Box<dyn Stream<Item = Result<CreateImageInfo, BollardError>> + Send>>;

/// Docker operations used by the engine.
#[async_trait]
pub trait DockerApi: Send + Sync {
    async fn create_container(
        &self,
        options: Option<CreateContainerOptions<String>>,
        config: Config<String>,
    ) -> Result<ContainerCreateResponse, BollardError>;

    async fn start_container(
        &self,
        id: &str,
        options: Option<StartContainerOptions<String>>,
    ) -> Result<(), BollardError>;

    async fn list_containers(
        &self,
        options: Option<ListContainersOptions<String>>,
    ) -> Result<Vec<ContainerSummary>, BollardError>;

    async fn stop_container(
        &self,
        id: &str,
        options: Option<StopContainerOptions>,
    ) -> Result<(), BollardError>;

    async fn remove_container(
        &self,
        id: &str,
        options: Option<RemoveContainerOptions>,
    ) -> Result<(), BollardError>;

    fn create_image_stream(&self, options: Option<CreateImageOptions<String>>) -> ImageStream;
}

/// [`DockerApi`] backed by a bollard client.
#[derive(Clone)]
pub struct BollardApi {
    docker: Docker,
}

impl BollardApi {
    /// Wraps an existing bollard client.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connects to the daemon described by `config`.
    ///
    /// `unix://` hosts use the socket, `tcp://` and `http://` hosts use plain
    /// HTTP, and no host at all falls back to the local defaults (which honor
    /// `DOCKER_HOST`). The client is built lazily, so an unreachable daemon
    /// only surfaces on the first request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Connection`] if the client cannot be built.
    pub fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        let timeout = config.request_timeout.as_secs();

        let docker = match config.docker_host.as_deref() {
            None => Docker::connect_with_local_defaults(),
            Some(host) if host.starts_with("unix://") => {
                Docker::connect_with_socket(host, timeout, API_DEFAULT_VERSION)
            }
            Some(host) => {
                let addr = host.replacen("tcp://", "http://", 1);
                Docker::connect_with_http(&addr, timeout, API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| EngineError::Connection(format!("Failed to connect: {e}")))?;

        Ok(Self {
            docker: docker.with_timeout(config.request_timeout),
        })
    }
}

#[async_trait]
impl DockerApi for BollardApi {
    async fn create_container(
        &self,
        options: Option<CreateContainerOptions<String>>,
        config: Config<String>,
    ) -> Result<ContainerCreateResponse, BollardError> {
        self.docker.create_container(options, config).await
    }

    async fn start_container(
        &self,
        id: &str,
        options: Option<StartContainerOptions<String>>,
    ) -> Result<(), BollardError> {
        self.docker.start_container(id, options).await
    }

    async fn list_containers(
        &self,
        options: Option<ListContainersOptions<String>>,
    ) -> Result<Vec<ContainerSummary>, BollardError> {
        self.docker.list_containers(options).await
    }

    async fn stop_container(
        &self,
        id: &str,
        options: Option<StopContainerOptions>,
    ) -> Result<(), BollardError> {
        self.docker.stop_container(id, options).await
    }

    async fn remove_container(
        &self,
        id: &str,
        options: Option<RemoveContainerOptions>,
    ) -> Result<(), BollardError> {
        self.docker.remove_container(id, options).await
    }

    fn create_image_stream(&self, options: Option<CreateImageOptions<String>>) -> ImageStream {
        Box::pin(self.docker.create_image(options, None, None))
    }
}
