//! Docker backend for the [`Engine`](crate::engine::Engine) contract.
//!
//! Talks to the Docker daemon through the bollard crate. Not-found
//! normalization relies on the daemon's HTTP 404 status rather than its
//! error text.
//!
//! # Example
//!
//! ```ignore
//! use service_engine::{DockerEngine, Engine, EngineConfig, ServiceSpec};
//!
//! let engine = DockerEngine::connect(&EngineConfig::from_env()?)?;
//! engine.pull_image("nginx:1.25").await?;
//!
//! let spec = ServiceSpec::new("nginx:1.25").with_port("8080:80");
//! let id = engine.create_container("web-0", &spec).await?;
//! engine.start_container(&id).await?;
//! ```

pub mod api;
mod convert;
mod engine;

pub use api::{BollardApi, DockerApi, ImageStream};
pub use engine::DockerEngine;
