//! service-engine: container-engine abstraction layer.
//!
//! Translates engine-agnostic service specs into container runtime
//! configuration and exposes container lifecycle operations (create, start,
//! list, stop, remove, pull) behind one interface with normalized errors.

// Core modules
pub mod cli;
pub mod config;
pub mod docker;
pub mod engine;
pub mod error;
pub mod spec;
pub mod translate;

pub use config::{ConfigError, EngineConfig};
pub use docker::DockerEngine;
pub use engine::{Engine, LabelFilters};
pub use error::{EngineError, NotFound, SpecError, TranslationError};
pub use spec::{ContainerRecord, Instance, ServiceSpec};
pub use translate::{parse_port_specs, to_instance, translate, HostConfig, ProcessConfig};
