//! Engine-agnostic service and container types.
//!
//! A [`ServiceSpec`] describes what a container should run and under which
//! constraints. An [`Instance`] is the read-only snapshot handed back when
//! containers are listed; it is rebuilt from the runtime on every call.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// Abstract description of a single service to run.
///
/// Field names follow the compose file conventions so specs can be written
/// by hand in YAML. Every field is optional; missing fields take the
/// runtime's defaults. Sizes are in bytes and are never rescaled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSpec {
    /// Image reference (e.g. `nginx:1.25`).
    pub image: String,
    /// Command override; empty keeps the image's default command.
    pub command: Vec<String>,
    /// Entrypoint override.
    pub entrypoint: Option<Vec<String>>,
    /// `KEY=VALUE` environment entries, in order.
    pub environment: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub hostname: String,
    #[serde(rename = "domainname")]
    pub domain_name: String,
    pub working_dir: String,
    pub user: String,
    pub stop_signal: String,

    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub dns: Vec<String>,
    pub dns_search: Vec<String>,
    #[serde(rename = "dns_opt")]
    pub dns_opts: Vec<String>,
    /// `host:ip` entries appended to `/etc/hosts`.
    pub extra_hosts: Vec<String>,
    pub group_add: Vec<String>,

    /// IPC namespace mode (`host`, `none`, `container:<id>`, ...).
    pub ipc: String,
    /// PID namespace mode.
    pub pid: String,
    /// UTS namespace mode.
    pub uts: String,
    pub network_mode: String,
    pub privileged: bool,
    /// Mount the root filesystem read-only.
    pub read_only: bool,
    pub security_opt: Vec<String>,

    /// Size of `/dev/shm` in bytes.
    pub shm_size: i64,
    /// CPUs the container may run on (e.g. `"0-3"`).
    pub cpuset: String,
    pub cpu_shares: i64,
    /// CPU CFS quota in microseconds.
    pub cpu_quota: i64,
    /// Memory limit in bytes.
    pub mem_limit: i64,
    /// Memory soft limit in bytes.
    pub mem_reservation: i64,
    /// Memory plus swap limit in bytes.
    #[serde(rename = "memswap_limit")]
    pub mem_swap_limit: i64,
    pub oom_score_adj: i64,
    /// Disable the OOM killer. Unset means `false`, and the value is always
    /// sent to the runtime as written.
    pub oom_kill_disable: bool,

    /// Port-binding specs: `[hostIP:][hostPort:]containerPort[/protocol]`.
    pub ports: Vec<String>,
}

impl ServiceSpec {
    /// Creates a spec for the given image with everything else defaulted.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Parses a spec from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SpecError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a spec file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    pub fn with_env(mut self, environment: Vec<String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.ports.push(port.into());
        self
    }

    pub fn with_network_mode(mut self, mode: impl Into<String>) -> Self {
        self.network_mode = mode.into();
        self
    }

    /// Sets the memory limit in bytes.
    pub fn with_mem_limit(mut self, bytes: i64) -> Self {
        self.mem_limit = bytes;
        self
    }
}

/// A container as reported by a runtime listing, before projection.
///
/// Backends fill this from their native listing type; `state` is the
/// runtime's own state string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: String,
    pub labels: BTreeMap<String, String>,
    pub state: String,
}

/// Runtime-observed snapshot of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Runtime-assigned container ID.
    pub id: String,
    /// Labels, as set from the service spec at creation.
    pub labels: BTreeMap<String, String>,
    /// True only when the runtime reports the container as `running`.
    pub running: bool,
}
