//! Service spec translation.
//!
//! Maps an engine-agnostic [`ServiceSpec`] onto the pair of configurations a
//! container runtime needs at creation time, and projects runtime container
//! records back into [`Instance`] snapshots. Everything here is pure: no I/O,
//! and the same input always yields the same output.
//!
//! The output types are runtime-neutral; each backend converts them into its
//! own request structures.

pub mod ports;

use std::collections::BTreeMap;

pub use ports::{
    parse_port_specs, ContainerPort, HostBinding, PortMap, PortMapping, Protocol,
};

use crate::error::TranslationError;
use crate::spec::{ContainerRecord, Instance, ServiceSpec};

/// Runtime state string that marks a container as running.
pub const RUNNING_STATE: &str = "running";

/// Process and image configuration of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessConfig {
    pub image: String,
    /// Empty keeps the image's default command.
    pub cmd: Vec<String>,
    pub entrypoint: Option<Vec<String>>,
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub hostname: String,
    pub domainname: String,
    pub user: String,
    pub working_dir: String,
    pub stop_signal: String,
    /// Container ports that have at least one binding.
    pub exposed_ports: Vec<ContainerPort>,
}

/// Resource limits applied to a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    pub cpuset_cpus: String,
    pub cpu_shares: i64,
    pub cpu_quota: i64,
    /// Bytes.
    pub memory: i64,
    /// Bytes.
    pub memory_reservation: i64,
    /// Bytes, memory plus swap.
    pub memory_swap: i64,
    pub oom_kill_disable: bool,
}

/// Host-side configuration of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub dns: Vec<String>,
    pub dns_options: Vec<String>,
    pub dns_search: Vec<String>,
    pub extra_hosts: Vec<String>,
    pub group_add: Vec<String>,
    pub ipc_mode: String,
    pub network_mode: String,
    pub oom_score_adj: i64,
    pub pid_mode: String,
    pub port_bindings: PortMap,
    pub privileged: bool,
    pub readonly_rootfs: bool,
    pub resources: Resources,
    /// Bytes.
    pub shm_size: i64,
    pub security_opt: Vec<String>,
    pub uts_mode: String,
}

/// Translates a service spec into process and host configuration.
///
/// # Errors
///
/// Returns [`TranslationError::InvalidPortSpec`] if any port-binding spec is
/// malformed. No partial configuration is produced.
pub fn translate(spec: &ServiceSpec) -> Result<(ProcessConfig, HostConfig), TranslationError> {
    let port_bindings = parse_port_specs(&spec.ports)?;

    let process = ProcessConfig {
        image: spec.image.clone(),
        cmd: spec.command.clone(),
        entrypoint: spec.entrypoint.clone(),
        env: spec.environment.clone(),
        labels: spec.labels.clone(),
        hostname: spec.hostname.clone(),
        domainname: spec.domain_name.clone(),
        user: spec.user.clone(),
        working_dir: spec.working_dir.clone(),
        stop_signal: spec.stop_signal.clone(),
        exposed_ports: port_bindings.keys().copied().collect(),
    };

    let host = HostConfig {
        cap_add: spec.cap_add.clone(),
        cap_drop: spec.cap_drop.clone(),
        dns: spec.dns.clone(),
        dns_options: spec.dns_opts.clone(),
        dns_search: spec.dns_search.clone(),
        extra_hosts: spec.extra_hosts.clone(),
        group_add: spec.group_add.clone(),
        ipc_mode: spec.ipc.clone(),
        network_mode: spec.network_mode.clone(),
        oom_score_adj: spec.oom_score_adj,
        pid_mode: spec.pid.clone(),
        port_bindings,
        privileged: spec.privileged,
        readonly_rootfs: spec.read_only,
        resources: Resources {
            cpuset_cpus: spec.cpuset.clone(),
            cpu_shares: spec.cpu_shares,
            cpu_quota: spec.cpu_quota,
            memory: spec.mem_limit,
            memory_reservation: spec.mem_reservation,
            memory_swap: spec.mem_swap_limit,
            oom_kill_disable: spec.oom_kill_disable,
        },
        shm_size: spec.shm_size,
        security_opt: spec.security_opt.clone(),
        uts_mode: spec.uts.clone(),
    };

    Ok((process, host))
}

/// Projects a runtime container record into an [`Instance`].
///
/// Only the exact state `"running"` counts as running; paused, restarting
/// and exited containers are all reported as not running.
pub fn to_instance(record: ContainerRecord) -> Instance {
    Instance {
        running: record.state == RUNNING_STATE,
        id: record.id,
        labels: record.labels,
    }
}
