//! Conversions between the runtime-neutral types and bollard's models.

use std::collections::HashMap;

use bollard::container::{Config, ListContainersOptions};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerSummary, HostConfig as DockerHostConfig, PortBinding};

use crate::engine::LabelFilters;
use crate::error::NotFound;
use crate::spec::ContainerRecord;
use crate::translate::{HostConfig, PortMap, ProcessConfig};

/// Tag pulled when a reference names neither a tag nor a digest.
const DEFAULT_TAG: &str = "latest";

/// Daemon wording for a missing container, used only when an error carries
/// no HTTP status.
const NO_SUCH_CONTAINER: &str = "No such container";

impl NotFound for BollardError {
    fn is_not_found(&self) -> bool {
        match self {
            BollardError::DockerResponseServerError { status_code, .. } => *status_code == 404,
            // No status code to inspect. Matching the daemon's message text is
            // fragile: it breaks if the wording changes or is localized.
            other => other.to_string().contains(NO_SUCH_CONTAINER),
        }
    }
}

/// Builds the create request body from translated configuration.
pub(crate) fn container_config(process: ProcessConfig, host: HostConfig) -> Config<String> {
    let exposed_ports = if process.exposed_ports.is_empty() {
        None
    } else {
        Some(
            process
                .exposed_ports
                .iter()
                .map(|port| (port.to_string(), HashMap::new()))
                .collect(),
        )
    };

    Config {
        image: non_empty(process.image),
        cmd: non_empty_vec(process.cmd),
        entrypoint: process.entrypoint,
        env: non_empty_vec(process.env),
        labels: if process.labels.is_empty() {
            None
        } else {
            Some(process.labels.into_iter().collect())
        },
        hostname: non_empty(process.hostname),
        domainname: non_empty(process.domainname),
        user: non_empty(process.user),
        working_dir: non_empty(process.working_dir),
        stop_signal: non_empty(process.stop_signal),
        exposed_ports,
        host_config: Some(host_config(host)),
        ..Default::default()
    }
}

fn host_config(host: HostConfig) -> DockerHostConfig {
    let resources = host.resources;
    DockerHostConfig {
        cap_add: non_empty_vec(host.cap_add),
        cap_drop: non_empty_vec(host.cap_drop),
        dns: non_empty_vec(host.dns),
        dns_options: non_empty_vec(host.dns_options),
        dns_search: non_empty_vec(host.dns_search),
        extra_hosts: non_empty_vec(host.extra_hosts),
        group_add: non_empty_vec(host.group_add),
        ipc_mode: non_empty(host.ipc_mode),
        network_mode: non_empty(host.network_mode),
        oom_score_adj: Some(host.oom_score_adj),
        pid_mode: non_empty(host.pid_mode),
        port_bindings: if host.port_bindings.is_empty() {
            None
        } else {
            Some(port_bindings(host.port_bindings))
        },
        privileged: Some(host.privileged),
        readonly_rootfs: Some(host.readonly_rootfs),
        cpuset_cpus: non_empty(resources.cpuset_cpus),
        cpu_shares: Some(resources.cpu_shares),
        cpu_quota: Some(resources.cpu_quota),
        memory: Some(resources.memory),
        memory_reservation: Some(resources.memory_reservation),
        memory_swap: Some(resources.memory_swap),
        oom_kill_disable: Some(resources.oom_kill_disable),
        shm_size: Some(host.shm_size),
        security_opt: non_empty_vec(host.security_opt),
        uts_mode: non_empty(host.uts_mode),
        ..Default::default()
    }
}

fn port_bindings(ports: PortMap) -> HashMap<String, Option<Vec<PortBinding>>> {
    ports
        .into_iter()
        .map(|(port, bindings)| {
            let bindings = bindings
                .into_iter()
                .map(|b| PortBinding {
                    host_ip: Some(b.host_ip),
                    host_port: Some(b.host_port),
                })
                .collect();
            (port.to_string(), Some(bindings))
        })
        .collect()
}

/// Builds list options selecting containers by label.
pub(crate) fn list_options(
    filters: &LabelFilters,
    include_stopped: bool,
) -> ListContainersOptions<String> {
    let mut query = HashMap::new();
    if !filters.is_empty() {
        query.insert("label".to_string(), filters.expressions());
    }

    ListContainersOptions {
        all: include_stopped,
        filters: query,
        ..Default::default()
    }
}

/// Splits an image reference into the pull request's image and tag.
///
/// A digest (`name@sha256:...`) is sent as the tag and wins over any tag in
/// the name. A bare name pulls `latest`; an empty tag would make the daemon
/// pull every tag of the repository. A `:` before the last `/` belongs to a
/// registry host (`host:5000/img`), not a tag.
pub(crate) fn image_options(reference: &str) -> CreateImageOptions<String> {
    let (from_image, tag) = match reference.split_once('@') {
        Some((name, digest)) => (strip_tag(name).0, digest),
        None => {
            let (name, tag) = strip_tag(reference);
            (name, tag.unwrap_or(DEFAULT_TAG))
        }
    };

    CreateImageOptions {
        from_image: from_image.to_string(),
        tag: tag.to_string(),
        ..Default::default()
    }
}

fn strip_tag(name: &str) -> (&str, Option<&str>) {
    let path_start = name.rfind('/').map_or(0, |slash| slash + 1);
    match name[path_start..].rfind(':') {
        Some(colon) => {
            let split = path_start + colon;
            (&name[..split], Some(&name[split + 1..]))
        }
        None => (name, None),
    }
}

/// Reduces a listing entry to the fields the engine reports.
pub(crate) fn container_record(summary: ContainerSummary) -> ContainerRecord {
    ContainerRecord {
        id: summary.id.unwrap_or_default(),
        labels: summary.labels.unwrap_or_default().into_iter().collect(),
        state: summary.state.unwrap_or_default(),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn non_empty_vec(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
