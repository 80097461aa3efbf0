//! Port-binding spec parsing.
//!
//! Grammar:
//!
//! ```text
//! binding       := [hostIP ":"] [hostPort ":"] containerPort ["/" protocol]
//! hostIP        := IPv4 literal, or IPv6 literal in brackets ("[::1]")
//! hostPort      := decimal integer in [0,65535], or empty
//! containerPort := decimal integer in [1,65535]
//! protocol      := "tcp" | "udp" | "sctp"        (default "tcp")
//! ```
//!
//! Several specs may target the same container port; their host bindings are
//! collected in input order.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use crate::error::TranslationError;

/// Transport protocol of an exposed port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            other => Err(format!("unknown protocol '{other}'")),
        }
    }
}

/// A port inside the container together with its protocol, e.g. `8080/tcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerPort {
    pub port: u16,
    pub protocol: Protocol,
}

impl ContainerPort {
    pub fn new(port: u16, protocol: Protocol) -> Self {
        Self { port, protocol }
    }

    pub fn tcp(port: u16) -> Self {
        Self::new(port, Protocol::Tcp)
    }
}

impl fmt::Display for ContainerPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Host side of a published port.
///
/// An empty `host_ip` binds all interfaces; an empty `host_port` lets the
/// runtime pick an ephemeral port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HostBinding {
    pub host_ip: String,
    pub host_port: String,
}

/// Container port mapped to its host bindings, in input order.
pub type PortMap = BTreeMap<ContainerPort, Vec<HostBinding>>;

/// One parsed port-binding spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortMapping {
    pub host: HostBinding,
    pub container: ContainerPort,
}

impl FromStr for PortMapping {
    type Err = TranslationError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (rest, protocol) = match spec.rsplit_once('/') {
            Some((rest, proto)) => {
                let protocol = proto
                    .parse::<Protocol>()
                    .map_err(|reason| TranslationError::port(spec, reason))?;
                (rest, protocol)
            }
            None => (spec, Protocol::Tcp),
        };

        let (host_ip, host_port, container_port) = split_parts(spec, rest)?;

        if !host_port.is_empty() && parse_port_number(host_port).is_none() {
            return Err(TranslationError::port(
                spec,
                format!("invalid host port '{host_port}'"),
            ));
        }

        let port = match parse_port_number(container_port) {
            Some(0) => {
                return Err(TranslationError::port(spec, "container port must not be 0"));
            }
            Some(port) => port,
            None if container_port.is_empty() => {
                return Err(TranslationError::port(spec, "missing container port"));
            }
            None => {
                return Err(TranslationError::port(
                    spec,
                    format!("invalid container port '{container_port}'"),
                ));
            }
        };

        Ok(Self {
            host: HostBinding {
                host_ip: host_ip.to_string(),
                host_port: host_port.to_string(),
            },
            container: ContainerPort::new(port, protocol),
        })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let HostBinding { host_ip, host_port } = &self.host;
        if host_ip.contains(':') {
            write!(f, "[{host_ip}]:{host_port}:")?;
        } else if !host_ip.is_empty() {
            write!(f, "{host_ip}:{host_port}:")?;
        } else if !host_port.is_empty() {
            write!(f, "{host_port}:")?;
        }
        write!(f, "{}", self.container)
    }
}

/// Parses every spec and groups the host bindings by container port.
///
/// Fails on the first malformed entry; no partial map is returned.
pub fn parse_port_specs<S: AsRef<str>>(specs: &[S]) -> Result<PortMap, TranslationError> {
    let mut map = PortMap::new();
    for spec in specs {
        let mapping: PortMapping = spec.as_ref().parse()?;
        map.entry(mapping.container).or_default().push(mapping.host);
    }
    Ok(map)
}

/// Splits `rest` (the spec without its protocol) into host IP, host port and
/// container port, validating the host IP.
fn split_parts<'a>(
    spec: &str,
    rest: &'a str,
) -> Result<(&'a str, &'a str, &'a str), TranslationError> {
    if let Some(bracketed) = rest.strip_prefix('[') {
        let (ip, tail) = bracketed
            .split_once(']')
            .ok_or_else(|| TranslationError::port(spec, "unterminated IPv6 address"))?;
        if ip.parse::<Ipv6Addr>().is_err() {
            return Err(TranslationError::port(
                spec,
                format!("invalid IPv6 address '{ip}'"),
            ));
        }
        let (host_port, container_port) = tail
            .strip_prefix(':')
            .and_then(|t| t.split_once(':'))
            .ok_or_else(|| {
                TranslationError::port(spec, "expected '[ip]:hostPort:containerPort'")
            })?;
        return Ok((ip, host_port, container_port));
    }

    let parts: Vec<&str> = rest.split(':').collect();
    match parts.as_slice() {
        [container] => Ok(("", "", container)),
        [host_port, container] => Ok(("", host_port, container)),
        [ip, host_port, container] => {
            if !ip.is_empty() && ip.parse::<IpAddr>().is_err() {
                return Err(TranslationError::port(
                    spec,
                    format!("invalid host IP '{ip}'"),
                ));
            }
            Ok((ip, host_port, container))
        }
        _ => Err(TranslationError::port(
            spec,
            "too many ':' separated parts (IPv6 host addresses must be bracketed)",
        )),
    }
}

/// Strict decimal port number: digits only, within `u16`.
fn parse_port_number(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
