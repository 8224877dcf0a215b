//! Bootstrap endpoint and socket option resolution.
//!
//! Turns the user-facing `bootstrap_hosts` value (a comma-separated string
//! or a structured list) into an ordered connection descriptor, and applies
//! the socket buffer sizing rule the transport expects.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_PORT: u16 = 9092;

/// Raw `bootstrap_hosts` config value, either `"h1:9092,h2:9092"` or
/// `["h1:9092", "h2"]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BootstrapHosts {
    List(Vec<String>),
    Csv(String),
}

/// A single resolved (host, port) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parses the raw host list into an ordered list of endpoints.
///
/// Entries without an explicit port get the Kafka default (9092). Malformed
/// entries (empty host, non-numeric port) fail with [`Error::InvalidEndpoint`].
pub fn resolve_endpoints(raw: &BootstrapHosts) -> Result<Vec<Endpoint>> {
    let entries: Vec<String> = match raw {
        BootstrapHosts::List(list) => list.clone(),
        BootstrapHosts::Csv(csv) => csv.split(',').map(|s| s.to_string()).collect(),
    };

    let mut endpoints = Vec::with_capacity(entries.len());
    for entry in &entries {
        endpoints.push(parse_endpoint(entry)?);
    }

    if endpoints.is_empty() {
        return Err(Error::InvalidEndpoint("empty host list".to_string()));
    }

    Ok(endpoints)
}

fn parse_endpoint(entry: &str) -> Result<Endpoint> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err(Error::InvalidEndpoint("empty entry".to_string()));
    }

    match entry.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(Error::InvalidEndpoint(entry.to_string()));
            }
            let port: u16 = port
                .parse()
                .map_err(|_| Error::InvalidEndpoint(entry.to_string()))?;
            Ok(Endpoint {
                host: host.to_string(),
                port,
            })
        }
        None => Ok(Endpoint {
            host: entry.to_string(),
            port: DEFAULT_PORT,
        }),
    }
}

/// TCP socket options passed through to the client.
///
/// Buffer sizes are in bytes. `buffer` is the user-space socket buffer; the
/// transport requires it to be at least as large as the kernel receive
/// buffer to avoid extra copying, see [`resolve_socket_options`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SocketOptions {
    pub send_buffer: Option<u64>,
    pub receive_buffer: Option<u64>,
    pub buffer: Option<u64>,
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            send_buffer: None,
            receive_buffer: None,
            buffer: None,
            nodelay: true,
        }
    }
}

fn default_nodelay() -> bool {
    true
}

/// Applies the socket buffer sizing rule.
///
/// Whenever any of `send_buffer`, `receive_buffer` or `buffer` is present,
/// `buffer` is forced to at least the maximum of itself and the other two.
/// Everything else passes through unchanged. Pure and idempotent: applying
/// it twice yields the same result as once.
pub fn resolve_socket_options(opts: &SocketOptions) -> SocketOptions {
    let mut resolved = opts.clone();

    let max = [opts.send_buffer, opts.receive_buffer, opts.buffer]
        .iter()
        .flatten()
        .max()
        .copied();

    if let Some(max) = max {
        resolved.buffer = Some(max);
    }

    resolved
}
