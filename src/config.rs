use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::{AuthConfig, TlsConfig};
use crate::buffer::BufferConfig;
use crate::endpoint::{BootstrapHosts, SocketOptions};
use crate::template::MessageTemplateConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_bridge_name")]
    pub name: String,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    pub bootstrap_hosts: BootstrapHosts,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_metadata_request_timeout_ms")]
    pub metadata_request_timeout_ms: u64,
    #[serde(default)]
    pub socket_opts: SocketOptions,
    #[serde(default)]
    pub authentication: AuthConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    pub producer: Option<ProducerConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProducerConfig {
    pub topic: String,
    pub message: Option<MessageTemplateConfig>,
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
    #[serde(default)]
    pub compression: Compression,
    #[serde(default)]
    pub partition_strategy: PartitionStrategy,
    #[serde(default)]
    pub required_acks: RequiredAcks,
    #[serde(default = "default_partition_count_refresh_interval_secs")]
    pub partition_count_refresh_interval_secs: u64,
    #[serde(default = "default_max_inflight")]
    pub max_inflight: u32,
    #[serde(default)]
    pub buffer: BufferConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAcks {
    #[default]
    AllIsr,
    LeaderOnly,
    None,
}

impl RequiredAcks {
    /// Value for the Kafka `acks` producer property.
    pub fn kafka_value(&self) -> &'static str {
        match self {
            RequiredAcks::AllIsr => "all",
            RequiredAcks::LeaderOnly => "1",
            RequiredAcks::None => "0",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    #[default]
    Random,
    RoundRobin,
    KeyHash,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("KAFKA_BRIDGE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

fn default_bridge_name() -> String {
    "default".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_metadata_request_timeout_ms() -> u64 {
    5_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_batch_bytes() -> usize {
    917_504 // 896KB
}

fn default_partition_count_refresh_interval_secs() -> u64 {
    60
}

fn default_max_inflight() -> u32 {
    10
}
