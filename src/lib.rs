pub mod auth;
pub mod bridge;
pub mod buffer;
pub mod config;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod telemetry;
pub mod template;

pub mod kafka;

pub use bridge::{BridgeInstance, ConnectionStatus, ProducerBridge, TeardownReport};
pub use config::{BridgeConfig, Config};
pub use error::{Error, Result};
