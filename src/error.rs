//! Error types and result handling for kafka-bridge.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use kafka_bridge::{Error, Result};
//!
//! fn start_client() -> Result<()> {
//!     // Simulating a client start failure
//!     Err(Error::ClientStart {
//!         resource_id: "b1:nodeA".to_string(),
//!         reason: "all brokers unreachable".to_string(),
//!     })
//! }
//!
//! match start_client() {
//!     Ok(()) => println!("Started"),
//!     Err(Error::ClientStart { resource_id, reason }) => {
//!         eprintln!("Client start failed for {}: {}", resource_id, reason)
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for kafka-bridge operations.
///
/// Configuration and template errors are caller contract violations and are
/// never retried. Client/producer start errors are fatal for the attempt;
/// the caller owns any retry/backoff policy.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or parsing error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The nested `producer` block is absent from the bridge config.
    #[error("Missing required `producer` config for {resource_id}")]
    MissingProducerConfig {
        /// Resource identifier the start was attempted for
        resource_id: String,
    },

    /// The nested `producer.message` template block is absent.
    #[error("Missing required `producer.message` template for {resource_id}")]
    MissingMessageTemplate {
        /// Resource identifier the start was attempted for
        resource_id: String,
    },

    /// A bootstrap endpoint entry could not be parsed.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Authentication config carried an unrecognized mechanism.
    #[error("Unsupported auth mechanism: {0}")]
    UnsupportedAuthMechanism(String),

    /// Malformed placeholder syntax in a message template fragment.
    ///
    /// Raised at compile time only; rendering is total and never fails.
    #[error("Template syntax error in `{fragment}` template: {reason}")]
    TemplateSyntax {
        /// Which fragment failed to compile (`key`, `value` or `timestamp`)
        fragment: String,
        /// What was malformed
        reason: String,
    },

    /// The underlying client could not be started or connected.
    #[error("Failed to start client for {resource_id}: {reason}")]
    ClientStart {
        /// Resource identifier the client belongs to
        resource_id: String,
        /// Underlying failure detail
        reason: String,
    },

    /// The producer could not be created on top of a started client.
    #[error("Failed to start producer for {resource_id}: {reason}")]
    ProducerStart {
        /// Resource identifier the producer belongs to
        resource_id: String,
        /// Underlying failure detail
        reason: String,
    },

    /// Synchronous send refusal, e.g. the producer queue is full or the
    /// bridge is already stopped.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Kafka client or producer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON error when handling event payloads.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from spool directory handling.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient Result type alias for kafka-bridge operations.
///
/// This is equivalent to `std::result::Result<T, kafka_bridge::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
