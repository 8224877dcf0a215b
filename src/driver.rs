//! Broker client collaborator interface.
//!
//! The bridge does not speak the broker wire protocol itself; it drives an
//! implementation of [`BrokerDriver`] (the rdkafka-backed one lives in
//! [`crate::kafka`], tests use recording mocks). `ensure_*` operations are
//! get-or-create, keyed by client identifier.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Credentials, TlsOptions};
use crate::buffer::BufferPlan;
use crate::config::{Compression, PartitionStrategy, RequiredAcks};
use crate::endpoint::{Endpoint, SocketOptions};
use crate::template::RenderedMessage;
use crate::Result;

/// Handle to a started client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandle {
    pub id: String,
}

/// Handle to a producer bound to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerHandle {
    pub id: String,
    pub topic: String,
}

/// Resolved client-level connection settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub metadata_request_timeout: Duration,
    /// Already adjusted via [`crate::endpoint::resolve_socket_options`].
    pub socket_options: SocketOptions,
    pub credentials: Credentials,
    pub tls: Option<TlsOptions>,
}

/// Resolved producer topology settings.
#[derive(Debug, Clone)]
pub struct ProducerSettings {
    pub max_batch_bytes: usize,
    pub compression: Compression,
    pub partition_strategy: PartitionStrategy,
    pub required_acks: RequiredAcks,
    pub partition_count_refresh_interval: Duration,
    pub max_inflight: u32,
    pub buffer: BufferPlan,
}

/// Per-record delivery outcome handed to the acknowledgment callback.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered { partition: i32, offset: i64 },
    Failed { reason: String },
}

/// Acknowledgment callback invoked once delivery settles.
pub type AckCallback = Arc<dyn Fn(DeliveryOutcome) + Send + Sync>;

#[async_trait]
pub trait BrokerDriver: Send + Sync {
    /// Starts (or returns the already-started) client for `id`.
    async fn ensure_client(
        &self,
        id: &str,
        endpoints: &[Endpoint],
        settings: &ClientSettings,
    ) -> Result<ClientHandle>;

    /// Creates (or returns the existing) producer for `topic`, bound to a
    /// started client.
    async fn ensure_producer(
        &self,
        client: &ClientHandle,
        topic: &str,
        settings: &ProducerSettings,
    ) -> Result<ProducerHandle>;

    /// Enqueues a record for asynchronous delivery.
    ///
    /// Returns `Err` synchronously when the producer cannot accept the
    /// record (stopped, queue full); otherwise the outcome arrives via
    /// `ack` on the driver's own scheduling.
    fn send(&self, producer: &ProducerHandle, record: RenderedMessage, ack: AckCallback)
        -> Result<()>;

    async fn stop_producer(&self, producer: &ProducerHandle) -> Result<()>;

    async fn stop_client(&self, id: &str) -> Result<()>;

    /// Connectivity probe for a started client.
    async fn check_connectivity(&self, client: &ClientHandle) -> Result<bool>;
}
