//! Shared test support: a recording mock driver and config builders.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use kafka_bridge::auth::{AuthConfig, TlsConfig};
use kafka_bridge::buffer::BufferConfig;
use kafka_bridge::config::{
    BridgeConfig, Compression, PartitionStrategy, ProducerConfig, RequiredAcks,
};
use kafka_bridge::driver::{
    AckCallback, BrokerDriver, ClientHandle, ClientSettings, ProducerHandle, ProducerSettings,
};
use kafka_bridge::endpoint::{BootstrapHosts, Endpoint, SocketOptions};
use kafka_bridge::metrics::InMemoryMetrics;
use kafka_bridge::telemetry::TelemetryHub;
use kafka_bridge::template::{MessageTemplateConfig, RenderedMessage};
use kafka_bridge::{Error, ProducerBridge, Result};

pub const TEST_DATA_DIR: &str = "/tmp/kafka-bridge-test";

/// Every collaborator call a bridge makes, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    EnsureClient(String),
    EnsureProducer(String, String),
    Send(String),
    StopProducer(String),
    StopClient(String),
}

/// Recording [`BrokerDriver`] with injectable failures.
#[derive(Default)]
pub struct MockDriver {
    calls: Mutex<Vec<DriverCall>>,
    pub fail_client_start: AtomicBool,
    pub fail_producer_start: AtomicBool,
    pub fail_stop_producer: AtomicBool,
    pub fail_stop_client: AtomicBool,
    pub refuse_sends: AtomicBool,
    pub disconnected: AtomicBool,
    pub last_client_settings: Mutex<Option<ClientSettings>>,
    pub last_producer_settings: Mutex<Option<ProducerSettings>>,
    pub last_record: Mutex<Option<RenderedMessage>>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &DriverCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BrokerDriver for MockDriver {
    async fn ensure_client(
        &self,
        id: &str,
        _endpoints: &[Endpoint],
        settings: &ClientSettings,
    ) -> Result<ClientHandle> {
        self.record(DriverCall::EnsureClient(id.to_string()));
        if self.fail_client_start.load(Ordering::SeqCst) {
            return Err(Error::Delivery("injected client failure".to_string()));
        }
        *self.last_client_settings.lock().unwrap() = Some(settings.clone());
        Ok(ClientHandle { id: id.to_string() })
    }

    async fn ensure_producer(
        &self,
        client: &ClientHandle,
        topic: &str,
        settings: &ProducerSettings,
    ) -> Result<ProducerHandle> {
        self.record(DriverCall::EnsureProducer(client.id.clone(), topic.to_string()));
        if self.fail_producer_start.load(Ordering::SeqCst) {
            return Err(Error::Delivery("injected producer failure".to_string()));
        }
        *self.last_producer_settings.lock().unwrap() = Some(settings.clone());
        Ok(ProducerHandle {
            id: format!("{}/{}", client.id, topic),
            topic: topic.to_string(),
        })
    }

    fn send(
        &self,
        producer: &ProducerHandle,
        record: RenderedMessage,
        _ack: AckCallback,
    ) -> Result<()> {
        self.record(DriverCall::Send(producer.topic.clone()));
        if self.refuse_sends.load(Ordering::SeqCst) {
            return Err(Error::Delivery("injected queue full".to_string()));
        }
        *self.last_record.lock().unwrap() = Some(record);
        Ok(())
    }

    async fn stop_producer(&self, producer: &ProducerHandle) -> Result<()> {
        self.record(DriverCall::StopProducer(producer.id.clone()));
        if self.fail_stop_producer.load(Ordering::SeqCst) {
            return Err(Error::Delivery("injected producer stop failure".to_string()));
        }
        Ok(())
    }

    async fn stop_client(&self, id: &str) -> Result<()> {
        self.record(DriverCall::StopClient(id.to_string()));
        if self.fail_stop_client.load(Ordering::SeqCst) {
            return Err(Error::Delivery("injected client stop failure".to_string()));
        }
        Ok(())
    }

    async fn check_connectivity(&self, _client: &ClientHandle) -> Result<bool> {
        Ok(!self.disconnected.load(Ordering::SeqCst))
    }
}

pub fn test_template_config() -> MessageTemplateConfig {
    MessageTemplateConfig {
        key: "${id}".to_string(),
        value: "${.}".to_string(),
        timestamp: "${ts}".to_string(),
    }
}

pub fn test_producer_config() -> ProducerConfig {
    ProducerConfig {
        topic: "events".to_string(),
        message: Some(test_template_config()),
        max_batch_bytes: 917_504,
        compression: Compression::None,
        partition_strategy: PartitionStrategy::Random,
        required_acks: RequiredAcks::AllIsr,
        partition_count_refresh_interval_secs: 60,
        max_inflight: 10,
        buffer: BufferConfig::default(),
    }
}

pub fn test_bridge_config() -> BridgeConfig {
    BridgeConfig {
        bootstrap_hosts: BootstrapHosts::Csv("localhost:9092".to_string()),
        connect_timeout_ms: 1_000,
        metadata_request_timeout_ms: 1_000,
        socket_opts: SocketOptions::default(),
        authentication: AuthConfig::default(),
        tls: TlsConfig::default(),
        data_dir: PathBuf::from(TEST_DATA_DIR),
        producer: Some(test_producer_config()),
    }
}

pub fn build_bridge(
    driver: Arc<MockDriver>,
) -> (ProducerBridge, TelemetryHub, Arc<InMemoryMetrics>) {
    let hub = TelemetryHub::new();
    let metrics = Arc::new(InMemoryMetrics::new());
    let bridge = ProducerBridge::new(driver, hub.clone(), metrics.clone(), TEST_DATA_DIR);
    (bridge, hub, metrics)
}
