//! rdkafka-backed [`BrokerDriver`].
//!
//! Keeps a registry of started clients and producers keyed by identifier,
//! so `ensure_*` calls are get-or-create and restarts of the same logical
//! bridge reuse what is already running. Delivery acknowledgments and
//! buffering state are reported as telemetry events into the hub.

use async_trait::async_trait;
use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::client::{base_client_config, producer_client_config};
use crate::driver::{
    AckCallback, BrokerDriver, ClientHandle, ClientSettings, DeliveryOutcome, ProducerHandle,
    ProducerSettings,
};
use crate::endpoint::Endpoint;
use crate::telemetry::{TelemetryEvent, TelemetryHub};
use crate::template::RenderedMessage;
use crate::{Error, Result};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

struct ClientEntry {
    base: ClientConfig,
    admin: AdminClient<DefaultClientContext>,
    metadata_timeout: Duration,
}

struct ProducerEntry {
    producer: FutureProducer,
    topic: String,
    client_id: String,
    inflight: Arc<AtomicI64>,
}

pub struct RdkafkaDriver {
    hub: TelemetryHub,
    clients: Mutex<HashMap<String, ClientEntry>>,
    producers: Mutex<HashMap<String, Arc<ProducerEntry>>>,
}

impl RdkafkaDriver {
    pub fn new(hub: TelemetryHub) -> Self {
        Self {
            hub,
            clients: Mutex::new(HashMap::new()),
            producers: Mutex::new(HashMap::new()),
        }
    }

    fn producer_id(client_id: &str, topic: &str) -> String {
        format!("{}/{}", client_id, topic)
    }
}

#[async_trait]
impl BrokerDriver for RdkafkaDriver {
    #[instrument(skip(self, endpoints, settings), fields(client_id = %id))]
    async fn ensure_client(
        &self,
        id: &str,
        endpoints: &[Endpoint],
        settings: &ClientSettings,
    ) -> Result<ClientHandle> {
        let handle = ClientHandle { id: id.to_string() };

        if self.clients.lock().unwrap().contains_key(id) {
            debug!("client already started");
            return Ok(handle);
        }

        let base = base_client_config(endpoints, settings);
        let admin: AdminClient<DefaultClientContext> = base.create()?;

        // Probe the cluster within the connect timeout so an unreachable
        // bootstrap list fails the start instead of the first send.
        admin
            .inner()
            .fetch_metadata(None, settings.connect_timeout)?;

        self.clients
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert(ClientEntry {
                base,
                admin,
                metadata_timeout: settings.metadata_request_timeout,
            });
        info!("kafka client started");
        Ok(handle)
    }

    #[instrument(skip(self, settings), fields(client_id = %client.id, topic = %topic))]
    async fn ensure_producer(
        &self,
        client: &ClientHandle,
        topic: &str,
        settings: &ProducerSettings,
    ) -> Result<ProducerHandle> {
        let producer_id = Self::producer_id(&client.id, topic);
        let handle = ProducerHandle {
            id: producer_id.clone(),
            topic: topic.to_string(),
        };

        if self.producers.lock().unwrap().contains_key(&producer_id) {
            debug!("producer already started");
            return Ok(handle);
        }

        let base = {
            let clients = self.clients.lock().unwrap();
            let entry = clients.get(&client.id).ok_or_else(|| Error::ClientStart {
                resource_id: client.id.clone(),
                reason: "client not started".to_string(),
            })?;
            entry.base.clone()
        };

        if let Some(path) = &settings.buffer.disk_path {
            // Reserve the deterministic spool location; the spool service
            // owns the segment format and any replay of what it finds here.
            std::fs::create_dir_all(path)?;
            warn!(
                spool = %path.display(),
                "librdkafka queues in memory only, spill durability is delegated to the external spool"
            );
        }

        let config = producer_client_config(&base, settings);
        let producer: FutureProducer = config.create()?;

        self.producers
            .lock()
            .unwrap()
            .entry(producer_id)
            .or_insert_with(|| {
                Arc::new(ProducerEntry {
                    producer,
                    topic: topic.to_string(),
                    client_id: client.id.clone(),
                    inflight: Arc::new(AtomicI64::new(0)),
                })
            });
        info!("kafka producer started");
        Ok(handle)
    }

    /// Enqueues the record via `send_result`, so a full queue refuses
    /// synchronously while delivery settles on librdkafka's own threads.
    /// Must be called within a tokio runtime.
    fn send(
        &self,
        producer: &ProducerHandle,
        record: RenderedMessage,
        ack: AckCallback,
    ) -> Result<()> {
        let entry = self
            .producers
            .lock()
            .unwrap()
            .get(&producer.id)
            .cloned()
            .ok_or_else(|| Error::Delivery(format!("producer {} is not running", producer.id)))?;

        let future_record = FutureRecord::<[u8], [u8]>::to(&entry.topic)
            .key(record.key.as_ref())
            .payload(record.value.as_ref())
            .timestamp(record.timestamp_ms);

        let delivery = match entry.producer.send_result(future_record) {
            Ok(delivery) => delivery,
            Err((e, _record)) => {
                if matches!(
                    e,
                    KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull)
                ) {
                    // Matches the client event vocabulary: a queue-full drop
                    // is reported both ways, the translator nets them.
                    self.hub
                        .emit(&TelemetryEvent::new("dropped", &entry.client_id, 1));
                    self.hub.emit(&TelemetryEvent::new(
                        "dropped_queue_full",
                        &entry.client_id,
                        1,
                    ));
                }
                return Err(Error::Delivery(e.to_string()));
            }
        };

        let hub = self.hub.clone();
        let client_id = entry.client_id.clone();
        let inflight = entry.inflight.clone();

        let n = inflight.fetch_add(1, Ordering::SeqCst) + 1;
        hub.emit(&TelemetryEvent::new("inflight", &client_id, n));

        tokio::spawn(async move {
            let outcome = match delivery.await {
                Ok(Ok((partition, offset))) => {
                    hub.emit(&TelemetryEvent::new("success", &client_id, 1).with_partition(partition));
                    DeliveryOutcome::Delivered { partition, offset }
                }
                Ok(Err((e, _message))) => {
                    hub.emit(&TelemetryEvent::new("failed", &client_id, 1));
                    DeliveryOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
                Err(_canceled) => {
                    hub.emit(&TelemetryEvent::new("failed", &client_id, 1));
                    DeliveryOutcome::Failed {
                        reason: "delivery future canceled".to_string(),
                    }
                }
            };
            let n = inflight.fetch_sub(1, Ordering::SeqCst) - 1;
            hub.emit(&TelemetryEvent::new("inflight", &client_id, n));
            ack(outcome);
        });

        Ok(())
    }

    async fn stop_producer(&self, producer: &ProducerHandle) -> Result<()> {
        let entry = self.producers.lock().unwrap().remove(&producer.id);
        match entry {
            Some(entry) => {
                // Drain what librdkafka already accepted before dropping.
                entry.producer.flush(Timeout::After(FLUSH_TIMEOUT))?;
                info!(producer_id = %producer.id, "kafka producer stopped");
            }
            None => debug!(producer_id = %producer.id, "producer already stopped"),
        }
        Ok(())
    }

    async fn stop_client(&self, id: &str) -> Result<()> {
        match self.clients.lock().unwrap().remove(id) {
            Some(_) => info!(client_id = %id, "kafka client stopped"),
            None => debug!(client_id = %id, "client already stopped"),
        }
        Ok(())
    }

    async fn check_connectivity(&self, client: &ClientHandle) -> Result<bool> {
        let clients = self.clients.lock().unwrap();
        let entry = clients.get(&client.id).ok_or_else(|| Error::ClientStart {
            resource_id: client.id.clone(),
            reason: "client not started".to_string(),
        })?;

        match entry.admin.inner().fetch_metadata(None, entry.metadata_timeout) {
            Ok(metadata) => Ok(!metadata.brokers().is_empty()),
            Err(e) => {
                debug!(client_id = %client.id, error = %e, "metadata probe failed");
                Ok(false)
            }
        }
    }
}
