//! Producer bridge lifecycle.
//!
//! `start` builds the {client, producer, telemetry-subscription} triple for
//! a resource identifier; `stop` tears it down best-effort; `send` renders
//! an input event and enqueues it; `status` probes connectivity. Exactly
//! one live triple exists per resource identifier at any time, and a failed
//! `start` never leaves partially created resources behind.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::auth::{resolve_credentials, resolve_tls};
use crate::buffer::select_buffer;
use crate::config::{BridgeConfig, ProducerConfig};
use crate::driver::{
    AckCallback, BrokerDriver, ClientHandle, ClientSettings, DeliveryOutcome, ProducerHandle,
    ProducerSettings,
};
use crate::endpoint::{resolve_endpoints, resolve_socket_options};
use crate::metrics::MetricsSink;
use crate::telemetry::{self, TelemetryHub};
use crate::template::{CompiledTemplate, MessageTemplateConfig};
use crate::{Error, Result};

/// Connectivity as reported by [`ProducerBridge::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A running bridge: client and producer handles plus the compiled message
/// template. Created by `start`, destroyed by `stop`; the three are torn
/// down as a unit and the instance never outlives its handles.
#[derive(Debug)]
pub struct BridgeInstance {
    resource_id: String,
    client: ClientHandle,
    producer: ProducerHandle,
    template: CompiledTemplate,
    stopped: AtomicBool,
}

impl BridgeInstance {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn topic(&self) -> &str {
        &self.producer.topic
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// One teardown step that failed. Teardown never aborts partway; failures
/// are collected so callers (and tests) can observe them.
#[derive(Debug)]
pub struct TeardownFailure {
    pub step: &'static str,
    pub error: Error,
}

/// Aggregate outcome of a best-effort teardown.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The managed producer bridge.
///
/// May be called concurrently from multiple supervisor tasks; it spawns no
/// long-lived workers of its own and delegates all connection I/O and
/// batching to the [`BrokerDriver`] collaborator.
pub struct ProducerBridge {
    driver: Arc<dyn BrokerDriver>,
    hub: TelemetryHub,
    metrics: Arc<dyn MetricsSink>,
    data_dir: PathBuf,
    instances: Mutex<HashMap<String, Arc<BridgeInstance>>>,
}

impl ProducerBridge {
    pub fn new(
        driver: Arc<dyn BrokerDriver>,
        hub: TelemetryHub,
        metrics: Arc<dyn MetricsSink>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            driver,
            hub,
            metrics,
            data_dir: data_dir.into(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// The running instance for `resource_id`, if any.
    pub fn instance(&self, resource_id: &str) -> Option<Arc<BridgeInstance>> {
        self.instances.lock().unwrap().get(resource_id).cloned()
    }

    /// Starts a bridge for `resource_id`.
    ///
    /// Either fully succeeds or reports one structured error; anything
    /// created before a failure is torn down before the error propagates.
    /// Starting over an already-running identifier first tears the
    /// previous instance down completely.
    #[instrument(skip(self, config), fields(resource_id = %resource_id))]
    pub async fn start(
        &self,
        resource_id: &str,
        config: &BridgeConfig,
    ) -> Result<Arc<BridgeInstance>> {
        // Caller contract: the nested producer/message config must be
        // present before any resource is created.
        let producer_config = config
            .producer
            .as_ref()
            .ok_or_else(|| Error::MissingProducerConfig {
                resource_id: resource_id.to_string(),
            })?;
        let template_config =
            producer_config
                .message
                .as_ref()
                .ok_or_else(|| Error::MissingMessageTemplate {
                    resource_id: resource_id.to_string(),
                })?;

        if let Some(previous) = self.instance(resource_id) {
            info!("bridge already running, tearing down previous instance");
            let report = self.stop(&previous).await;
            if !report.is_clean() {
                warn!(
                    failures = report.failures.len(),
                    "teardown of previous instance reported failures"
                );
            }
        }

        telemetry::install(&self.hub, self.metrics.clone(), resource_id);

        match self
            .start_inner(resource_id, config, producer_config, template_config)
            .await
        {
            Ok(instance) => Ok(instance),
            Err(e) => {
                telemetry::uninstall(&self.hub, resource_id);
                Err(e)
            }
        }
    }

    async fn start_inner(
        &self,
        resource_id: &str,
        config: &BridgeConfig,
        producer_config: &ProducerConfig,
        template_config: &MessageTemplateConfig,
    ) -> Result<Arc<BridgeInstance>> {
        let endpoints = resolve_endpoints(&config.bootstrap_hosts)?;
        let client_settings = ClientSettings {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            metadata_request_timeout: Duration::from_millis(config.metadata_request_timeout_ms),
            socket_options: resolve_socket_options(&config.socket_opts),
            credentials: resolve_credentials(&config.authentication)?,
            tls: resolve_tls(&config.tls),
        };

        info!(
            endpoints = %endpoints.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            topic = %producer_config.topic,
            "starting kafka client"
        );

        let client = match self
            .driver
            .ensure_client(resource_id, &endpoints, &client_settings)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "client start failed");
                return Err(Error::ClientStart {
                    resource_id: resource_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let buffer = select_buffer(&producer_config.buffer, &self.data_dir, resource_id);
        let producer_settings = ProducerSettings {
            max_batch_bytes: producer_config.max_batch_bytes,
            compression: producer_config.compression,
            partition_strategy: producer_config.partition_strategy,
            required_acks: producer_config.required_acks,
            partition_count_refresh_interval: Duration::from_secs(
                producer_config.partition_count_refresh_interval_secs,
            ),
            max_inflight: producer_config.max_inflight,
            buffer,
        };

        let producer = match self
            .driver
            .ensure_producer(&client, &producer_config.topic, &producer_settings)
            .await
        {
            Ok(producer) => producer,
            Err(e) => {
                // The client must not be left behind with a stale
                // configuration for the next start attempt.
                warn!(error = %e, "producer start failed, tearing down client");
                self.teardown_handles(resource_id, None, Some(&client)).await;
                return Err(Error::ProducerStart {
                    resource_id: resource_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let template = match CompiledTemplate::compile(template_config) {
            Ok(template) => template,
            Err(e) => {
                self.teardown_handles(resource_id, Some(&producer), Some(&client))
                    .await;
                return Err(e);
            }
        };

        let instance = Arc::new(BridgeInstance {
            resource_id: resource_id.to_string(),
            client,
            producer,
            template,
            stopped: AtomicBool::new(false),
        });
        self.instances
            .lock()
            .unwrap()
            .insert(resource_id.to_string(), instance.clone());
        info!("bridge started");
        Ok(instance)
    }

    /// Stops a bridge instance: producer, then client, then telemetry
    /// subscription, each step guarded so one failure never prevents the
    /// next. Stopping an already-stopped instance is a no-op.
    #[instrument(skip(self, instance), fields(resource_id = %instance.resource_id))]
    pub async fn stop(&self, instance: &BridgeInstance) -> TeardownReport {
        if instance.stopped.swap(true, Ordering::SeqCst) {
            return TeardownReport::default();
        }

        {
            let mut instances = self.instances.lock().unwrap();
            let is_current = instances
                .get(&instance.resource_id)
                .is_some_and(|current| std::ptr::eq(current.as_ref(), instance));
            if is_current {
                instances.remove(&instance.resource_id);
            }
        }

        let report = self
            .teardown_handles(
                &instance.resource_id,
                Some(&instance.producer),
                Some(&instance.client),
            )
            .await;
        if report.is_clean() {
            info!("bridge stopped");
        } else {
            warn!(
                failures = report.failures.len(),
                "bridge stopped with teardown failures"
            );
        }
        report
    }

    /// Renders `event` through the instance's template and enqueues it.
    ///
    /// Returns synchronously; delivery settles asynchronously on the
    /// driver's scheduling. A producer that cannot accept the record
    /// surfaces as [`Error::Delivery`] to the caller, not retried here.
    pub fn send(&self, instance: &BridgeInstance, event: &Value) -> Result<()> {
        if instance.is_stopped() {
            return Err(Error::Delivery(format!(
                "bridge {} is stopped",
                instance.resource_id
            )));
        }

        let record = instance.template.render(event);

        // Deliberately side-effect-free: delivery metrics come from the
        // telemetry stream, counting here as well would double-report.
        let ack: AckCallback = Arc::new(|_outcome: DeliveryOutcome| {});

        self.driver.send(&instance.producer, record, ack)
    }

    /// Connectivity probe. Internal errors are hard failures, never a
    /// silent `Disconnected`.
    pub async fn status(&self, instance: &BridgeInstance) -> Result<ConnectionStatus> {
        let connected = self.driver.check_connectivity(&instance.client).await?;
        Ok(if connected {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        })
    }

    async fn teardown_handles(
        &self,
        resource_id: &str,
        producer: Option<&ProducerHandle>,
        client: Option<&ClientHandle>,
    ) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(producer) = producer {
            if let Err(e) = self.driver.stop_producer(producer).await {
                warn!(resource_id, error = %e, "failed to stop producer");
                report.failures.push(TeardownFailure {
                    step: "stop_producer",
                    error: e,
                });
            }
        }

        if let Some(client) = client {
            if let Err(e) = self.driver.stop_client(&client.id).await {
                warn!(resource_id, error = %e, "failed to stop client");
                report.failures.push(TeardownFailure {
                    step: "stop_client",
                    error: e,
                });
            }
        }

        telemetry::uninstall(&self.hub, resource_id);

        report
    }
}
