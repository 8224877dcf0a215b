//! Translation of resolved bridge settings into rdkafka client properties.

use rdkafka::ClientConfig;

use crate::auth::{Credentials, TlsOptions};
use crate::config::PartitionStrategy;
use crate::driver::{ClientSettings, ProducerSettings};
use crate::endpoint::Endpoint;

/// Builds the base client configuration shared by every producer bound to
/// the same client.
pub fn base_client_config(endpoints: &[Endpoint], settings: &ClientSettings) -> ClientConfig {
    let mut config = ClientConfig::new();

    config.set(
        "bootstrap.servers",
        endpoints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    );
    config.set(
        "socket.connection.setup.timeout.ms",
        settings.connect_timeout.as_millis().to_string(),
    );
    config.set(
        "socket.timeout.ms",
        settings.metadata_request_timeout.as_millis().to_string(),
    );

    let socket = &settings.socket_options;
    if let Some(bytes) = socket.send_buffer {
        config.set("socket.send.buffer.bytes", bytes.to_string());
    }
    if let Some(bytes) = socket.receive_buffer {
        config.set("socket.receive.buffer.bytes", bytes.to_string());
    }
    // The adjusted user-space `buffer` value has no librdkafka equivalent
    // and stays descriptor-only.
    config.set(
        "socket.nagle.disable",
        if socket.nodelay { "true" } else { "false" },
    );

    apply_security(&mut config, &settings.credentials, settings.tls.as_ref());

    config
}

fn apply_security(config: &mut ClientConfig, credentials: &Credentials, tls: Option<&TlsOptions>) {
    let protocol = match (credentials, tls) {
        (Credentials::None, None) => "plaintext",
        (Credentials::None, Some(_)) => "ssl",
        (_, None) => "sasl_plaintext",
        (_, Some(_)) => "sasl_ssl",
    };
    config.set("security.protocol", protocol);

    match credentials {
        Credentials::None => {}
        Credentials::Plain {
            mechanism,
            username,
            password,
        } => {
            config.set("sasl.mechanism", mechanism.kafka_value());
            config.set("sasl.username", username);
            config.set("sasl.password", password.expose_secret());
        }
        Credentials::Kerberos {
            principal,
            keytab_file,
        } => {
            config.set("sasl.mechanism", "GSSAPI");
            config.set("sasl.kerberos.principal", principal);
            config.set(
                "sasl.kerberos.keytab",
                keytab_file.to_string_lossy().to_string(),
            );
        }
    }

    if let Some(tls) = tls {
        if let Some(ca) = &tls.ca_file {
            config.set("ssl.ca.location", ca.to_string_lossy().to_string());
        }
        if let Some(cert) = &tls.cert_file {
            config.set("ssl.certificate.location", cert.to_string_lossy().to_string());
        }
        if let Some(key) = &tls.key_file {
            config.set("ssl.key.location", key.to_string_lossy().to_string());
        }
        config.set(
            "enable.ssl.certificate.verification",
            if tls.verify { "true" } else { "false" },
        );
    }
}

/// Derives the per-producer configuration from the client base.
pub fn producer_client_config(base: &ClientConfig, settings: &ProducerSettings) -> ClientConfig {
    let mut config = base.clone();

    config.set("batch.size", settings.max_batch_bytes.to_string());
    config.set("compression.type", settings.compression.as_str());
    config.set("acks", settings.required_acks.kafka_value());
    config.set(
        "max.in.flight.requests.per.connection",
        settings.max_inflight.to_string(),
    );
    config.set(
        "topic.metadata.refresh.interval.ms",
        settings
            .partition_count_refresh_interval
            .as_millis()
            .to_string(),
    );
    config.set("partitioner", partitioner_value(settings.partition_strategy));

    // librdkafka's producer queue is memory-only; bound it from the plan.
    let kbytes = (settings.buffer.per_partition_limit / 1024).max(1);
    config.set("queue.buffering.max.kbytes", kbytes.to_string());

    config
}

/// librdkafka has no round-robin partitioner; `random` preserves the
/// keyless-spread intent.
pub fn partitioner_value(strategy: PartitionStrategy) -> &'static str {
    match strategy {
        PartitionStrategy::Random => "random",
        PartitionStrategy::RoundRobin => "random",
        PartitionStrategy::KeyHash => "murmur2_random",
    }
}
