// ── Telemetry streaming ──
//
// Poll → transform → deliver, repeated on a fixed cadence. Each round opens
// its own broker connection, publishes every record with QoS 1, waits for
// the settle time, then disconnects. Rounds never overlap; cancellation is
// observed between rounds and while a round waits for the broker.

pub mod aps;
pub mod extra;
pub mod switches;

use std::future::Future;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use netboard_api::{BrokerConfig, GatewayClient, TELEMETRY_TOPIC};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::CoreError;
use crate::model::TelemetryRecord;

// ── Publisher boundary ───────────────────────────────────────────────

/// A connected gateway session.
#[async_trait]
pub trait GatewayPublisher: Send + Sync {
    /// Publish a JSON payload on `topic` with QoS 1, no retain.
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), CoreError>;

    async fn disconnect(self: Box<Self>);
}

/// Opens a fresh [`GatewayPublisher`] per round.
#[async_trait]
pub trait PublisherFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn GatewayPublisher>, CoreError>;
}

#[async_trait]
impl GatewayPublisher for GatewayClient {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), CoreError> {
        Ok(self.publish_json(topic, payload).await?)
    }

    async fn disconnect(self: Box<Self>) {
        GatewayClient::disconnect(*self).await;
    }
}

/// [`PublisherFactory`] connecting to the platform's MQTT broker.
pub struct MqttPublisherFactory {
    broker: BrokerConfig,
}

impl MqttPublisherFactory {
    pub fn new(broker: BrokerConfig) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl PublisherFactory for MqttPublisherFactory {
    async fn connect(&self) -> Result<Box<dyn GatewayPublisher>, CoreError> {
        let client = GatewayClient::connect(&self.broker).await?;
        Ok(Box::new(client))
    }
}

// ── Publishing ───────────────────────────────────────────────────────

/// Counts from one delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
    pub published: usize,
    pub failed: usize,
}

/// Publish each record to the telemetry topic, then wait `settle`.
///
/// Every record is attempted; failures are logged and counted.
pub async fn publish_telemetry(
    publisher: &dyn GatewayPublisher,
    records: &[TelemetryRecord],
    settle: Duration,
) -> PublishSummary {
    let mut summary = PublishSummary::default();
    for record in records {
        let devices: Vec<&str> = record.devices().collect();
        info!(?devices, "publishing telemetry");
        match publisher.publish(TELEMETRY_TOPIC, &record.to_payload()).await {
            Ok(()) => summary.published += 1,
            Err(e) => {
                error!(?devices, error = %e, "telemetry publish failed");
                summary.failed += 1;
            }
        }
    }
    tokio::time::sleep(settle).await;
    summary
}

/// Where a round's records go.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn deliver(&self, records: &[TelemetryRecord]) -> Result<PublishSummary, CoreError>;
}

/// Connect, publish, settle, disconnect.
pub struct MqttSink {
    factory: Arc<dyn PublisherFactory>,
    settle: Duration,
    cancel: CancellationToken,
}

impl MqttSink {
    pub fn new(factory: Arc<dyn PublisherFactory>, settle: Duration) -> Self {
        Self {
            factory,
            settle,
            cancel: CancellationToken::new(),
        }
    }

    /// Give up on a broker that has not accepted yet once `cancel` fires.
    /// Records already being published are unaffected.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
impl TelemetrySink for MqttSink {
    async fn deliver(&self, records: &[TelemetryRecord]) -> Result<PublishSummary, CoreError> {
        let publisher = tokio::select! {
            () = self.cancel.cancelled() => {
                warn!(records = records.len(), "stopped before the broker accepted, round dropped");
                return Ok(PublishSummary {
                    published: 0,
                    failed: records.len(),
                });
            }
            connected = self.factory.connect() => connected?,
        };
        let summary = publish_telemetry(publisher.as_ref(), records, self.settle).await;
        publisher.disconnect().await;
        info!(
            published = summary.published,
            failed = summary.failed,
            "round delivered"
        );
        Ok(summary)
    }
}

/// Dry-run sink: one JSON document per record, one per line.
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    async fn deliver(&self, records: &[TelemetryRecord]) -> Result<PublishSummary, CoreError> {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for record in records {
            writeln!(out, "{}", record.to_payload())
                .map_err(|e| CoreError::io("<dry-run output>", e))?;
        }
        out.flush()
            .map_err(|e| CoreError::io("<dry-run output>", e))?;
        Ok(PublishSummary {
            published: records.len(),
            failed: 0,
        })
    }
}

// ── Round loop ───────────────────────────────────────────────────────

/// Wait before the first round, then between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub initial_delay: Duration,
    pub interval: Duration,
}

/// Run `round` until `cancel` fires. Returns the number of rounds run.
///
/// The token is checked while sleeping between rounds. A round in progress
/// runs to completion unless its sink watches the same token.
pub async fn run_rounds<F, Fut>(cancel: &CancellationToken, cadence: Cadence, mut round: F) -> u64
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut completed = 0u64;
    if !sleep_or_cancel(cancel, cadence.initial_delay).await {
        return completed;
    }
    loop {
        round(completed).await;
        completed += 1;
        if !sleep_or_cancel(cancel, cadence.interval).await {
            info!(rounds = completed, "streaming stopped");
            return completed;
        }
    }
}

/// `false` when cancelled.
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Deliver a round, logging instead of failing.
pub(crate) async fn deliver_round(sink: &dyn TelemetrySink, records: &[TelemetryRecord]) {
    if records.is_empty() {
        warn!("round produced no telemetry");
        return;
    }
    if let Err(e) = sink.deliver(records).await {
        error!(error = %e, "round delivery failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::TelemetryPoint;

    #[tokio::test]
    async fn json_lines_sink_writes_one_line_per_record() {
        let sink = JsonLinesSink::new(Vec::new());
        let records = vec![
            TelemetryRecord::single("AP1", TelemetryPoint::new(1)),
            TelemetryRecord::single("AP2", TelemetryPoint::new(2)),
        ];
        let summary = sink.deliver(&records).await.unwrap();
        assert_eq!(summary.published, 2);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(r#"{"AP1":"#));
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_stop_when_cancelled() {
        let cancel = CancellationToken::new();
        let cadence = Cadence {
            initial_delay: Duration::from_secs(60),
            interval: Duration::from_secs(270),
        };
        let stopper = cancel.clone();
        let rounds = run_rounds(&cancel, cadence, |n| {
            let stopper = stopper.clone();
            async move {
                if n == 2 {
                    stopper.cancel();
                }
            }
        })
        .await;
        assert_eq!(rounds, 3);
    }

    struct StalledFactory;

    #[async_trait]
    impl PublisherFactory for StalledFactory {
        async fn connect(&self) -> Result<Box<dyn GatewayPublisher>, CoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ends_a_round_waiting_for_the_broker() {
        let cancel = CancellationToken::new();
        let sink = MqttSink::new(Arc::new(StalledFactory), Duration::from_secs(1))
            .with_cancel(cancel.clone());
        let records = vec![TelemetryRecord::single("SW1_1", TelemetryPoint::new(1))];
        let cadence = Cadence {
            initial_delay: Duration::ZERO,
            interval: Duration::from_secs(270),
        };

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            stopper.cancel();
        });
        let (sink, records) = (&sink, records.as_slice());
        let rounds = tokio::time::timeout(
            Duration::from_secs(8),
            run_rounds(&cancel, cadence, move |_| deliver_round(sink, records)),
        )
        .await
        .unwrap();

        assert_eq!(rounds, 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let cadence = Cadence {
            initial_delay: Duration::ZERO,
            interval: Duration::ZERO,
        };
        let rounds = run_rounds(&cancel, cadence, |_| async {}).await;
        assert_eq!(rounds, 0);
    }
}
