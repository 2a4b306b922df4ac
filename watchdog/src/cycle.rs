//! The offline-check cycle.
//!
//! One call to [`OfflineChecker::run_cycle`] takes a single registry
//! snapshot, evaluates every device against the supplied clock reading and
//! pushes a notification for each stale one. Nothing that goes wrong inside
//! a cycle escapes it: registry failures turn the cycle into a no-op,
//! incomplete records are skipped and delivery failures are recorded per
//! device. The checker holds no mutable state, so overlapping cycles are
//! independent.

use crate::errors::{DeliveryError, RegistryError};
use crate::liveness::{evaluate, Evaluation, DEFAULT_OFFLINE_THRESHOLD_SECS};
use crate::metrics::{
    CYCLES_TOTAL, CYCLE_DURATION_SECONDS, DEVICES_EVALUATED_TOTAL, DEVICES_SKIPPED_TOTAL,
    LAST_CYCLE_STALE, NOTIFICATIONS_FAILED_TOTAL, NOTIFICATIONS_SENT_TOTAL,
    REGISTRY_FAILURES_TOTAL, STALE_DEVICES_TOTAL,
};
use crate::model::{CycleOutcome, CycleReport, DeviceStatus, Notification};
use crate::notifier::Notifier;
use crate::registry::RegistryReader;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OfflineChecker {
    registry: Arc<dyn RegistryReader>,
    notifier: Arc<dyn Notifier>,
    threshold_secs: i64,
    notify_timeout: Duration,
    registry_timeout: Duration,
}

impl OfflineChecker {
    pub fn new(registry: Arc<dyn RegistryReader>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry,
            notifier,
            threshold_secs: DEFAULT_OFFLINE_THRESHOLD_SECS,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            registry_timeout: DEFAULT_REGISTRY_TIMEOUT,
        }
    }

    pub fn with_threshold(mut self, threshold_secs: i64) -> Self {
        self.threshold_secs = threshold_secs;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn with_registry_timeout(mut self, timeout: Duration) -> Self {
        self.registry_timeout = timeout;
        self
    }

    pub fn threshold_secs(&self) -> i64 {
        self.threshold_secs
    }

    /// Runs a cycle against the wall clock.
    pub async fn run_cycle_now(&self) -> CycleReport {
        self.run_cycle(Utc::now().timestamp()).await
    }

    /// Runs one cycle with `now` in Unix epoch seconds. Always returns a
    /// report, whatever failed along the way.
    pub async fn run_cycle(&self, now: i64) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", cycle_id = %cycle_id, now);
        self.sweep(cycle_id, now).instrument(span).await
    }

    async fn sweep(&self, cycle_id: Uuid, now: i64) -> CycleReport {
        CYCLES_TOTAL.inc();
        let _timer = CYCLE_DURATION_SECONDS.start_timer();
        info!("Running offline check");

        let fetched = tokio::time::timeout(self.registry_timeout, self.registry.snapshot())
            .await
            .unwrap_or(Err(RegistryError::Timeout));

        let snapshot = match fetched {
            Ok(Some(snapshot)) if !snapshot.is_empty() => snapshot,
            Ok(_) => {
                info!("No devices found");
                LAST_CYCLE_STALE.set(0.0);
                return CycleReport::empty(cycle_id, now, CycleOutcome::NoDevices);
            }
            Err(e) => {
                REGISTRY_FAILURES_TOTAL.inc();
                error!("Error reading device registry: {}", e);
                return CycleReport::empty(cycle_id, now, CycleOutcome::RegistryUnavailable);
            }
        };

        let mut report = CycleReport::empty(cycle_id, now, CycleOutcome::Completed);
        report.devices = snapshot.len();

        let mut dispatches = JoinSet::new();
        let mut in_flight: HashMap<String, i64> = HashMap::new();

        for (device_id, record) in &snapshot {
            DEVICES_EVALUATED_TOTAL.inc();

            match evaluate(record, now, self.threshold_secs) {
                Evaluation::Skip(reason) => {
                    info!("Skipping device {}: {}", device_id, reason);
                    DEVICES_SKIPPED_TOTAL
                        .with_label_values(&[reason.as_str()])
                        .inc();
                    report.record(device_id.clone(), DeviceStatus::Skipped { reason });
                }
                Evaluation::Online { age_secs } => {
                    debug!("Device {} last seen {}s ago", device_id, age_secs);
                    report.record(device_id.clone(), DeviceStatus::Online { age_secs });
                }
                Evaluation::Stale { token, age_secs } => {
                    STALE_DEVICES_TOTAL.inc();
                    warn!(
                        "Device {} silent for {}s, sending offline notification",
                        device_id, age_secs
                    );

                    let notification =
                        Notification::offline(device_id, token, self.threshold_secs);
                    let notifier = Arc::clone(&self.notifier);
                    let timeout = self.notify_timeout;
                    let id = device_id.clone();
                    in_flight.insert(id.clone(), age_secs);

                    dispatches.spawn(
                        async move {
                            let result =
                                match tokio::time::timeout(timeout, notifier.send(&notification))
                                    .await
                                {
                                    Ok(result) => result,
                                    Err(_) => Err(DeliveryError::Timeout),
                                };
                            (id, result)
                        }
                        .in_current_span(),
                    );
                }
            }
        }

        while let Some(joined) = dispatches.join_next().await {
            match joined {
                Ok((device_id, result)) => {
                    let age_secs = in_flight.remove(&device_id).unwrap_or_default();
                    record_delivery(&mut report, device_id, age_secs, result);
                }
                Err(e) => {
                    error!("Notification task failed: {}", e);
                }
            }
        }

        // Whatever is left belongs to tasks that panicked or were cancelled.
        for (device_id, age_secs) in in_flight {
            let err = DeliveryError::TaskFailed("task did not complete".to_string());
            record_delivery(&mut report, device_id, age_secs, Err(err));
        }

        report.results.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        LAST_CYCLE_STALE.set(report.stale as f64);

        info!(
            "Offline check complete: {} devices, {} online, {} stale ({} notified, {} failed), {} skipped",
            report.devices,
            report.online,
            report.stale,
            report.delivered,
            report.failed,
            report.skipped_no_token + report.skipped_no_timestamp
        );

        report
    }
}

fn record_delivery(
    report: &mut CycleReport,
    device_id: String,
    age_secs: i64,
    result: Result<String, DeliveryError>,
) {
    match result {
        Ok(receipt) => {
            NOTIFICATIONS_SENT_TOTAL.inc();
            info!("Notification sent for device {}: {}", device_id, receipt);
            report.record(device_id, DeviceStatus::Notified { age_secs, receipt });
        }
        Err(e) => {
            NOTIFICATIONS_FAILED_TOTAL.inc();
            error!("Failed to notify for device {}: {}", device_id, e);
            report.record(
                device_id,
                DeviceStatus::DeliveryFailed {
                    age_secs,
                    error: e.to_string(),
                },
            );
        }
    }
}
