//! Periodic reminder delivery.
//!
//! Each cycle reads a snapshot of every due, reminder-eligible note, hands
//! each occurrence not yet in the dedup set to the sink, and then drops
//! dedup keys that no longer appear in the snapshot. A key `(id, T)` is only
//! recorded once `T <= now`, so it stays in every later snapshot for as long
//! as the note keeps that reminder and stays out of the trash.
//!
//! Failed or timed-out deliveries are not recorded and are retried on the
//! next cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use keep_db::Database;

use crate::dedup::{DedupKey, DedupSet};
use crate::sink::{DeliveryError, Notification, NotificationSink};

/// Outcome counters for one scan cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub due: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub evicted: usize,
}

pub struct ReminderEngine {
    db: Arc<Database>,
    sink: Arc<dyn NotificationSink>,
    dedup: DedupSet,
    interval: Duration,
    delivery_timeout: Duration,
}

impl ReminderEngine {
    pub fn new(
        db: Arc<Database>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            db,
            sink,
            dedup: DedupSet::new(),
            interval,
            delivery_timeout,
        }
    }

    pub fn dedup(&self) -> &DedupSet {
        &self.dedup
    }

    /// Runs one cycle against the state of the store at `now`.
    pub async fn scan(&mut self, now: DateTime<Utc>) -> Result<ScanReport> {
        let db = self.db.clone();
        let due = tokio::task::spawn_blocking(move || db.due_reminders(now))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

        let mut report = ScanReport {
            due: due.len(),
            ..Default::default()
        };
        let mut live = HashSet::with_capacity(due.len());

        for note in &due {
            let (Some(key), Some(notification)) =
                (DedupKey::for_note(note), Notification::for_note(note))
            else {
                continue;
            };
            live.insert(key);

            if self.dedup.contains(&key) {
                report.skipped += 1;
                continue;
            }

            match self.deliver(&notification).await {
                Ok(()) => {
                    debug!(
                        "Reminder for note {} delivered to {}",
                        note.id, notification.recipient
                    );
                    self.dedup.record(key);
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(
                        "Reminder for note {} not delivered, retrying next cycle: {}",
                        note.id, e
                    );
                    report.failed += 1;
                }
            }
        }

        report.evicted = self.dedup.retain_live(&live);
        Ok(report)
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        match tokio::time::timeout(self.delivery_timeout, self.sink.deliver(notification)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.delivery_timeout)),
        }
    }

    /// Scans on a fixed interval until `cancel` fires. A cycle that has
    /// started always runs to completion.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Reminder engine started (every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.scan(Utc::now()).await {
                Ok(report) => {
                    if report.delivered > 0 || report.failed > 0 || report.evicted > 0 {
                        info!(
                            "Reminders: {} due, {} delivered, {} failed, {} evicted",
                            report.due, report.delivered, report.failed, report.evicted
                        );
                    }
                }
                Err(e) => {
                    warn!("Reminder scan error: {}", e);
                }
            }
        }

        info!("Reminder engine stopped");
    }
}
