//! Scheduled background drivers
//!
//! Periodic sweeps that run alongside live request handling: fine issuing,
//! payment expiry and due-date reminders. A failed iteration is logged and
//! the loop keeps going; cadence is deployment configuration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::{config::SchedulerConfig, services::Services};

/// Spawn all periodic sweeps onto the runtime
pub fn spawn(config: SchedulerConfig, services: Arc<Services>) {
    spawn_fine_sweep(config.fine_sweep_interval_secs, services.clone());
    spawn_payment_expiry(
        config.payment_expiry_interval_secs,
        config.payment_retention_hours,
        services.clone(),
    );
    spawn_due_reminders(
        config.reminder_interval_secs,
        config.reminder_lead_days,
        services,
    );
}

fn spawn_fine_sweep(interval_secs: u64, services: Arc<Services>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match services.fines.issue_fines().await {
                Ok(report) => {
                    tracing::info!(
                        total_overdue = report.total_overdue,
                        created = report.created,
                        skipped = report.skipped,
                        failed = report.failed,
                        "fine sweep completed"
                    );
                    for failure in &report.failures {
                        tracing::warn!(
                            borrowing_id = %failure.borrowing_id,
                            error = %failure.error,
                            "fine sweep item failed"
                        );
                    }
                }
                Err(e) => tracing::error!(error = %e, "fine sweep failed"),
            }
        }
    });
}

fn spawn_payment_expiry(interval_secs: u64, retention_hours: i64, services: Arc<Services>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);
            match services.payments.expire_pending(cutoff).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "expired stale pending payments"),
                Err(e) => tracing::error!(error = %e, "payment expiry sweep failed"),
            }
        }
    });
}

fn spawn_due_reminders(interval_secs: u64, lead_days: i64, services: Arc<Services>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match services.borrowings.send_due_reminders(lead_days).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "sent due-date reminders"),
                Err(e) => tracing::error!(error = %e, "reminder sweep failed"),
            }
        }
    });
}
