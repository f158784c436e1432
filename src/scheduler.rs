//! Background reconciliation scheduler.
//!
//! Two periodic tasks keep local order state converged with the provider:
//!
//! * status poll - every `poll_interval`, reconcile a batch of in-flight
//!   orders that the provider already accepted;
//! * submission retry - every `retry_interval`, resubmit a batch of recent
//!   orders the provider never accepted.
//!
//! One provider failure affects only that order within a tick; the rest of
//! the batch still runs, and the next tick picks the failed order up again.
//! The tick bodies are standalone functions so tests drive them directly
//! without timers.

use crate::{
    core::{order, status::StatusMap},
    errors::Result,
    provider::SmmProvider,
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Cadence and batch limits for the two reconciliation tasks.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often in-flight orders are polled
    pub poll_interval: Duration,
    /// Max orders reconciled per poll tick
    pub poll_batch: u64,
    /// How often unsubmitted orders are retried
    pub retry_interval: Duration,
    /// Max orders resubmitted per retry tick
    pub retry_batch: u64,
    /// Only orders created within this window are retried
    pub retry_window: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            poll_batch: 100,
            retry_interval: Duration::from_secs(600),
            retry_batch: 50,
            retry_window: chrono::Duration::hours(24),
        }
    }
}

/// What one tick accomplished, for the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Orders handled successfully
    pub processed: usize,
    /// Orders skipped after a per-order failure
    pub failed: usize,
}

/// Owns the two periodic tasks and their shutdown signal.
pub struct Scheduler {
    db: DatabaseConnection,
    provider: Arc<dyn SmmProvider>,
    status_map: StatusMap,
    config: SchedulerConfig,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        db: DatabaseConnection,
        provider: Arc<dyn SmmProvider>,
        status_map: StatusMap,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            db,
            provider,
            status_map,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// A handle for requesting shutdown from outside (signal handler).
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs both tasks until the shutdown token fires. In-flight ticks
    /// finish; no tick is interrupted halfway through an order.
    pub async fn run(self) {
        tracing::info!(
            poll_interval = ?self.config.poll_interval,
            retry_interval = ?self.config.retry_interval,
            "Reconciliation scheduler starting"
        );
        tokio::join!(self.status_poll_loop(), self.submission_retry_loop());
        tracing::info!("Reconciliation scheduler stopped");
    }

    async fn status_poll_loop(&self) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = interval.tick() => {
                    match run_status_poll_tick(
                        &self.db,
                        self.provider.as_ref(),
                        &self.status_map,
                        self.config.poll_batch,
                    )
                    .await
                    {
                        Ok(summary) if summary != TickSummary::default() => {
                            tracing::info!(
                                processed = summary.processed,
                                failed = summary.failed,
                                "Status poll tick finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Status poll tick failed"),
                    }
                }
            }
        }
    }

    async fn submission_retry_loop(&self) {
        let mut interval = tokio::time::interval(self.config.retry_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = interval.tick() => {
                    match run_submission_retry_tick(
                        &self.db,
                        self.provider.as_ref(),
                        self.config.retry_batch,
                        self.config.retry_window,
                    )
                    .await
                    {
                        Ok(summary) if summary != TickSummary::default() => {
                            tracing::info!(
                                processed = summary.processed,
                                failed = summary.failed,
                                "Submission retry tick finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Submission retry tick failed"),
                    }
                }
            }
        }
    }
}

/// One pass of the status poll: reconciles up to `batch` in-flight orders
/// against the provider. Per-order failures are logged and counted, never
/// propagated past the order they belong to.
pub async fn run_status_poll_tick(
    db: &DatabaseConnection,
    provider: &dyn SmmProvider,
    status_map: &StatusMap,
    batch: u64,
) -> Result<TickSummary> {
    let orders = order::find_pollable_orders(db, batch).await?;

    let mut summary = TickSummary::default();
    for candidate in orders {
        match order::reconcile_order(db, provider, status_map, candidate.id).await {
            Ok(_) => summary.processed += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    order_id = candidate.id,
                    error = %e,
                    "Skipping order after reconciliation failure"
                );
            }
        }
    }

    Ok(summary)
}

/// One pass of the submission retry: resubmits up to `batch` recent orders
/// the provider never accepted. Same per-order failure isolation as the
/// status poll.
pub async fn run_submission_retry_tick(
    db: &DatabaseConnection,
    provider: &dyn SmmProvider,
    batch: u64,
    window: chrono::Duration,
) -> Result<TickSummary> {
    let orders = order::find_unsubmitted_orders(db, batch, window).await?;

    let mut summary = TickSummary::default();
    for candidate in orders {
        match order::submit_order(db, provider, candidate.id).await {
            Ok(_) => summary.processed += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    order_id = candidate.id,
                    error = %e,
                    "Order submission retry failed, will retry next tick"
                );
            }
        }
    }

    Ok(summary)
}
