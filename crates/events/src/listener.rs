//! PostgreSQL `LISTEN` bridge.
//!
//! The `notify_row_change` trigger sends `{table, op, id, scope_id}` on the
//! `helpdesk_changes` channel. [`PgChangeListener`] re-reads the affected row
//! (payloads are size-limited, so rows are never inlined) and publishes a
//! [`ChangeEvent`] on the [`ChangeBus`].

use std::sync::Arc;
use std::time::Duration;

use helpdesk_core::types::DbId;
use helpdesk_db::repositories::{ApprovalRequestRepo, ArticleRepo, MessageRepo, TicketRepo};
use helpdesk_db::DbPool;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;

use crate::bus::{ChangeBus, ChangeEvent, ChangeKind, Table};

/// Notification channel used by the `notify_row_change` trigger.
pub const CHANNEL: &str = "helpdesk_changes";

/// Receive errors in a row after which the listener gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 8;
const BASE_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Wait before the next receive after `failures` consecutive errors.
pub(crate) fn retry_delay(failures: u32) -> Duration {
    let factor = 1u32 << failures.saturating_sub(1).min(16);
    BASE_RETRY_DELAY.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Raw trigger payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifyPayload {
    pub table: String,
    pub op: String,
    pub id: DbId,
    pub scope_id: Option<DbId>,
}

impl NotifyPayload {
    /// Parse and classify a payload. Returns `None` for tables or operations
    /// this crate does not publish.
    pub fn parse(raw: &str) -> Option<(Table, ChangeKind, Self)> {
        let payload: NotifyPayload = match serde_json::from_str(raw) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, payload = raw, "Malformed change notification");
                return None;
            }
        };
        let table = payload.table.parse::<Table>().ok()?;
        let kind = payload.op.parse::<ChangeKind>().ok()?;
        Some((table, kind, payload))
    }
}

/// Background service forwarding database notifications to the bus.
pub struct PgChangeListener {
    pool: DbPool,
    bus: Arc<ChangeBus>,
}

impl PgChangeListener {
    pub fn new(pool: DbPool, bus: Arc<ChangeBus>) -> Self {
        Self { pool, bus }
    }

    /// Run until `cancel` fires.
    ///
    /// `PgListener` re-connects on its own after a dropped connection;
    /// notifications sent while disconnected are lost, which subscribers see
    /// as missing events rather than errors. Receive errors back off
    /// exponentially; after [`MAX_CONSECUTIVE_FAILURES`] in a row the last
    /// error is returned.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANNEL).await?;
        tracing::info!(channel = CHANNEL, "Change listener started");

        let mut failures = 0u32;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                notification = listener.recv() => match notification {
                    Ok(n) => {
                        failures = 0;
                        self.forward(n.payload()).await;
                        continue;
                    }
                    Err(e) => {
                        failures += 1;
                        if failures >= MAX_CONSECUTIVE_FAILURES {
                            tracing::error!(error = %e, failures, "Change listener giving up");
                            return Err(e);
                        }
                        tracing::warn!(error = %e, failures, "Change listener receive failed");
                    }
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(retry_delay(failures)) => {}
            }
        }
        tracing::info!("Change listener shutting down");
        Ok(())
    }

    async fn forward(&self, raw: &str) {
        let Some((table, kind, payload)) = NotifyPayload::parse(raw) else {
            return;
        };

        let event = match kind {
            ChangeKind::Delete => Some(ChangeEvent::deleted(table, payload.id, payload.scope_id)),
            ChangeKind::Insert | ChangeKind::Update => match self.hydrate(table, payload.id).await {
                Ok(Some(row)) => Some(
                    ChangeEvent::new(table, kind, payload.id)
                        .with_scope(payload.scope_id)
                        .with_new(row),
                ),
                // Deleted again before we could read it; the delete follows.
                Ok(None) => None,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        table = %table,
                        id = payload.id,
                        "Failed to load changed row"
                    );
                    None
                }
            },
        };

        if let Some(event) = event {
            tracing::debug!(table = %event.table, kind = %event.kind, id = event.record_id, "Change received");
            self.bus.publish(event);
        }
    }

    async fn hydrate(&self, table: Table, id: DbId) -> Result<Option<serde_json::Value>, sqlx::Error> {
        let value = match table {
            Table::Tickets => TicketRepo::find_by_id(&self.pool, id).await?.map(to_json),
            Table::Messages => MessageRepo::find_by_id(&self.pool, id).await?.map(to_json),
            Table::Articles => ArticleRepo::find_by_id(&self.pool, id).await?.map(to_json),
            Table::ApprovalRequests => ApprovalRequestRepo::find_by_id(&self.pool, id)
                .await?
                .map(to_json),
        };
        Ok(value.transpose().unwrap_or_else(|e| {
            tracing::error!(error = %e, table = %table, id, "Failed to serialize changed row");
            None
        }))
    }
}

fn to_json<T: serde::Serialize>(row: T) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(row)
}
