//! Transactional outbox.
//!
//! `enqueue` is called with the transaction handle of the write that
//! produced the event; the row becomes visible only if that transaction
//! commits. `start_worker` polls for pending rows and dispatches them to the
//! in-process event channel, retrying with bounded exponential backoff.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::outbox_event::{self, Entity as OutboxEntity, OutboxStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

const MAX_ATTEMPTS: i32 = 8;
const BASE_BACKOFF_SECS: i64 = 2;

/// Enqueues a domain event inside the caller's transaction.
pub async fn enqueue<C: ConnectionTrait>(conn: &C, event: &Event) -> Result<(), ServiceError> {
    let (aggregate_type, aggregate_id) = event.aggregate();
    let now = Utc::now();

    outbox_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        aggregate_type: Set(aggregate_type.to_string()),
        aggregate_id: Set(aggregate_id),
        event_type: Set(event.event_type().to_string()),
        payload: Set(serde_json::to_value(event)?),
        status: Set(OutboxStatus::Pending),
        attempts: Set(0),
        available_at: Set(now),
        created_at: Set(now),
        updated_at: Set(None),
        processed_at: Set(None),
        error_message: Set(None),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::from_db)?;

    Ok(())
}

/// Drains one batch of due pending events. Returns the number of rows
/// claimed.
pub async fn drain_once(
    db: &DatabaseConnection,
    sender: &EventSender,
    batch_size: u64,
) -> Result<usize, ServiceError> {
    let now = Utc::now();
    let due = OutboxEntity::find()
        .filter(outbox_event::Column::Status.eq(OutboxStatus::Pending))
        .filter(outbox_event::Column::AvailableAt.lte(now))
        .order_by_asc(outbox_event::Column::CreatedAt)
        .limit(batch_size)
        .all(db)
        .await
        .map_err(ServiceError::from_db)?;

    let claimed = due.len();
    for row in due {
        let attempts = row.attempts + 1;
        let row_id = row.id;

        let event: Option<Event> = serde_json::from_value(row.payload.clone()).ok();
        let mut active: outbox_event::ActiveModel = row.into();
        active.status = Set(OutboxStatus::Processing);
        active.attempts = Set(attempts);
        active.updated_at = Set(Some(Utc::now()));
        let claimed_row = active.update(db).await.map_err(ServiceError::from_db)?;

        let dispatched = match event {
            Some(event) => sender.send(event).await.is_ok(),
            None => {
                warn!(outbox_id = %row_id, "outbox payload no longer deserializes; dropping");
                false
            }
        };

        let mut active: outbox_event::ActiveModel = claimed_row.into();
        if dispatched {
            active.status = Set(OutboxStatus::Delivered);
            active.processed_at = Set(Some(Utc::now()));
            active.error_message = Set(None);
        } else if attempts < MAX_ATTEMPTS {
            let backoff = BASE_BACKOFF_SECS.saturating_pow(attempts as u32);
            active.status = Set(OutboxStatus::Pending);
            active.available_at = Set(Utc::now() + ChronoDuration::seconds(backoff));
            active.error_message = Set(Some("dispatch failed".to_string()));
        } else {
            active.status = Set(OutboxStatus::Failed);
            active.error_message = Set(Some("max attempts exceeded".to_string()));
        }
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::from_db)?;
    }

    Ok(claimed)
}

/// Spawns the background worker that drains the outbox at a fixed interval.
pub async fn start_worker(
    db: Arc<DatabaseConnection>,
    sender: EventSender,
    poll_interval: Duration,
    batch_size: u64,
) {
    info!(interval_ms = poll_interval.as_millis() as u64, "outbox worker started");
    tokio::spawn(async move {
        loop {
            if let Err(e) = drain_once(&db, &sender, batch_size).await {
                error!("outbox worker error: {}", e);
            }
            sleep(poll_interval).await;
        }
    });
}
