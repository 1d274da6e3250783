use crate::error::Result;
use crate::models::notification_event::NotificationEvent;
use crate::utils::signature::sign_payload;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub const EVENT_SCORE_SUBMITTED: &str = "score-submitted";
pub const EVENT_SCORE_EDITED: &str = "score-edited";
pub const EVENT_LICENSE_EXPIRED: &str = "license:expired";
pub const EVENT_LICENSE_LIMIT_REACHED: &str = "license:limitReached";
pub const EVENT_LICENSE_DISABLED: &str = "license:disabled";
pub const EVENT_LICENSE_REACTIVATED: &str = "license:reactivated";

/// Records fan-out events per college room and pushes them to the
/// notification server. Delivery is best-effort: bounded retries with
/// backoff, and clients that miss an event re-fetch state instead.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    target_url: String,
}

impl NotificationService {
    pub fn new(pool: PgPool, target_url: String) -> Self {
        Self {
            pool,
            client: Client::new(),
            target_url,
        }
    }

    pub async fn enqueue(
        &self,
        event_type: &str,
        room: &str,
        payload: &JsonValue,
    ) -> Result<NotificationEvent> {
        let event = sqlx::query_as::<_, NotificationEvent>(
            r#"
            INSERT INTO notification_events (event_type, room, payload, target_url, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING *
            "#,
        )
        .bind(event_type)
        .bind(room)
        .bind(payload)
        .bind(&self.target_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    /// Score events carry enough for the receiver to identify the student
    /// without re-fetching.
    pub async fn enqueue_score_event(
        &self,
        event_type: &str,
        room: &str,
        student_name: &str,
        score_id: Uuid,
        quiz_title: &str,
    ) -> Result<NotificationEvent> {
        let payload = json!({
            "studentName": student_name,
            "scoreId": score_id,
            "quizTitle": quiz_title,
        });
        self.enqueue(event_type, room, &payload).await
    }

    pub async fn enqueue_license_event(
        &self,
        event_type: &str,
        college: &str,
        message: &str,
    ) -> Result<NotificationEvent> {
        let payload = json!({
            "college": college,
            "message": message,
        });
        self.enqueue(event_type, college, &payload).await
    }

    pub async fn deliver_once(&self, event_id: Uuid) -> Result<()> {
        let event = sqlx::query_as::<_, NotificationEvent>(
            r#"SELECT * FROM notification_events WHERE id = $1"#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        let body = json!({
            "event": event.event_type,
            "room": event.room,
            "payload": event.payload,
        });
        let body_bytes = serde_json::to_vec(&body)?;
        let secret = &crate::config::get_config().notify_webhook_secret;
        let signature = sign_payload(secret, &body_bytes)?;

        let res = self
            .client
            .post(&event.target_url)
            .header("X-Notify-Event", &event.event_type)
            .header("X-Notify-Signature", signature)
            .header("content-type", "application/json")
            .body(body_bytes)
            .send()
            .await;

        match res {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let response_body = resp.text().await.unwrap_or_default();
                sqlx::query(
                    r#"UPDATE notification_events
                       SET http_status = $1, response_body = $2,
                           status = CASE WHEN $1 BETWEEN 200 AND 299 THEN 'success' ELSE 'failed' END,
                           attempts = attempts + 1, updated_at = NOW()
                       WHERE id = $3"#,
                )
                .bind(status)
                .bind(response_body)
                .bind(event.id)
                .execute(&self.pool)
                .await?;
            }
            Err(err) => {
                sqlx::query(
                    r#"UPDATE notification_events
                       SET response_body = $1, status = 'failed',
                           attempts = attempts + 1, updated_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(format!("{}", err))
                .bind(event.id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Picks one due pending event and delivers it. Returns false when the
    /// queue is empty so the worker loop can sleep.
    pub async fn run_once(&self) -> Result<bool> {
        let row_opt = sqlx::query(
            r#"SELECT id FROM notification_events
               WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
               ORDER BY created_at ASC
               FOR UPDATE SKIP LOCKED
               LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: Uuid = row.try_get("id")?;

        let _ = self.deliver_once(id).await;

        let row2 = sqlx::query(
            r#"SELECT attempts, max_attempts, status FROM notification_events WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        let attempts: i32 = row2.try_get("attempts")?;
        let max_attempts: i32 = row2.try_get("max_attempts")?;
        let status: String = row2.try_get("status")?;

        if status == "failed" && attempts < max_attempts {
            let delay_secs = backoff_seconds(attempts);
            sqlx::query(
                r#"UPDATE notification_events
                   SET status = 'pending', next_retry_at = NOW() + make_interval(secs => $1)
                   WHERE id = $2"#,
            )
            .bind(delay_secs as f64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        Ok(true)
    }

    /// Room-scoped read-back for polling clients.
    pub async fn poll(&self, room: &str, since: DateTime<Utc>) -> Result<Vec<NotificationEvent>> {
        let events = sqlx::query_as::<_, NotificationEvent>(
            r#"SELECT * FROM notification_events
               WHERE room = $1 AND created_at > $2
               ORDER BY created_at ASC
               LIMIT 200"#,
        )
        .bind(room)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}

fn backoff_seconds(attempts: i32) -> u32 {
    let exp = attempts.saturating_sub(1).clamp(0, 7) as u32;
    (30u32.saturating_mul(2u32.pow(exp))).min(3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_seconds(1), 30);
        assert_eq!(backoff_seconds(2), 60);
        assert_eq!(backoff_seconds(3), 120);
        assert_eq!(backoff_seconds(20), 3600);
        // a zero attempt count behaves like the first retry
        assert_eq!(backoff_seconds(0), 30);
    }
}
