//! Post-commit notification fan-out.
//!
//! Webhook delivery and search reindexing run as one detached task after a
//! template commit. Both are best effort: failures are logged and never
//! reach the caller or undo the commit.

use std::sync::Arc;
use std::time::Duration;

use crate::models::TemplateResponse;
use crate::state::AppState;

/// Event name sent for new templates.
pub const TEMPLATE_CREATED_EVENT: &str = "template.created";

/// HTTP timeout for a single webhook delivery.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Fan out "template created" side effects. Returns immediately.
pub fn template_created(state: Arc<AppState>, template: &TemplateResponse) {
    let template = template.clone();
    tokio::spawn(async move {
        deliver_webhooks(&state, &template).await;
        refresh_search_entry(&state, &template).await;
    });
}

async fn deliver_webhooks(state: &AppState, template: &TemplateResponse) {
    if state.config.webhook_urls.is_empty() {
        return;
    }

    let client = match reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Could not build webhook client: {}", e);
            return;
        }
    };

    let payload = serde_json::json!({
        "event_type": TEMPLATE_CREATED_EVENT,
        "timestamp": template.created_at,
        "data": template,
    });

    for url in &state.config.webhook_urls {
        match client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(url = %url, "Webhook delivered");
            }
            Ok(response) => tracing::warn!(
                url = %url,
                status = response.status().as_u16(),
                "Webhook returned non-success status"
            ),
            Err(e) => tracing::warn!(url = %url, error = %e, "Webhook delivery failed"),
        }
    }
}

async fn refresh_search_entry(state: &AppState, template: &TemplateResponse) {
    let mut content = template.name.clone();
    for doc in &template.documents {
        content.push(' ');
        content.push_str(&doc.filename);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO search_entries (template_id, content, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(template_id) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at
        "#,
    )
    .bind(&template.id)
    .bind(&content)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        tracing::warn!(template_id = %template.id, error = %e, "Search reindex failed");
    }
}
