//! Integration tests for template creation from document payloads.

mod common;

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use common::{
    body_json, data_uri, encrypted_pdf, form_pdf, plain_pdf, post_json, post_json_with_token,
    test_app, test_config, test_state,
};
use serde_json::json;
use std::time::Duration;

use template_api::state::AppConfig;

async fn table_count(state: &template_api::state::AppState, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&state.db)
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn creates_template_from_data_uri_pdf() {
    let state = test_state(test_config()).await;
    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "name": "Onboarding",
            "documents": [{ "file": data_uri(&form_pdf()), "name": "lease.pdf" }],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["name"], "Onboarding");
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"][0]["content_type"], "application/pdf");
    assert_eq!(body["documents"][0]["filename"], "lease.pdf");

    // One schema entry per attachment, marked pending because its fields
    // were derived rather than supplied.
    let schema = body["schema"].as_array().unwrap();
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0]["name"], "lease");
    assert_eq!(schema[0]["pending_fields"], true);

    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["name"], "Full Name");
    assert_eq!(fields[0]["type"], "text");
    assert_eq!(fields[0]["required"], true);

    assert_eq!(table_count(&state, "templates").await, 1);
    assert_eq!(table_count(&state, "attachments").await, 1);
}

#[tokio::test]
async fn schema_preserves_submission_order() {
    let state = test_state(test_config()).await;
    let pdf = plain_pdf();

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [
                { "file": data_uri(&pdf), "name": "a.pdf" },
                { "file": data_uri(&pdf), "name": "b.pdf" },
                { "file": data_uri(&pdf), "name": "c.pdf" },
            ],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let names: Vec<&str> = body["schema"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    // Attachment order matches too.
    let filenames: Vec<&str> = body["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["filename"].as_str().unwrap())
        .collect();
    assert_eq!(filenames, vec!["a.pdf", "b.pdf", "c.pdf"]);
}

#[tokio::test]
async fn encrypted_document_aborts_all_or_nothing() {
    let state = test_state(test_config()).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [
                { "file": data_uri(&plain_pdf()), "name": "fine.pdf" },
                { "file": data_uri(&encrypted_pdf()), "name": "locked.pdf" },
            ],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "PDF is encrypted. Please provide an unencrypted PDF."
    );

    // The healthy document must not survive the abort.
    assert_eq!(table_count(&state, "templates").await, 0);
    assert_eq!(table_count(&state, "attachments").await, 0);
}

#[tokio::test]
async fn unreachable_url_aborts_the_request() {
    let state = test_state(test_config()).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [{ "file": "http://127.0.0.1:9/contract.pdf" }],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("download"));

    assert_eq!(table_count(&state, "templates").await, 0);
    assert_eq!(table_count(&state, "attachments").await, 0);
}

#[tokio::test]
async fn unrecognized_entries_are_skipped() {
    let state = test_state(test_config()).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [
                { "file": "data:application/pdf" },
                { "file": data_uri(&plain_pdf()), "name": "kept.pdf" },
            ],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"][0]["filename"], "kept.pdf");
}

#[tokio::test]
async fn malformed_base64_aborts() {
    let state = test_state(test_config()).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [{ "file": "!!!not base64 at all!!!" }],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("base64"));

    assert_eq!(table_count(&state, "templates").await, 0);
}

#[tokio::test]
async fn raw_base64_assumes_pdf_content_type() {
    let state = test_state(test_config()).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [{ "file": BASE64.encode(plain_pdf()) }],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["documents"][0]["content_type"], "application/pdf");
    assert_eq!(body["documents"][0]["filename"], "document.pdf");
}

#[tokio::test]
async fn explicit_fields_skip_extraction() {
    let state = test_state(test_config()).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [{ "file": data_uri(&form_pdf()), "name": "lease.pdf" }],
            "fields": [{
                "uuid": "field-1",
                "name": "Tenant Signature",
                "type": "signature",
                "required": true,
                "areas": [],
            }],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    // Caller-supplied layout wins: no extraction, nothing pending.
    assert_eq!(body["schema"][0]["pending_fields"], false);
    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["name"], "Tenant Signature");
}

#[tokio::test]
async fn empty_request_creates_untitled_template() {
    let state = test_state(test_config()).await;

    let response = post_json(test_app(state.clone()), "/api/templates/pdf", json!({})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Untitled Template");
    assert_eq!(body["folder_name"], "Default");
    assert!(body["schema"].as_array().unwrap().is_empty());
    assert!(body["documents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_requires_the_configured_token() {
    let config = AppConfig {
        api_token: Some("secret".to_string()),
        ..test_config()
    };
    let state = test_state(config).await;

    let denied = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({ "documents": [] }),
    )
    .await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = post_json_with_token(
        test_app(state.clone()),
        "/api/templates/pdf",
        "secret",
        json!({ "documents": [] }),
    )
    .await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn fanout_refreshes_the_search_entry_after_commit() {
    let state = test_state(test_config()).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "name": "Searchable",
            "documents": [{ "file": data_uri(&plain_pdf()), "name": "scan.pdf" }],
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The reindex runs on a detached task; give it a moment.
    let mut content = None;
    for _ in 0..40 {
        let row: Option<(String,)> = sqlx::query_as("SELECT content FROM search_entries")
            .fetch_optional(&state.db)
            .await
            .unwrap();
        if let Some((found,)) = row {
            content = Some(found);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let content = content.expect("search entry was not written after commit");
    assert!(content.contains("Searchable"));
    assert!(content.contains("scan.pdf"));
}

#[tokio::test]
async fn fanout_delivers_the_template_created_webhook() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (sender, receiver) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                match tokio::time::timeout(Duration::from_millis(500), socket.read(&mut chunk))
                    .await
                {
                    Ok(Ok(0)) => break,
                    Ok(Ok(n)) => {
                        buf.extend_from_slice(&chunk[..n]);
                        let needle = b"template.created";
                        if buf.windows(needle.len()).any(|w| w == needle) {
                            break;
                        }
                    }
                    _ => break,
                }
            }
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            let _ = sender.send(buf);
        }
    });

    let config = AppConfig {
        webhook_urls: vec![format!("http://{}/hooks", addr)],
        ..test_config()
    };
    let state = test_state(config).await;

    let response = post_json(
        test_app(state.clone()),
        "/api/templates/pdf",
        json!({
            "documents": [{ "file": data_uri(&plain_pdf()), "name": "scan.pdf" }],
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let received = tokio::time::timeout(Duration::from_secs(5), receiver)
        .await
        .expect("webhook was not delivered")
        .unwrap();
    let text = String::from_utf8_lossy(&received);
    assert!(text.contains("template.created"));
    assert!(text.contains("scan.pdf"));
}
