//! Shared helpers for the template API integration tests.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use http_body_util::BodyExt;
use lopdf::{dictionary, Document, Object};
use std::sync::Arc;
use tower::ServiceExt;

use template_api::state::{AppConfig, AppState};

pub fn test_config() -> AppConfig {
    AppConfig {
        api_token: None,
        webhook_urls: Vec::new(),
        account_id: "1".to_string(),
        author_id: "1".to_string(),
    }
}

pub async fn test_state(config: AppConfig) -> Arc<AppState> {
    Arc::new(AppState::in_memory(config).await.unwrap())
}

pub fn test_app(state: Arc<AppState>) -> Router {
    template_api::router(state)
}

pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_with_token(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-auth-token", token)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:application/pdf;base64,{}", BASE64.encode(bytes))
}

/// Single-page PDF with no form fields.
pub fn plain_pdf() -> Vec<u8> {
    save(plain_document())
}

/// Single-page PDF with one required "Full Name" text field.
pub fn form_pdf() -> Vec<u8> {
    save(form_document())
}

/// PDF whose trailer declares encryption.
pub fn encrypted_pdf() -> Vec<u8> {
    let mut doc = plain_document();
    let enc_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
    });
    doc.trailer.set("Encrypt", enc_id);
    save(doc)
}

fn plain_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc
}

fn form_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let widget_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => Object::Name(b"Tx".to_vec()),
        "T" => Object::string_literal("Full Name"),
        "Ff" => 2i64,
        "Rect" => vec![
            Object::Integer(100),
            Object::Integer(700),
            Object::Integer(300),
            Object::Integer(730),
        ],
    });

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
        "Annots" => vec![Object::Reference(widget_id)],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let acro_id = doc.add_object(dictionary! {
        "Fields" => vec![Object::Reference(widget_id)],
    });

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acro_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
