//! Application state: configuration and database pool.

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use template_ingest::Resolver;

/// Runtime configuration read from the environment.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Token callers must present in `X-Auth-Token` to create templates.
    /// Unset means the gate is open (local development).
    pub api_token: Option<String>,
    /// Webhook endpoints notified after a template commit.
    pub webhook_urls: Vec<String>,
    /// Account the server operates on behalf of.
    pub account_id: String,
    /// Author recorded on created templates.
    pub author_id: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let webhook_urls = std::env::var("WEBHOOK_URLS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            api_token: std::env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            webhook_urls,
            account_id: std::env::var("ACCOUNT_ID").unwrap_or_else(|_| "1".to_string()),
            author_id: std::env::var("AUTHOR_ID").unwrap_or_else(|_| "1".to_string()),
        }
    }
}

pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
    pub resolver: Resolver,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let db_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:template-api.db?mode=rwc".to_string());

        tracing::info!("Connecting to database: {}", db_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self {
            db: pool,
            config: AppConfig::from_env(),
            resolver: Resolver::new(),
        })
    }

    /// Isolated in-memory database, used by the test suites.
    pub async fn in_memory(config: AppConfig) -> Result<Self> {
        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self {
            db: pool,
            config,
            resolver: Resolver::new(),
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS template_folders (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                account_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(account_id, name)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                folder_id TEXT NOT NULL REFERENCES template_folders(id),
                account_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                schema_json TEXT NOT NULL DEFAULT '[]',
                fields_json TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attachments (
                uuid TEXT PRIMARY KEY,
                template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                byte_size INTEGER NOT NULL,
                sha256 TEXT NOT NULL,
                data BLOB NOT NULL,
                position INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_attachments_template ON attachments(template_id)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submitters (
                slug TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                submission_id TEXT NOT NULL,
                signing_key TEXT,
                completed_at TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_submitters_signing_key ON submitters(signing_key)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_entries (
                template_id TEXT PRIMARY KEY REFERENCES templates(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}
