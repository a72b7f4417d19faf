//! Database connection management
//!
//! Builds the PostgreSQL pool, bootstraps the schema and wires the
//! PostgreSQL repositories. The pool is an owned handle: `main` creates it,
//! hands clones to the repositories and closes it on shutdown.

pub mod comments;
pub mod texts;
pub mod workspaces;

pub use comments::PgCommentRepository;
pub use texts::PgTextRepository;
pub use workspaces::PgWorkspaceRepository;

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::repository::Repositories;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::sync::Arc;
use tokio_postgres::NoTls;
use tracing::info;

/// Create a connection pool and check that it can reach the server
pub async fn connect(config: &DatabaseConfig) -> Result<Pool, AppError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(config.max_pool_size));

    let pool = if config.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| AppError::Config(format!("Failed to create TLS pool: {}", e)))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Config(format!("Failed to create pool: {}", e)))?
    };

    // Test connection
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    drop(client);

    info!(
        "✅ Database connection successful ({}:{}/{}, TLS: {})",
        config.host, config.port, config.database, config.require_tls
    );
    Ok(pool)
}

/// Create tables if they don't exist
pub async fn migrate(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;

    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS workspaces (
                id UUID PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                hex_color VARCHAR(7) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE TABLE IF NOT EXISTS workspace_members (
                workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                role VARCHAR(16) NOT NULL CHECK (role IN ('admin', 'editor')),
                joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (workspace_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS texts (
                id UUID PRIMARY KEY,
                workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                title VARCHAR(200) NOT NULL,
                content TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE TABLE IF NOT EXISTS comments (
                id UUID PRIMARY KEY,
                workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                text_id UUID NOT NULL REFERENCES texts(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE INDEX IF NOT EXISTS idx_workspace_members_user_id ON workspace_members(user_id);
            CREATE INDEX IF NOT EXISTS idx_texts_workspace_id ON texts(workspace_id);
            CREATE INDEX IF NOT EXISTS idx_comments_workspace_text ON comments(workspace_id, text_id);",
        )
        .await?;

    info!("✅ Database tables initialized");
    Ok(())
}

impl Repositories {
    pub fn postgres(pool: Pool) -> Self {
        Self {
            workspaces: Arc::new(PgWorkspaceRepository::new(pool.clone())),
            texts: Arc::new(PgTextRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool)),
        }
    }
}
