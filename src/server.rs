//! MCP transport wiring.
//!
//! Builds the shared state every tool call runs against (one SQLite
//! connection behind a mutex, one embedding provider) and serves the tool
//! router over stdio or streamable HTTP.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::ServiceExt;

use crate::config::TomeConfig;
use crate::embedding::EmbeddingProvider;
use crate::tools::TomeTools;
use crate::{db, embedding};

struct SharedState {
    db: Arc<Mutex<rusqlite::Connection>>,
    provider: Arc<dyn EmbeddingProvider>,
    config: Arc<TomeConfig>,
}

impl SharedState {
    fn build(config: TomeConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;

        // Vectors in the store were produced by whatever model was configured
        // when they were written; a config change leaves them stale.
        if let Ok(Some(stored)) = db::migrations::get_embedding_model(&conn) {
            if stored != config.embedding.model {
                tracing::warn!(
                    stored = %stored,
                    configured = %config.embedding.model,
                    "embedding model changed — run `tome embed --regenerate` to refresh vectors"
                );
            }
        }

        let provider: Arc<dyn EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding)?);
        tracing::info!(provider = %config.embedding.provider, "embedding provider ready");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            provider,
            config: Arc::new(config),
        })
    }

    fn tools(&self) -> TomeTools {
        TomeTools::new(self.db.clone(), self.provider.clone(), self.config.clone())
    }
}

/// Serve MCP over stdio until the client hangs up.
pub async fn serve_stdio(config: TomeConfig) -> Result<()> {
    tracing::info!("serving MCP on stdio");
    let state = SharedState::build(config)?;

    let running = state.tools().serve(rmcp::transport::stdio()).await?;
    running.waiting().await?;
    tracing::info!("stdio client disconnected");
    Ok(())
}

/// Serve MCP over streamable HTTP at `http://<host>:<port>/mcp`.
pub async fn serve_http(config: TomeConfig) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = SharedState::build(config)?;

    let service = StreamableHttpService::new(
        move || Ok(state.tools()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("serving MCP at http://{addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
