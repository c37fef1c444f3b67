pub mod add_link;
pub mod delete_knowledge;
pub mod find_similar;
pub mod generate_embeddings;
pub mod get_knowledge;
pub mod get_stats;
pub mod list_knowledge;
pub mod query_knowledge;
pub mod set_session;
pub mod smart_search;
pub mod upsert_knowledge;

use add_link::AddLinkParams;
use delete_knowledge::DeleteKnowledgeParams;
use find_similar::FindSimilarParams;
use generate_embeddings::GenerateEmbeddingsParams;
use get_knowledge::GetKnowledgeParams;
use get_stats::GetStatsParams;
use list_knowledge::ListKnowledgeParams;
use query_knowledge::QueryKnowledgeParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use set_session::SetSessionParams;
use smart_search::SmartSearchParams;
use std::sync::{Arc, Mutex};
use upsert_knowledge::UpsertKnowledgeParams;

use crate::config::TomeConfig;
use crate::embedding::EmbeddingProvider;
use crate::kb;
use crate::kb::search::FilterQuery;
use crate::kb::types::UpsertInput;

/// The Tome MCP tool handler. Holds shared state (db connection, embedding
/// provider, config) and exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct TomeTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    config: Arc<TomeConfig>,
}

#[tool_router]
impl TomeTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: Arc<TomeConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            embedding,
            config,
        }
    }

    /// Create or replace a knowledge document.
    #[tool(description = "Create or update a knowledge document. The caller-assigned id is the identity: reusing one replaces that document's fields while preserving its creation time and links.")]
    async fn upsert_knowledge(
        &self,
        Parameters(params): Parameters<UpsertKnowledgeParams>,
    ) -> Result<String, String> {
        let generate = params.generate_embedding.unwrap_or(true);

        tracing::info!(id = %params.id, category = %params.category, generate, "upsert_knowledge called");

        let input = UpsertInput {
            id: params.id,
            category: params.category,
            title: params.title,
            tags: params.tags.unwrap_or_default(),
            content: params.content,
            metadata: params.metadata.unwrap_or_else(|| serde_json::json!({})),
        };

        let db = Arc::clone(&self.db);
        let embedding = Arc::clone(&self.embedding);

        // Embedding inference and DB writes are both blocking
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            let embedder: Option<&dyn EmbeddingProvider> =
                if generate { Some(&*embedding) } else { None };
            kb::store::upsert(&mut conn, &input, embedder)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        tracing::info!(
            id = %result.document.id,
            outcome = ?result.outcome,
            embedding_generated = result.embedding_generated,
            "knowledge stored"
        );

        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Fetch a document by id.
    #[tool(description = "Fetch a knowledge document by id, optionally with its linked documents.")]
    async fn get_knowledge(
        &self,
        Parameters(params): Parameters<GetKnowledgeParams>,
    ) -> Result<String, String> {
        let include_related = params.include_related.unwrap_or(false);
        let db = Arc::clone(&self.db);

        let response = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            let document = kb::store::get(&conn, &params.id)?
                .ok_or_else(|| kb::KbError::NotFound(params.id.clone()))?;
            let related = if include_related {
                Some(kb::links::get_related(&conn, &params.id)?)
            } else {
                None
            };
            Ok::<_, kb::KbError>(serde_json::json!({
                "document": document,
                "related": related,
            }))
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        Ok(response.to_string())
    }

    /// List documents with structured filters.
    #[tool(description = "List knowledge documents filtered by category, tags, update time, or a text substring. Newest first.")]
    async fn list_knowledge(
        &self,
        Parameters(params): Parameters<ListKnowledgeParams>,
    ) -> Result<String, String> {
        let filter = FilterQuery {
            category: params.category,
            tags: params.tags.unwrap_or_default(),
            updated_after: params.updated_after,
            text: params.text,
        };
        let limit = params.limit.unwrap_or(50);
        let offset = params.offset.unwrap_or(0);

        let db = Arc::clone(&self.db);
        let docs = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::search::filter_documents(&conn, &filter, limit, offset)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        let count = docs.len();
        serde_json::to_string(&serde_json::json!({
            "documents": docs,
            "count": count,
        }))
        .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Run a read-only SQL query.
    #[tool(description = "Run a read-only SELECT query against the knowledge base. Tables: documents, links, access_log. Anything but a single SELECT is rejected.")]
    async fn query_knowledge(
        &self,
        Parameters(params): Parameters<QueryKnowledgeParams>,
    ) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let rows = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::search::raw_query(&conn, &params.sql)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        let count = rows.len();
        serde_json::to_string(&serde_json::json!({
            "rows": rows,
            "count": count,
        }))
        .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Pure vector similarity search.
    #[tool(description = "Find documents semantically similar to a query. Only embedded documents participate; results must score strictly above the threshold.")]
    async fn find_similar(
        &self,
        Parameters(params): Parameters<FindSimilarParams>,
    ) -> Result<String, String> {
        let threshold = params
            .threshold
            .unwrap_or(self.config.search.similarity_threshold);
        let limit = params.limit.unwrap_or(self.config.search.default_limit);

        let query_embedding = self.embed_query(params.query).await?;

        let db = Arc::clone(&self.db);
        let hits = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::search::similar(
                &conn,
                &query_embedding,
                params.category.as_deref(),
                threshold,
                limit,
            )
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        let count = hits.len();
        serde_json::to_string(&serde_json::json!({
            "results": hits,
            "count": count,
        }))
        .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Hybrid structured + semantic search.
    #[tool(description = "Hybrid search: semantic similarity combined with structured filters (category, tags, update time). Ordered by score, then recency.")]
    async fn smart_search(
        &self,
        Parameters(params): Parameters<SmartSearchParams>,
    ) -> Result<String, String> {
        let threshold = params
            .threshold
            .unwrap_or(self.config.search.similarity_threshold);
        let limit = params.limit.unwrap_or(self.config.search.default_limit);
        let filter = FilterQuery {
            category: params.category,
            tags: params.tags.unwrap_or_default(),
            updated_after: params.updated_after,
            text: None,
        };

        let query_embedding = self.embed_query(params.query).await?;

        let db = Arc::clone(&self.db);
        let hits = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::search::hybrid_search(&conn, &query_embedding, &filter, threshold, limit)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        let count = hits.len();
        serde_json::to_string(&serde_json::json!({
            "results": hits,
            "count": count,
        }))
        .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Delete a document and its links.
    #[tool(description = "Delete a knowledge document. All links touching it are removed in the same transaction.")]
    async fn delete_knowledge(
        &self,
        Parameters(params): Parameters<DeleteKnowledgeParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, "delete_knowledge called");

        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::store::delete(&mut conn, &params.id)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Link two documents.
    #[tool(description = "Create a directed, typed link between two documents. Idempotent; self-links are rejected.")]
    async fn add_link(
        &self,
        Parameters(params): Parameters<AddLinkParams>,
    ) -> Result<String, String> {
        let link_type = params.link_type.unwrap_or_else(|| "related".to_string());

        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::links::add_link(&conn, &params.from_id, &params.to_id, &link_type)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Knowledge base statistics.
    #[tool(description = "Get knowledge base statistics: document and link counts, embedding coverage, and optionally per-category and tag breakdowns.")]
    async fn get_stats(
        &self,
        Parameters(params): Parameters<GetStatsParams>,
    ) -> Result<String, String> {
        let detailed = params.detailed.unwrap_or(false);
        let db_path = self.config.resolved_db_path();

        let db = Arc::clone(&self.db);
        let stats = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::stats::get_stats(&conn, detailed, Some(&db_path))
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&stats).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Batch embedding backfill.
    #[tool(description = "Generate embeddings for documents missing one (or all documents with regenerate=true). Failed batches are reported, not fatal.")]
    async fn generate_embeddings(
        &self,
        Parameters(params): Parameters<GenerateEmbeddingsParams>,
    ) -> Result<String, String> {
        let regenerate = params.regenerate.unwrap_or(false);
        let batch_size = params.batch_size.unwrap_or(kb::embed::DEFAULT_BATCH_SIZE);

        tracing::info!(regenerate, batch_size, "generate_embeddings called");

        let db = Arc::clone(&self.db);
        let embedding = Arc::clone(&self.embedding);
        let summary = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| kb::KbError::Validation(format!("db lock poisoned: {e}")))?;
            kb::embed::generate_embeddings(
                &mut conn,
                &*embedding,
                params.ids.as_deref(),
                regenerate,
                batch_size,
                |_| {},
            )
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&summary).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Activate or deactivate the access ledger.
    #[tool(description = "Set the active session number for the access ledger, or omit it to stop recording. While a session is active every operation logs the document ids it touched.")]
    async fn set_session(
        &self,
        Parameters(params): Parameters<SetSessionParams>,
    ) -> Result<String, String> {
        match params.session {
            Some(session) => {
                kb::ledger::set_session(session);
                tracing::info!(session, "access ledger session set");
                Ok(serde_json::json!({"session": session, "recording": true}).to_string())
            }
            None => {
                kb::ledger::clear_session();
                tracing::info!("access ledger session cleared");
                Ok(serde_json::json!({"session": null, "recording": false}).to_string())
            }
        }
    }

    /// Embed a query string on the blocking pool. Provider failures surface
    /// as [`kb::KbError::Embedding`].
    async fn embed_query(&self, query: String) -> Result<Vec<f32>, String> {
        let embedding = Arc::clone(&self.embedding);
        tokio::task::spawn_blocking(move || embedding.embed(&query))
            .await
            .map_err(|e| format!("embedding task failed: {e}"))?
            .map_err(|e| kb::KbError::Embedding(e.to_string()).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OfflineProvider;

    impl EmbeddingProvider for OfflineProvider {
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("connection refused")
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    fn test_tools() -> TomeTools {
        let conn = crate::db::open_memory_database().unwrap();
        TomeTools::new(
            Arc::new(Mutex::new(conn)),
            Arc::new(OfflineProvider),
            Arc::new(TomeConfig::default()),
        )
    }

    #[tokio::test]
    async fn query_embedding_failure_is_an_embedding_error() {
        let tools = test_tools();
        let err = tools.embed_query("anything".to_string()).await.unwrap_err();
        assert!(err.starts_with("embedding error:"), "got: {err}");
        assert!(err.contains("connection refused"));
    }
}

#[tool_handler]
impl ServerHandler for TomeTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Tome is a personal knowledge base. Use upsert_knowledge to save documents, \
                 smart_search or find_similar to retrieve them, add_link to connect them, \
                 and list_knowledge for structured browsing."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
