use anyhow::Result;
use std::sync::Arc;

use tome::config::TomeConfig;
use tome::kb::search::{hybrid_search, FilterQuery};

/// Run a hybrid search from the terminal.
pub async fn search(
    config: &TomeConfig,
    query: &str,
    category: Option<String>,
    threshold: Option<f64>,
    limit: Option<usize>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = tome::db::open_database(&db_path)?;

    let provider = tome::embedding::create_provider(&config.embedding)?;
    let embedding_provider: Arc<dyn tome::embedding::EmbeddingProvider> = Arc::from(provider);

    // Embed the query off the async runtime
    let query_text = query.to_string();
    let ep = Arc::clone(&embedding_provider);
    let query_embedding = tokio::task::spawn_blocking(move || ep.embed(&query_text)).await??;

    let filter = FilterQuery {
        category,
        ..FilterQuery::default()
    };
    let threshold = threshold.unwrap_or(config.search.similarity_threshold);
    let limit = limit.unwrap_or(config.search.default_limit);

    let hits = hybrid_search(&conn, &query_embedding, &filter, threshold, limit)?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. [{}] {} — {} (score: {:.4})",
            i + 1,
            hit.category,
            hit.id,
            hit.title,
            hit.score,
        );
        if !hit.preview.is_empty() {
            println!("     {}", hit.preview);
        }
        println!();
    }

    Ok(())
}
