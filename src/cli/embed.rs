//! CLI `embed` command — backfill or regenerate document embeddings.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use tome::config::TomeConfig;
use tome::db;
use tome::embedding;
use tome::kb;

/// Embed documents that lack a vector, or every document with `regenerate`.
pub async fn embed(
    config: &TomeConfig,
    ids: Option<Vec<String>>,
    regenerate: bool,
    batch_size: Option<usize>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = db::open_database(&db_path).context("failed to open database")?;

    let provider = embedding::create_provider(&config.embedding)
        .context("failed to create embedding provider")?;

    let pending: i64 = if regenerate {
        conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?
    } else {
        conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE embedding IS NULL",
            [],
            |r| r.get(0),
        )?
    };

    if pending == 0 {
        println!("Nothing to embed.");
        return Ok(());
    }

    println!(
        "Embedding up to {pending} documents with model '{}'...",
        config.embedding.model
    );

    let pb = ProgressBar::new(pending as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let batch_size = batch_size.unwrap_or(kb::embed::DEFAULT_BATCH_SIZE);
    let model = config.embedding.model.clone();

    // Providers use blocking I/O, so run the whole pass off the async runtime.
    let pb_task = pb.clone();
    let summary = tokio::task::spawn_blocking(move || {
        let summary = kb::embed::generate_embeddings(
            &mut conn,
            provider.as_ref(),
            ids.as_deref(),
            regenerate,
            batch_size,
            |done| pb_task.inc(done as u64),
        )?;

        // Record the model the vectors now reflect
        db::migrations::set_embedding_model(&conn, &model)?;
        db::migrations::set_embedding_dim(&conn, provider.dimensions())?;
        anyhow::Ok(summary)
    })
    .await??;

    pb.finish_and_clear();

    println!(
        "Embedded {} of {} documents ({} failed).",
        summary.updated, summary.scanned, summary.failed
    );
    Ok(())
}
