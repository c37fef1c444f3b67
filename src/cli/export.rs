use anyhow::{Context, Result};
use std::path::Path;

use tome::config::TomeConfig;
use tome::markdown::{self, ExportOptions};

/// Export documents as markdown files with YAML frontmatter.
pub fn export(
    config: &TomeConfig,
    dir: Option<&Path>,
    category: Option<String>,
    tags: Vec<String>,
    flat: bool,
    clear_existing: bool,
) -> Result<()> {
    let root = match dir {
        Some(d) => d.to_path_buf(),
        None => config.resolved_markdown_dir(),
    };

    let db_path = config.resolved_db_path();
    let conn = tome::db::open_database(&db_path).context("failed to open database")?;

    println!("Exporting markdown to {}...", root.display());

    let options = ExportOptions {
        clear_existing,
        flat,
        category,
        tags,
    };
    let summary = markdown::export(&conn, &root, &options)?;

    println!(
        "Export complete: {} written, {} unchanged.",
        summary.written, summary.unchanged
    );
    for warning in &summary.warnings {
        eprintln!("Warning: {warning}");
    }

    Ok(())
}
