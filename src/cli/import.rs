use anyhow::{Context, Result};
use std::path::Path;

use tome::config::TomeConfig;
use tome::markdown::{self, ImportOptions};

/// Import markdown files from a directory tree into the knowledge base.
pub fn import(
    config: &TomeConfig,
    dir: Option<&Path>,
    category: Option<String>,
    clear_first: bool,
) -> Result<()> {
    let root = match dir {
        Some(d) => d.to_path_buf(),
        None => config.resolved_markdown_dir(),
    };

    let db_path = config.resolved_db_path();
    let mut conn = tome::db::open_database(&db_path).context("failed to open database")?;

    println!("Importing markdown from {}...", root.display());

    let options = ImportOptions {
        category,
        clear_first,
    };
    let summary = markdown::import(&mut conn, &root, &options)?;

    println!("Import complete:");
    println!("  Created:   {}", summary.created);
    println!("  Updated:   {}", summary.updated);
    println!("  Unchanged: {}", summary.unchanged);
    if summary.skipped > 0 {
        println!("  Skipped:   {}", summary.skipped);
    }
    for warning in &summary.warnings {
        eprintln!("Warning: {warning}");
    }

    if summary.created > 0 {
        println!("Run `tome embed` to generate vectors for new documents.");
    }

    Ok(())
}
