//! Export the document store to a markdown directory tree.
//!
//! One file per document at `<root>/<category>/<id>.md`. Files are only
//! rewritten when their rendered bytes change, so repeated exports of an
//! unchanged store are no-ops. Clearing never touches hidden directories
//! or any subtree containing a `.git` directory.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::kb::store;
use crate::markdown::frontmatter;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Remove previously exported category directories first.
    pub clear_existing: bool,
    /// Write flat `<root>/<id>.md` instead of per-category subdirectories.
    pub flat: bool,
    /// Export only this category.
    pub category: Option<String>,
    /// Export only documents carrying any of these tags.
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportSummary {
    /// Files written because their content changed or they were new.
    pub written: usize,
    /// Files already up to date on disk.
    pub unchanged: usize,
    pub warnings: Vec<String>,
}

/// Export matching documents under `root`.
pub fn export(conn: &Connection, root: &Path, options: &ExportOptions) -> Result<ExportSummary> {
    let mut summary = ExportSummary {
        written: 0,
        unchanged: 0,
        warnings: Vec::new(),
    };

    std::fs::create_dir_all(root)
        .with_context(|| format!("failed to create export directory {}", root.display()))?;

    if options.clear_existing {
        clear_export_dir(root, &mut summary.warnings)?;
    }

    let docs = fetch_export_docs(conn, options)?;

    for doc in &docs {
        let rendered = frontmatter::render(doc)?;
        let path = if options.flat {
            root.join(format!("{}.md", safe_component(&doc.id)))
        } else {
            root.join(safe_component(&doc.category))
                .join(format!("{}.md", safe_component(&doc.id)))
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let existing = std::fs::read_to_string(&path).ok();
        if existing.as_deref() == Some(rendered.as_str()) {
            summary.unchanged += 1;
            continue;
        }

        std::fs::write(&path, &rendered)
            .with_context(|| format!("failed to write {}", path.display()))?;
        summary.written += 1;
    }

    tracing::info!(
        written = summary.written,
        unchanged = summary.unchanged,
        root = %root.display(),
        "export complete"
    );
    Ok(summary)
}

/// Fetch documents for export in a stable order (category, then id).
fn fetch_export_docs(
    conn: &Connection,
    options: &ExportOptions,
) -> Result<Vec<crate::kb::types::Document>> {
    use rusqlite::types::Value;

    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(ref cat) = options.category {
        params.push(Value::Text(cat.clone()));
        clauses.push(format!("category = ?{}", params.len()));
    }
    if !options.tags.is_empty() {
        let mut placeholders = Vec::new();
        for tag in &options.tags {
            params.push(Value::Text(tag.trim().to_lowercase()));
            placeholders.push(format!("?{}", params.len()));
        }
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(documents.tags) \
             WHERE json_each.value IN ({}))",
            placeholders.join(", ")
        ));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT id, category, title, tags, content, metadata, \
         embedding IS NOT NULL, created, updated \
         FROM documents {where_sql} ORDER BY category, id"
    );

    let mut stmt = conn.prepare(&sql)?;
    let docs = stmt
        .query_map(rusqlite::params_from_iter(params), store::row_to_document)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(docs)
}

/// Remove previously exported content under `root`.
///
/// Skips hidden entries and refuses to delete any directory whose subtree
/// contains a `.git`, so a repository checked out inside the export root
/// survives a clearing export.
fn clear_export_dir(root: &Path, warnings: &mut Vec<String>) -> Result<()> {
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("failed to read {}", root.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if subtree_contains_git(&path) {
                warnings.push(format!(
                    "skipped clearing {}: contains a git repository",
                    path.display()
                ));
                continue;
            }
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }

    Ok(())
}

fn subtree_contains_git(dir: &Path) -> bool {
    if dir.join(".git").exists() {
        return true;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && subtree_contains_git(&path) {
            return true;
        }
    }
    false
}

/// Make a value safe to use as a single path component.
fn safe_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "uncategorized".to_string()
    } else {
        trimmed.to_string()
    }
}
