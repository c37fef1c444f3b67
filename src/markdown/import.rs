//! Import markdown files into the document store.
//!
//! Walks a directory tree for `*.md` files, skipping hidden directories.
//! Each file stands alone: a malformed file becomes a warning, never an
//! abort. Files whose fields match the stored document exactly are left
//! untouched, so re-importing an export does not move `updated`.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::kb::types::normalize_tags;
use crate::kb::now_rfc3339;
use crate::markdown::frontmatter;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Import only files resolving to this category.
    pub category: Option<String>,
    /// Delete matching documents (and their links) before importing.
    pub clear_first: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    /// Files whose stored document already matched field for field.
    pub unchanged: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Import every markdown file under `root`. An empty tree is a successful
/// no-op.
pub fn import(conn: &mut Connection, root: &Path, options: &ImportOptions) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        created: 0,
        updated: 0,
        unchanged: 0,
        skipped: 0,
        warnings: Vec::new(),
    };

    if options.clear_first {
        clear_documents(conn, options.category.as_deref())?;
    }

    let mut files = Vec::new();
    collect_md_files(root, &mut files)
        .with_context(|| format!("failed to scan {}", root.display()))?;
    files.sort();

    for path in &files {
        if let Err(e) = import_file(conn, root, path, options, &mut summary) {
            summary.skipped += 1;
            summary
                .warnings
                .push(format!("{}: {e:#}", path.display()));
        }
    }

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        "import complete"
    );
    Ok(summary)
}

fn import_file(
    conn: &mut Connection,
    root: &Path,
    path: &Path,
    options: &ImportOptions,
    summary: &mut ImportSummary,
) -> Result<()> {
    let text = std::fs::read_to_string(path).context("failed to read file")?;
    let (front, body) = frontmatter::parse(&text)?;

    let Some(id) = front.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        anyhow::bail!("no id in front matter");
    };

    let category = front
        .category
        .clone()
        .or_else(|| category_from_path(root, path))
        .unwrap_or_else(|| "uncategorized".to_string());

    if let Some(ref wanted) = options.category {
        if &category != wanted {
            summary.skipped += 1;
            return Ok(());
        }
    }

    let title = front.title.clone().unwrap_or_else(|| id.to_string());
    let tags = normalize_tags(&front.tags);
    let tags_json = serde_json::to_string(&tags)?;
    let metadata_json = serde_json::to_string(&front.metadata_json())?;

    let existing: Option<(String, String, String, String, String, String)> = conn
        .query_row(
            "SELECT category, title, tags, content, metadata, updated \
             FROM documents WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;

    match existing {
        Some((e_cat, e_title, e_tags, e_content, e_meta, e_updated)) => {
            let identical = e_cat == category
                && e_title == title
                && e_tags == tags_json
                && e_content == body
                && e_meta == metadata_json;
            if identical {
                summary.unchanged += 1;
                return Ok(());
            }

            // updated stays monotonic even when the file carries an older stamp
            let candidate = front.updated.clone().unwrap_or_else(now_rfc3339);
            let updated = if e_updated > candidate { e_updated } else { candidate };

            conn.execute(
                "UPDATE documents SET category = ?1, title = ?2, tags = ?3, \
                 content = ?4, metadata = ?5, updated = ?6 WHERE id = ?7",
                params![category, title, tags_json, body, metadata_json, updated, id],
            )?;
            summary.updated += 1;
        }
        None => {
            let now = now_rfc3339();
            let created = front.created.clone().unwrap_or_else(|| now.clone());
            let updated = front.updated.clone().unwrap_or(now);

            conn.execute(
                "INSERT INTO documents (id, category, title, tags, content, metadata, created, updated) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![id, category, title, tags_json, body, metadata_json, created, updated],
            )?;
            summary.created += 1;
        }
    }

    Ok(())
}

/// Derive a category from the file's directory relative to the import root.
fn category_from_path(root: &Path, path: &Path) -> Option<String> {
    let parent = path.parent()?;
    if parent == root {
        return None;
    }
    parent
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Recursively collect `*.md` files, skipping hidden entries.
fn collect_md_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_md_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            out.push(path);
        }
    }
    Ok(())
}

fn clear_documents(conn: &mut Connection, category: Option<&str>) -> Result<()> {
    let tx = conn.transaction()?;
    match category {
        Some(cat) => {
            tx.execute(
                "DELETE FROM links WHERE \
                 from_id IN (SELECT id FROM documents WHERE category = ?1) OR \
                 to_id IN (SELECT id FROM documents WHERE category = ?1)",
                params![cat],
            )?;
            tx.execute("DELETE FROM documents WHERE category = ?1", params![cat])?;
        }
        None => {
            tx.execute("DELETE FROM links", [])?;
            tx.execute("DELETE FROM documents", [])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn write_file(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn md(id: &str, category: &str, body: &str) -> String {
        format!(
            "---\nid: {id}\ncategory: {category}\ntitle: Title {id}\ntags:\n- rust\n---\n\n{body}"
        )
    }

    #[test]
    fn imports_new_files() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "howto/a.md", &md("a", "howto", "body a"));
        write_file(dir.path(), "design/b.md", &md("b", "design", "body b"));

        let summary = import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.skipped, 0);

        let doc = crate::kb::store::get(&conn, "a").unwrap().unwrap();
        assert_eq!(doc.category, "howto");
        assert_eq!(doc.content, "body a");
        assert_eq!(doc.tags, vec!["rust"]);
    }

    #[test]
    fn reimport_is_idempotent() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "howto/a.md", &md("a", "howto", "body a"));

        import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        let before: String = conn
            .query_row("SELECT updated FROM documents WHERE id = 'a'", [], |r| {
                r.get(0)
            })
            .unwrap();

        let summary = import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.unchanged, 1);

        let after: String = conn
            .query_row("SELECT updated FROM documents WHERE id = 'a'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn malformed_file_is_warned_not_fatal() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "good.md", &md("good", "note", "fine"));
        write_file(dir.path(), "bad.md", "no front matter at all");
        write_file(dir.path(), "no-id.md", "---\ntitle: orphan\n---\n\nbody");

        let summary = import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.warnings.len(), 2);
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), ".obsidian/cache.md", &md("ghost", "x", "y"));
        write_file(dir.path(), "real.md", &md("real", "note", "z"));

        let summary = import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        assert_eq!(summary.created, 1);
        assert!(crate::kb::store::get(&conn, "ghost").unwrap().is_none());
    }

    #[test]
    fn category_falls_back_to_directory_name() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "guides/c.md",
            "---\nid: c\ntitle: C\n---\n\nbody",
        );

        import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        let doc = crate::kb::store::get(&conn, "c").unwrap().unwrap();
        assert_eq!(doc.category, "guides");
    }

    #[test]
    fn changed_file_updates_but_keeps_created() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.md", &md("a", "note", "first"));
        import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();

        let created_before: String = conn
            .query_row("SELECT created FROM documents WHERE id = 'a'", [], |r| {
                r.get(0)
            })
            .unwrap();

        write_file(dir.path(), "a.md", &md("a", "note", "second"));
        let summary = import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        assert_eq!(summary.updated, 1);

        let (created_after, content): (String, String) = conn
            .query_row(
                "SELECT created, content FROM documents WHERE id = 'a'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(created_before, created_after);
        assert_eq!(content, "second");
    }

    #[test]
    fn clear_first_replaces_store() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.md", &md("a", "note", "x"));
        import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();

        // New tree without "a"
        let dir2 = tempfile::tempdir().unwrap();
        write_file(dir2.path(), "b.md", &md("b", "note", "y"));
        let options = ImportOptions {
            clear_first: true,
            ..Default::default()
        };
        import(&mut conn, dir2.path(), &options).unwrap();

        assert!(crate::kb::store::get(&conn, "a").unwrap().is_none());
        assert!(crate::kb::store::get(&conn, "b").unwrap().is_some());
    }

    #[test]
    fn empty_tree_is_a_successful_noop() {
        let mut conn = db::open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let summary = import(&mut conn, dir.path(), &ImportOptions::default()).unwrap();
        assert_eq!(summary.created + summary.updated + summary.skipped, 0);
    }
}
