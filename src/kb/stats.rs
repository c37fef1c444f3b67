//! Knowledge base statistics.

use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::kb::error::Result;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_documents: i64,
    pub with_embedding: i64,
    pub without_embedding: i64,
    pub link_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_tags: Option<Vec<TagCount>>,
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Gather store-wide counts. `detailed` adds the per-category breakdown
/// and the tag leaderboard.
pub fn get_stats(
    conn: &Connection,
    detailed: bool,
    db_path: Option<&Path>,
) -> Result<StatsResponse> {
    let total_documents: i64 =
        conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
    let with_embedding: i64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE embedding IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let link_count: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |r| r.get(0))?;

    let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created), MAX(updated) FROM documents",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len());

    let (categories, top_tags) = if detailed {
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM documents GROUP BY category ORDER BY COUNT(*) DESC",
        )?;
        let cats = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    category: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT value, COUNT(*) FROM documents, json_each(documents.tags) \
             GROUP BY value ORDER BY COUNT(*) DESC, value LIMIT 20",
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(TagCount {
                    tag: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        (Some(cats), Some(tags))
    } else {
        (None, None)
    };

    Ok(StatsResponse {
        total_documents,
        with_embedding,
        without_embedding: total_documents - with_embedding,
        link_count,
        oldest,
        newest,
        db_size_bytes,
        categories,
        top_tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::kb::store::{set_embedding, upsert};
    use crate::kb::types::UpsertInput;

    fn insert_doc(conn: &mut Connection, id: &str, category: &str, tags: &[&str]) {
        upsert(
            conn,
            &UpsertInput {
                id: id.to_string(),
                category: category.to_string(),
                title: id.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                content: "body".to_string(),
                metadata: serde_json::json!({}),
            },
            None,
        )
        .unwrap();
    }

    #[test]
    fn counts_and_embedding_coverage() {
        let mut conn = db::open_memory_database().unwrap();
        insert_doc(&mut conn, "a", "howto", &["rust"]);
        insert_doc(&mut conn, "b", "howto", &["rust", "sql"]);
        insert_doc(&mut conn, "c", "design", &[]);
        set_embedding(&mut conn, "a", &[1.0, 0.0]).unwrap();
        crate::kb::links::add_link(&conn, "a", "b", "related").unwrap();

        let stats = get_stats(&conn, true, None).unwrap();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.with_embedding, 1);
        assert_eq!(stats.without_embedding, 2);
        assert_eq!(stats.link_count, 1);
        assert!(stats.oldest.is_some());

        let cats = stats.categories.unwrap();
        assert_eq!(cats[0].category, "howto");
        assert_eq!(cats[0].count, 2);

        let tags = stats.top_tags.unwrap();
        assert_eq!(tags[0].tag, "rust");
        assert_eq!(tags[0].count, 2);
    }

    #[test]
    fn summary_omits_detail_sections() {
        let conn = db::open_memory_database().unwrap();
        let stats = get_stats(&conn, false, None).unwrap();
        assert_eq!(stats.total_documents, 0);
        assert!(stats.categories.is_none());
        assert!(stats.top_tags.is_none());
        assert!(stats.oldest.is_none());
    }
}
