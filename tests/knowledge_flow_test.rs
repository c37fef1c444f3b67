mod helpers;

use helpers::StubProvider;
use tome::embedding::{document_embedding_text, EmbeddingProvider};
use tome::kb::search::{hybrid_search, raw_query, similar, FilterQuery};
use tome::kb::store::{self, upsert};
use tome::kb::types::UpsertInput;
use tome::kb::{embed, links, stats};

fn input(id: &str, category: &str, content: &str) -> UpsertInput {
    UpsertInput {
        id: id.to_string(),
        category: category.to_string(),
        title: format!("Title for {id}"),
        tags: vec!["flow".to_string()],
        content: content.to_string(),
        metadata: serde_json::json!({}),
    }
}

#[test]
fn upsert_embed_and_find_again() {
    let mut conn = helpers::test_db();
    let provider = StubProvider { dim: 8 };

    let r = upsert(&mut conn, &input("target", "note", "the one we want"), Some(&provider)).unwrap();
    assert!(r.embedding_generated);
    upsert(&mut conn, &input("decoy", "note", "something else entirely"), Some(&provider)).unwrap();

    // Embedding the same composed text must find the document with score 1.0
    let doc = store::get(&conn, "target").unwrap().unwrap();
    let text = document_embedding_text(&doc.title, &doc.tags, &doc.content);
    let query = provider.embed(&text).unwrap();

    let hits = similar(&conn, &query, None, 0.9, 10).unwrap();
    assert_eq!(hits[0].id, "target");
    assert!(hits[0].score > 0.99);
}

#[test]
fn backfill_embeds_only_missing_documents() {
    let mut conn = helpers::test_db();
    let provider = StubProvider { dim: 8 };

    helpers::insert_doc(&mut conn, "a", "note", &[], "first");
    helpers::insert_doc(&mut conn, "b", "note", &[], "second");
    helpers::insert_doc_with_embedding(&mut conn, "c", "note", "third", 3);

    let mut batches = 0;
    let summary =
        embed::generate_embeddings(&mut conn, &provider, None, false, 1, |_| batches += 1).unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(batches, 2);

    let s = stats::get_stats(&conn, false, None).unwrap();
    assert_eq!(s.total_documents, 3);
    assert_eq!(s.with_embedding, 3);
    assert_eq!(s.without_embedding, 0);
}

#[test]
fn hybrid_search_combines_graph_and_filters() {
    let mut conn = helpers::test_db();

    helpers::insert_doc_with_embedding(&mut conn, "runbook", "howto", "deploy steps", 0);
    helpers::insert_doc_with_embedding(&mut conn, "postmortem", "incident", "what broke", 0);
    links::add_link(&conn, "postmortem", "runbook", "references").unwrap();

    let filter = FilterQuery {
        category: Some("incident".to_string()),
        ..Default::default()
    };
    let hits = hybrid_search(&conn, &helpers::test_embedding(0), &filter, 0.5, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "postmortem");

    // Hop through the graph from the hit
    let related = links::get_related(&conn, "postmortem").unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, "runbook");
}

#[test]
fn detailed_stats_report_categories_and_tags() {
    let mut conn = helpers::test_db();
    helpers::insert_doc(&mut conn, "a", "howto", &["rust", "deploy"], "x");
    helpers::insert_doc(&mut conn, "b", "howto", &["rust"], "x");
    helpers::insert_doc(&mut conn, "c", "design", &["deploy"], "x");

    let s = stats::get_stats(&conn, true, None).unwrap();
    let categories = s.categories.unwrap();
    assert_eq!(categories[0].category, "howto");
    assert_eq!(categories[0].count, 2);

    let tags = s.top_tags.unwrap();
    assert_eq!(tags.len(), 2);
    // Tied counts order alphabetically
    assert_eq!(tags[0].tag, "deploy");
    assert_eq!(tags[0].count, 2);
}

#[test]
fn raw_query_joins_across_tables() {
    let mut conn = helpers::test_db();
    helpers::insert_doc(&mut conn, "a", "note", &[], "x");
    helpers::insert_doc(&mut conn, "b", "note", &[], "x");
    links::add_link(&conn, "a", "b", "related").unwrap();

    let rows = raw_query(
        &conn,
        "SELECT d.id, COUNT(l.to_id) AS outgoing \
         FROM documents d LEFT JOIN links l ON l.from_id = d.id \
         GROUP BY d.id ORDER BY d.id",
    )
    .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "a");
    assert_eq!(rows[0]["outgoing"], 1);
    assert_eq!(rows[1]["outgoing"], 0);
}
