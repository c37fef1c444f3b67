mod helpers;

use tome::db;

#[test]
fn open_database_creates_schema_and_meta() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("knowledge.db");

    let conn = db::open_database(&db_path).unwrap();

    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    for table in ["documents", "links", "access_log", "kb_meta"] {
        assert!(tables.contains(&table.to_string()), "{table} table missing");
    }

    let version = db::migrations::get_schema_version(&conn).unwrap();
    assert_eq!(version, db::migrations::CURRENT_SCHEMA_VERSION);

    // sqlite-vec must be loaded for the search path to work at all
    let vec_version: String = conn
        .query_row("SELECT vec_version()", [], |r| r.get(0))
        .unwrap();
    assert!(!vec_version.is_empty());
}

#[test]
fn reopening_an_existing_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("knowledge.db");

    {
        let conn = db::open_database(&db_path).unwrap();
        conn.execute(
            "INSERT INTO documents (id, category, title, tags, content, metadata, created, updated) \
             VALUES ('a', 'note', 't', '[]', 'body', '{}', \
                     '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
    }

    let conn = db::open_database(&db_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn embedding_dim_is_locked_by_first_vector() {
    let mut conn = helpers::test_db();
    helpers::insert_doc(&mut conn, "a", "note", &[], "x");

    assert!(db::migrations::get_embedding_dim(&conn).unwrap().is_none());
    tome::kb::store::set_embedding(&mut conn, "a", &helpers::test_embedding(0)).unwrap();
    assert_eq!(db::migrations::get_embedding_dim(&conn).unwrap(), Some(8));
}
