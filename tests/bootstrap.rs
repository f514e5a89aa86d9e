//! End-to-end bootstrap of a library database from a db-config.json file

use paper::{PaperConfig, PaperDatabase, SCHEMA_CONFIG_FILE};
use rusqlite::types::Value;
use rusqlite::ErrorCode;
use std::path::Path;

const AUTHOR_BOOK_SCHEMA: &str = r#"{
    "tables": {
        "author": { "id": "INTEGER PRIMARY KEY", "name": "TEXT" },
        "book": { "id": "INTEGER", "title": "TEXT", "author_id": "INTEGER" }
    },
    "relations": {
        "authorship": [
            { "table": "book", "column": "author_id", "ref_table": "author", "ref_column": "id" }
        ]
    }
}"#;

fn test_config(home: &Path, cwd: &Path) -> PaperConfig {
    let config = PaperConfig::resolve(home.to_path_buf(), cwd.to_path_buf(), true).unwrap();
    std::fs::create_dir_all(&config.config_dir).unwrap();
    std::fs::write(
        config.config_dir.join(SCHEMA_CONFIG_FILE),
        AUTHOR_BOOK_SCHEMA,
    )
    .unwrap();
    config
}

fn constraint_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.downcast_ref::<rusqlite::Error>()
        .and_then(|e| e.sqlite_error_code())
}

#[test]
fn author_book_scenario() {
    let home = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    let config = test_config(home.path(), cwd.path());

    let mut db = PaperDatabase::open_with_config(&config, "library").unwrap();
    db.create_database_from_config(&config).unwrap();
    db.close().unwrap();

    assert!(cwd.path().join("library/db/library.db").exists());

    // every operation reconnects on its own
    let conn = db.connection();
    assert!(conn.table_exists("author").unwrap());
    assert!(conn.table_exists("book").unwrap());

    conn.insert("author", "1, 'Ursula K. Le Guin'").unwrap();

    let err = conn.insert("book", "1, 'Ghost Book', 99").unwrap_err();
    assert_eq!(constraint_code(&err), Some(ErrorCode::ConstraintViolation));

    conn.insert("book", "2, 'The Dispossessed', 1").unwrap();
    let rows = conn.select("book", "id, title, author_id", None).unwrap();
    assert_eq!(
        rows,
        vec![vec![
            Value::Integer(2),
            Value::Text("The Dispossessed".to_string()),
            Value::Integer(1),
        ]]
    );
}

#[test]
fn rebuild_keeps_existing_rows_on_disk() {
    let home = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    let config = test_config(home.path(), cwd.path());
    let path = config.db_path("staged");

    // tables first, rows next, relations last
    let schema = paper::SchemaDescription::from_file(config.schema_config_path()).unwrap();
    let mut db = PaperDatabase::open(&path).unwrap();
    let conn = db.connection();
    paper::SchemaMaterializer::new(conn).create_tables(&schema).unwrap();

    conn.insert("author", "1, 'Borges'").unwrap();
    let books: Vec<Vec<Value>> = (1..=12)
        .map(|i| {
            vec![
                Value::Integer(i),
                Value::Text(format!("Ficciones {}", i)),
                Value::Integer(1),
            ]
        })
        .collect();
    conn.execute_batch(
        "INSERT INTO book (id, title, author_id) VALUES (?1, ?2, ?3)",
        &books,
    )
    .unwrap();
    conn.close().unwrap();

    paper::SchemaMaterializer::new(conn)
        .create_relations(&schema)
        .unwrap();
    conn.close().unwrap();

    let mut reopened = PaperDatabase::open(&path).unwrap();
    let conn = reopened.connection();
    assert_eq!(conn.query("SELECT id, title, author_id FROM book").unwrap(), books);
    assert!(conn.insert("book", "13, 'Orphan', 2").is_err());
}

#[test]
fn second_bootstrap_fails_on_duplicate_table() {
    let home = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    let config = test_config(home.path(), cwd.path());

    let mut db = PaperDatabase::open_with_config(&config, "twice").unwrap();
    db.create_database_from_config(&config).unwrap();

    let mut again = PaperDatabase::open_with_config(&config, "twice").unwrap();
    let err = again.create_database_from_config(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("table author already exists"));
}
