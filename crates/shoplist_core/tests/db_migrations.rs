use rusqlite::Connection;
use shoplist_core::db::migrations::latest_version;
use shoplist_core::db::{open_db, open_db_in_memory, DbError, DB_FILE_NAME};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_eq!(latest_version(), 1);
    assert_table_exists(&conn, "items");
}

#[test]
fn items_table_has_expected_columns_and_defaults() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO items (name) VALUES ('Milk');", [])
        .unwrap();

    let (quantity, purchased): (i64, i64) = conn
        .query_row(
            "SELECT quantity, purchased FROM items WHERE name = 'Milk';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(quantity, 1);
    assert_eq!(purchased, 0);

    let columns = column_names(&conn, "items");
    assert_eq!(columns, vec!["id", "name", "quantity", "purchased"]);
}

#[test]
fn name_is_not_null_and_purchased_is_boolean() {
    let conn = open_db_in_memory().unwrap();

    assert!(conn
        .execute("INSERT INTO items (name) VALUES (NULL);", [])
        .is_err());
    assert!(conn
        .execute("INSERT INTO items (name, purchased) VALUES ('Eggs', 2);", [])
        .is_err());
}

#[test]
fn autoincrement_never_reuses_deleted_ids() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO items (name) VALUES ('a');", [])
        .unwrap();
    let first = conn.last_insert_rowid();
    conn.execute("DELETE FROM items WHERE id = ?1;", [first])
        .unwrap();
    conn.execute("INSERT INTO items (name) VALUES ('b');", [])
        .unwrap();

    assert!(conn.last_insert_rowid() > first);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DB_FILE_NAME);

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute("INSERT INTO items (name) VALUES ('Bread');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_path_in_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join(DB_FILE_NAME);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn column_names(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>("name"))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
