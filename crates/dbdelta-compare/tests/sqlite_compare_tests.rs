//! End to end comparisons of SQLite snapshots
use dbdelta_compare::{
    ChangeKind, ColumnChange, CompareConfig, Comparator, Comparison, RowChange, TablePresence,
    load_comparison_json, save_comparison_json,
};
use dbdelta_core::{ErrorKind, Value};
use dbdelta_driver_sqlite::SqliteConnection;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn snapshot(dir: &TempDir, name: &str, sql: &str) -> SqliteConnection {
    let path = dir.path().join(name);
    {
        let conn = rusqlite::Connection::open(&path).expect("create snapshot");
        conn.execute_batch(sql).expect("seed snapshot");
    }
    SqliteConnection::open(path.to_str().unwrap()).expect("open snapshot read-only")
}

async fn compare(old: &SqliteConnection, new: &SqliteConnection) -> Comparison {
    Comparator::new(old, new).compare().await.expect("comparison runs")
}

fn row_kinds(comparison: &Comparison, table: &str) -> Vec<ChangeKind> {
    comparison
        .table(table)
        .expect("table present in results")
        .data
        .iter()
        .map(RowChange::kind)
        .collect()
}

const SHOP: &str = r#"
    CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT);
    CREATE TABLE tags (label TEXT, weight REAL);
    CREATE TABLE files (id INTEGER PRIMARY KEY, RowGUID TEXT, body BLOB);
    INSERT INTO customers VALUES (1, 'Alice', 'a@example.com'), (2, 'Bob', NULL);
    INSERT INTO tags VALUES ('red', 1.5), ('red', 1.5), ('blue', NULL);
    INSERT INTO files VALUES (1, '{0001}', X'00FF10'), (2, '{0002}', NULL);
"#;

#[tokio::test]
async fn test_snapshot_compared_with_itself_is_empty() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(&dir, "old.db", SHOP);
    let new = snapshot(&dir, "new.db", SHOP);

    let result = compare(&old, &new).await;
    assert_eq!(result.changes.len(), 3);
    assert!(result.is_empty(), "unexpected changes: {:#?}", result);
    assert!(result.is_complete());

    // Both handles on the same file work too.
    let same = compare(&old, &old).await;
    assert!(same.is_empty());
}

#[tokio::test]
async fn test_rows_matched_by_primary_key() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO test VALUES (1, 'Alice'), (2, 'Bob');",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO test VALUES (1, 'Alice'), (3, 'Carol');",
    );

    let result = compare(&old, &new).await;
    let table = result.table("test").unwrap();
    assert!(table.schema.is_empty());
    assert_eq!(row_kinds(&result, "test"), vec![ChangeKind::Added, ChangeKind::Removed]);

    let RowChange::Added { new } = &table.data[0] else {
        panic!("expected an added row");
    };
    assert_eq!(new.get_by_name("name"), Some(&Value::from("Carol")));
    let RowChange::Removed { old } = &table.data[1] else {
        panic!("expected a removed row");
    };
    assert_eq!(old.get_by_name("id"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn test_stable_identifier_survives_key_regeneration() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE test (id INTEGER PRIMARY KEY, guid TEXT, value INTEGER);
         INSERT INTO test VALUES (1, 'g1', 100);",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE test (id INTEGER PRIMARY KEY, guid TEXT, value INTEGER);
         INSERT INTO test VALUES (10, 'g1', 150);",
    );

    let config = CompareConfig::default().with_stable_identifier("guid");
    let result = Comparator::with_config(&old, &new, config)
        .compare()
        .await
        .unwrap();

    let table = result.table("test").unwrap();
    assert_eq!(table.data.len(), 1);
    let RowChange::Modified { old, new } = &table.data[0] else {
        panic!("expected a modified row, got {:?}", table.data[0]);
    };
    assert_eq!(old.get_by_name("id"), Some(&Value::Integer(1)));
    assert_eq!(new.get_by_name("id"), Some(&Value::Integer(10)));
    assert_eq!(old.get_by_name("value"), Some(&Value::Integer(100)));
    assert_eq!(new.get_by_name("value"), Some(&Value::Integer(150)));
}

#[tokio::test]
async fn test_rowguid_column_used_by_default() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE files (id INTEGER PRIMARY KEY, RowGUID TEXT, body BLOB);
         INSERT INTO files VALUES (1, '{0001}', X'01'), (2, '{0002}', X'02');",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE files (id INTEGER PRIMARY KEY, RowGUID TEXT, body BLOB);
         INSERT INTO files VALUES (20, '{0002}', X'02'), (21, '{0001}', X'01');",
    );

    let result = compare(&old, &new).await;
    assert_eq!(
        row_kinds(&result, "files"),
        vec![ChangeKind::Modified, ChangeKind::Modified]
    );
}

#[tokio::test]
async fn test_removed_column_marks_surviving_rows_modified() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE contacts (id INTEGER PRIMARY KEY, name TEXT, email TEXT, phone TEXT);
         INSERT INTO contacts VALUES (1, 'Ann', 'ann@x', '555'), (2, 'Ben', 'ben@x', NULL);",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE contacts (id INTEGER PRIMARY KEY, name TEXT, email TEXT);
         INSERT INTO contacts VALUES (1, 'Ann', 'ann@x'), (2, 'Ben', 'ben@x');",
    );

    let result = compare(&old, &new).await;
    let table = result.table("contacts").unwrap();
    assert_eq!(table.schema.len(), 1);
    assert!(matches!(&table.schema[0], ColumnChange::Removed { old } if old.name == "phone"));
    assert_eq!(
        row_kinds(&result, "contacts"),
        vec![ChangeKind::Modified, ChangeKind::Modified]
    );
}

#[tokio::test]
async fn test_null_stable_identifiers_fall_back_to_primary_key() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE t (id INTEGER PRIMARY KEY, RowGUID TEXT, note TEXT);
         INSERT INTO t VALUES (1, NULL, 'kept'), (2, NULL, 'gone');",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE t (id INTEGER PRIMARY KEY, RowGUID TEXT, note TEXT);
         INSERT INTO t VALUES (1, NULL, 'kept'), (3, NULL, 'fresh');",
    );

    let result = compare(&old, &new).await;
    assert_eq!(row_kinds(&result, "t"), vec![ChangeKind::Added, ChangeKind::Removed]);
}

#[tokio::test]
async fn test_duplicate_rows_without_key_pair_one_to_one() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE tags (label TEXT, weight REAL);
         INSERT INTO tags VALUES ('red', 1.5), ('red', 1.5), ('blue', NULL);",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE tags (label TEXT, weight REAL);
         INSERT INTO tags VALUES ('red', 1.5), ('blue', NULL), ('blue', NULL);",
    );

    let result = compare(&old, &new).await;
    let table = result.table("tags").unwrap();
    assert_eq!(
        row_kinds(&result, "tags"),
        vec![ChangeKind::Added, ChangeKind::Removed]
    );
    assert_eq!(
        table.data[0].new_row().unwrap().get_by_name("label"),
        Some(&Value::from("blue"))
    );
    assert_eq!(
        table.data[1].old_row().unwrap().get_by_name("label"),
        Some(&Value::from("red"))
    );
}

#[tokio::test]
async fn test_undecodable_text_differences_are_reported() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);
         INSERT INTO t VALUES (1, CAST(x'80' AS TEXT)), (2, CAST(x'C3' AS TEXT));",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);
         INSERT INTO t VALUES (1, CAST(x'FF' AS TEXT)), (2, CAST(x'C3' AS TEXT));",
    );

    let result = compare(&old, &new).await;
    let table = result.table("t").unwrap();
    assert_eq!(row_kinds(&result, "t"), vec![ChangeKind::Modified]);

    let RowChange::Modified { old, new } = &table.data[0] else {
        panic!("expected a modified row, got {:?}", table.data[0]);
    };
    assert_eq!(old.get_by_name("v"), Some(&Value::Blob(vec![0x80])));
    assert_eq!(new.get_by_name("v"), Some(&Value::Blob(vec![0xFF])));
}

#[tokio::test]
async fn test_tables_on_one_side_are_reported_in_full() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(
        &dir,
        "old.db",
        "CREATE TABLE legacy (code TEXT);
         INSERT INTO legacy VALUES ('a'), ('b');",
    );
    let new = snapshot(
        &dir,
        "new.db",
        "CREATE TABLE audit (id INTEGER PRIMARY KEY, at TEXT);
         INSERT INTO audit VALUES (1, '2024-01-01');",
    );

    let result = compare(&old, &new).await;
    let names: Vec<_> = result.changes.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["audit", "legacy"]);

    let audit = result.table("audit").unwrap();
    assert_eq!(audit.presence, TablePresence::Added);
    assert_eq!(audit.column_counts().added, 2);
    assert_eq!(row_kinds(&result, "audit"), vec![ChangeKind::Added]);

    let legacy = result.table("legacy").unwrap();
    assert_eq!(legacy.presence, TablePresence::Removed);
    assert_eq!(legacy.column_counts().removed, 1);
    assert_eq!(
        row_kinds(&result, "legacy"),
        vec![ChangeKind::Removed, ChangeKind::Removed]
    );
}

#[tokio::test]
async fn test_cancelled_connection_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(&dir, "old.db", SHOP);
    let new = snapshot(&dir, "new.db", SHOP);

    new.cancel_handle().cancel();
    let err = Comparator::new(&old, &new).compare().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_saved_comparison_loads_back_unchanged() {
    let dir = TempDir::new().unwrap();
    let old = snapshot(&dir, "old.db", SHOP);
    let new = snapshot(
        &dir,
        "new.db",
        r#"
        CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT, vip INTEGER);
        CREATE TABLE files (id INTEGER PRIMARY KEY, RowGUID TEXT, body BLOB);
        INSERT INTO customers VALUES (1, 'Alice', 'alice@example.com', 1);
        INSERT INTO files VALUES (1, '{0001}', X'DEADBEEF'), (2, '{0002}', NULL);
        "#,
    );

    let result = compare(&old, &new).await;
    assert!(!result.is_empty());

    let path = dir.path().join("result.json");
    save_comparison_json(&result, &path).unwrap();
    let loaded = load_comparison_json(&path).unwrap();
    assert_eq!(loaded, result);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains(r#""$blob": "deadbeef""#), "{}", text);
}
