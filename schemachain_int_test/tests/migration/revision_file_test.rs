use schemachain::revision::{Marker, RevisionStore};
use schemachain::{ErrorKind, SchemaChain};
use schemachain_int_test::test_util::{agent_revisions, cleanup, random_path, run_test, seed_agents};
use std::fs;

const REVISIONS: &str = r#"[
  {
    "id": "c2",
    "parent_id": "c1",
    "label": "index agents by name",
    "forward": {"op": "create_index", "name": "idx_agents_name", "table": "agents", "columns": ["name"], "unique": true},
    "reverse": {"op": "drop_index", "name": "idx_agents_name"}
  },
  {
    "id": "c1",
    "parent_id": null,
    "created_at": "2024-03-01T12:00:00Z",
    "forward": {
      "op": "add_column",
      "table": "agents",
      "column": {"name": "retries", "sql_type": "INTEGER", "default": 3},
      "policy": "leave_null"
    },
    "reverse": {"op": "drop_column", "table": "agents", "column": "retries"}
  }
]"#;

#[test]
fn test_upgrade_from_revision_file() {
    let revisions_path = random_path().with_extension("json");
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        fs::write(&revisions_path, REVISIONS)?;

        let chain = SchemaChain::builder()
            .db_path(path)
            .revisions_file(&revisions_path)
            .open()?;
        assert_eq!(chain.head()?, Marker::from("c2"));

        let report = chain.upgrade(None)?;
        assert_eq!(report.applied(), 2);

        let retries: Vec<Option<i64>> = chain.with_connection(|conn| {
            conn.execute_batch("INSERT INTO agents (name) VALUES ('gamma')")?;
            let mut stmt = conn.prepare("SELECT retries FROM agents ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let mut values = Vec::new();
            for row in rows {
                values.push(row?);
            }
            Ok(values)
        })?;
        assert_eq!(retries, vec![None, None, Some(3)]);

        let indexes = chain.list_structures("idx_agents%")?;
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].table, "agents");
        Ok(())
    });
    cleanup(&revisions_path);
}

#[test]
fn test_orphan_in_revision_file_registers_nothing() {
    let json = r#"[
        {"id": "a", "parent_id": null,
         "forward": {"op": "sql", "statement": "CREATE TABLE a (id INTEGER)"},
         "reverse": {"op": "drop_table", "table": "a"}},
        {"id": "c", "parent_id": "b",
         "forward": {"op": "sql", "statement": "CREATE TABLE c (id INTEGER)"},
         "reverse": {"op": "drop_table", "table": "c"}}
    ]"#;

    let mut store = RevisionStore::new();
    let err = store.load_json(json).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownParent);
    assert!(store.is_empty());

    let opened = SchemaChain::builder().revisions_json(json).open();
    assert_eq!(
        opened.err().map(|e| e.kind().clone()),
        Some(ErrorKind::UnknownParent)
    );
}

#[test]
fn test_malformed_revision_file() {
    let result = SchemaChain::builder()
        .revisions_json(r#"[{"id": "a", "forward": {"op": "teleport"}}]"#)
        .open();
    assert_eq!(
        result.err().map(|e| e.kind().clone()),
        Some(ErrorKind::EncodingError)
    );
}

#[test]
fn test_exported_store_reloads() {
    run_test(|path| {
        let mut store = RevisionStore::new();
        store.register_all(agent_revisions()?)?;
        fs::write(path, store.to_json()?)?;

        let mut reloaded = RevisionStore::new();
        reloaded.load_file(path)?;
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.by_id("r3")?, store.by_id("r3")?);
        Ok(())
    });
}
