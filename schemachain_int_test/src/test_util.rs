use rusqlite::Connection;
use schemachain::inspector::{ColumnInfo, Structure, StructureKind};
use schemachain::revision::{ColumnDef, Operation, Revision};
use schemachain::{SchemaChain, SchemaResult};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

/// A database file path under the system temp directory that does not exist yet.
pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("schemachain-{}.db", id))
}

/// Removes a database file and the journal files SQLite may leave next to it.
pub fn cleanup(path: &Path) {
    let _ = fs::remove_file(path);
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        let _ = fs::remove_file(PathBuf::from(sidecar));
    }
}

/// Creates the `agents` table the agent revisions operate on, with two rows.
pub fn seed_agents(path: &Path, url_column: &str) -> SchemaResult<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(&format!(
        "CREATE TABLE agents (id INTEGER PRIMARY KEY, name TEXT NOT NULL, {url} TEXT);
         INSERT INTO agents (name, {url}) VALUES ('alpha', 'http://alpha'), ('beta', 'http://beta');",
        url = url_column
    ))?;
    Ok(())
}

/// r1 adds `is_verified`, r2 adds `total_spent`, r3 renames `endpoint_url` to `endpoint`.
pub fn agent_revisions() -> SchemaResult<Vec<Revision>> {
    Ok(vec![
        Revision::reversible(
            "r1",
            None,
            Operation::add_column(
                "agents",
                ColumnDef::new("is_verified", "BOOLEAN")
                    .not_null()
                    .default_value(false),
            ),
        )?
        .with_label("add agents.is_verified"),
        Revision::reversible(
            "r2",
            Some("r1"),
            Operation::add_column(
                "agents",
                ColumnDef::new("total_spent", "FLOAT")
                    .not_null()
                    .default_value(0.0),
            ),
        )?
        .with_label("add agents.total_spent"),
        Revision::reversible(
            "r3",
            Some("r2"),
            Operation::rename_column("agents", "endpoint_url", "endpoint"),
        )?
        .with_label("rename agents.endpoint_url"),
    ])
}

/// r4 and r5 create the workflow tables on top of the agent revisions.
pub fn workflow_revisions() -> SchemaResult<Vec<Revision>> {
    Ok(vec![
        Revision::reversible(
            "r4",
            Some("r3"),
            Operation::create_table(
                "workflow_runs",
                vec![
                    ColumnDef::new("id", "INTEGER").primary_key(),
                    ColumnDef::new("agent_id", "INTEGER").not_null().default_value(0),
                    ColumnDef::new("status", "TEXT").not_null().default_value("queued"),
                ],
            ),
        )?,
        Revision::reversible(
            "r5",
            Some("r4"),
            Operation::create_table(
                "workflow_steps",
                vec![
                    ColumnDef::new("id", "INTEGER").primary_key(),
                    ColumnDef::new("run_id", "INTEGER").not_null().default_value(0),
                    ColumnDef::new("name", "TEXT"),
                ],
            ),
        )?,
        Revision::reversible(
            "r6",
            Some("r5"),
            Operation::create_index("idx_workflow_steps_run", "workflow_steps", &["run_id"], false),
        )?,
    ])
}

/// Opens a file-backed handle with short lock timings.
pub fn open_chain(path: &Path, revisions: Vec<Revision>) -> SchemaResult<SchemaChain> {
    SchemaChain::builder()
        .db_path(path)
        .lock_timeout(Duration::from_millis(300))
        .lock_poll_interval(Duration::from_millis(20))
        .add_revisions(revisions)
        .open()
}

/// Every user structure with the columns of each table, for comparing two databases.
pub fn schema_snapshot(chain: &SchemaChain) -> SchemaResult<Vec<(Structure, Vec<ColumnInfo>)>> {
    let mut snapshot = Vec::new();
    for structure in chain.list_all()? {
        let columns = if structure.kind == StructureKind::Table {
            chain.describe_table(&structure.name)?
        } else {
            Vec::new()
        };
        snapshot.push((structure, columns));
    }
    Ok(snapshot)
}

/// Runs `test` against a fresh database path and removes the files afterwards, also when
/// the test fails or panics.
pub fn run_test<T>(test: T)
where
    T: FnOnce(&Path) -> SchemaResult<()>,
{
    let path = random_path();
    let result = panic::catch_unwind(AssertUnwindSafe(|| test(&path)));
    cleanup(&path);
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed: {:?}", e),
        Err(payload) => panic::resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_test_cleans_up_after_panic() {
        let mut used = None;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_test(|path| {
                used = Some(path.to_path_buf());
                seed_agents(path, "endpoint_url")?;
                assert!(path.exists());
                panic!("assertion inside a test");
            })
        }));

        assert!(outcome.is_err());
        let used = used.expect("test body ran");
        assert!(!used.exists());
    }

    #[test]
    fn test_run_test_cleans_up_after_error() {
        let mut used = None;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_test(|path| {
                used = Some(path.to_path_buf());
                seed_agents(path, "endpoint_url")?;
                seed_agents(path, "endpoint_url")
            })
        }));

        assert!(outcome.is_err());
        let used = used.expect("test body ran");
        assert!(!used.exists());
    }
}
