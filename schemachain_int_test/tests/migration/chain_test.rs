use schemachain::migration::StepOutcome;
use schemachain::revision::{Marker, Operation, Revision};
use schemachain::{ErrorKind, SchemaChain, SchemaResult};
use schemachain_int_test::test_util::{
    agent_revisions, cleanup, open_chain, random_path, run_test, schema_snapshot, seed_agents,
    workflow_revisions,
};

fn column_names(chain: &SchemaChain, table: &str) -> SchemaResult<Vec<String>> {
    Ok(chain
        .describe_table(table)?
        .into_iter()
        .map(|c| c.name)
        .collect())
}

fn full_chain() -> SchemaResult<Vec<Revision>> {
    let mut revisions = agent_revisions()?;
    revisions.extend(workflow_revisions()?);
    Ok(revisions)
}

#[test]
fn test_upgrade_to_r3_then_downgrade_to_r1() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, agent_revisions()?)?;

        let report = chain.upgrade(Some("r3"))?;
        let applied: Vec<&str> = report.steps().iter().map(|s| s.revision_id.as_str()).collect();
        assert_eq!(applied, vec!["r1", "r2", "r3"]);
        assert_eq!(report.applied(), 3);
        assert_eq!(chain.current()?, Marker::from("r3"));
        assert_eq!(
            column_names(&chain, "agents")?,
            vec!["id", "name", "endpoint", "is_verified", "total_spent"]
        );

        let backfilled: Vec<(bool, f64)> = chain.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT is_verified, total_spent FROM agents ORDER BY id")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut values = Vec::new();
            for row in rows {
                values.push(row?);
            }
            Ok(values)
        })?;
        assert_eq!(backfilled, vec![(false, 0.0), (false, 0.0)]);

        let report = chain.downgrade("r1")?;
        let reversed: Vec<&str> = report.steps().iter().map(|s| s.revision_id.as_str()).collect();
        assert_eq!(reversed, vec!["r3", "r2"]);
        assert_eq!(chain.current()?, Marker::from("r1"));
        assert_eq!(
            column_names(&chain, "agents")?,
            vec!["id", "name", "endpoint_url", "is_verified"]
        );
        Ok(())
    });
}

#[test]
fn test_round_trip_matches_single_upgrade() {
    let fresh = random_path();
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, full_chain()?)?;
        chain.upgrade(None)?.into_result()?;
        chain.downgrade("base")?.into_result()?;
        assert_eq!(chain.current()?, Marker::Root);
        chain.upgrade(None)?.into_result()?;
        assert_eq!(chain.current()?, chain.head()?);

        seed_agents(&fresh, "endpoint_url")?;
        let reference = open_chain(&fresh, full_chain()?)?;
        reference.upgrade(None)?.into_result()?;

        assert_eq!(schema_snapshot(&chain)?, schema_snapshot(&reference)?);
        Ok(())
    });
    cleanup(&fresh);
}

#[test]
fn test_second_upgrade_runs_nothing() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, full_chain()?)?;

        let first = chain.upgrade(None)?;
        assert_eq!(first.applied(), 6);
        let recorded = chain.history()?.len();

        let second = chain.upgrade(None)?;
        assert!(second.steps().is_empty());
        assert_eq!(second.final_marker(), &Marker::from("r6"));
        assert_eq!(chain.history()?.len(), recorded);
        Ok(())
    });
}

#[test]
fn test_marker_survives_reopen() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        {
            let chain = open_chain(path, agent_revisions()?)?;
            chain.upgrade(Some("r2"))?.into_result()?;
        }

        let chain = open_chain(path, agent_revisions()?)?;
        assert_eq!(chain.current()?, Marker::from("r2"));
        let report = chain.upgrade(None)?;
        assert_eq!(report.start_marker(), &Marker::from("r2"));
        assert_eq!(report.steps().len(), 1);
        assert_eq!(report.steps()[0].revision_id, "r3");
        Ok(())
    });
}

#[test]
fn test_failing_step_keeps_last_committed_marker() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let mut revisions = agent_revisions()?;
        revisions.push(Revision::new(
            "r4",
            Some("r3"),
            Operation::sql(
                "CREATE TABLE audit_log (id INTEGER PRIMARY KEY); \
                 UPDATE agents SET missing_column = 1;",
            ),
            Operation::drop_table("audit_log"),
        ));
        let chain = open_chain(path, revisions)?;

        let report = chain.upgrade(None)?;
        assert!(!report.is_success());
        assert_eq!(report.applied(), 3);
        assert!(matches!(
            report.steps().last().map(|s| &s.outcome),
            Some(StepOutcome::Failed { .. })
        ));
        assert_eq!(chain.current()?, Marker::from("r3"));
        assert!(chain.list_structures("audit_log")?.is_empty());
        assert_eq!(chain.history()?.len(), 3);

        let err = report.into_result().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TransactionFailure);
        assert!(err.cause().is_some());
        Ok(())
    });
}

#[test]
fn test_bad_targets_change_nothing() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, agent_revisions()?)?;
        chain.upgrade(Some("r2"))?.into_result()?;

        let behind = chain.upgrade(Some("r1")).unwrap_err();
        assert_eq!(behind.kind(), &ErrorKind::Unreachable);
        let ahead = chain.downgrade("r3").unwrap_err();
        assert_eq!(ahead.kind(), &ErrorKind::Unreachable);
        let unknown = chain.upgrade(Some("zz99")).unwrap_err();
        assert_eq!(unknown.kind(), &ErrorKind::Unreachable);

        assert_eq!(chain.current()?, Marker::from("r2"));
        assert_eq!(chain.history()?.len(), 2);
        Ok(())
    });
}

#[test]
fn test_status_marks_applied_revisions() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, full_chain()?)?;
        chain.upgrade(Some("r4"))?.into_result()?;

        let status = chain.status()?;
        let applied: Vec<&str> = status
            .iter()
            .filter(|s| s.applied)
            .map(|s| s.revision.id())
            .collect();
        assert_eq!(applied, vec!["r1", "r2", "r3", "r4"]);
        let current: Vec<&str> = status
            .iter()
            .filter(|s| s.current)
            .map(|s| s.revision.id())
            .collect();
        assert_eq!(current, vec!["r4"]);
        Ok(())
    });
}
