use schemachain::migration::StepOutcome;
use schemachain::revision::Marker;
use schemachain::SchemaResult;
use schemachain_int_test::test_util::{agent_revisions, open_chain, run_test, seed_agents};

#[test]
fn test_existing_rename_target_is_skipped() {
    run_test(|path| {
        // endpoint was renamed by hand before r3 ever ran
        seed_agents(path, "endpoint")?;
        let chain = open_chain(path, agent_revisions()?)?;
        chain.upgrade(Some("r2"))?.into_result()?;

        let report = chain.upgrade(Some("r3"))?;
        assert!(report.is_success());
        assert_eq!(report.applied(), 0);
        assert_eq!(report.skipped(), 1);
        match &report.steps()[0].outcome {
            StepOutcome::Skipped { reason } => {
                assert!(reason.contains("endpoint_url"), "unexpected reason: {}", reason)
            }
            other => panic!("expected a skip, got {:?}", other),
        }
        assert_eq!(chain.current()?, Marker::from("r3"));

        let history = chain.history()?;
        let last = history.last().map(|h| (h.revision_id.as_str(), h.skipped));
        assert_eq!(last, Some(("r3", true)));
        Ok(())
    });
}

#[test]
fn test_partially_applied_chain_catches_up() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, agent_revisions()?)?;
        chain.with_connection(|conn| {
            conn.execute_batch("ALTER TABLE agents ADD COLUMN is_verified BOOLEAN")?;
            Ok(())
        })?;

        let report = chain.upgrade(None)?;
        let outcomes: Vec<(&str, bool)> = report
            .steps()
            .iter()
            .map(|s| {
                (
                    s.revision_id.as_str(),
                    matches!(s.outcome, StepOutcome::Skipped { .. }),
                )
            })
            .collect();
        assert_eq!(outcomes, vec![("r1", true), ("r2", false), ("r3", false)]);
        assert_eq!(chain.current()?, Marker::from("r3"));
        Ok(())
    });
}

#[test]
fn test_downgrade_tolerates_missing_column() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, agent_revisions()?)?;
        chain.upgrade(None)?.into_result()?;
        chain.with_connection(|conn| {
            conn.execute_batch("ALTER TABLE agents DROP COLUMN total_spent")?;
            Ok(())
        })?;

        let report = chain.downgrade("base")?;
        assert!(report.is_success());
        assert_eq!(report.applied(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(chain.current()?, Marker::Root);

        let columns: SchemaResult<Vec<String>> = chain
            .describe_table("agents")
            .map(|cols| cols.into_iter().map(|c| c.name).collect());
        assert_eq!(columns?, vec!["id", "name", "endpoint_url"]);
        Ok(())
    });
}
