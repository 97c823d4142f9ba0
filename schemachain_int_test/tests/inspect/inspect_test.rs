use schemachain::inspector::StructureKind;
use schemachain::revision::Marker;
use schemachain::ErrorKind;
use schemachain_int_test::test_util::{
    agent_revisions, open_chain, run_test, seed_agents, workflow_revisions,
};

#[test]
fn test_workflow_pattern() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let mut revisions = agent_revisions()?;
        revisions.extend(workflow_revisions()?);
        let chain = open_chain(path, revisions)?;
        chain.upgrade(None)?.into_result()?;

        let names: Vec<String> = chain
            .list_structures("workflow%")?
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["workflow_runs", "workflow_steps"]);
        Ok(())
    });
}

#[test]
fn test_list_all_hides_bookkeeping() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let mut revisions = agent_revisions()?;
        revisions.extend(workflow_revisions()?);
        let chain = open_chain(path, revisions)?;
        chain.upgrade(None)?.into_result()?;

        let all = chain.list_all()?;
        let listed: Vec<(&str, StructureKind)> =
            all.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            listed,
            vec![
                ("agents", StructureKind::Table),
                ("idx_workflow_steps_run", StructureKind::Index),
                ("workflow_runs", StructureKind::Table),
                ("workflow_steps", StructureKind::Table),
            ]
        );
        Ok(())
    });
}

#[test]
fn test_inspection_is_read_only() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, agent_revisions()?)?;

        let before = chain.list_all()?;
        assert!(chain.list_structures("nothing%")?.is_empty());
        assert_eq!(chain.current()?, Marker::Root);
        assert_eq!(chain.list_all()?, before);

        let columns = chain.describe_table("agents")?;
        let name = columns.iter().find(|c| c.name == "name");
        assert_eq!(name.map(|c| c.nullable), Some(false));
        assert_eq!(
            chain.describe_table("workflow_runs").unwrap_err().kind(),
            &ErrorKind::NotFound
        );
        Ok(())
    });
}

#[test]
fn test_describe_reports_defaults() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let chain = open_chain(path, agent_revisions()?)?;
        chain.upgrade(Some("r1"))?.into_result()?;

        let columns = chain.describe_table("agents")?;
        let verified = columns
            .iter()
            .find(|c| c.name == "is_verified")
            .map(|c| (c.sql_type.as_str(), c.nullable, c.default.as_deref()));
        assert_eq!(verified, Some(("BOOLEAN", false, Some("FALSE"))));
        Ok(())
    });
}
