use rusqlite::Connection;
use schemachain::migration::MigrationLock;
use schemachain::revision::Marker;
use schemachain::{ErrorKind, SchemaChain};
use schemachain_int_test::test_util::{agent_revisions, open_chain, run_test, seed_agents};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_held_lock_times_out() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let other = Connection::open(path)?;
        let _held = MigrationLock::acquire(&other, Duration::ZERO, Duration::from_millis(10))?;

        let chain = open_chain(path, agent_revisions()?)?;
        let started = Instant::now();
        let err = chain.upgrade(None).unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::LockTimeout);
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(chain.current()?, Marker::Root);
        assert!(chain.history()?.is_empty());
        Ok(())
    });
}

#[test]
fn test_waiting_run_proceeds_after_release() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        let (acquired_tx, acquired_rx) = mpsc::channel();
        let holder_path = path.to_path_buf();

        let holder = thread::spawn(move || -> schemachain::SchemaResult<()> {
            let conn = Connection::open(&holder_path)?;
            let lock = MigrationLock::acquire(&conn, Duration::ZERO, Duration::from_millis(10))?;
            let _ = acquired_tx.send(());
            thread::sleep(Duration::from_millis(150));
            drop(lock);
            Ok(())
        });
        let _ = acquired_rx.recv();

        let chain = SchemaChain::builder()
            .db_path(path)
            .lock_timeout(Duration::from_secs(5))
            .lock_poll_interval(Duration::from_millis(20))
            .add_revisions(agent_revisions()?)
            .open()?;
        let report = chain.upgrade(None)?;

        if let Ok(result) = holder.join() {
            result?;
        }
        assert_eq!(report.applied(), 3);
        assert_eq!(chain.current()?, Marker::from("r3"));
        Ok(())
    });
}

#[test]
fn test_unlock_clears_stale_lock() {
    run_test(|path| {
        seed_agents(path, "endpoint_url")?;
        {
            let crashed = Connection::open(path)?;
            std::mem::forget(MigrationLock::acquire(
                &crashed,
                Duration::ZERO,
                Duration::from_millis(10),
            )?);
        }

        let chain = open_chain(path, agent_revisions()?)?;
        assert_eq!(
            chain.upgrade(None).unwrap_err().kind(),
            &ErrorKind::LockTimeout
        );

        assert!(chain.force_unlock()?);
        assert!(!chain.force_unlock()?);
        assert_eq!(chain.upgrade(None)?.applied(), 3);
        Ok(())
    });
}
