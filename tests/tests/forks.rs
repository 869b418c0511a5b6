//! Forked invocations.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use txscope_core::TransactionId;
use txscope_intercept::ForkHandle;
use txscope_tests::prelude::*;

mod detached {
    use super::*;

    #[test]
    fn test_parent_commit_waits_for_concurrent_forks() {
        // GIVEN
        init_tracing();
        let shop = shop();
        let journal = Journal::new();
        let forks: Arc<Mutex<Vec<(TransactionId, Option<TransactionId>)>>> = Arc::default();
        let order = RecordingParticipant::new("order", &journal);

        // WHEN
        let parent = shop
            .invoke(PLACE_ORDER, |outer| {
                outer.enlist(order.clone())?;
                for name in ["a", "b"] {
                    let journal = journal.clone();
                    let forks = forks.clone();
                    let outcome = outer.spawn(NOTIFY, move |inv| {
                        let handle = inv.transaction().unwrap();
                        forks.lock().push((handle.id(), handle.info().parent));
                        inv.enlist(RecordingParticipant::new(format!("fork-{name}"), &journal))?;
                        thread::sleep(Duration::from_millis(40));
                        journal.record(format!("fork-{name}:done"));
                        Ok::<_, ShopError>(())
                    })?;
                    assert!(outcome.is_forked());
                }
                Ok::<_, ShopError>(outer.transaction().unwrap().id())
            })
            .unwrap();

        // THEN
        let forks = forks.lock().clone();
        assert_eq!(forks.len(), 2);
        assert_ne!(forks[0].0, forks[1].0);
        assert!(forks.iter().all(|(_, p)| *p == Some(parent)));

        let order_commit = journal.position("order:commit").unwrap();
        for name in ["a", "b"] {
            let done = journal.position(&format!("fork-{name}:done")).unwrap();
            let committed = journal.position(&format!("fork-{name}:commit")).unwrap();
            assert!(done < order_commit);
            assert!(done < committed);
        }
    }

    #[test]
    fn test_fork_under_nested_call_settles_before_top_level_commit() {
        // GIVEN
        init_tracing();
        let shop = shop();
        let journal = Journal::new();
        let slot: Arc<Mutex<Option<ForkHandle<Option<TransactionId>, ShopError>>>> =
            Arc::default();
        let order = RecordingParticipant::new("order", &journal);

        // WHEN - top-level -> nested -> detached fork
        let reservation = shop
            .invoke(PLACE_ORDER, |outer| {
                outer.enlist(order.clone())?;
                outer.invoke(RESERVE_STOCK, |inner| {
                    let journal = journal.clone();
                    let outcome = inner.spawn(NOTIFY, move |inv| {
                        inv.enlist(RecordingParticipant::new("fork", &journal))?;
                        thread::sleep(Duration::from_millis(60));
                        journal.record("fork:done");
                        Ok::<_, ShopError>(inv.transaction().and_then(|h| h.info().parent))
                    })?;
                    if let Outcome::Forked(fork) = outcome {
                        *slot.lock() = Some(fork);
                    }
                    Ok::<_, ShopError>(inner.transaction().unwrap().id())
                })
            })
            .unwrap();

        // THEN
        let fork = slot.lock().take().unwrap();
        assert_eq!(fork.join().unwrap(), Some(reservation));

        let order_commit = journal.position("order:commit").unwrap();
        assert!(journal.position("fork:done").unwrap() < order_commit);
        assert!(journal.position("fork:commit").is_some());
        assert_eq!(journal.position("fork:rollback"), None);
        assert_eq!(journal.count("commit"), 2);
    }

    #[test]
    fn test_fork_error_stays_in_fork() {
        // GIVEN
        let shop = shop();
        let slot: Arc<Mutex<Option<ForkHandle<(), ShopError>>>> = Arc::default();

        // WHEN
        let parent = shop.invoke(PLACE_ORDER, |outer| {
            let outcome = outer.spawn(NOTIFY, |_| -> ShopResult<()> { Err(ShopError::Declined) })?;
            if let Outcome::Forked(fork) = outcome {
                *slot.lock() = Some(fork);
            }
            Ok::<_, ShopError>("placed")
        });

        // THEN - the fork's error is only seen by joining it
        let fork = slot.lock().take().unwrap();
        assert!(matches!(fork.join(), Err(ShopError::Declined)));
        // Its rollback doomed the parent, whose commit fails on its own terms.
        let error = parent.unwrap_err();
        assert!(matches!(
            TransactionError::find_in(&error),
            Some(TransactionError::CommitFailed { .. })
        ));
    }

    #[test]
    fn test_fork_at_top_level_runs_inline() {
        let shop = shop();
        let caller = thread::current().id();

        let outcome = shop
            .spawn(NOTIFY, move |inv| {
                Ok::<_, ShopError>((thread::current().id(), inv.activity().count()))
            })
            .unwrap();

        assert!(!outcome.is_forked());
        assert_eq!(outcome.completed(), Some((caller, 1)));
    }

    #[test]
    fn test_panicking_fork_rolls_back() {
        // GIVEN
        let shop = shop();
        let journal = Journal::new();
        let slot: Arc<Mutex<Option<ForkHandle<(), ShopError>>>> = Arc::default();
        let participant = RecordingParticipant::new("fork", &journal);

        // WHEN
        let parent = shop.invoke(PLACE_ORDER, |outer| {
            let participant = participant.clone();
            let outcome = outer.spawn(NOTIFY, move |inv| -> ShopResult<()> {
                inv.enlist(participant.clone())?;
                panic!("fork exploded");
            })?;
            if let Outcome::Forked(fork) = outcome {
                *slot.lock() = Some(fork);
            }
            Ok::<_, ShopError>(())
        });

        // THEN
        assert!(parent.is_err());
        assert_eq!(journal.entries(), vec!["fork:start", "fork:rollback"]);
        let fork = slot.lock().take().unwrap();
        assert!(matches!(
            fork.join(),
            Err(ShopError::Engine(InterceptError::ForkPanicked { .. }))
        ));
    }
}

mod waiting {
    use super::*;

    #[test]
    fn test_caller_waits_and_fork_commits_with_parent() {
        // GIVEN
        let shop = shop();
        let journal = Journal::new();
        let parcel = RecordingParticipant::new("parcel", &journal);

        // WHEN
        let shipped = shop
            .invoke(PLACE_ORDER, |outer| {
                let shipped = outer.invoke(SHIP, |inv| {
                    inv.enlist(parcel.clone())?;
                    thread::sleep(Duration::from_millis(20));
                    journal.record("ship:done");
                    Ok::<_, ShopError>(inv.activity().parent_id() == Some(outer.activity().id()))
                })?;
                journal.record("order:continues");
                Ok::<_, ShopError>(shipped)
            })
            .unwrap();

        // THEN
        assert!(shipped);
        assert_eq!(
            journal.entries(),
            vec!["parcel:start", "ship:done", "order:continues", "parcel:commit"]
        );
    }

    #[test]
    fn test_fork_error_reaches_caller() {
        let shop = shop();

        let result = shop.invoke(PLACE_ORDER, |outer| {
            let shipped: ShopResult<()> = outer.invoke(SHIP, |_| Err(ShopError::Declined));
            assert!(matches!(shipped, Err(ShopError::Declined)));
            shipped
        });

        assert!(matches!(result, Err(ShopError::Declined)));
    }

    #[test]
    fn test_detached_fork_through_invoke_is_rejected() {
        let shop = shop();

        let result = shop.invoke(PLACE_ORDER, |outer| {
            outer.invoke(NOTIFY, |_| Ok::<_, ShopError>(()))
        });

        match result {
            Err(ShopError::Engine(e)) => assert!(e.is_precondition()),
            other => panic!("expected a precondition violation, got {:?}", other),
        }
    }
}
