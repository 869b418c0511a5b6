//! Which transaction an invocation gets.

use std::sync::Arc;

use txscope_core::TransactionOptions;
use txscope_tests::prelude::*;

mod required {
    use super::*;

    #[test]
    fn test_empty_activity_creates_independent() {
        // GIVEN
        let shop = shop();
        let activity = Activity::new();

        // WHEN
        let (dependent, depth) = shop
            .invoke_in(&activity, PLACE_ORDER, |inv| {
                let handle = inv.transaction().unwrap();
                Ok::<_, ShopError>((handle.is_dependent(), handle.depth()))
            })
            .unwrap();

        // THEN
        assert!(!dependent);
        assert_eq!(depth, 1);
    }

    #[test]
    fn test_nested_call_depends_on_current_transaction() {
        // GIVEN
        let shop = shop();
        let activity = Activity::new();

        // WHEN
        let (outer_id, inner_parent, outstanding) = shop
            .invoke_in(&activity, PLACE_ORDER, |outer| {
                let outer_handle = outer.transaction().unwrap();
                let (parent, outstanding) = outer.invoke(RESERVE_STOCK, |inner| {
                    let handle = inner.transaction().unwrap();
                    Ok::<_, ShopError>((
                        handle.info().parent,
                        outer_handle.transaction().outstanding_dependents(),
                    ))
                })?;
                Ok::<_, ShopError>((outer_handle.id(), parent, outstanding))
            })
            .unwrap();

        // THEN
        assert_eq!(inner_parent, Some(outer_id));
        assert_eq!(outstanding, 1);
    }

    #[test]
    fn test_nested_isolation_follows_parent() {
        let shop = shop();
        let activity = Activity::new();

        let nested = shop
            .invoke_in(&activity, PLACE_ORDER, |outer| {
                outer.invoke(CHARGE, |inner| {
                    Ok::<_, ShopError>(inner.transaction().unwrap().info().isolation)
                })
            })
            .unwrap();
        let top_level = shop
            .invoke_in(&activity, CHARGE, |inv| {
                Ok::<_, ShopError>(inv.transaction().unwrap().info().isolation)
            })
            .unwrap();

        assert_eq!(nested, IsolationLevel::ReadCommitted);
        assert_eq!(top_level, IsolationLevel::Serializable);
    }
}

mod independent {
    use super::*;

    #[test]
    fn test_nested_independent_is_not_gated_by_parent() {
        // GIVEN
        let shop = shop();
        let activity = Activity::new();

        // WHEN
        let (dependent, count, outstanding) = shop
            .invoke_in(&activity, PLACE_ORDER, |outer| {
                let outer_handle = outer.transaction().unwrap();
                outer.invoke(AUDIT, |inner| {
                    Ok::<_, ShopError>((
                        inner.transaction().unwrap().is_dependent(),
                        inner.activity().count(),
                        outer_handle.transaction().outstanding_dependents(),
                    ))
                })
            })
            .unwrap();

        // THEN
        assert!(!dependent);
        assert_eq!(count, 2);
        assert_eq!(outstanding, 0);
    }

    #[test]
    fn test_independent_commits_even_if_parent_fails() {
        // GIVEN
        let shop = shop();
        let activity = Activity::new();
        let journal = Journal::new();
        let audit = RecordingParticipant::new("audit", &journal);

        // WHEN
        let result: ShopResult<()> = shop.invoke_in(&activity, PLACE_ORDER, |outer| {
            outer.invoke(AUDIT, |inner| {
                inner.enlist(audit.clone())?;
                Ok::<_, ShopError>(())
            })?;
            Err(ShopError::Declined)
        });

        // THEN
        assert!(matches!(result, Err(ShopError::Declined)));
        assert_eq!(journal.entries(), vec!["audit:start", "audit:commit"]);
    }
}

mod suppress {
    use super::*;

    #[test]
    fn test_create_never_mutates_activity_at_any_depth() {
        // GIVEN
        let shop = shop();
        let coordinator = shop.coordinator();
        let activity = Activity::new();
        let mut handles: Vec<Arc<TransactionHandle>> = Vec::new();

        for depth in 0..4 {
            // WHEN
            let created = coordinator
                .create_transaction(&activity, &TransactionOptions::suppressed())
                .unwrap();

            // THEN
            assert!(created.is_none());
            assert_eq!(activity.count(), depth);

            let next = coordinator
                .create_transaction(&activity, &TransactionOptions::new())
                .unwrap()
                .unwrap();
            handles.push(next.into_handle());
        }

        for handle in handles.iter().rev() {
            handle.dispose().unwrap();
        }
        assert_eq!(activity.count(), 0);
    }

    #[test]
    fn test_suppressed_body_sees_no_transaction() {
        // GIVEN
        let shop = shop();
        let activity = Activity::new();

        // WHEN
        let (has_txn, count, nested_dependent) = shop
            .invoke_in(&activity, PLACE_ORDER, |outer| {
                outer.invoke(QUOTE, |quote| {
                    let nested = quote.invoke(RESERVE_STOCK, |inner| {
                        Ok::<_, ShopError>(inner.transaction().unwrap().is_dependent())
                    })?;
                    Ok::<_, ShopError>((quote.transaction().is_some(), quote.activity().count(), nested))
                })
            })
            .unwrap();

        // THEN
        assert!(!has_txn);
        assert_eq!(count, 0);
        // A transactional call below a suppressed one starts afresh.
        assert!(!nested_dependent);
    }

    #[test]
    fn test_enlist_without_transaction_is_precondition() {
        let shop = shop();
        let journal = Journal::new();
        let participant = RecordingParticipant::new("p", &journal);

        let result = shop.invoke(QUOTE, |inv| {
            inv.enlist(participant.clone())?;
            Ok::<_, ShopError>(())
        });

        assert!(matches!(
            result,
            Err(ShopError::Engine(InterceptError::Transaction(
                TransactionError::Precondition { .. }
            )))
        ));
        assert!(journal.entries().is_empty());
    }
}
