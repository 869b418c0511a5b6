//! Participants driven through the interceptor.

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use txscope_resources::{StagedFile, TransactionalMap};
use txscope_tests::prelude::*;

mod staged_file {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_published_when_invocation_commits() {
        // GIVEN
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("receipt.txt");
        let shop = shop();

        // WHEN
        shop.invoke(PLACE_ORDER, |inv| {
            let receipt = StagedFile::new(&target);
            inv.enlist(receipt.clone())?;
            receipt.write("order 17: 3 widgets\n");
            assert!(!target.exists());
            Ok::<_, ShopError>(())
        })
        .unwrap();

        // THEN
        assert_eq!(fs::read_to_string(&target).unwrap(), "order 17: 3 widgets\n");
    }

    #[test]
    fn test_file_untouched_when_invocation_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("receipt.txt");
        fs::write(&target, "previous").unwrap();
        let shop = shop();

        let result: ShopResult<()> = shop.invoke(PLACE_ORDER, |inv| {
            let receipt = StagedFile::new(&target);
            inv.enlist(receipt.clone())?;
            receipt.write("never published");
            Err(ShopError::Declined)
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "previous");
    }
}

mod transactional_map {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_writes_publish_with_outer_commit() {
        // GIVEN
        let shop = shop();
        let stock: TransactionalMap<String, u32> = TransactionalMap::new("stock");

        // WHEN
        let visible_before_outer_commit = shop
            .invoke(PLACE_ORDER, |outer| {
                outer.invoke(RESERVE_STOCK, |inner| {
                    let writer = stock.writer();
                    inner.enlist(writer.clone())?;
                    writer.put("widget".to_string(), 7);
                    Ok::<_, ShopError>(())
                })?;
                Ok::<_, ShopError>(stock.get(&"widget".to_string()))
            })
            .unwrap();

        // THEN
        assert_eq!(visible_before_outer_commit, None);
        assert_eq!(stock.get(&"widget".to_string()), Some(7));
    }

    #[test]
    fn test_nested_writes_discarded_with_outer_rollback() {
        // GIVEN
        let shop = shop();
        let stock: TransactionalMap<String, u32> = TransactionalMap::new("stock");

        // WHEN
        let result: ShopResult<()> = shop.invoke(PLACE_ORDER, |outer| {
            outer.invoke(RESERVE_STOCK, |inner| {
                let writer = stock.writer();
                inner.enlist(writer.clone())?;
                writer.put("widget".to_string(), 7);
                Ok::<_, ShopError>(())
            })?;
            Err(ShopError::Declined)
        });

        // THEN
        assert!(result.is_err());
        assert!(stock.is_empty());
    }

    #[test]
    fn test_independent_audit_survives_outer_rollback() {
        let shop = shop();
        let log: TransactionalMap<u32, String> = TransactionalMap::new("audit");

        let _ = shop.invoke(PLACE_ORDER, |outer| {
            outer.invoke(AUDIT, |inner| {
                let writer = log.writer();
                inner.enlist(writer.clone())?;
                writer.put(1, "order attempted".to_string());
                Ok::<_, ShopError>(())
            })?;
            Err::<(), _>(ShopError::Declined)
        });

        assert_eq!(log.get(&1).as_deref(), Some("order attempted"));
    }
}
