// ==========================================
// 明细/板柜仓储集成测试 (SQLite)
// ==========================================
// 职责: 验证手工明细维护边界与协调提交的事务性
// ==========================================


#[cfg(test)]
mod repository_integration_test {
    use crate::test_helpers::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use switchboard_quote::domain::{BoardConfiguration, LineItem};
    use switchboard_quote::repository::{ItemChanges, RepositoryError};
    use switchboard_quote::ItemSource;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn system_item(item_id: &str, code: &str) -> LineItem {
        LineItem {
            item_id: item_id.to_string(),
            board_id: TEST_BOARD_ID.to_string(),
            category: "General".to_string(),
            subcategory: "Standard".to_string(),
            part_code: code.to_string(),
            description: code.to_string(),
            quantity: 2.0,
            unit_price: 100.0,
            labour_hours: 1.0,
            cost: 200.0,
            source: ItemSource::System,
            formula_priced: false,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        }
    }

    fn commit(env: &TestEnv, creates: &[LineItem], expected_revision: i32) -> Result<i32, RepositoryError> {
        env.boards.commit_changes(
            TEST_BOARD_ID,
            &BoardConfiguration {
                tier_count: Some(1),
                ..Default::default()
            },
            expected_revision,
            ItemChanges {
                creates,
                updates: &[],
                deletes: &[],
            },
        )
    }

    // ==========================================
    // 手工明细维护
    // ==========================================

    #[test]
    fn test_update_manual_item_recomputes_cost() {
        let env = setup_env();
        let mut item = env
            .items
            .add_manual_item(TEST_BOARD_ID, "General", "User", "USER-A", "Part A", 1.0, 50.0, 0.5)
            .unwrap();

        item.quantity = 3.0;
        item.unit_price = 40.0;
        item.cost = 0.0;
        let updated = env.items.update_manual_item(&item).unwrap();
        assert_eq!(updated.cost, 120.0);

        let stored = env
            .items
            .find_by_board(TEST_BOARD_ID, Some(ItemSource::Manual))
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quantity, 3.0);
        assert_eq!(stored[0].cost, 120.0);
    }

    #[test]
    fn test_manual_update_cannot_touch_system_item() {
        let env = setup_env();
        commit(&env, &[system_item("S-1", "CT-PANEL")], 0).unwrap();

        let mut forged = system_item("S-1", "CT-PANEL");
        forged.quantity = 9.0;
        let err = env.items.update_manual_item(&forged).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        let stored = env
            .items
            .find_by_board(TEST_BOARD_ID, Some(ItemSource::System))
            .unwrap();
        assert_eq!(stored, vec![system_item("S-1", "CT-PANEL")]);
    }

    #[test]
    fn test_manual_delete_only_removes_manual_items() {
        let env = setup_env();
        commit(&env, &[system_item("S-1", "CT-PANEL")], 0).unwrap();
        let manual = env
            .items
            .add_manual_item(TEST_BOARD_ID, "General", "User", "USER-A", "Part A", 1.0, 50.0, 0.5)
            .unwrap();

        assert!(matches!(
            env.items.delete_manual_item("S-1"),
            Err(RepositoryError::NotFound { .. })
        ));
        env.items.delete_manual_item(&manual.item_id).unwrap();

        let remaining = env.items.find_by_board(TEST_BOARD_ID, None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item_id, "S-1");
    }

    #[test]
    fn test_manual_item_rejects_negative_quantity() {
        let env = setup_env();
        let mut item = env
            .items
            .add_manual_item(TEST_BOARD_ID, "General", "User", "USER-A", "Part A", 1.0, 50.0, 0.5)
            .unwrap();
        item.quantity = -1.0;

        assert!(matches!(
            env.items.update_manual_item(&item),
            Err(RepositoryError::FieldValueError { .. })
        ));
    }

    // ==========================================
    // 协调提交事务
    // ==========================================

    #[test]
    fn test_commit_is_rolled_back_when_an_item_write_fails() {
        let env = setup_env();

        // 同一 item_id 插入两次, 第二次违反主键约束
        let err = commit(
            &env,
            &[system_item("S-1", "CT-PANEL"), system_item("S-1", "CT-WIRING")],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        let board = env.boards.find_by_id(TEST_BOARD_ID).unwrap().unwrap();
        assert_eq!(board.revision, 0);
        assert_eq!(board.configuration, BoardConfiguration::default());
        assert!(env.items.find_by_board(TEST_BOARD_ID, None).unwrap().is_empty());
    }

    #[test]
    fn test_commit_with_stale_revision_writes_no_items() {
        let env = setup_env();
        assert_eq!(commit(&env, &[system_item("S-1", "CT-PANEL")], 0).unwrap(), 1);

        let err = commit(&env, &[system_item("S-2", "CT-WIRING")], 0).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::OptimisticLockFailure { expected: 0, actual: 1, .. }
        ));

        let stored = env.items.find_by_board(TEST_BOARD_ID, None).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].item_id, "S-1");
    }
}
