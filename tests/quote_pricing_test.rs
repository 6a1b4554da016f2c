// ==========================================
// 报价单计价与参考价目刷新集成测试
// ==========================================
// 职责: 验证设置合并 → 成本汇总 → 含税合计, 以及手工明细价目刷新
// ==========================================


#[cfg(test)]
mod quote_pricing_test {
    use crate::test_helpers::*;
    use std::sync::Arc;
    use switchboard_quote::config::{config_keys, ConfigManager};
    use switchboard_quote::domain::{BoardConfiguration, LineItem};
    use switchboard_quote::engine::{
        BoardReconcileService, CatalogRefreshService, EngineError, QuotePricingService,
        ReconcileOptions, SkipReason,
    };
    use switchboard_quote::ItemSource;

    fn pricing_service(env: &TestEnv) -> (Arc<ConfigManager>, QuotePricingService) {
        let config = Arc::new(ConfigManager::from_connection(env.conn.clone()).unwrap());
        let service = QuotePricingService::new(env.boards.clone(), env.items.clone(), config.clone());
        (config, service)
    }

    /// 材料 1000, 工时 10
    fn add_reference_items(env: &TestEnv, board_id: &str) {
        env.items
            .add_manual_item(board_id, "General", "User", "USER-A", "Part A", 1.0, 400.0, 2.0)
            .unwrap();
        env.items
            .add_manual_item(board_id, "General", "User", "USER-B", "Part B", 2.0, 300.0, 4.0)
            .unwrap();
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    // ==========================================
    // 报价单计价
    // ==========================================

    #[tokio::test]
    async fn test_quote_pricing_with_default_settings() {
        let env = setup_env();
        add_reference_items(&env, TEST_BOARD_ID);
        let (_, service) = pricing_service(&env);

        let pricing = service.price_quote(TEST_QUOTE_ID).await.unwrap();
        assert_eq!(pricing.boards.len(), 1);

        let b = &pricing.boards[0].breakdown;
        assert!(approx(b.cost_base, 2030.0));
        assert!(approx(b.overhead_amount, 406.0));
        assert!(approx(b.engineering_cost, 406.0));
        assert!(approx(b.total_cost, 2842.0));
        assert!((b.sell_price - 3465.85).abs() < 0.01);
        assert_eq!(b.sell_price_rounded, 3500.0);

        assert!(approx(pricing.totals.subtotal, 3500.0));
        assert!(approx(pricing.totals.gst, 350.0));
        assert!(approx(pricing.totals.final_price, 3850.0));
    }

    #[tokio::test]
    async fn test_quote_override_takes_precedence_including_zero() {
        let env = setup_env();
        add_reference_items(&env, TEST_BOARD_ID);
        let (config, service) = pricing_service(&env);

        config
            .set_global_value(config_keys::LABOUR_RATE, 50.0)
            .unwrap();
        config
            .set_quote_override(TEST_QUOTE_ID, config_keys::LABOUR_RATE, Some(100.0))
            .unwrap();
        config
            .set_quote_override(TEST_QUOTE_ID, config_keys::OVERHEAD_FRACTION, Some(0.0))
            .unwrap();

        let pricing = service.price_quote(TEST_QUOTE_ID).await.unwrap();
        let b = &pricing.boards[0].breakdown;
        assert!(approx(b.labour_cost, 1000.0));
        assert!(approx(b.overhead_amount, 0.0));
        assert!(approx(b.total_cost, 2030.0 + 406.0));
        assert_eq!(pricing.settings.overhead_fraction, 0.0);

        // 清除覆写后回落全局值
        config
            .set_quote_override(TEST_QUOTE_ID, config_keys::LABOUR_RATE, None)
            .unwrap();
        let pricing = service.price_quote(TEST_QUOTE_ID).await.unwrap();
        assert!(approx(pricing.boards[0].breakdown.labour_cost, 500.0));
    }

    #[tokio::test]
    async fn test_multi_board_aggregation_uses_rounded_prices() {
        let env = setup_env();
        env.boards.create(&test_board("B-SECOND")).unwrap();
        add_reference_items(&env, TEST_BOARD_ID);
        add_reference_items(&env, "B-SECOND");
        let (_, service) = pricing_service(&env);

        let pricing = service.price_quote(TEST_QUOTE_ID).await.unwrap();
        assert_eq!(pricing.boards.len(), 2);
        assert!(approx(pricing.totals.subtotal, 7000.0));
        assert!(approx(pricing.totals.final_price, 7700.0));
    }

    #[tokio::test]
    async fn test_system_and_manual_items_both_count() {
        let env = setup_env();
        add_reference_items(&env, TEST_BOARD_ID);
        BoardReconcileService::new(env.boards.clone(), env.items.clone(), env.references.clone())
            .reconcile_board(
                TEST_BOARD_ID,
                &BoardConfiguration {
                    tier_count: Some(1),
                    ..Default::default()
                },
                ReconcileOptions::default(),
            )
            .await
            .unwrap();
        let (_, service) = pricing_service(&env);

        let priced = service.price_board(TEST_BOARD_ID).await.unwrap();
        // 柜层 4 条系统明细各 100 + 手工 1000
        assert_eq!(priced.item_count, 6);
        assert!(approx(priced.breakdown.material_cost, 1400.0));
        assert!(approx(priced.breakdown.labour_hours, 14.0));
    }

    #[tokio::test]
    async fn test_unknown_quote_and_board() {
        let env = setup_env();
        let (_, service) = pricing_service(&env);

        assert!(matches!(
            service.price_quote("Q-MISSING").await,
            Err(EngineError::QuoteNotFound(_))
        ));
        assert!(matches!(
            service.price_board("B-MISSING").await,
            Err(EngineError::BoardNotFound(_))
        ));
    }

    // ==========================================
    // 参考价目刷新
    // ==========================================

    fn manual_by_code(env: &TestEnv, code: &str) -> LineItem {
        env.items
            .find_by_board(TEST_BOARD_ID, Some(ItemSource::Manual))
            .unwrap()
            .into_iter()
            .find(|i| i.part_code == code)
            .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_syncs_manual_items_from_catalog() {
        let env = setup_env();
        env.items
            .add_manual_item(TEST_BOARD_ID, "CT", "Old", "CT-PANEL", "Old text", 2.0, 90.0, 0.5)
            .unwrap();
        env.items
            .add_manual_item(TEST_BOARD_ID, "General", "User", "NOT-IN-CATALOG", "Custom", 1.0, 10.0, 0.0)
            .unwrap();

        let service = CatalogRefreshService::new(env.items.clone(), env.references.clone());
        let summary = service.refresh_board(TEST_BOARD_ID).await.unwrap();
        assert_eq!(summary.updated, 1);

        let refreshed = manual_by_code(&env, "CT-PANEL");
        assert_eq!(refreshed.unit_price, 100.0);
        assert_eq!(refreshed.labour_hours, 1.0);
        assert_eq!(refreshed.description, "CT-PANEL (catalog)");
        assert_eq!(refreshed.subcategory, "Standard");
        assert!(approx(refreshed.cost, 200.0));

        let untouched = manual_by_code(&env, "NOT-IN-CATALOG");
        assert_eq!(untouched.unit_price, 10.0);

        // 再次刷新无变化
        let again = service.refresh_board(TEST_BOARD_ID).await.unwrap();
        assert_eq!(again.updated, 0);
    }

    #[tokio::test]
    async fn test_refresh_skips_ambiguous_and_ignores_system_items() {
        let env = setup_env();
        BoardReconcileService::new(env.boards.clone(), env.items.clone(), env.references.clone())
            .reconcile_board(
                TEST_BOARD_ID,
                &BoardConfiguration {
                    tier_count: Some(1),
                    ..Default::default()
                },
                ReconcileOptions::default(),
            )
            .await
            .unwrap();
        let system_before: Vec<LineItem> = env
            .items
            .find_by_board(TEST_BOARD_ID, Some(ItemSource::System))
            .unwrap();

        env.items
            .add_manual_item(TEST_BOARD_ID, "General", "User", "WC-PANEL", "Panel", 1.0, 80.0, 1.0)
            .unwrap();
        env.references
            .batch_insert(&[
                reference_item("WC-PANEL", 95.0, 1.0),
                reference_item("TIER-LABELS", 999.0, 9.0),
            ])
            .unwrap();

        let summary = CatalogRefreshService::new(env.items.clone(), env.references.clone())
            .refresh_board(TEST_BOARD_ID)
            .await
            .unwrap();

        assert_eq!(summary.updated, 0);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].part_code, "WC-PANEL");
        assert_eq!(summary.skipped[0].reason, SkipReason::Ambiguous { count: 2 });
        assert_eq!(manual_by_code(&env, "WC-PANEL").unit_price, 80.0);
        assert_eq!(
            env.items
                .find_by_board(TEST_BOARD_ID, Some(ItemSource::System))
                .unwrap(),
            system_before
        );
    }
}
