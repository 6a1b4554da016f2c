// ==========================================
// 开关柜报价核心 - 参考价目刷新
// ==========================================
// 职责: 用最新参考价目同步手工明细的价格/工时/描述
// 范围: 仅手工明细; 系统明细由配置协调负责
// 红线: 公式计价明细只同步描述/子类, 绝不覆盖价格/工时
// 红线: 身份键在价目中重复 → 跳过, 不猜
// ==========================================

use crate::domain::line_item::{LineItem, ReferenceItem};
use crate::domain::types::ItemSource;
use crate::engine::error::EngineResult;
use crate::engine::resolver::{SkipReason, SkippedKey};
use crate::repository::stores::{LineItemStore, ReferencePriceList};
use chrono::{NaiveDateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 数值字段比较容差
pub const REFRESH_EPS: f64 = 0.001;

// ==========================================
// RefreshPlan - 刷新计划
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshPlan {
    pub updates: Vec<LineItem>,
    pub skipped: Vec<SkippedKey>,
}

// ==========================================
// CatalogRefreshReconciler - 刷新计划计算 (纯函数)
// ==========================================
pub struct CatalogRefreshReconciler {
    // 无状态引擎
}

impl CatalogRefreshReconciler {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算刷新计划
    ///
    /// 非手工明细直接忽略; 价目中找不到的键不改动也不记录
    pub fn plan(
        &self,
        items: &[LineItem],
        references: &[ReferenceItem],
        now: NaiveDateTime,
    ) -> RefreshPlan {
        let mut by_code: HashMap<&str, Vec<&ReferenceItem>> = HashMap::new();
        for reference in references {
            by_code
                .entry(reference.part_code.trim())
                .or_default()
                .push(reference);
        }

        let mut plan = RefreshPlan::default();
        let mut reported: BTreeSet<String> = BTreeSet::new();

        for item in items.iter().filter(|item| item.is_manual()) {
            let code = item.part_code.trim();
            let reference = match by_code.get(code).map(Vec::as_slice) {
                Some([single]) => *single,
                Some(many) if many.len() > 1 => {
                    if reported.insert(code.to_string()) {
                        warn!(part_code = %code, count = many.len(), "参考价目存在重复身份键，跳过刷新");
                        plan.skipped.push(SkippedKey {
                            part_code: code.to_string(),
                            reason: SkipReason::Ambiguous { count: many.len() },
                        });
                    }
                    continue;
                }
                _ => continue,
            };

            if let Some(updated) = self.sync_item(item, reference, now) {
                plan.updates.push(updated);
            }
        }

        plan
    }

    fn sync_item(
        &self,
        item: &LineItem,
        reference: &ReferenceItem,
        now: NaiveDateTime,
    ) -> Option<LineItem> {
        let description_changed = item.description != reference.description;
        let subcategory_changed = item.subcategory != reference.subcategory;

        if item.formula_priced {
            if !description_changed && !subcategory_changed {
                return None;
            }
            let mut updated = item.clone();
            updated.description = reference.description.clone();
            updated.subcategory = reference.subcategory.clone();
            updated.updated_at = now;
            return Some(updated);
        }

        let price_changed = (item.unit_price - reference.unit_price).abs() > REFRESH_EPS;
        let labour_changed = (item.labour_hours - reference.labour_hours).abs() > REFRESH_EPS;
        if !price_changed && !labour_changed && !description_changed {
            return None;
        }

        let mut updated = item.clone();
        updated.unit_price = reference.unit_price;
        updated.labour_hours = reference.labour_hours;
        updated.description = reference.description.clone();
        updated.subcategory = reference.subcategory.clone();
        updated.recompute_cost();
        updated.updated_at = now;
        Some(updated)
    }
}

impl Default for CatalogRefreshReconciler {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// RefreshSummary - 刷新结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshSummary {
    pub board_id: String,
    pub updated: usize,
    pub skipped: Vec<SkippedKey>,
}

// ==========================================
// CatalogRefreshService - 刷新执行器
// ==========================================
pub struct CatalogRefreshService {
    items: Arc<dyn LineItemStore>,
    references: Arc<dyn ReferencePriceList>,
    reconciler: CatalogRefreshReconciler,
}

impl CatalogRefreshService {
    pub fn new(items: Arc<dyn LineItemStore>, references: Arc<dyn ReferencePriceList>) -> Self {
        Self {
            items,
            references,
            reconciler: CatalogRefreshReconciler::new(),
        }
    }

    /// 刷新单板柜手工明细
    #[instrument(skip(self))]
    pub async fn refresh_board(&self, board_id: &str) -> EngineResult<RefreshSummary> {
        let manual_items = self
            .items
            .list_by_board(board_id, Some(ItemSource::Manual))
            .await?;

        let codes: Vec<String> = manual_items
            .iter()
            .map(|item| item.part_code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let references = if codes.is_empty() {
            Vec::new()
        } else {
            self.references.find_by_codes(&codes).await?
        };

        let plan = self
            .reconciler
            .plan(&manual_items, &references, Utc::now().naive_utc());

        try_join_all(plan.updates.iter().map(|item| self.items.update_item(item))).await?;

        info!(
            board_id = %board_id,
            updated = plan.updates.len(),
            skipped = plan.skipped.len(),
            "参考价目刷新完成"
        );

        Ok(RefreshSummary {
            board_id: board_id.to_string(),
            updated: plan.updates.len(),
            skipped: plan.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(code: &str, price: f64, hours: f64, description: &str) -> ReferenceItem {
        ReferenceItem {
            item_id: format!("R-{}-{}", code, price),
            part_code: code.to_string(),
            category: "General".to_string(),
            subcategory: "Catalog".to_string(),
            description: description.to_string(),
            unit_price: price,
            labour_hours: hours,
            auto_add: false,
            sheet_metal: false,
        }
    }

    fn manual(id: &str, code: &str, price: f64, hours: f64) -> LineItem {
        let now = Utc::now().naive_utc();
        LineItem {
            item_id: id.to_string(),
            board_id: "B1".to_string(),
            category: "General".to_string(),
            subcategory: "Catalog".to_string(),
            part_code: code.to_string(),
            description: "Widget".to_string(),
            quantity: 3.0,
            unit_price: price,
            labour_hours: hours,
            cost: price * 3.0,
            source: ItemSource::Manual,
            formula_priced: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    #[test]
    fn test_price_change_overwrites_and_recomputes_cost() {
        let items = vec![manual("M1", "WIDGET", 10.0, 0.5)];
        let refs = vec![reference("WIDGET", 12.0, 0.5, "Widget")];

        let plan = CatalogRefreshReconciler::new().plan(&items, &refs, now());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].unit_price, 12.0);
        assert_eq!(plan.updates[0].cost, 36.0);
    }

    #[test]
    fn test_differences_within_epsilon_are_ignored() {
        let items = vec![manual("M1", "WIDGET", 10.0, 0.5)];
        let refs = vec![reference("WIDGET", 10.0005, 0.5004, "Widget")];

        let plan = CatalogRefreshReconciler::new().plan(&items, &refs, now());
        assert!(plan.updates.is_empty());
    }

    #[test]
    fn test_description_change_alone_triggers_sync() {
        let items = vec![manual("M1", "WIDGET", 10.0, 0.5)];
        let refs = vec![reference("WIDGET", 10.0, 0.5, "Widget Mk II")];

        let plan = CatalogRefreshReconciler::new().plan(&items, &refs, now());
        assert_eq!(plan.updates[0].description, "Widget Mk II");
    }

    #[test]
    fn test_formula_priced_items_keep_price() {
        let mut item = manual("M1", "WIDGET", 10.0, 0.5);
        item.formula_priced = true;
        let refs = vec![reference("WIDGET", 99.0, 9.0, "Widget Mk II")];

        let plan = CatalogRefreshReconciler::new().plan(&[item], &refs, now());
        let updated = &plan.updates[0];
        assert_eq!(updated.unit_price, 10.0);
        assert_eq!(updated.labour_hours, 0.5);
        assert_eq!(updated.description, "Widget Mk II");
    }

    #[test]
    fn test_ambiguous_and_system_items_are_skipped() {
        let mut system = manual("S1", "GADGET", 1.0, 0.0);
        system.source = ItemSource::System;
        let items = vec![
            manual("M1", "WIDGET", 10.0, 0.5),
            manual("M2", "WIDGET", 10.0, 0.5),
            system,
        ];
        let refs = vec![
            reference("WIDGET", 11.0, 0.5, "Widget"),
            reference("WIDGET", 12.0, 0.5, "Widget"),
            reference("GADGET", 50.0, 0.0, "Gadget"),
        ];

        let plan = CatalogRefreshReconciler::new().plan(&items, &refs, now());
        assert!(plan.updates.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].part_code, "WIDGET");
    }
}
