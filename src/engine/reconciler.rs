// ==========================================
// 开关柜报价核心 - 明细协调器 (差异计划)
// ==========================================
// 职责: 现有系统明细 × 解析结果 → 新增/更新/删除计划
// 红线: 只遍历系统托管词表内的 SYSTEM 明细, 手工明细不读不写
// 红线: 本轮被跳过的键 (缺失/歧义) 保持原状
// 红线: 纯函数; 写入由编排层执行
// ==========================================
// 状态转换 (按身份键):
//   现有 ∧ 目标 ∧ 无变化     → 不动
//   现有 ∧ 目标 ∧ 数量/公式价变化 → 更新
//   现有 ∧ ¬目标             → 删除
//   ¬现有 ∧ 目标             → 新增
//   同键多条现有 (历史数据)  → 保留第一条, 其余删除
// ==========================================

use crate::domain::line_item::LineItem;
use crate::domain::types::ItemSource;
use crate::engine::part_key::PartKey;
use crate::engine::resolver::{ResolvedItem, Resolution};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use uuid::Uuid;

/// 数值比较容差
const EPS: f64 = 1e-6;

// ==========================================
// ReconcilePlan - 协调计划
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub creates: Vec<LineItem>,
    pub updates: Vec<LineItem>,
    pub deletes: Vec<String>, // item_id
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }
}

// ==========================================
// Reconciler - 明细协调器
// ==========================================
pub struct Reconciler {
    // 无状态引擎
}

impl Reconciler {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算协调计划
    ///
    /// # 参数
    /// - `board_id`: 板柜ID (新增明细归属)
    /// - `existing`: 板柜现有明细 (可含手工明细, 此处会过滤掉)
    /// - `resolution`: 解析结果
    /// - `now`: 写入时间戳
    pub fn plan(
        &self,
        board_id: &str,
        existing: &[LineItem],
        resolution: &Resolution,
        now: NaiveDateTime,
    ) -> ReconcilePlan {
        let mut plan = ReconcilePlan::default();

        // ===== 现有托管明细按键分组 =====
        let mut managed: BTreeMap<PartKey, &LineItem> = BTreeMap::new();
        for item in existing.iter().filter(|item| item.is_system()) {
            let Some(key) = PartKey::from_code(&item.part_code) else {
                continue;
            };
            if managed.contains_key(&key) {
                tracing::warn!(
                    board_id = %board_id,
                    part_code = %item.part_code,
                    item_id = %item.item_id,
                    "同键存在多条系统明细，删除多余条目"
                );
                plan.deletes.push(item.item_id.clone());
                continue;
            }
            managed.insert(key, item);
        }

        // ===== 现有 → 更新 / 删除 =====
        for (key, item) in &managed {
            if resolution.is_skipped(key) {
                tracing::debug!(part_code = %key, "键本轮被跳过，保持现有明细");
                continue;
            }

            match resolution.items.get(key) {
                Some(resolved) => {
                    if let Some(updated) = self.apply_changes(item, resolved, now) {
                        plan.updates.push(updated);
                    }
                }
                None => plan.deletes.push(item.item_id.clone()),
            }
        }

        // ===== 目标 → 新增 =====
        for (key, resolved) in &resolution.items {
            if !managed.contains_key(key) {
                plan.creates.push(self.new_item(board_id, resolved, now));
            }
        }

        plan
    }

    /// 比较现有明细与解析结果; 有变化时返回更新后的明细
    fn apply_changes(
        &self,
        item: &LineItem,
        resolved: &ResolvedItem,
        now: NaiveDateTime,
    ) -> Option<LineItem> {
        let quantity_changed = (item.quantity - resolved.quantity).abs() > EPS;
        let price_changed = resolved.formula_priced
            && ((item.unit_price - resolved.unit_price).abs() > EPS
                || (item.labour_hours - resolved.labour_hours).abs() > EPS);

        if !quantity_changed && !price_changed {
            return None;
        }

        let mut updated = item.clone();
        updated.quantity = resolved.quantity;
        if resolved.formula_priced {
            updated.unit_price = resolved.unit_price;
            updated.labour_hours = resolved.labour_hours;
            updated.formula_priced = true;
        }
        updated.recompute_cost();
        updated.updated_at = now;
        Some(updated)
    }

    fn new_item(&self, board_id: &str, resolved: &ResolvedItem, now: NaiveDateTime) -> LineItem {
        LineItem {
            item_id: Uuid::new_v4().to_string(),
            board_id: board_id.to_string(),
            category: resolved.category.clone(),
            subcategory: resolved.subcategory.clone(),
            part_code: resolved.key.code(),
            description: resolved.description.clone(),
            quantity: resolved.quantity,
            unit_price: resolved.unit_price,
            labour_hours: resolved.labour_hours,
            cost: resolved.material_total(),
            source: ItemSource::System,
            formula_priced: resolved.formula_priced,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
