// ==========================================
// 开关柜报价核心 - 明细与参考价目
// ==========================================
// 红线: 每块板柜每个 part_code 最多一条 SYSTEM 明细
// 红线: MANUAL 明细只由用户维护, 协调器不读不写
// ==========================================

use crate::domain::types::ItemSource;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// LineItem - 板柜明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: String,
    pub board_id: String,
    pub category: String,
    pub subcategory: String,
    pub part_code: String,         // 身份键
    pub description: String,
    pub quantity: f64,             // >= 0
    pub unit_price: f64,
    pub labour_hours: f64,         // 单件工时
    pub cost: f64,                 // unit_price * quantity
    pub source: ItemSource,
    pub formula_priced: bool,      // 公式计价 (不取参考价)
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl LineItem {
    pub fn is_system(&self) -> bool {
        self.source == ItemSource::System
    }

    pub fn is_manual(&self) -> bool {
        self.source == ItemSource::Manual
    }

    /// 重新计算材料成本
    pub fn recompute_cost(&mut self) {
        self.cost = self.unit_price * self.quantity;
    }

    /// 材料合计 (单价 × 数量)
    pub fn material_total(&self) -> f64 {
        self.unit_price * self.quantity
    }

    /// 工时合计 (单件工时 × 数量)
    pub fn labour_total(&self) -> f64 {
        self.labour_hours * self.quantity
    }
}

// ==========================================
// ReferenceItem - 参考价目 (外部只读)
// ==========================================
// part_code 在价目表中不保证唯一, 重复即视为歧义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub item_id: String,
    pub part_code: String,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub unit_price: f64,
    pub labour_hours: f64,
    pub auto_add: bool,
    pub sheet_metal: bool,
}
