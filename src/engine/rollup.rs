// ==========================================
// 开关柜报价核心 - 成本汇总引擎
// ==========================================
// 职责: 明细 × 有效设置 → 成本分解与售价
// 红线: 纯函数, 相同输入必得相同输出 (含取整售价)
// 红线: 系统明细与手工明细一视同仁
// ==========================================
// 计算链:
//   材料 / 工时 → 人工 → 耗材 → 成本基数
//   → 管理费 + 工程费 → 总成本 → 售价 → 取整售价 → 利润
// 利润口径: 取整售价 − 总成本 (未取整口径仅作展示)
// ==========================================

use crate::domain::line_item::LineItem;
use crate::domain::settings::EffectiveSettings;
use serde::{Deserialize, Serialize};

// ==========================================
// CostBreakdown - 单板柜成本分解
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material_cost: f64,
    pub labour_hours: f64,
    pub labour_cost: f64,
    pub consumables_cost: f64,
    pub cost_base: f64,
    pub overhead_amount: f64,
    pub engineering_cost: f64,
    pub total_cost: f64,
    pub sell_price: f64,
    pub sell_price_rounded: f64,
    pub profit: f64,
    pub profit_unrounded: f64,
}

// ==========================================
// QuoteTotals - 报价单合计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: f64,    // Σ 取整售价
    pub gst: f64,         // 税额
    pub final_price: f64, // 含税总价
}

// ==========================================
// CostRollupEngine - 成本汇总引擎
// ==========================================
pub struct CostRollupEngine {
    // 无状态引擎, 可被多个调用方并发共享
}

impl CostRollupEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 单板柜成本汇总
    pub fn rollup(&self, items: &[LineItem], settings: &EffectiveSettings) -> CostBreakdown {
        let material_cost: f64 = items.iter().map(LineItem::material_total).sum();
        let labour_hours: f64 = items.iter().map(LineItem::labour_total).sum();

        let labour_cost = labour_hours * settings.labour_rate;
        let consumables_cost = material_cost * settings.consumables_fraction;
        let cost_base = material_cost + labour_cost + consumables_cost;

        let overhead_amount = cost_base * settings.overhead_fraction;
        let engineering_cost = cost_base * settings.engineering_fraction;
        let total_cost = cost_base + overhead_amount + engineering_cost;

        let sell_price = self.sell_price(total_cost, settings.target_margin_fraction);
        let sell_price_rounded = round_to_increment(sell_price, settings.rounding_increment);

        CostBreakdown {
            material_cost,
            labour_hours,
            labour_cost,
            consumables_cost,
            cost_base,
            overhead_amount,
            engineering_cost,
            total_cost,
            sell_price,
            sell_price_rounded,
            profit: sell_price_rounded - total_cost,
            profit_unrounded: sell_price - total_cost,
        }
    }

    /// 多板柜合计: 税额按取整售价之和计算
    pub fn aggregate(&self, boards: &[CostBreakdown], settings: &EffectiveSettings) -> QuoteTotals {
        let subtotal: f64 = boards.iter().map(|b| b.sell_price_rounded).sum();
        let gst = subtotal * settings.tax_fraction;

        QuoteTotals {
            subtotal,
            gst,
            final_price: subtotal + gst,
        }
    }

    /// 售价 = 总成本 ÷ (1 − 毛利率); 分母 ≤ 0 时退回总成本
    fn sell_price(&self, total_cost: f64, margin: f64) -> f64 {
        let divisor = 1.0 - margin;
        if divisor <= 0.0 {
            tracing::warn!(target_margin = margin, "目标毛利率不小于 100%，售价按总成本计");
            return total_cost;
        }
        total_cost / divisor
    }
}

impl Default for CostRollupEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 按增量取整 (四舍五入, 远离零); 增量 ≤ 0 不取整
pub fn round_to_increment(value: f64, increment: f64) -> f64 {
    if increment <= 0.0 || !increment.is_finite() {
        return value;
    }
    (value / increment).round() * increment
}
