// ==========================================
// 开关柜报价核心 - 成本设置
// ==========================================
// 全局设置 + 报价单级可空覆写 → 有效设置
// 覆写非空即生效 (包括显式 0)
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// GlobalSettings - 全局设置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub labour_rate: f64,
    pub consumables_fraction: f64,
    pub overhead_fraction: f64,
    pub engineering_fraction: f64,
    pub target_margin_fraction: f64,
    pub tax_fraction: f64,
    pub rounding_increment: f64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            labour_rate: 100.0,
            consumables_fraction: 0.03,
            overhead_fraction: 0.20,
            engineering_fraction: 0.20,
            target_margin_fraction: 0.18,
            tax_fraction: 0.10,
            rounding_increment: 100.0,
        }
    }
}

// ==========================================
// QuoteOverrides - 报价单级覆写 (全部可空)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteOverrides {
    pub labour_rate: Option<f64>,
    pub consumables_fraction: Option<f64>,
    pub overhead_fraction: Option<f64>,
    pub engineering_fraction: Option<f64>,
    pub target_margin_fraction: Option<f64>,
    pub tax_fraction: Option<f64>,
    pub rounding_increment: Option<f64>,
}

// ==========================================
// EffectiveSettings - 有效设置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveSettings {
    pub labour_rate: f64,
    pub consumables_fraction: f64,
    pub overhead_fraction: f64,
    pub engineering_fraction: f64,
    pub target_margin_fraction: f64,
    pub tax_fraction: f64,
    pub rounding_increment: f64,
}

impl EffectiveSettings {
    /// 逐字段合并: 覆写为 None 时回落全局值
    pub fn merge(global: &GlobalSettings, overrides: Option<&QuoteOverrides>) -> Self {
        let empty = QuoteOverrides::default();
        let o = overrides.unwrap_or(&empty);

        Self {
            labour_rate: o.labour_rate.unwrap_or(global.labour_rate),
            consumables_fraction: o.consumables_fraction.unwrap_or(global.consumables_fraction),
            overhead_fraction: o.overhead_fraction.unwrap_or(global.overhead_fraction),
            engineering_fraction: o.engineering_fraction.unwrap_or(global.engineering_fraction),
            target_margin_fraction: o
                .target_margin_fraction
                .unwrap_or(global.target_margin_fraction),
            tax_fraction: o.tax_fraction.unwrap_or(global.tax_fraction),
            rounding_increment: o.rounding_increment.unwrap_or(global.rounding_increment),
        }
    }
}

impl From<&GlobalSettings> for EffectiveSettings {
    fn from(global: &GlobalSettings) -> Self {
        Self::merge(global, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_without_overrides_uses_global() {
        let global = GlobalSettings::default();
        let eff = EffectiveSettings::merge(&global, None);
        assert_eq!(eff.labour_rate, 100.0);
        assert_eq!(eff.target_margin_fraction, 0.18);
    }

    #[test]
    fn test_explicit_zero_override_wins() {
        let global = GlobalSettings::default();
        let overrides = QuoteOverrides {
            overhead_fraction: Some(0.0),
            labour_rate: Some(120.0),
            ..Default::default()
        };

        let eff = EffectiveSettings::merge(&global, Some(&overrides));
        assert_eq!(eff.overhead_fraction, 0.0);
        assert_eq!(eff.labour_rate, 120.0);
        // 未覆写字段保持全局值
        assert_eq!(eff.engineering_fraction, 0.20);
        assert_eq!(eff.rounding_increment, 100.0);
    }
}
