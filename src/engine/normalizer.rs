// ==========================================
// 开关柜报价核心 - 配置规整器
// ==========================================
// 职责: 从原始配置派生计算字段
//   1. 电流档位 (不小于额定电流的最小档位)
//   2. 柜层数 (配置优先; 可选兼容回退到已有柜层明细)
//   3. 图纸参考 (排除占位值)
// 输入: BoardConfiguration (+ 兼容回退时的已有明细)
// 输出: NormalizedConfig
// ==========================================

use crate::domain::board::BoardConfiguration;
use crate::domain::line_item::LineItem;
use crate::domain::types::{CurrentBand, EnclosureType};
use crate::engine::part_key::PartKey;

/// 图纸参考占位值 (视为未填写)
const DRAWING_REFERENCE_SENTINELS: [&str; 4] = ["Yes", "No", "As Shown", "---"];

// ==========================================
// 柜层数来源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierCountSource {
    Configuration,
    LegacyItems,
    Absent,
}

// ==========================================
// NormalizedConfig - 规整后配置
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConfig {
    pub config: BoardConfiguration,
    pub current_band: CurrentBand,
    pub tier_count: u32,
    pub tier_count_source: TierCountSource,
    pub drawing_reference: Option<String>,
}

// ==========================================
// ConfigNormalizer - 配置规整器
// ==========================================
pub struct ConfigNormalizer {
    // 无状态, 回退开关由调用方逐次传入
}

impl ConfigNormalizer {
    pub fn new() -> Self {
        Self {}
    }

    /// 规整配置
    ///
    /// # 参数
    /// - `config`: 原始配置
    /// - `existing_items`: 板柜现有明细 (仅兼容回退时读取)
    /// - `legacy_tier_fallback`: 是否启用柜层数兼容回退
    pub fn normalize(
        &self,
        config: &BoardConfiguration,
        existing_items: &[LineItem],
        legacy_tier_fallback: bool,
    ) -> NormalizedConfig {
        let (tier_count, tier_count_source) =
            self.resolve_tier_count(config, existing_items, legacy_tier_fallback);

        NormalizedConfig {
            config: config.clone(),
            current_band: self.parse_current_band(&config.current_rating),
            tier_count,
            tier_count_source,
            drawing_reference: self.significant_drawing_reference(config.drawing_reference.as_deref()),
        }
    }

    /// 解析额定电流 → 档位
    ///
    /// 接受 "630" / "630A" / " 630 a "; 无法解析时落到最高档
    pub fn parse_current_band(&self, raw: &str) -> CurrentBand {
        let trimmed = raw.trim();
        let numeric = trimmed
            .strip_suffix('A')
            .or_else(|| trimmed.strip_suffix('a'))
            .unwrap_or(trimmed)
            .trim();

        match numeric.parse::<f64>() {
            Ok(amps) => CurrentBand::for_amps(amps),
            Err(_) => {
                tracing::debug!(raw_rating = %raw, "额定电流无法解析，取最高档位");
                CurrentBand::highest()
            }
        }
    }

    /// 柜层数
    ///
    /// 配置值 > 0 时直接采用; 否则仅在启用兼容回退时读取现有柜层标记明细数量
    pub fn resolve_tier_count(
        &self,
        config: &BoardConfiguration,
        existing_items: &[LineItem],
        legacy_tier_fallback: bool,
    ) -> (u32, TierCountSource) {
        if let Some(count) = config.tier_count.filter(|c| *c > 0) {
            return (count, TierCountSource::Configuration);
        }

        if !legacy_tier_fallback {
            return (0, TierCountSource::Absent);
        }

        // 同外壳类型的柜层标记优先, 其次另一种
        let preferred = PartKey::tier_marker(config.enclosure_type).code();
        let other = match config.enclosure_type {
            EnclosureType::Cubic => PartKey::TierCustom.code(),
            EnclosureType::Custom => PartKey::TierCubic.code(),
        };

        let marker = existing_items
            .iter()
            .find(|item| item.part_code == preferred)
            .or_else(|| existing_items.iter().find(|item| item.part_code == other));

        match marker {
            Some(item) if item.quantity >= 1.0 => {
                let count = item.quantity.floor() as u32;
                tracing::info!(
                    board_id = %item.board_id,
                    part_code = %item.part_code,
                    tier_count = count,
                    "配置缺少柜层数，按现有柜层明细回退"
                );
                (count, TierCountSource::LegacyItems)
            }
            _ => (0, TierCountSource::Absent),
        }
    }

    /// 图纸参考: 非空且不是占位值才有意义
    pub fn significant_drawing_reference(&self, raw: Option<&str>) -> Option<String> {
        let text = raw?.trim();
        if text.is_empty() || DRAWING_REFERENCE_SENTINELS.contains(&text) {
            return None;
        }
        Some(text.to_string())
    }
}

impl Default for ConfigNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
