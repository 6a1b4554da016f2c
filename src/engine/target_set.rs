// ==========================================
// 开关柜报价核心 - 目标部件集构建器
// ==========================================
// 职责: 规整配置 → 期望的系统托管部件多重集
// 红线: 纯函数, 不读库不写库
// 说明: 各规则由配置开关独立控制, 叠加组合 (同键数量相加)
// ==========================================
// 规则清单:
//   1. CT 计量        (基础包 + CT 类型 + 母排 + CT 室)
//   2. 计量面板       (数量 = CT 数量)
//   3. 直接计量       (三相/单相套件互斥)
//   4. 柜层           (标记 + 标签 + 五金 + 运输)
//   5. 现场重连       (板宽 > 4 模数)
//   6. 母排绝缘       (合成计价)
//   7. Cubic 专属     (隔室 / 50kA 附加 / 非标颜色)
//   8. 定制柜专属     (底座 / 门 / 材质溢价)
// ==========================================

use crate::domain::types::{CtType, EnclosureType, Location};
use crate::engine::normalizer::NormalizedConfig;
use crate::engine::part_key::{ChamberSize, PartKey};
use std::collections::BTreeMap;

/// 现场重连: 板宽阈值 (模数)
pub const SITE_RECONNECT_WIDTH_THRESHOLD: f64 = 4.0;

// ==========================================
// PriceRule - 计价规则
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum PriceRule {
    /// 直接采用参考单价/工时
    Catalog,
    /// 参考单价 × 隔室数 ÷ 4, 数量固定 1
    QuarterOfCompartments { compartments: u32 },
    /// 合成: 母排类明细材料 × 系数 × 0.6, 工时 × 系数 × 0.4
    BusbarInsulation { factor: f64 },
    /// 合成: (柜层 + 底座) 材料成本 × 材质系数
    MaterialUplift { factor: f64 },
}

impl PriceRule {
    /// 价格是否由公式给出 (而非直接取参考价)
    pub fn is_formula(&self) -> bool {
        !matches!(self, PriceRule::Catalog)
    }
}

// ==========================================
// TargetEntry - 目标条目
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEntry {
    pub key: PartKey,
    pub quantity: f64,
    pub rule: PriceRule,
}

// ==========================================
// TargetSet - 目标部件集
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetSet {
    entries: BTreeMap<PartKey, TargetEntry>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入条目; 同键已存在时数量累加
    pub fn add(&mut self, key: PartKey, quantity: f64, rule: PriceRule) {
        if quantity <= 0.0 {
            return;
        }
        self.entries
            .entry(key)
            .and_modify(|entry| entry.quantity += quantity)
            .or_insert(TargetEntry {
                key,
                quantity,
                rule,
            });
    }

    pub fn get(&self, key: &PartKey) -> Option<&TargetEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &PartKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TargetEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 需要查参考价目的身份键
    pub fn catalog_codes(&self) -> Vec<String> {
        self.entries
            .keys()
            .filter(|key| !key.bypasses_catalog())
            .map(|key| key.code())
            .collect()
    }

    /// 身份键 → 数量 (便于比对)
    pub fn quantities(&self) -> BTreeMap<String, f64> {
        self.entries
            .values()
            .map(|entry| (entry.key.code(), entry.quantity))
            .collect()
    }
}

// ==========================================
// TargetSetBuilder - 目标部件集构建器
// ==========================================
pub struct TargetSetBuilder {
    // 无状态引擎
}

impl TargetSetBuilder {
    pub fn new() -> Self {
        Self {}
    }

    /// 计量面板数量与 CT 数量绑定
    ///
    /// 若将来计量面板需要独立数量, 只改这里
    pub fn meter_panel_quantity(normalized: &NormalizedConfig) -> u32 {
        normalized.config.ct_metering.quantity
    }

    /// 构建目标部件集
    pub fn build(&self, normalized: &NormalizedConfig) -> TargetSet {
        let mut target = TargetSet::new();

        self.add_ct_metering(normalized, &mut target);
        self.add_meter_panel(normalized, &mut target);
        self.add_whole_current_metering(normalized, &mut target);
        self.add_tiers(normalized, &mut target);
        self.add_site_reconnection(normalized, &mut target);
        self.add_busbar_insulation(normalized, &mut target);
        self.add_cubic_extras(normalized, &mut target);
        self.add_custom_extras(normalized, &mut target);

        tracing::debug!(
            entries = target.len(),
            band = %normalized.current_band,
            tier_count = normalized.tier_count,
            "目标部件集构建完成"
        );
        target
    }

    // ==========================================
    // 规则 1: CT 计量
    // ==========================================
    fn add_ct_metering(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        let ct = &normalized.config.ct_metering;
        if !ct.enabled || ct.quantity == 0 {
            return;
        }
        let qty = ct.quantity as f64;

        for key in [
            PartKey::CtCompartment,
            PartKey::CtPanel,
            PartKey::CtTestBlock,
            PartKey::CtWiring,
        ] {
            target.add(key, qty, PriceRule::Catalog);
        }

        match CtType::from_code(&ct.ct_type) {
            Some(ct_type) => target.add(PartKey::CtUnit(ct_type), qty, PriceRule::Catalog),
            None => tracing::warn!(ct_type = %ct.ct_type, "未知 CT 类型，不生成 CT 部件"),
        }

        target.add(
            PartKey::busbar(normalized.current_band, normalized.config.enclosure_type),
            qty,
            PriceRule::Catalog,
        );
        target.add(
            PartKey::CtChamber(ChamberSize::for_band(normalized.current_band)),
            qty,
            PriceRule::Catalog,
        );
    }

    // ==========================================
    // 规则 2: 计量面板
    // ==========================================
    fn add_meter_panel(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        if !normalized.config.meter_panel {
            return;
        }
        let qty = Self::meter_panel_quantity(normalized) as f64;

        for key in [
            PartKey::MeterPanel,
            PartKey::MeterPanelDoor,
            PartKey::MeterPanelWiring,
        ] {
            target.add(key, qty, PriceRule::Catalog);
        }
    }

    // ==========================================
    // 规则 3: 直接计量 (三相/单相套件互斥)
    // ==========================================
    fn add_whole_current_metering(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        let wc = &normalized.config.whole_current_metering;
        if !wc.enabled || wc.quantity == 0 {
            return;
        }
        let meters = wc.quantity as f64;

        target.add(
            PartKey::WcFuse,
            (wc.wiring.fuses_per_meter() * wc.quantity) as f64,
            PriceRule::Catalog,
        );
        target.add(PartKey::WcPanel, meters, PriceRule::Catalog);
        target.add(PartKey::WcNeutralLink, meters, PriceRule::Catalog);
        target.add(PartKey::WcBreaker(wc.wiring), meters, PriceRule::Catalog);
    }

    // ==========================================
    // 规则 4: 柜层
    // ==========================================
    fn add_tiers(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        let tiers = normalized.tier_count;
        if tiers == 0 {
            return;
        }
        let qty = tiers as f64;

        target.add(
            PartKey::tier_marker(normalized.config.enclosure_type),
            qty,
            PriceRule::Catalog,
        );
        target.add(PartKey::TierLabels, qty, PriceRule::Catalog);
        target.add(PartKey::TierHardware, qty, PriceRule::Catalog);

        // 运输: 单层轻型, 多层重型, 二者互斥
        let delivery = if tiers == 1 {
            PartKey::DeliveryLight
        } else {
            PartKey::DeliveryHeavy
        };
        target.add(delivery, 1.0, PriceRule::Catalog);
    }

    // ==========================================
    // 规则 5: 现场重连
    // ==========================================
    fn add_site_reconnection(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        let config = &normalized.config;
        if config.board_width <= SITE_RECONNECT_WIDTH_THRESHOLD {
            return;
        }

        let qty = (config.shipping_sections + 1) / 2;
        target.add(PartKey::SiteReconnect, qty as f64, PriceRule::Catalog);
    }

    // ==========================================
    // 规则 6: 母排绝缘 (价格在解析后计算)
    // ==========================================
    fn add_busbar_insulation(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        if let Some(factor) = normalized.config.insulation.factor() {
            target.add(
                PartKey::BusbarInsulation,
                1.0,
                PriceRule::BusbarInsulation { factor },
            );
        }
    }

    // ==========================================
    // 规则 7: Cubic 专属
    // ==========================================
    fn add_cubic_extras(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        let config = &normalized.config;
        if config.enclosure_type != EnclosureType::Cubic || config.compartment_count == 0 {
            return;
        }
        let compartments = config.compartment_count;

        target.add(
            PartKey::CubicCompartment,
            compartments as f64,
            PriceRule::Catalog,
        );

        if config.over_50ka {
            target.add(
                PartKey::CubicOver50ka,
                1.0,
                PriceRule::QuarterOfCompartments { compartments },
            );
        }

        if config.non_standard_colour {
            target.add(
                PartKey::CubicNonStdColour,
                compartments as f64,
                PriceRule::Catalog,
            );
        }
    }

    // ==========================================
    // 规则 8: 定制柜专属
    // ==========================================
    fn add_custom_extras(&self, normalized: &NormalizedConfig, target: &mut TargetSet) {
        let config = &normalized.config;
        if config.enclosure_type != EnclosureType::Custom {
            return;
        }
        let tiers = normalized.tier_count as f64;

        if config.base_required {
            target.add(PartKey::CustomBase, tiers, PriceRule::Catalog);
        }

        if config.location == Location::Outdoor {
            target.add(PartKey::CustomDoors, tiers, PriceRule::Catalog);
        }

        let factor = config.material.uplift_factor();
        if factor > 0.0 {
            target.add(
                PartKey::MaterialUplift,
                1.0,
                PriceRule::MaterialUplift { factor },
            );
        }
    }
}

impl Default for TargetSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
