// ==========================================
// 开关柜报价核心 - 参考价目解析器
// ==========================================
// 职责: 目标部件集 × 参考价目 → 已解析明细
// 红线: 同一身份键命中多条参考价目 = 歧义, 本轮整体跳过, 不猜
// 红线: 缺失/歧义只告警, 不中断其余键的解析
// 说明: 合成计价键 (母排绝缘 / 材质溢价) 不查价目, 在普通键解析后计算
// 说明: 本轮被跳过的键保留现有系统明细, 其成本仍计入合成计价的汇总
// ==========================================

use crate::domain::line_item::{LineItem, ReferenceItem};
use crate::engine::part_key::PartKey;
use crate::engine::target_set::{PriceRule, TargetSet};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 母排类明细的类别名 (不区分大小写)
pub const BUSBAR_CATEGORY: &str = "Busbar";

/// 母排绝缘: 材料占比
const INSULATION_MATERIAL_SHARE: f64 = 0.6;
/// 母排绝缘: 工时占比
const INSULATION_LABOUR_SHARE: f64 = 0.4;

// ==========================================
// ResolvedItem - 已解析明细
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub key: PartKey,
    pub quantity: f64,
    pub unit_price: f64,
    pub labour_hours: f64,
    pub description: String,
    pub category: String,
    pub subcategory: String,
    pub formula_priced: bool,
}

impl ResolvedItem {
    pub fn material_total(&self) -> f64 {
        self.unit_price * self.quantity
    }

    pub fn labour_total(&self) -> f64 {
        self.labour_hours * self.quantity
    }

    fn is_busbar(&self) -> bool {
        self.category.eq_ignore_ascii_case(BUSBAR_CATEGORY)
    }
}

// ==========================================
// 跳过原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// 参考价目中无此键
    Missing,
    /// 参考价目中此键重复
    Ambiguous { count: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Missing => write!(f, "参考价目缺失"),
            SkipReason::Ambiguous { count } => write!(f, "参考价目重复 {} 条", count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedKey {
    pub part_code: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

// ==========================================
// Resolution - 解析结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub items: BTreeMap<PartKey, ResolvedItem>,
    pub skipped: Vec<SkippedKey>,
}

impl Resolution {
    /// 本轮被跳过的键 (协调器对这些键不做任何写入)
    pub fn is_skipped(&self, key: &PartKey) -> bool {
        let code = key.code();
        self.skipped.iter().any(|s| s.part_code == code)
    }
}

// ==========================================
// CatalogResolver - 参考价目解析器
// ==========================================
pub struct CatalogResolver {
    // 无状态引擎
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self {}
    }

    /// 解析目标部件集
    ///
    /// # 参数
    /// - `target`: 目标部件集
    /// - `references`: 按目标键查得的参考价目 (可能含重复键)
    /// - `existing`: 板柜现有明细 (只读; 手工母排与被跳过键的系统明细参与合成计价)
    pub fn resolve(
        &self,
        target: &TargetSet,
        references: &[ReferenceItem],
        existing: &[LineItem],
    ) -> Resolution {
        let mut by_code: HashMap<&str, Vec<&ReferenceItem>> = HashMap::new();
        for reference in references {
            by_code
                .entry(reference.part_code.trim())
                .or_default()
                .push(reference);
        }

        let mut resolution = Resolution::default();

        // ===== 第一遍: 查价目的键 =====
        for entry in target.entries().filter(|e| !e.key.bypasses_catalog()) {
            let code = entry.key.code();
            let matches = by_code.get(code.as_str()).map(Vec::as_slice).unwrap_or(&[]);

            let reference = match matches {
                [single] => *single,
                [] => {
                    tracing::warn!(part_code = %code, "参考价目缺失，本轮跳过该部件");
                    resolution.skipped.push(SkippedKey {
                        part_code: code,
                        reason: SkipReason::Missing,
                    });
                    continue;
                }
                many => {
                    tracing::warn!(
                        part_code = %code,
                        count = many.len(),
                        "参考价目存在重复身份键，本轮跳过该部件"
                    );
                    resolution.skipped.push(SkippedKey {
                        part_code: code,
                        reason: SkipReason::Ambiguous { count: many.len() },
                    });
                    continue;
                }
            };

            let (quantity, unit_price, labour_hours) = match entry.rule {
                PriceRule::QuarterOfCompartments { compartments } => {
                    let scale = compartments as f64 / 4.0;
                    (1.0, reference.unit_price * scale, reference.labour_hours * scale)
                }
                _ => (entry.quantity, reference.unit_price, reference.labour_hours),
            };

            resolution.items.insert(
                entry.key,
                ResolvedItem {
                    key: entry.key,
                    quantity,
                    unit_price,
                    labour_hours,
                    description: reference.description.clone(),
                    category: reference.category.clone(),
                    subcategory: reference.subcategory.clone(),
                    formula_priced: entry.rule.is_formula(),
                },
            );
        }

        // ===== 第二遍: 合成计价键 =====
        let retained = self.retained_items(&resolution, existing);
        let manual_items: Vec<&LineItem> = existing.iter().filter(|item| item.is_manual()).collect();

        for entry in target.entries().filter(|e| e.key.bypasses_catalog()) {
            let synthetic = match entry.rule {
                PriceRule::BusbarInsulation { factor } => self.busbar_insulation(
                    factor,
                    &resolution.items,
                    &retained,
                    &manual_items,
                ),
                PriceRule::MaterialUplift { factor } => {
                    self.material_uplift(factor, &resolution.items, &retained)
                }
                _ => None,
            };

            match synthetic {
                Some(item) => {
                    resolution.items.insert(item.key, item);
                }
                None => tracing::debug!(part_code = %entry.key, "合成计价为零，不生成明细"),
            }
        }

        resolution
    }

    /// 被跳过键的现有系统明细 (同键多条时取第一条)
    fn retained_items<'a>(
        &self,
        resolution: &Resolution,
        existing: &'a [LineItem],
    ) -> BTreeMap<PartKey, &'a LineItem> {
        let mut retained = BTreeMap::new();
        for item in existing.iter().filter(|item| item.is_system()) {
            let Some(key) = PartKey::from_code(&item.part_code) else {
                continue;
            };
            if resolution.is_skipped(&key) {
                retained.entry(key).or_insert(item);
            }
        }
        retained
    }

    /// 母排绝缘: 汇总母排类明细, 材料 × 系数 × 0.6, 工时 × 系数 × 0.4
    ///
    /// 母排类明细 = 本轮解析的母排 + 被跳过但仍保留的系统母排 + 手工母排
    fn busbar_insulation(
        &self,
        factor: f64,
        resolved: &BTreeMap<PartKey, ResolvedItem>,
        retained: &BTreeMap<PartKey, &LineItem>,
        manual_items: &[&LineItem],
    ) -> Option<ResolvedItem> {
        let (mut material, mut labour) = resolved
            .values()
            .filter(|item| item.is_busbar())
            .fold((0.0, 0.0), |(m, l), item| {
                (m + item.material_total(), l + item.labour_total())
            });

        for item in retained
            .values()
            .chain(manual_items.iter())
            .filter(|item| item.category.eq_ignore_ascii_case(BUSBAR_CATEGORY))
        {
            material += item.material_total();
            labour += item.labour_total();
        }

        let unit_price = material * factor * INSULATION_MATERIAL_SHARE;
        let labour_hours = labour * factor * INSULATION_LABOUR_SHARE;
        if unit_price == 0.0 && labour_hours == 0.0 {
            return None;
        }

        Some(ResolvedItem {
            key: PartKey::BusbarInsulation,
            quantity: 1.0,
            unit_price,
            labour_hours,
            description: format!("Busbar insulation ({:.0}%)", factor * 100.0),
            category: "Insulation".to_string(),
            subcategory: "Busbar Insulation".to_string(),
            formula_priced: true,
        })
    }

    /// 材质溢价: 系数 × (定制柜层 + 底座) 材料成本
    fn material_uplift(
        &self,
        factor: f64,
        resolved: &BTreeMap<PartKey, ResolvedItem>,
        retained: &BTreeMap<PartKey, &LineItem>,
    ) -> Option<ResolvedItem> {
        let basis: f64 = [PartKey::TierCustom, PartKey::CustomBase]
            .iter()
            .map(|key| match (resolved.get(key), retained.get(key)) {
                (Some(item), _) => item.material_total(),
                (None, Some(item)) => item.material_total(),
                (None, None) => 0.0,
            })
            .sum();

        let unit_price = basis * factor;
        if unit_price == 0.0 {
            return None;
        }

        Some(ResolvedItem {
            key: PartKey::MaterialUplift,
            quantity: 1.0,
            unit_price,
            labour_hours: 0.0,
            description: format!("Enclosure material uplift ({:.0}%)", factor * 100.0),
            category: "Enclosure".to_string(),
            subcategory: "Material Uplift".to_string(),
            formula_priced: true,
        })
    }
}

impl Default for CatalogResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CurrentBand, ItemSource};
    use chrono::Utc;

    fn reference(code: &str, category: &str, price: f64, hours: f64) -> ReferenceItem {
        ReferenceItem {
            item_id: format!("R-{}-{}", code, price),
            part_code: code.to_string(),
            category: category.to_string(),
            subcategory: "General".to_string(),
            description: format!("{} description", code),
            unit_price: price,
            labour_hours: hours,
            auto_add: false,
            sheet_metal: false,
        }
    }

    fn manual(code: &str, category: &str, price: f64, hours: f64, qty: f64) -> LineItem {
        let now = Utc::now().naive_utc();
        LineItem {
            item_id: format!("M-{}", code),
            board_id: "B1".to_string(),
            category: category.to_string(),
            subcategory: "User".to_string(),
            part_code: code.to_string(),
            description: "manual".to_string(),
            quantity: qty,
            unit_price: price,
            labour_hours: hours,
            cost: price * qty,
            source: ItemSource::Manual,
            formula_priced: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn system(code: &str, category: &str, price: f64, hours: f64, qty: f64) -> LineItem {
        LineItem {
            item_id: format!("S-{}", code),
            source: ItemSource::System,
            subcategory: "General".to_string(),
            ..manual(code, category, price, hours, qty)
        }
    }

    #[test]
    fn test_unique_reference_binds_price_and_quantity() {
        let mut target = TargetSet::new();
        target.add(PartKey::CtPanel, 2.0, PriceRule::Catalog);

        let resolution = CatalogResolver::new().resolve(
            &target,
            &[reference("CT-PANEL", "CT", 150.0, 1.5)],
            &[],
        );

        let item = &resolution.items[&PartKey::CtPanel];
        assert_eq!(item.quantity, 2.0);
        assert_eq!(item.unit_price, 150.0);
        assert_eq!(item.labour_hours, 1.5);
        assert_eq!(item.description, "CT-PANEL description");
        assert!(!item.formula_priced);
        assert!(resolution.skipped.is_empty());
    }

    #[test]
    fn test_duplicate_reference_key_is_skipped() {
        let mut target = TargetSet::new();
        target.add(PartKey::CustomBusbar(CurrentBand::A400), 1.0, PriceRule::Catalog);
        target.add(PartKey::CtPanel, 1.0, PriceRule::Catalog);

        let resolution = CatalogResolver::new().resolve(
            &target,
            &[
                reference("BB-400A", "Busbar", 800.0, 4.0),
                reference("BB-400A", "Busbar", 820.0, 4.0),
                reference("CT-PANEL", "CT", 150.0, 1.5),
            ],
            &[],
        );

        assert_eq!(resolution.items.len(), 1);
        assert!(resolution.items.contains_key(&PartKey::CtPanel));
        assert_eq!(
            resolution.skipped,
            vec![SkippedKey {
                part_code: "BB-400A".to_string(),
                reason: SkipReason::Ambiguous { count: 2 },
            }]
        );
    }

    #[test]
    fn test_missing_reference_key_is_skipped() {
        let mut target = TargetSet::new();
        target.add(PartKey::TierLabels, 3.0, PriceRule::Catalog);

        let resolution = CatalogResolver::new().resolve(&target, &[], &[]);
        assert!(resolution.items.is_empty());
        assert!(resolution.is_skipped(&PartKey::TierLabels));
        assert_eq!(resolution.skipped[0].reason, SkipReason::Missing);
    }

    #[test]
    fn test_over_50ka_is_quarter_of_compartments() {
        let mut target = TargetSet::new();
        target.add(
            PartKey::CubicOver50ka,
            1.0,
            PriceRule::QuarterOfCompartments { compartments: 6 },
        );

        let resolution = CatalogResolver::new().resolve(
            &target,
            &[reference("CUBIC-OVER-50KA", "Cubic", 200.0, 2.0)],
            &[],
        );

        let item = &resolution.items[&PartKey::CubicOver50ka];
        assert_eq!(item.quantity, 1.0);
        assert!((item.unit_price - 300.0).abs() < 1e-9);
        assert!((item.labour_hours - 3.0).abs() < 1e-9);
        assert!(item.formula_priced);
    }

    #[test]
    fn test_busbar_insulation_sums_resolved_and_manual_busbars() {
        let mut target = TargetSet::new();
        target.add(PartKey::CustomBusbar(CurrentBand::A400), 2.0, PriceRule::Catalog);
        target.add(
            PartKey::BusbarInsulation,
            1.0,
            PriceRule::BusbarInsulation { factor: 0.25 },
        );

        let manuals = vec![
            manual("USER-BB", "busbar", 100.0, 1.0, 2.0),
            manual("USER-OTHER", "Sundries", 999.0, 9.0, 1.0),
        ];
        let resolution = CatalogResolver::new().resolve(
            &target,
            &[reference("BB-400A", "Busbar", 500.0, 5.0)],
            &manuals,
        );

        // 材料 = 500*2 + 100*2 = 1200; 工时 = 5*2 + 1*2 = 12
        let item = &resolution.items[&PartKey::BusbarInsulation];
        assert_eq!(item.quantity, 1.0);
        assert!((item.unit_price - 1200.0 * 0.25 * 0.6).abs() < 1e-9);
        assert!((item.labour_hours - 12.0 * 0.25 * 0.4).abs() < 1e-9);
        assert!(item.formula_priced);
    }

    #[test]
    fn test_busbar_insulation_omitted_without_busbars() {
        let mut target = TargetSet::new();
        target.add(
            PartKey::BusbarInsulation,
            1.0,
            PriceRule::BusbarInsulation { factor: 1.0 },
        );

        let resolution = CatalogResolver::new().resolve(&target, &[], &[]);
        assert!(resolution.items.is_empty());
        assert!(resolution.skipped.is_empty());
    }

    #[test]
    fn test_material_uplift_over_tiers_and_base() {
        let mut target = TargetSet::new();
        target.add(PartKey::TierCustom, 2.0, PriceRule::Catalog);
        target.add(PartKey::CustomBase, 2.0, PriceRule::Catalog);
        target.add(PartKey::TierLabels, 2.0, PriceRule::Catalog);
        target.add(
            PartKey::MaterialUplift,
            1.0,
            PriceRule::MaterialUplift { factor: 0.45 },
        );

        let resolution = CatalogResolver::new().resolve(
            &target,
            &[
                reference("TIER-CUSTOM", "Enclosure", 1000.0, 8.0),
                reference("CUSTOM-BASE", "Enclosure", 250.0, 1.0),
                reference("TIER-LABELS", "Sundries", 40.0, 0.2),
            ],
            &[],
        );

        let item = &resolution.items[&PartKey::MaterialUplift];
        assert!((item.unit_price - 0.45 * 2500.0).abs() < 1e-9);
        assert_eq!(item.labour_hours, 0.0);
        assert_eq!(item.subcategory, "Material Uplift");
    }

    #[test]
    fn test_skipped_busbar_still_counts_towards_insulation() {
        let mut target = TargetSet::new();
        target.add(PartKey::CustomBusbar(CurrentBand::A400), 2.0, PriceRule::Catalog);
        target.add(
            PartKey::BusbarInsulation,
            1.0,
            PriceRule::BusbarInsulation { factor: 1.0 },
        );

        // 母排价目重复, 本轮跳过; 现有系统母排 500 × 2 仍在板柜上
        let existing = vec![system("BB-400A", "Busbar", 500.0, 4.0, 2.0)];
        let resolution = CatalogResolver::new().resolve(
            &target,
            &[
                reference("BB-400A", "Busbar", 500.0, 4.0),
                reference("BB-400A", "Busbar", 520.0, 4.0),
            ],
            &existing,
        );

        assert!(resolution.is_skipped(&PartKey::CustomBusbar(CurrentBand::A400)));
        let item = &resolution.items[&PartKey::BusbarInsulation];
        assert!((item.unit_price - 1000.0 * 0.6).abs() < 1e-9);
        assert!((item.labour_hours - 8.0 * 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_skipped_tier_still_counts_towards_uplift() {
        let mut target = TargetSet::new();
        target.add(PartKey::TierCustom, 2.0, PriceRule::Catalog);
        target.add(PartKey::CustomBase, 1.0, PriceRule::Catalog);
        target.add(
            PartKey::MaterialUplift,
            1.0,
            PriceRule::MaterialUplift { factor: 0.10 },
        );

        let existing = vec![
            system("TIER-CUSTOM", "Enclosure", 1000.0, 8.0, 2.0),
            // 未被跳过的键以本轮解析为准, 不重复计入
            system("CUSTOM-BASE", "Enclosure", 999.0, 1.0, 1.0),
        ];
        let resolution = CatalogResolver::new().resolve(
            &target,
            &[reference("CUSTOM-BASE", "Enclosure", 250.0, 1.0)],
            &existing,
        );

        assert_eq!(resolution.skipped[0].part_code, "TIER-CUSTOM");
        let item = &resolution.items[&PartKey::MaterialUplift];
        assert!((item.unit_price - 0.10 * 2250.0).abs() < 1e-9);
    }

    #[test]
    fn test_system_busbar_not_skipped_is_not_double_counted() {
        let mut target = TargetSet::new();
        target.add(PartKey::CustomBusbar(CurrentBand::A400), 2.0, PriceRule::Catalog);
        target.add(
            PartKey::BusbarInsulation,
            1.0,
            PriceRule::BusbarInsulation { factor: 1.0 },
        );

        let existing = vec![system("BB-400A", "Busbar", 400.0, 4.0, 1.0)];
        let resolution = CatalogResolver::new().resolve(
            &target,
            &[reference("BB-400A", "Busbar", 500.0, 4.0)],
            &existing,
        );

        let item = &resolution.items[&PartKey::BusbarInsulation];
        assert!((item.unit_price - 1000.0 * 0.6).abs() < 1e-9);
    }
}
