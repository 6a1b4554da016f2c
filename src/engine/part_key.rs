// ==========================================
// 开关柜报价核心 - 系统托管部件身份键
// ==========================================
// 职责: 定义协调器可托管的固定部件词表
// 红线: 协调器只遍历本词表; 词表外的明细一律不触碰
// 说明: 档位/外壳/CT 类型 → 部件 的映射全部用 match 穷举,
//       新增档位或外壳类型时编译器强制补全
// ==========================================

use crate::domain::types::{CtType, CurrentBand, EnclosureType, WiringType};
use std::fmt;

// ==========================================
// CT 室规格 (按电流档位分组)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChamberSize {
    Upto800,
    Upto1600,
    Upto2500,
    Upto4000,
}

impl ChamberSize {
    pub const ALL: [ChamberSize; 4] = [
        ChamberSize::Upto800,
        ChamberSize::Upto1600,
        ChamberSize::Upto2500,
        ChamberSize::Upto4000,
    ];

    /// 电流档位 → CT 室规格
    pub fn for_band(band: CurrentBand) -> Self {
        match band {
            CurrentBand::A400 | CurrentBand::A630 | CurrentBand::A800 => ChamberSize::Upto800,
            CurrentBand::A1000 | CurrentBand::A1250 | CurrentBand::A1600 => ChamberSize::Upto1600,
            CurrentBand::A2000 | CurrentBand::A2500 => ChamberSize::Upto2500,
            CurrentBand::A3200 | CurrentBand::A4000 => ChamberSize::Upto4000,
        }
    }

    fn amps(&self) -> u32 {
        match self {
            ChamberSize::Upto800 => 800,
            ChamberSize::Upto1600 => 1600,
            ChamberSize::Upto2500 => 2500,
            ChamberSize::Upto4000 => 4000,
        }
    }
}

// ==========================================
// PartKey - 部件身份键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartKey {
    // ===== CT 计量 =====
    CtCompartment,
    CtPanel,
    CtTestBlock,
    CtWiring,
    CtUnit(CtType),
    CustomBusbar(CurrentBand),
    CubicBusbar(CurrentBand),
    CtChamber(ChamberSize),

    // ===== 计量面板 =====
    MeterPanel,
    MeterPanelDoor,
    MeterPanelWiring,

    // ===== 直接计量 =====
    WcFuse,
    WcPanel,
    WcNeutralLink,
    WcBreaker(WiringType),

    // ===== 柜层 =====
    TierCubic,
    TierCustom,
    TierLabels,
    TierHardware,
    DeliveryLight,
    DeliveryHeavy,

    // ===== 现场 =====
    SiteReconnect,

    // ===== 合成计价 =====
    BusbarInsulation,
    MaterialUplift,

    // ===== Cubic 专属 =====
    CubicCompartment,
    CubicOver50ka,
    CubicNonStdColour,

    // ===== 定制柜专属 =====
    CustomBase,
    CustomDoors,
}

impl PartKey {
    /// 母排: 电流档位 × 外壳类型
    pub fn busbar(band: CurrentBand, enclosure: EnclosureType) -> Self {
        match enclosure {
            EnclosureType::Custom => PartKey::CustomBusbar(band),
            EnclosureType::Cubic => PartKey::CubicBusbar(band),
        }
    }

    /// 柜层标记: Cubic 一个键, 其余外壳另一个键
    pub fn tier_marker(enclosure: EnclosureType) -> Self {
        match enclosure {
            EnclosureType::Cubic => PartKey::TierCubic,
            EnclosureType::Custom => PartKey::TierCustom,
        }
    }

    /// 是否跳过参考价目查询 (价格/工时完全由公式给出)
    pub fn bypasses_catalog(&self) -> bool {
        matches!(self, PartKey::BusbarInsulation | PartKey::MaterialUplift)
    }

    /// 参考价目中的身份键
    pub fn code(&self) -> String {
        match self {
            PartKey::CtCompartment => "CT-COMPARTMENT".to_string(),
            PartKey::CtPanel => "CT-PANEL".to_string(),
            PartKey::CtTestBlock => "CT-TEST-BLOCK".to_string(),
            PartKey::CtWiring => "CT-WIRING".to_string(),
            PartKey::CtUnit(ct_type) => format!("CT-TYPE-{}", ct_type.code()),
            PartKey::CustomBusbar(band) => format!("BB-{}", band),
            PartKey::CubicBusbar(band) => format!("CBB-{}", band),
            PartKey::CtChamber(size) => format!("CT-CHAMBER-{}", size.amps()),
            PartKey::MeterPanel => "MP-PANEL".to_string(),
            PartKey::MeterPanelDoor => "MP-DOOR".to_string(),
            PartKey::MeterPanelWiring => "MP-WIRING".to_string(),
            PartKey::WcFuse => "WC-FUSE".to_string(),
            PartKey::WcPanel => "WC-PANEL".to_string(),
            PartKey::WcNeutralLink => "WC-NEUTRAL-LINK".to_string(),
            PartKey::WcBreaker(WiringType::ThreePhase) => "WC-CB-3P".to_string(),
            PartKey::WcBreaker(WiringType::SinglePhase) => "WC-CB-1P".to_string(),
            PartKey::TierCubic => "TIER-CUBIC".to_string(),
            PartKey::TierCustom => "TIER-CUSTOM".to_string(),
            PartKey::TierLabels => "TIER-LABELS".to_string(),
            PartKey::TierHardware => "TIER-HARDWARE".to_string(),
            PartKey::DeliveryLight => "DELIVERY-LIGHT".to_string(),
            PartKey::DeliveryHeavy => "DELIVERY-HEAVY".to_string(),
            PartKey::SiteReconnect => "SITE-RECONNECT".to_string(),
            PartKey::BusbarInsulation => "BB-INSULATION".to_string(),
            PartKey::MaterialUplift => "MATERIAL-UPLIFT".to_string(),
            PartKey::CubicCompartment => "CUBIC-COMPARTMENT".to_string(),
            PartKey::CubicOver50ka => "CUBIC-OVER-50KA".to_string(),
            PartKey::CubicNonStdColour => "CUBIC-NONSTD-COLOUR".to_string(),
            PartKey::CustomBase => "CUSTOM-BASE".to_string(),
            PartKey::CustomDoors => "CUSTOM-DOORS".to_string(),
        }
    }

    /// 完整词表
    pub fn vocabulary() -> Vec<PartKey> {
        let mut keys = vec![
            PartKey::CtCompartment,
            PartKey::CtPanel,
            PartKey::CtTestBlock,
            PartKey::CtWiring,
        ];
        keys.extend(
            [CtType::Tunnel, CtType::Window, CtType::Bar, CtType::Split]
                .into_iter()
                .map(PartKey::CtUnit),
        );
        keys.extend(CurrentBand::ALL.into_iter().map(PartKey::CustomBusbar));
        keys.extend(CurrentBand::ALL.into_iter().map(PartKey::CubicBusbar));
        keys.extend(ChamberSize::ALL.into_iter().map(PartKey::CtChamber));
        keys.extend([
            PartKey::MeterPanel,
            PartKey::MeterPanelDoor,
            PartKey::MeterPanelWiring,
            PartKey::WcFuse,
            PartKey::WcPanel,
            PartKey::WcNeutralLink,
            PartKey::WcBreaker(WiringType::ThreePhase),
            PartKey::WcBreaker(WiringType::SinglePhase),
            PartKey::TierCubic,
            PartKey::TierCustom,
            PartKey::TierLabels,
            PartKey::TierHardware,
            PartKey::DeliveryLight,
            PartKey::DeliveryHeavy,
            PartKey::SiteReconnect,
            PartKey::BusbarInsulation,
            PartKey::MaterialUplift,
            PartKey::CubicCompartment,
            PartKey::CubicOver50ka,
            PartKey::CubicNonStdColour,
            PartKey::CustomBase,
            PartKey::CustomDoors,
        ]);
        keys
    }

    /// 从身份键反查 (词表外返回 None)
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::vocabulary().into_iter().find(|key| key.code() == code)
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_vocabulary_codes_are_unique_and_reversible() {
        let vocab = PartKey::vocabulary();
        let codes: HashSet<String> = vocab.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), vocab.len());

        for key in vocab {
            assert_eq!(PartKey::from_code(&key.code()), Some(key));
        }
    }

    #[test]
    fn test_busbar_families_by_enclosure() {
        assert_eq!(
            PartKey::busbar(CurrentBand::A400, EnclosureType::Custom).code(),
            "BB-400A"
        );
        assert_eq!(
            PartKey::busbar(CurrentBand::A2500, EnclosureType::Cubic).code(),
            "CBB-2500A"
        );
    }

    #[test]
    fn test_chamber_grouping() {
        assert_eq!(ChamberSize::for_band(CurrentBand::A630), ChamberSize::Upto800);
        assert_eq!(ChamberSize::for_band(CurrentBand::A1250), ChamberSize::Upto1600);
        assert_eq!(PartKey::CtChamber(ChamberSize::Upto2500).code(), "CT-CHAMBER-2500");
    }

    #[test]
    fn test_unknown_code_outside_vocabulary() {
        assert_eq!(PartKey::from_code("USER-WIDGET"), None);
        assert_eq!(PartKey::from_code(" TIER-CUBIC "), Some(PartKey::TierCubic));
    }
}
