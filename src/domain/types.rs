// ==========================================
// 开关柜报价核心 - 领域类型定义
// ==========================================
// 依据: 板柜配置字段 (外壳/位置/材质/绝缘/计量)
// 红线: 枚举穷举分派,新增档位时由编译器强制补全映射
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 外壳类型 (Enclosure Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnclosureType {
    Custom, // 定制柜
    Cubic,  // Cubic 模块柜
}

impl fmt::Display for EnclosureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnclosureType::Custom => write!(f, "CUSTOM"),
            EnclosureType::Cubic => write!(f, "CUBIC"),
        }
    }
}

// ==========================================
// 安装位置 (Location)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    Indoor,
    Outdoor,
}

// ==========================================
// 柜体材质 (Material)
// ==========================================
// 材质溢价系数只作用于定制柜的柜层 + 底座成本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Material {
    MildSteel,
    Galvanised,
    Aluminium,
    Stainless304,
    Stainless316,
}

impl Material {
    /// 材质溢价系数 (相对低碳钢)
    pub fn uplift_factor(&self) -> f64 {
        match self {
            Material::MildSteel => 0.0,
            Material::Galvanised => 0.10,
            Material::Aluminium => 0.25,
            Material::Stainless304 => 0.45,
            Material::Stainless316 => 0.60,
        }
    }
}

// ==========================================
// 母排绝缘等级 (Insulation Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsulationLevel {
    None,
    Air,
    Fully,
}

impl InsulationLevel {
    /// 绝缘系数; None 表示不生成绝缘明细
    pub fn factor(&self) -> Option<f64> {
        match self {
            InsulationLevel::None => None,
            InsulationLevel::Air => Some(0.25),
            InsulationLevel::Fully => Some(1.0),
        }
    }
}

// ==========================================
// 电流档位 (Current Band)
// ==========================================
// 取 "不小于额定电流的最小档位"; 非法输入落到最高档
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CurrentBand {
    A400,
    A630,
    A800,
    A1000,
    A1250,
    A1600,
    A2000,
    A2500,
    A3200,
    A4000,
}

impl CurrentBand {
    /// 全部档位 (升序)
    pub const ALL: [CurrentBand; 10] = [
        CurrentBand::A400,
        CurrentBand::A630,
        CurrentBand::A800,
        CurrentBand::A1000,
        CurrentBand::A1250,
        CurrentBand::A1600,
        CurrentBand::A2000,
        CurrentBand::A2500,
        CurrentBand::A3200,
        CurrentBand::A4000,
    ];

    /// 档位上限 (安培)
    pub fn amps(&self) -> u32 {
        match self {
            CurrentBand::A400 => 400,
            CurrentBand::A630 => 630,
            CurrentBand::A800 => 800,
            CurrentBand::A1000 => 1000,
            CurrentBand::A1250 => 1250,
            CurrentBand::A1600 => 1600,
            CurrentBand::A2000 => 2000,
            CurrentBand::A2500 => 2500,
            CurrentBand::A3200 => 3200,
            CurrentBand::A4000 => 4000,
        }
    }

    /// 最高档位
    pub fn highest() -> Self {
        CurrentBand::A4000
    }

    /// 按安培值取档: 不小于 rating 的最小档位
    pub fn for_amps(rating: f64) -> Self {
        if !rating.is_finite() || rating <= 0.0 {
            return Self::highest();
        }
        Self::ALL
            .iter()
            .copied()
            .find(|band| rating <= band.amps() as f64)
            .unwrap_or_else(Self::highest)
    }
}

impl fmt::Display for CurrentBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}A", self.amps())
    }
}

// ==========================================
// CT 类型 (Current Transformer Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CtType {
    Tunnel, // "T"
    Window, // "W"
    Bar,    // "B"
    Split,  // "S"
}

impl CtType {
    /// 从配置代码解析 (不区分大小写)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "T" => Some(CtType::Tunnel),
            "W" => Some(CtType::Window),
            "B" => Some(CtType::Bar),
            "S" => Some(CtType::Split),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CtType::Tunnel => "T",
            CtType::Window => "W",
            CtType::Bar => "B",
            CtType::Split => "S",
        }
    }
}

// ==========================================
// 直接计量接线方式 (Whole-current Wiring)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WiringType {
    ThreePhase,
    SinglePhase,
}

impl WiringType {
    /// 每块表的熔断器数量
    pub fn fuses_per_meter(&self) -> u32 {
        match self {
            WiringType::ThreePhase => 3,
            WiringType::SinglePhase => 1,
        }
    }
}

// ==========================================
// 明细来源 (Item Source)
// ==========================================
// SYSTEM: 仅由协调器写入; MANUAL: 仅由用户直接维护
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemSource {
    System,
    Manual,
}

impl ItemSource {
    /// 转换为数据库字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ItemSource::System => "SYSTEM",
            ItemSource::Manual => "MANUAL",
        }
    }

    /// 从数据库字符串解析 (未知值按 MANUAL 处理, 协调器永不触碰)
    pub fn from_db_str(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "SYSTEM" => ItemSource::System,
            _ => ItemSource::Manual,
        }
    }
}

impl fmt::Display for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
