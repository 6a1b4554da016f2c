// ==========================================
// 开关柜报价核心 - 板柜领域模型
// ==========================================
// 板柜配置每次编辑整体替换; 每次替换触发一次完整协调
// ==========================================

use crate::domain::types::{EnclosureType, InsulationLevel, Location, Material, WiringType};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Quote - 报价单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: String,          // 报价单ID
    pub quote_name: String,        // 报价单名称
    pub created_at: NaiveDateTime, // 创建时间
}

// ==========================================
// Board - 板柜
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub board_id: String,                   // 板柜ID
    pub quote_id: String,                   // 所属报价单
    pub board_name: String,                 // 板柜名称
    pub configuration: BoardConfiguration,  // 当前配置
    pub revision: i32,                      // 乐观锁：修订号
    pub updated_at: NaiveDateTime,          // 更新时间
}

// ==========================================
// CT 计量选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtMetering {
    pub enabled: bool,
    pub ct_type: String, // 配置代码 T/W/B/S
    pub quantity: u32,
}

// ==========================================
// 直接计量选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WholeCurrentMetering {
    pub enabled: bool,
    pub wiring: WiringType,
    pub quantity: u32,
}

// ==========================================
// BoardConfiguration - 板柜配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfiguration {
    pub enclosure_type: EnclosureType,
    pub location: Location,
    pub material: Material,
    pub current_rating: String,          // 原始输入, 例如 "630" / "630A"
    pub fault_rating: Option<String>,    // 例如 "50kA", 仅展示用
    pub tier_count: Option<u32>,         // None/0 时可走兼容回退
    pub ct_metering: CtMetering,
    pub meter_panel: bool,
    pub whole_current_metering: WholeCurrentMetering,
    pub base_required: bool,
    pub insulation: InsulationLevel,
    pub board_width: f64,                // 板宽 (单位模数)
    pub shipping_sections: u32,          // 运输分段数
    pub compartment_count: u32,          // Cubic 隔室数
    pub over_50ka: bool,
    pub non_standard_colour: bool,
    pub drawing_reference: Option<String>,
}

impl Default for BoardConfiguration {
    fn default() -> Self {
        Self {
            enclosure_type: EnclosureType::Custom,
            location: Location::Indoor,
            material: Material::MildSteel,
            current_rating: "400".to_string(),
            fault_rating: None,
            tier_count: None,
            ct_metering: CtMetering {
                enabled: false,
                ct_type: String::new(),
                quantity: 0,
            },
            meter_panel: false,
            whole_current_metering: WholeCurrentMetering {
                enabled: false,
                wiring: WiringType::ThreePhase,
                quantity: 0,
            },
            base_required: false,
            insulation: InsulationLevel::None,
            board_width: 0.0,
            shipping_sections: 0,
            compartment_count: 0,
            over_50ka: false,
            non_standard_colour: false,
            drawing_reference: None,
        }
    }
}
