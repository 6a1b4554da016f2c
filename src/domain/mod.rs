// ==========================================
// 开关柜报价核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod board;
pub mod line_item;
pub mod settings;
pub mod types;

// 重导出核心类型
pub use board::{Board, BoardConfiguration, CtMetering, Quote, WholeCurrentMetering};
pub use line_item::{LineItem, ReferenceItem};
pub use settings::{EffectiveSettings, GlobalSettings, QuoteOverrides};
pub use types::{
    CtType, CurrentBand, EnclosureType, InsulationLevel, ItemSource, Location, Material,
    WiringType,
};
