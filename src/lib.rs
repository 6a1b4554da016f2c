// ==========================================
// 开关柜报价核心 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 功能: 板柜配置 → 系统托管明细协调; 明细 → 成本汇总与售价
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 成本设置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CtType, CurrentBand, EnclosureType, InsulationLevel, ItemSource, Location, Material,
    WiringType,
};

// 领域实体
pub use domain::{
    Board, BoardConfiguration, EffectiveSettings, GlobalSettings, LineItem, Quote,
    QuoteOverrides, ReferenceItem,
};

// 引擎
pub use engine::{
    BoardReconcileService, CatalogRefreshService, ConfigNormalizer, CostRollupEngine,
    QuotePricingService, ReconcileOptions, ReconcileSummary, TargetSetBuilder,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "开关柜报价核心";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
