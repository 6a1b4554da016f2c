// ==========================================
// 开关柜报价核心 - 引擎层
// ==========================================
// 职责: 实现报价业务规则, 不拼 SQL
// 纯决策: normalizer → target_set → resolver → reconciler / rollup / catalog_refresh
// 编排:   orchestrator / catalog_refresh / quote_pricing (经存储 Trait 读写)
// ==========================================

pub mod catalog_refresh;
pub mod error;
pub mod normalizer;
pub mod orchestrator;
pub mod part_key;
pub mod quote_pricing;
pub mod reconciler;
pub mod resolver;
pub mod rollup;
pub mod target_set;

// 重导出核心引擎
pub use catalog_refresh::{
    CatalogRefreshReconciler, CatalogRefreshService, RefreshPlan, RefreshSummary,
};
pub use error::{EngineError, EngineResult};
pub use normalizer::{ConfigNormalizer, NormalizedConfig, TierCountSource};
pub use orchestrator::{BoardReconcileService, ReconcileOptions, ReconcileSummary};
pub use part_key::{ChamberSize, PartKey};
pub use quote_pricing::{BoardPricing, QuotePricing, QuotePricingService};
pub use reconciler::{ReconcilePlan, Reconciler};
pub use resolver::{CatalogResolver, Resolution, ResolvedItem, SkipReason, SkippedKey};
pub use rollup::{round_to_increment, CostBreakdown, CostRollupEngine, QuoteTotals};
pub use target_set::{PriceRule, TargetEntry, TargetSet, TargetSetBuilder};
