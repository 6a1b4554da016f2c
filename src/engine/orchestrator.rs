// ==========================================
// 开关柜报价核心 - 板柜协调编排器
// ==========================================
// 用途: 串联规整 → 目标集 → 价目解析 → 差异计划 → 写入
// 红线: 决策阶段严格顺序且无副作用; 差异定稿后才写库
// 并发: revision 比较交换与明细写入同一事务提交, 输掉竞争的一方不写任何明细
// 红线: 存储失败不重试, 原样上抛
// ==========================================

use crate::domain::board::BoardConfiguration;
use crate::domain::line_item::LineItem;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::normalizer::{ConfigNormalizer, TierCountSource};
use crate::engine::reconciler::Reconciler;
use crate::engine::resolver::{CatalogResolver, SkippedKey};
use crate::engine::target_set::TargetSetBuilder;
use crate::repository::stores::{BoardStore, ItemChanges, LineItemStore, ReferencePriceList};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// ReconcileOptions - 协调选项
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// 配置缺少柜层数时按现有柜层明细回退 (默认关闭)
    pub legacy_tier_fallback: bool,
    /// 只计算不写入
    pub dry_run: bool,
}

// ==========================================
// ReconcileSummary - 协调结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileSummary {
    pub board_id: String,
    pub revision: i32,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: Vec<SkippedKey>,
    pub tier_count: u32,
    pub legacy_tier_count_used: bool,
    pub dry_run: bool,
}

impl ReconcileSummary {
    pub fn write_count(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

// ==========================================
// BoardReconcileService - 板柜协调编排器
// ==========================================
pub struct BoardReconcileService {
    boards: Arc<dyn BoardStore>,
    items: Arc<dyn LineItemStore>,
    references: Arc<dyn ReferencePriceList>,
    normalizer: ConfigNormalizer,
    builder: TargetSetBuilder,
    resolver: CatalogResolver,
    reconciler: Reconciler,
}

impl BoardReconcileService {
    pub fn new(
        boards: Arc<dyn BoardStore>,
        items: Arc<dyn LineItemStore>,
        references: Arc<dyn ReferencePriceList>,
    ) -> Self {
        Self {
            boards,
            items,
            references,
            normalizer: ConfigNormalizer::new(),
            builder: TargetSetBuilder::new(),
            resolver: CatalogResolver::new(),
            reconciler: Reconciler::new(),
        }
    }

    /// 按新配置协调板柜系统明细
    ///
    /// # 参数
    /// - `board_id`: 板柜ID
    /// - `configuration`: 新配置 (整体替换)
    /// - `options`: 协调选项
    ///
    /// # 错误
    /// - `EngineError::BoardNotFound`: 板柜不存在
    /// - `RepositoryError::OptimisticLockFailure`: 并发协调已先行写入
    #[instrument(skip(self, configuration))]
    pub async fn reconcile_board(
        &self,
        board_id: &str,
        configuration: &BoardConfiguration,
        options: ReconcileOptions,
    ) -> EngineResult<ReconcileSummary> {
        // ===== 读取阶段 =====
        let board = self
            .boards
            .find_board(board_id)
            .await?
            .ok_or_else(|| EngineError::BoardNotFound(board_id.to_string()))?;

        let existing: Vec<LineItem> = self.items.list_by_board(board_id, None).await?;

        // ===== 决策阶段 (纯函数) =====
        let normalized =
            self.normalizer
                .normalize(configuration, &existing, options.legacy_tier_fallback);
        let target = self.builder.build(&normalized);

        let codes = target.catalog_codes();
        let references = if codes.is_empty() {
            Vec::new()
        } else {
            self.references.find_by_codes(&codes).await?
        };

        let resolution = self.resolver.resolve(&target, &references, &existing);
        let plan = self
            .reconciler
            .plan(board_id, &existing, &resolution, Utc::now().naive_utc());

        debug!(
            target_keys = target.len(),
            resolved = resolution.items.len(),
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            "协调计划已生成"
        );

        let mut summary = ReconcileSummary {
            board_id: board_id.to_string(),
            revision: board.revision,
            created: plan.creates.len(),
            updated: plan.updates.len(),
            deleted: plan.deletes.len(),
            skipped: resolution.skipped.clone(),
            tier_count: normalized.tier_count,
            legacy_tier_count_used: normalized.tier_count_source == TierCountSource::LegacyItems,
            dry_run: options.dry_run,
        };

        if options.dry_run {
            return Ok(summary);
        }

        // ===== 写入阶段 =====
        if plan.is_empty() && board.configuration == *configuration {
            info!(board_id = %board_id, "配置与明细均无变化，跳过写入");
            return Ok(summary);
        }

        summary.revision = self
            .boards
            .commit_reconciliation(
                board_id,
                configuration,
                board.revision,
                ItemChanges {
                    creates: &plan.creates,
                    updates: &plan.updates,
                    deletes: &plan.deletes,
                },
            )
            .await?;

        info!(
            board_id = %board_id,
            revision = summary.revision,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            skipped = ?summary
                .skipped
                .iter()
                .map(|s| s.part_code.as_str())
                .collect::<Vec<_>>(),
            "板柜协调完成"
        );

        Ok(summary)
    }
}
