// ==========================================
// 开关柜报价核心 - 报价单计价服务
// ==========================================
// 用途: 报价单下每块板柜做成本汇总, 再合计含税总价
// 输入: 板柜明细 (系统 + 手工) + 报价单有效设置
// 输出: QuotePricing (列表展示 / 文档导出共用)
// ==========================================

use crate::config::SettingsReader;
use crate::domain::settings::EffectiveSettings;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::rollup::{CostBreakdown, CostRollupEngine, QuoteTotals};
use crate::repository::stores::{BoardStore, LineItemStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardPricing {
    pub board_id: String,
    pub board_name: String,
    pub item_count: usize,
    pub breakdown: CostBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotePricing {
    pub quote_id: String,
    pub settings: EffectiveSettings,
    pub boards: Vec<BoardPricing>,
    pub totals: QuoteTotals,
}

// ==========================================
// QuotePricingService - 报价单计价服务
// ==========================================
pub struct QuotePricingService {
    boards: Arc<dyn BoardStore>,
    items: Arc<dyn LineItemStore>,
    settings: Arc<dyn SettingsReader>,
    engine: CostRollupEngine,
}

impl QuotePricingService {
    pub fn new(
        boards: Arc<dyn BoardStore>,
        items: Arc<dyn LineItemStore>,
        settings: Arc<dyn SettingsReader>,
    ) -> Self {
        Self {
            boards,
            items,
            settings,
            engine: CostRollupEngine::new(),
        }
    }

    /// 单板柜计价 (使用所属报价单的有效设置)
    pub async fn price_board(&self, board_id: &str) -> EngineResult<BoardPricing> {
        let board = self
            .boards
            .find_board(board_id)
            .await?
            .ok_or_else(|| EngineError::BoardNotFound(board_id.to_string()))?;

        let settings = self.settings.get_effective_settings(&board.quote_id).await?;
        let items = self.items.list_by_board(board_id, None).await?;

        Ok(BoardPricing {
            board_id: board.board_id,
            board_name: board.board_name,
            item_count: items.len(),
            breakdown: self.engine.rollup(&items, &settings),
        })
    }

    /// 报价单计价
    pub async fn price_quote(&self, quote_id: &str) -> EngineResult<QuotePricing> {
        self.boards
            .find_quote(quote_id)
            .await?
            .ok_or_else(|| EngineError::QuoteNotFound(quote_id.to_string()))?;

        let settings = self.settings.get_effective_settings(quote_id).await?;
        let boards = self.boards.list_boards_by_quote(quote_id).await?;

        let mut priced = Vec::with_capacity(boards.len());
        for board in boards {
            let items = self.items.list_by_board(&board.board_id, None).await?;
            priced.push(BoardPricing {
                item_count: items.len(),
                breakdown: self.engine.rollup(&items, &settings),
                board_id: board.board_id,
                board_name: board.board_name,
            });
        }

        let breakdowns: Vec<CostBreakdown> = priced.iter().map(|b| b.breakdown.clone()).collect();
        let totals = self.engine.aggregate(&breakdowns, &settings);

        info!(
            quote_id = %quote_id,
            boards = priced.len(),
            final_price = totals.final_price,
            "报价单计价完成"
        );

        Ok(QuotePricing {
            quote_id: quote_id.to_string(),
            settings,
            boards: priced,
            totals,
        })
    }
}
