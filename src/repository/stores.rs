// ==========================================
// 开关柜报价核心 - 存储接口 Trait
// ==========================================
// 职责: 定义引擎所需的读写契约（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================
// 实现者: rusqlite 仓储 (board_repo / line_item_repo / reference_repo)
// 测试中可替换为内存实现
// ==========================================

use crate::domain::board::{Board, BoardConfiguration, Quote};
use crate::domain::line_item::{LineItem, ReferenceItem};
use crate::domain::types::ItemSource;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// BoardStore - 板柜存储
// ==========================================
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// 按ID读取报价单 (不存在返回 None)
    async fn find_quote(&self, quote_id: &str) -> RepositoryResult<Option<Quote>>;

    /// 按ID读取板柜 (不存在返回 None)
    async fn find_board(&self, board_id: &str) -> RepositoryResult<Option<Board>>;

    /// 查询报价单下所有板柜
    async fn list_boards_by_quote(&self, quote_id: &str) -> RepositoryResult<Vec<Board>>;

    /// 提交一次协调: revision 比较交换 + 保存配置 + 明细增删改, 整体原子
    ///
    /// # 返回
    /// - Ok(new_revision): 写入成功后的修订号
    /// - Err(OptimisticLockFailure): revision 不匹配, 不写入任何明细
    async fn commit_reconciliation(
        &self,
        board_id: &str,
        configuration: &BoardConfiguration,
        expected_revision: i32,
        changes: ItemChanges<'_>,
    ) -> RepositoryResult<i32>;
}

/// 一次协调的明细写入
#[derive(Debug, Clone, Copy)]
pub struct ItemChanges<'a> {
    pub creates: &'a [LineItem],
    pub updates: &'a [LineItem],
    pub deletes: &'a [String],
}

impl ItemChanges<'_> {
    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// LineItemStore - 明细存储
// ==========================================
#[async_trait]
pub trait LineItemStore: Send + Sync {
    /// 读取板柜明细; source 为 None 时返回全部
    async fn list_by_board(
        &self,
        board_id: &str,
        source: Option<ItemSource>,
    ) -> RepositoryResult<Vec<LineItem>>;

    /// 新增明细
    async fn insert_item(&self, item: &LineItem) -> RepositoryResult<()>;

    /// 按 item_id 整体更新明细
    async fn update_item(&self, item: &LineItem) -> RepositoryResult<()>;

    /// 按 item_id 删除明细
    async fn delete_item(&self, item_id: &str) -> RepositoryResult<()>;
}

// ==========================================
// ReferencePriceList - 参考价目表 (只读)
// ==========================================
#[async_trait]
pub trait ReferencePriceList: Send + Sync {
    /// 按身份键批量查询候选条目 (可能包含重复键)
    async fn find_by_codes(&self, codes: &[String]) -> RepositoryResult<Vec<ReferenceItem>>;
}
