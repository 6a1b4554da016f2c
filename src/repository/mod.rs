// ==========================================
// 开关柜报价核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod board_repo;
pub mod error;
pub mod line_item_repo;
pub mod reference_repo;
pub mod stores;

// 重导出核心仓储
pub use board_repo::{BoardRepository, QuoteRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use line_item_repo::LineItemRepository;
pub use reference_repo::ReferenceItemRepository;
pub use stores::{BoardStore, ItemChanges, LineItemStore, ReferencePriceList};
