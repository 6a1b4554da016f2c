// ==========================================
// 开关柜报价核心 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 存储失败不重试, 原样上抛给调用方
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("板柜不存在: {0}")]
    BoardNotFound(String),

    #[error("报价单不存在: {0}")]
    QuoteNotFound(String),
}

impl EngineError {
    /// 是否为并发修改冲突 (调用方可提示用户刷新后重试)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::Repository(RepositoryError::OptimisticLockFailure { .. })
        )
    }
}

/// 引擎层 Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
