// ==========================================
// 开关柜报价核心 - 报价单/板柜数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发: board.revision 乐观锁, 防止同一板柜并发协调互相覆盖
// 并发: 协调提交 (比较交换 + 明细写入) 在同一事务内完成
// ==========================================

use crate::domain::board::{Board, BoardConfiguration, Quote};
use crate::domain::types::ItemSource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::line_item_repo;
use crate::repository::stores::{BoardStore, ItemChanges};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ==========================================
// QuoteRepository - 报价单仓储
// ==========================================
pub struct QuoteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QuoteRepository {
    /// 创建新的QuoteRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建报价单
    pub fn create(&self, quote: &Quote) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            "INSERT INTO quote (quote_id, quote_name, created_at) VALUES (?, ?, ?)",
            params![
                &quote.quote_id,
                &quote.quote_name,
                &quote.created_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Ok(quote.quote_id.clone())
    }

    /// 按ID查询报价单
    pub fn find_by_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            "SELECT quote_id, quote_name, created_at FROM quote WHERE quote_id = ?",
            params![quote_id],
            |row| {
                Ok(Quote {
                    quote_id: row.get(0)?,
                    quote_name: row.get(1)?,
                    created_at: parse_datetime(2, &row.get::<_, String>(2)?)?,
                })
            },
        ) {
            Ok(quote) => Ok(Some(quote)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ==========================================
// BoardRepository - 板柜仓储
// ==========================================
pub struct BoardRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BoardRepository {
    /// 创建新的BoardRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn encode_config(configuration: &BoardConfiguration) -> RepositoryResult<String> {
        serde_json::to_string(configuration).map_err(|e| RepositoryError::Serialization {
            field: "config_json".to_string(),
            message: e.to_string(),
        })
    }

    /// 创建板柜
    pub fn create(&self, board: &Board) -> RepositoryResult<String> {
        let config_json = Self::encode_config(&board.configuration)?;
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO board (
                board_id, quote_id, board_name, config_json, revision, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &board.board_id,
                &board.quote_id,
                &board.board_name,
                &config_json,
                &board.revision,
                &board.updated_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Ok(board.board_id.clone())
    }

    /// 按ID查询板柜
    pub fn find_by_id(&self, board_id: &str) -> RepositoryResult<Option<Board>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT board_id, quote_id, board_name, config_json, revision, updated_at
               FROM board
               WHERE board_id = ?"#,
            params![board_id],
            |row| self.map_row(row),
        ) {
            Ok(board) => Ok(Some(board)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询报价单下所有板柜 (按名称排序)
    pub fn find_by_quote(&self, quote_id: &str) -> RepositoryResult<Vec<Board>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT board_id, quote_id, board_name, config_json, revision, updated_at
               FROM board
               WHERE quote_id = ?
               ORDER BY board_name, board_id"#,
        )?;

        let boards = stmt
            .query_map(params![quote_id], |row| self.map_row(row))?
            .collect::<Result<Vec<Board>, _>>()?;

        Ok(boards)
    }

    /// 更新配置 (带乐观锁检查)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision不匹配 (并发协调已写入)
    /// - `RepositoryError::NotFound`: board_id不存在
    pub fn update_configuration(
        &self,
        board_id: &str,
        configuration: &BoardConfiguration,
        expected_revision: i32,
    ) -> RepositoryResult<i32> {
        let config_json = Self::encode_config(configuration)?;
        let conn = self.get_conn()?;
        swap_revision(&conn, board_id, &config_json, expected_revision)
    }

    /// 协调提交: 同一事务内完成 revision 比较交换、配置保存与明细写入
    ///
    /// 任一步失败整体回滚; revision 冲突时不写入任何明细
    pub fn commit_changes(
        &self,
        board_id: &str,
        configuration: &BoardConfiguration,
        expected_revision: i32,
        changes: ItemChanges<'_>,
    ) -> RepositoryResult<i32> {
        let config_json = Self::encode_config(configuration)?;
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let new_revision = swap_revision(&tx, board_id, &config_json, expected_revision)?;

        for id in changes.deletes {
            line_item_repo::delete_row(&tx, id, Some(ItemSource::System))?;
        }
        for item in changes.updates {
            line_item_repo::update_row(&tx, item, Some(ItemSource::System))?;
        }
        for item in changes.creates {
            line_item_repo::insert_row(&tx, item)?;
        }

        tx.commit()?;

        tracing::debug!(
            board_id = %board_id,
            revision = new_revision,
            writes = changes.len(),
            "协调事务已提交"
        );
        Ok(new_revision)
    }

    /// 映射数据库行到Board对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Board> {
        let config_json: String = row.get(3)?;
        let configuration: BoardConfiguration = serde_json::from_str(&config_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Board {
            board_id: row.get(0)?,
            quote_id: row.get(1)?,
            board_name: row.get(2)?,
            configuration,
            revision: row.get(4)?,
            updated_at: parse_datetime(5, &row.get::<_, String>(5)?)?,
        })
    }
}

/// revision 比较交换并写入配置
fn swap_revision(
    conn: &Connection,
    board_id: &str,
    config_json: &str,
    expected_revision: i32,
) -> RepositoryResult<i32> {
    let rows_affected = conn.execute(
        r#"UPDATE board
           SET config_json = ?, revision = revision + 1, updated_at = ?
           WHERE board_id = ? AND revision = ?"#,
        params![
            config_json,
            &Utc::now().naive_utc().format(DATETIME_FMT).to_string(),
            board_id,
            &expected_revision,
        ],
    )?;

    if rows_affected == 0 {
        // 判断是记录不存在还是revision冲突
        let exists: Result<i32, _> = conn.query_row(
            "SELECT revision FROM board WHERE board_id = ?",
            params![board_id],
            |row| row.get(0),
        );

        return match exists {
            Ok(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                board_id: board_id.to_string(),
                expected: expected_revision,
                actual: actual_revision,
            }),
            Err(_) => Err(RepositoryError::NotFound {
                entity: "Board".to_string(),
                id: board_id.to_string(),
            }),
        };
    }

    Ok(expected_revision + 1)
}

#[async_trait]
impl BoardStore for BoardRepository {
    async fn find_quote(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
        QuoteRepository::new(self.conn.clone()).find_by_id(quote_id)
    }

    async fn find_board(&self, board_id: &str) -> RepositoryResult<Option<Board>> {
        self.find_by_id(board_id)
    }

    async fn list_boards_by_quote(&self, quote_id: &str) -> RepositoryResult<Vec<Board>> {
        self.find_by_quote(quote_id)
    }

    async fn commit_reconciliation(
        &self,
        board_id: &str,
        configuration: &BoardConfiguration,
        expected_revision: i32,
        changes: ItemChanges<'_>,
    ) -> RepositoryResult<i32> {
        self.commit_changes(board_id, configuration, expected_revision, changes)
    }
}
