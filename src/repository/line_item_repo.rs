// ==========================================
// 开关柜报价核心 - 板柜明细数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: SYSTEM/MANUAL 两类明细同表存放, 以 source 字段区分
// ==========================================

use crate::domain::line_item::LineItem;
use crate::domain::types::ItemSource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::stores::LineItemStore;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_COLUMNS: &str = r#"SELECT item_id, board_id, category, subcategory, part_code,
          description, quantity, unit_price, labour_hours, cost,
          source, formula_priced, created_at, updated_at
   FROM line_item"#;

// ==========================================
// LineItemRepository - 明细仓储
// ==========================================
pub struct LineItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LineItemRepository {
    /// 创建新的LineItemRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入明细
    pub fn insert(&self, item: &LineItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_row(&conn, item)
    }

    /// 按 item_id 更新明细 (source/board_id 不可变)
    pub fn update(&self, item: &LineItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update_row(&conn, item, None)
    }

    /// 删除明细
    pub fn delete(&self, item_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        delete_row(&conn, item_id, None)
    }

    /// 查询板柜明细 (可选按来源过滤)
    pub fn find_by_board(
        &self,
        board_id: &str,
        source: Option<ItemSource>,
    ) -> RepositoryResult<Vec<LineItem>> {
        let conn = self.get_conn()?;

        let items = match source {
            Some(source) => {
                let sql = format!(
                    "{} WHERE board_id = ? AND source = ? ORDER BY created_at, item_id",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![board_id, source.to_db_str()], |row| self.map_row(row))?
                    .collect::<Result<Vec<LineItem>, _>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "{} WHERE board_id = ? ORDER BY created_at, item_id",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![board_id], |row| self.map_row(row))?
                    .collect::<Result<Vec<LineItem>, _>>()?;
                rows
            }
        };

        Ok(items)
    }

    /// 用户新增手工明细
    ///
    /// 说明: source 强制为 MANUAL, cost 按单价×数量重算
    #[allow(clippy::too_many_arguments)]
    pub fn add_manual_item(
        &self,
        board_id: &str,
        category: &str,
        subcategory: &str,
        part_code: &str,
        description: &str,
        quantity: f64,
        unit_price: f64,
        labour_hours: f64,
    ) -> RepositoryResult<LineItem> {
        if quantity < 0.0 {
            return Err(RepositoryError::FieldValueError {
                field: "quantity".to_string(),
                message: format!("数量不能为负: {}", quantity),
            });
        }

        let now = Utc::now().naive_utc();
        let item = LineItem {
            item_id: Uuid::new_v4().to_string(),
            board_id: board_id.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            part_code: part_code.to_string(),
            description: description.to_string(),
            quantity,
            unit_price,
            labour_hours,
            cost: unit_price * quantity,
            source: ItemSource::Manual,
            formula_priced: false,
            created_at: now,
            updated_at: now,
        };

        self.insert(&item)?;
        Ok(item)
    }

    /// 用户修改手工明细
    ///
    /// 说明: 只命中 MANUAL 明细, cost 按单价×数量重算
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: item_id 不存在或不是手工明细
    pub fn update_manual_item(&self, item: &LineItem) -> RepositoryResult<LineItem> {
        if item.quantity < 0.0 {
            return Err(RepositoryError::FieldValueError {
                field: "quantity".to_string(),
                message: format!("数量不能为负: {}", item.quantity),
            });
        }

        let mut updated = item.clone();
        updated.source = ItemSource::Manual;
        updated.formula_priced = false;
        updated.recompute_cost();
        updated.updated_at = Utc::now().naive_utc();

        let conn = self.get_conn()?;
        update_row(&conn, &updated, Some(ItemSource::Manual))?;
        Ok(updated)
    }

    /// 用户删除手工明细
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: item_id 不存在或不是手工明细
    pub fn delete_manual_item(&self, item_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        delete_row(&conn, item_id, Some(ItemSource::Manual))
    }

    /// 映射数据库行到LineItem对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<LineItem> {
        let source_str: String = row.get(10)?;
        let formula_priced: i32 = row.get(11)?;
        Ok(LineItem {
            item_id: row.get(0)?,
            board_id: row.get(1)?,
            category: row.get(2)?,
            subcategory: row.get(3)?,
            part_code: row.get(4)?,
            description: row.get(5)?,
            quantity: row.get(6)?,
            unit_price: row.get(7)?,
            labour_hours: row.get(8)?,
            cost: row.get(9)?,
            source: ItemSource::from_db_str(&source_str),
            formula_priced: formula_priced != 0,
            created_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(12)?, DATETIME_FMT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e)))?,
            updated_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(13)?, DATETIME_FMT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e)))?,
        })
    }
}

// ==========================================
// 行级写入 (可在事务内复用)
// ==========================================

pub(crate) fn insert_row(conn: &Connection, item: &LineItem) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO line_item (
            item_id, board_id, category, subcategory, part_code,
            description, quantity, unit_price, labour_hours, cost,
            source, formula_priced, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &item.item_id,
            &item.board_id,
            &item.category,
            &item.subcategory,
            &item.part_code,
            &item.description,
            &item.quantity,
            &item.unit_price,
            &item.labour_hours,
            &item.cost,
            item.source.to_db_str(),
            if item.formula_priced { 1 } else { 0 },
            &item.created_at.format(DATETIME_FMT).to_string(),
            &item.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;

    Ok(())
}

/// 按 item_id 更新; `only_source` 为 Some 时仅命中该来源的明细
pub(crate) fn update_row(
    conn: &Connection,
    item: &LineItem,
    only_source: Option<ItemSource>,
) -> RepositoryResult<()> {
    let rows_affected = conn.execute(
        r#"UPDATE line_item
           SET category = ?, subcategory = ?, part_code = ?, description = ?,
               quantity = ?, unit_price = ?, labour_hours = ?, cost = ?,
               formula_priced = ?, updated_at = ?
           WHERE item_id = ? AND (?12 IS NULL OR source = ?12)"#,
        params![
            &item.category,
            &item.subcategory,
            &item.part_code,
            &item.description,
            &item.quantity,
            &item.unit_price,
            &item.labour_hours,
            &item.cost,
            if item.formula_priced { 1 } else { 0 },
            &Utc::now().naive_utc().format(DATETIME_FMT).to_string(),
            &item.item_id,
            only_source.map(|s| s.to_db_str()),
        ],
    )?;

    if rows_affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "LineItem".to_string(),
            id: item.item_id.clone(),
        });
    }

    Ok(())
}

/// 按 item_id 删除; `only_source` 为 Some 时仅命中该来源的明细, 未命中报 NotFound
pub(crate) fn delete_row(
    conn: &Connection,
    item_id: &str,
    only_source: Option<ItemSource>,
) -> RepositoryResult<()> {
    let rows_affected = conn.execute(
        "DELETE FROM line_item WHERE item_id = ?1 AND (?2 IS NULL OR source = ?2)",
        params![item_id, only_source.map(|s| s.to_db_str())],
    )?;

    if rows_affected == 0 && only_source.is_some() {
        return Err(RepositoryError::NotFound {
            entity: "LineItem".to_string(),
            id: item_id.to_string(),
        });
    }

    Ok(())
}

#[async_trait]
impl LineItemStore for LineItemRepository {
    async fn list_by_board(
        &self,
        board_id: &str,
        source: Option<ItemSource>,
    ) -> RepositoryResult<Vec<LineItem>> {
        self.find_by_board(board_id, source)
    }

    async fn insert_item(&self, item: &LineItem) -> RepositoryResult<()> {
        self.insert(item)
    }

    async fn update_item(&self, item: &LineItem) -> RepositoryResult<()> {
        self.update(item)
    }

    async fn delete_item(&self, item_id: &str) -> RepositoryResult<()> {
        self.delete(item_id)
    }
}
