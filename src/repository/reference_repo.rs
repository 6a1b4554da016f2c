// ==========================================
// 开关柜报价核心 - 参考价目数据仓储
// ==========================================
// 价目表由外部维护; 本仓储只读 (insert 仅用于初始化/测试数据)
// part_code 不设唯一约束: 重复键由 CatalogResolver 识别为歧义
// ==========================================

use crate::domain::line_item::ReferenceItem;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::stores::ReferencePriceList;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex};

pub struct ReferenceItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量写入参考价目
    pub fn batch_insert(&self, items: &[ReferenceItem]) -> RepositoryResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO reference_item (
                        item_id, part_code, category, subcategory, description,
                        unit_price, labour_hours, auto_add, sheet_metal
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;

            for item in items {
                stmt.execute(params![
                    &item.item_id,
                    &item.part_code,
                    &item.category,
                    &item.subcategory,
                    &item.description,
                    &item.unit_price,
                    &item.labour_hours,
                    if item.auto_add { 1 } else { 0 },
                    if item.sheet_metal { 1 } else { 0 },
                ])?;
            }
        }

        tx.commit()?;
        Ok(items.len())
    }

    /// 按身份键批量查询 (IN 列表, 保留重复条目)
    pub fn find_by_part_codes(&self, codes: &[String]) -> RepositoryResult<Vec<ReferenceItem>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;

        let placeholders = vec!["?"; codes.len()].join(", ");
        let sql = format!(
            r#"SELECT item_id, part_code, category, subcategory, description,
                      unit_price, labour_hours, auto_add, sheet_metal
               FROM reference_item
               WHERE part_code IN ({})
               ORDER BY part_code, item_id"#,
            placeholders
        );

        let values: Vec<Value> = codes.iter().map(|c| Value::from(c.clone())).collect();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values), |row| {
                let auto_add: i32 = row.get(7)?;
                let sheet_metal: i32 = row.get(8)?;
                Ok(ReferenceItem {
                    item_id: row.get(0)?,
                    part_code: row.get(1)?,
                    category: row.get(2)?,
                    subcategory: row.get(3)?,
                    description: row.get(4)?,
                    unit_price: row.get(5)?,
                    labour_hours: row.get(6)?,
                    auto_add: auto_add != 0,
                    sheet_metal: sheet_metal != 0,
                })
            })?
            .collect::<Result<Vec<ReferenceItem>, _>>()?;

        Ok(items)
    }
}

#[async_trait]
impl ReferencePriceList for ReferenceItemRepository {
    async fn find_by_codes(&self, codes: &[String]) -> RepositoryResult<Vec<ReferenceItem>> {
        self.find_by_part_codes(codes)
    }
}
