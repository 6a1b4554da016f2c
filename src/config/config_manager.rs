// ==========================================
// 开关柜报价核心 - 配置管理器
// ==========================================
// 职责: 成本设置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
//   - scope 'global'          : 全局设置
//   - scope 'quote/{quote_id}': 报价单级覆写 (缺键 = 未覆写)
// ==========================================

use crate::config::settings_reader::SettingsReader;
use crate::db::open_sqlite_connection;
use crate::domain::settings::{GlobalSettings, QuoteOverrides};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

fn quote_scope_id(quote_id: &str) -> String {
    format!("quote/{}", quote_id)
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取某个 scope 下的全部键值
    fn get_scope_values(&self, scope_id: &str) -> RepositoryResult<HashMap<String, String>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1")?;
        let rows = stmt.query_map(params![scope_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut values = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            values.insert(key, value);
        }
        Ok(values)
    }

    /// 写入全局设置项
    pub fn set_global_value(&self, key: &str, value: f64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value.to_string()],
        )?;
        Ok(())
    }

    /// 写入/清除报价单覆写项
    ///
    /// # 参数
    /// - value: Some(v) 覆写 (包括 0); None 清除覆写, 回落全局值
    pub fn set_quote_override(
        &self,
        quote_id: &str,
        key: &str,
        value: Option<f64>,
    ) -> RepositoryResult<()> {
        let scope_id = quote_scope_id(quote_id);
        let conn = self.get_conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key) VALUES (?1, 'QUOTE', ?2)",
            params![&scope_id, quote_id],
        )?;

        match value {
            Some(v) => {
                conn.execute(
                    "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
                    params![&scope_id, key, v.to_string()],
                )?;
            }
            None => {
                conn.execute(
                    "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                    params![&scope_id, key],
                )?;
            }
        }
        Ok(())
    }

    /// 读取全局设置 (同步版本)
    pub fn load_global_settings(&self) -> RepositoryResult<GlobalSettings> {
        let values = self.get_scope_values(GLOBAL_SCOPE)?;
        let defaults = GlobalSettings::default();

        // 全局值格式错误时告警并回落默认值
        let read = |key: &str, default: f64| -> f64 {
            match values.get(key) {
                None => default,
                Some(raw) => match raw.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        tracing::warn!(
                            config_key = key,
                            raw_value = %raw,
                            "全局设置格式错误，使用默认值"
                        );
                        default
                    }
                },
            }
        };

        Ok(GlobalSettings {
            labour_rate: read(config_keys::LABOUR_RATE, defaults.labour_rate),
            consumables_fraction: read(
                config_keys::CONSUMABLES_FRACTION,
                defaults.consumables_fraction,
            ),
            overhead_fraction: read(config_keys::OVERHEAD_FRACTION, defaults.overhead_fraction),
            engineering_fraction: read(
                config_keys::ENGINEERING_FRACTION,
                defaults.engineering_fraction,
            ),
            target_margin_fraction: read(
                config_keys::TARGET_MARGIN_FRACTION,
                defaults.target_margin_fraction,
            ),
            tax_fraction: read(config_keys::TAX_FRACTION, defaults.tax_fraction),
            rounding_increment: read(config_keys::ROUNDING_INCREMENT, defaults.rounding_increment),
        })
    }

    /// 读取报价单覆写 (同步版本)
    pub fn load_quote_overrides(&self, quote_id: &str) -> RepositoryResult<QuoteOverrides> {
        let values = self.get_scope_values(&quote_scope_id(quote_id))?;

        // 覆写格式错误视为未覆写
        let read = |key: &str| -> Option<f64> {
            let raw = values.get(key)?;
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    tracing::warn!(
                        quote_id = quote_id,
                        config_key = key,
                        raw_value = %raw,
                        "报价单覆写格式错误，忽略该覆写"
                    );
                    None
                }
            }
        };

        Ok(QuoteOverrides {
            labour_rate: read(config_keys::LABOUR_RATE),
            consumables_fraction: read(config_keys::CONSUMABLES_FRACTION),
            overhead_fraction: read(config_keys::OVERHEAD_FRACTION),
            engineering_fraction: read(config_keys::ENGINEERING_FRACTION),
            target_margin_fraction: read(config_keys::TARGET_MARGIN_FRACTION),
            tax_fraction: read(config_keys::TAX_FRACTION),
            rounding_increment: read(config_keys::ROUNDING_INCREMENT),
        })
    }
}

// ==========================================
// SettingsReader Trait 实现
// ==========================================
#[async_trait]
impl SettingsReader for ConfigManager {
    async fn get_global_settings(&self) -> RepositoryResult<GlobalSettings> {
        self.load_global_settings()
    }

    async fn get_quote_overrides(&self, quote_id: &str) -> RepositoryResult<QuoteOverrides> {
        self.load_quote_overrides(quote_id)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 人工
    pub const LABOUR_RATE: &str = "labour_rate";

    // 成本分层比例
    pub const CONSUMABLES_FRACTION: &str = "consumables_fraction";
    pub const OVERHEAD_FRACTION: &str = "overhead_fraction";
    pub const ENGINEERING_FRACTION: &str = "engineering_fraction";

    // 售价
    pub const TARGET_MARGIN_FRACTION: &str = "target_margin_fraction";
    pub const TAX_FRACTION: &str = "tax_fraction";
    pub const ROUNDING_INCREMENT: &str = "rounding_increment";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsReader;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_global_empty() {
        let manager = setup();
        let settings = manager.get_global_settings().await.unwrap();
        assert_eq!(settings, GlobalSettings::default());
    }

    #[tokio::test]
    async fn test_override_zero_and_clear() {
        let manager = setup();
        manager.set_global_value(config_keys::LABOUR_RATE, 95.0).unwrap();
        manager
            .set_quote_override("Q1", config_keys::OVERHEAD_FRACTION, Some(0.0))
            .unwrap();

        let eff = manager.get_effective_settings("Q1").await.unwrap();
        assert_eq!(eff.labour_rate, 95.0);
        assert_eq!(eff.overhead_fraction, 0.0);

        manager
            .set_quote_override("Q1", config_keys::OVERHEAD_FRACTION, None)
            .unwrap();
        let eff = manager.get_effective_settings("Q1").await.unwrap();
        assert_eq!(eff.overhead_fraction, 0.20);
    }

    #[tokio::test]
    async fn test_malformed_global_value_falls_back() {
        let manager = setup();
        {
            let conn = manager.get_conn().unwrap();
            conn.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', 'labour_rate', 'abc')",
                [],
            )
            .unwrap();
        }

        let settings = manager.get_global_settings().await.unwrap();
        assert_eq!(settings.labour_rate, 100.0);
    }
}
