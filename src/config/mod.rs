// ==========================================
// 开关柜报价核心 - 配置层
// ==========================================
// 职责: 成本设置管理,支持报价单级覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod settings_reader;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use settings_reader::SettingsReader;
