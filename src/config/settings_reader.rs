// ==========================================
// 开关柜报价核心 - 成本设置读取 Trait
// ==========================================
// 职责: 定义成本汇总所需的设置读取接口
// 实现者: ConfigManager (config_kv 表)
// ==========================================

use crate::domain::settings::{EffectiveSettings, GlobalSettings, QuoteOverrides};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

#[async_trait]
pub trait SettingsReader: Send + Sync {
    /// 读取全局设置 (缺失键取默认值)
    async fn get_global_settings(&self) -> RepositoryResult<GlobalSettings>;

    /// 读取报价单级覆写 (缺失键为 None)
    async fn get_quote_overrides(&self, quote_id: &str) -> RepositoryResult<QuoteOverrides>;

    /// 读取有效设置 = 全局 ⊕ 覆写
    async fn get_effective_settings(&self, quote_id: &str) -> RepositoryResult<EffectiveSettings> {
        let global = self.get_global_settings().await?;
        let overrides = self.get_quote_overrides(quote_id).await?;
        Ok(EffectiveSettings::merge(&global, Some(&overrides)))
    }
}
