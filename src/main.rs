// ==========================================
// 开关柜报价核心 - 命令行入口
// ==========================================
// 用法:
//   switchboard-quote [--db <path>] init
//   switchboard-quote [--db <path>] reconcile <board_id> <config.json> [--dry-run] [--legacy-tier-fallback]
//   switchboard-quote [--db <path>] refresh <board_id>
//   switchboard-quote [--db <path>] price <quote_id>
// 数据库路径: --db > SWITCHBOARD_DB > 用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use switchboard_quote::config::ConfigManager;
use switchboard_quote::db::{init_schema, open_sqlite_connection, warn_if_schema_mismatch};
use switchboard_quote::engine::{
    BoardReconcileService, CatalogRefreshService, QuotePricingService, ReconcileOptions,
};
use switchboard_quote::repository::{BoardRepository, LineItemRepository, ReferenceItemRepository};
use switchboard_quote::{logging, BoardConfiguration};

const USAGE: &str = "用法: switchboard-quote [--db <path>] <init|reconcile|refresh|price> ...";

/// 默认数据库路径
fn default_db_path() -> String {
    if let Ok(path) = std::env::var("SWITCHBOARD_DB") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./switchboard.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("switchboard-quote");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("switchboard.db");
        }
    }
    path.to_string_lossy().to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let db_path = match args.iter().position(|a| a == "--db") {
        Some(idx) => {
            if idx + 1 >= args.len() {
                bail!("--db 需要路径参数");
            }
            let path = args.remove(idx + 1);
            args.remove(idx);
            path
        }
        None => default_db_path(),
    };

    let dry_run = take_flag(&mut args, "--dry-run");
    let legacy_tier_fallback = take_flag(&mut args, "--legacy-tier-fallback");

    tracing::info!("开关柜报价核心 v{}", switchboard_quote::VERSION);
    tracing::info!("使用数据库: {}", db_path);

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn)?;
    warn_if_schema_mismatch(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let boards = Arc::new(BoardRepository::new(conn.clone()));
    let items = Arc::new(LineItemRepository::new(conn.clone()));
    let references = Arc::new(ReferenceItemRepository::new(conn.clone()));

    let command = args.first().map(String::as_str).ok_or_else(|| anyhow!(USAGE))?;
    match command {
        "init" => {
            println!("schema ready: {}", db_path);
        }
        "reconcile" => {
            let board_id = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            let config_path = args.get(2).ok_or_else(|| anyhow!(USAGE))?;

            let raw = std::fs::read_to_string(config_path)
                .with_context(|| format!("无法读取配置文件: {}", config_path))?;
            let configuration: BoardConfiguration =
                serde_json::from_str(&raw).context("配置文件格式错误")?;

            let service = BoardReconcileService::new(boards, items, references);
            let summary = service
                .reconcile_board(
                    board_id,
                    &configuration,
                    ReconcileOptions {
                        legacy_tier_fallback,
                        dry_run,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "refresh" => {
            let board_id = args.get(1).ok_or_else(|| anyhow!(USAGE))?;

            let service = CatalogRefreshService::new(items, references);
            let summary = service.refresh_board(board_id).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "price" => {
            let quote_id = args.get(1).ok_or_else(|| anyhow!(USAGE))?;

            let settings = Arc::new(ConfigManager::from_connection(conn.clone())?);
            let service = QuotePricingService::new(boards, items, settings);
            let pricing = service.price_quote(quote_id).await?;
            println!("{}", serde_json::to_string_pretty(&pricing)?);
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(idx) => {
            args.remove(idx);
            true
        }
        None => false,
    }
}
