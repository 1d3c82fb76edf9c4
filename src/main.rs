// ==========================================
// 工程项目挣值管理系统 - 命令行入口
// ==========================================
// 用法:
//   project-evm [db_path] <project_id> [--snapshot]
//
// 输出驾驶舱 JSON（挣值结果 + 物理进度明细）到 stdout；
// --snapshot 时同时覆盖保存项目挣值快照
// PROJECT_EVM_LOG_FORMAT=json 时日志以 JSON 写 stderr
// ==========================================

use anyhow::{bail, Context};
use project_evm::api::{get_default_db_path, EvmApi, DB_PATH_ENV};
use project_evm::db::{init_schema, open_sqlite_connection, warn_if_schema_mismatch};
use std::sync::{Arc, Mutex};

struct CliArgs {
    db_path: String,
    project_id: String,
    snapshot: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut snapshot = false;
    let mut positional = Vec::new();
    for arg in args {
        if arg == "--snapshot" {
            snapshot = true;
        } else {
            positional.push(arg);
        }
    }

    let (db_path, project_id) = match positional.as_slice() {
        [project_id] => (None, project_id.clone()),
        [db_path, project_id] => (Some(db_path.clone()), project_id.clone()),
        _ => bail!("用法: project-evm [db_path] <project_id> [--snapshot]"),
    };

    // 环境变量优先于命令行路径
    let db_path = match std::env::var(DB_PATH_ENV).ok().filter(|v| !v.trim().is_empty()) {
        Some(_) => get_default_db_path(),
        None => db_path.unwrap_or_else(get_default_db_path),
    };

    Ok(CliArgs {
        db_path,
        project_id,
        snapshot,
    })
}

fn main() -> anyhow::Result<()> {
    project_evm::logging::init_from_env();

    let args = parse_args(std::env::args().skip(1))?;

    tracing::info!("{} v{}", project_evm::APP_NAME, project_evm::VERSION);
    tracing::info!(db_path = %args.db_path, "使用数据库");

    let conn = open_sqlite_connection(&args.db_path)
        .with_context(|| format!("无法打开数据库: {}", args.db_path))?;
    init_schema(&conn)?;
    warn_if_schema_mismatch(&conn);

    let api = EvmApi::from_connection(Arc::new(Mutex::new(conn)))?;

    let dashboard = api.get_pmi_dashboard_data(&args.project_id)?;
    println!("{}", serde_json::to_string_pretty(&dashboard)?);

    if args.snapshot {
        let snapshot = api.refresh_snapshot(&args.project_id)?;
        tracing::info!(snapshot_id = %snapshot.snapshot_id, "快照已保存");
    }

    Ok(())
}
