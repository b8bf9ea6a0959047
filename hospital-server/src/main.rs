//! 医院记录管理服务主程序

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hospital_admin::config::{save_config, DatabaseConfig};
use hospital_admin::{init_logging, ConfigManager, HospitalConfig, ServiceMonitor};
use hospital_core::{HospitalService, HospitalStore, MemoryStore};
use hospital_database::{DatabasePool, DatabaseQueries, PoolSettings};
use hospital_web::{AppState, WebServer};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "hospital-server")]
#[command(about = "医院记录管理服务：医生、患者、预约、账单、病房与报表")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动 HTTP 服务（默认）
    Serve {
        /// 监听端口
        #[arg(short, long)]
        port: Option<u16>,

        /// 监听地址
        #[arg(long)]
        host: Option<String>,

        /// 存储后端：memory 或 postgres
        #[arg(short, long)]
        backend: Option<String>,
    },
    /// 在 PostgreSQL 中创建表和索引
    Migrate,
    /// 写出默认配置文件
    InitConfig {
        /// 输出路径
        #[arg(default_value = "hospital.toml")]
        path: String,

        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let manager = ConfigManager::new(args.config.as_deref())?;

    let mut config = manager.get_config().await;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(Command::Serve {
        port,
        host,
        backend,
    }) = &args.command
    {
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(backend) = backend {
            config.database.backend = backend.clone();
        }
    }
    manager.update_config(config).await?;
    let config = manager.get_config().await;

    init_logging(&config.logging)?;

    let result = match args.command {
        Some(Command::Migrate) => migrate(&config).await,
        Some(Command::InitConfig { path, force }) => init_config(&config, &path, force).await,
        Some(Command::Serve { .. }) | None => serve(config).await,
    };

    if let Err(e) = &result {
        error!("hospital-server failed: {:#}", e);
    }
    result
}

fn pool_settings(database: &DatabaseConfig) -> PoolSettings {
    PoolSettings {
        max_connections: database.max_connections,
        min_connections: database.min_connections,
        connect_timeout: database.connect_timeout(),
    }
}

async fn connect(database: &DatabaseConfig) -> Result<DatabaseQueries> {
    let pool = DatabasePool::connect(&database.connection_string, &pool_settings(database))
        .await
        .context("Failed to connect to PostgreSQL")?;
    let queries = DatabaseQueries::new(pool);
    queries.create_tables().await?;
    Ok(queries)
}

async fn serve(config: HospitalConfig) -> Result<()> {
    info!("Starting {}", config.server.name);

    let store: Arc<dyn HospitalStore> = match config.database.backend.as_str() {
        "postgres" => Arc::new(connect(&config.database).await?),
        _ => {
            info!("Using in-memory store; records are lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let service = HospitalService::new(store, config.pagination.clone());
    let state = AppState::new(service, ServiceMonitor::new()?);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!("Server configuration:");
    info!("  Listen address: {}", addr);
    info!("  Backend: {}", config.database.backend);
    info!("  Page sizes: {:?}", config.pagination);

    WebServer::new(addr, state).run().await
}

async fn migrate(config: &HospitalConfig) -> Result<()> {
    if config.database.backend != "postgres" {
        bail!("migrate requires the postgres backend (set database.backend = \"postgres\")");
    }
    connect(&config.database).await?;
    info!("Migration finished");
    Ok(())
}

async fn init_config(config: &HospitalConfig, path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        bail!("{} already exists, pass --force to overwrite", path);
    }
    save_config(config, path).await
}
