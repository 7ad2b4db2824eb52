//! geoip2-server main entry point
//! geoip2-server 主入口点

use anyhow::Context;
use apix::config::init_tracing;
use apix::geoip2::{service::routes, CliArgs, GeoIpClient, Geoip2ServerConfig, RefreshScheduler};
use apix::http::server::middleware::{cors_allow_all, logger, recover};
use apix::http::Entrypoint;
use apix::utils::worker_threads;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    // Parse command line arguments / 解析命令行参数
    let args = CliArgs::parse();
    let workers = worker_threads(&args.cpu)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    runtime.block_on(run(args, workers))
}

async fn run(args: CliArgs, workers: usize) -> anyhow::Result<()> {
    let config = Geoip2ServerConfig::load_with_cli(&args)?;

    // Initialize logging with configuration / 使用配置初始化日志
    init_tracing(&config.log.to_logging_config())?;

    info!("geoip2-server starting with:");
    info!("  - listen address: {}", config.server.addr);
    info!("  - database dir: {}", config.geoip.db_dir.display());
    info!("  - max concurrent lookups: {}", config.geoip.max_connect);
    info!("  - refresh schedule: {}", config.geoip.update_schedule);
    info!("  - worker threads: {}", workers);
    if config.geoip.license_key.is_empty() {
        warn!("No MaxMind license key configured, downloads will be rejected upstream");
    }

    // Load databases before accepting traffic / 接收流量前加载数据库
    let client = Arc::new(GeoIpClient::new(config.geoip.clone())?);
    client.init().await?;

    let mut entrypoint = Entrypoint::new(config.server.clone());
    entrypoint.attach_middleware(recover());
    entrypoint.attach_middleware(logger());
    entrypoint.attach_middleware(cors_allow_all());

    let scheduler = RefreshScheduler::new(&config.geoip.update_schedule)?;
    let refresh = scheduler.spawn(client.clone(), entrypoint.shutdown_token());

    entrypoint.start(routes(client.clone())).await?;
    entrypoint.run().await?;

    entrypoint.stop();
    if let Err(e) = refresh.await {
        warn!("Refresh scheduler ended abnormally: {}", e);
    }
    if let Err(e) = client.close() {
        warn!("Close databases: {}", e);
    }
    info!("geoip2-server stopped");
    Ok(())
}
