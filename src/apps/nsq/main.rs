//! nsq-service main entry point: nsqlookupd + nsqd + nsqadmin
//! nsq-service 主入口点：nsqlookupd + nsqd + nsqadmin

use apix::config::init_tracing;
use apix::http::server::shutdown_signal;
use apix::nsq::{start_nsqadmin, start_nsqd, start_nsqlookupd, CliArgs, Daemon, NsqServiceConfig};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = NsqServiceConfig::load_with_cli(&args)?;
    init_tracing(&config.log.to_logging_config())?;

    let mut daemons: Vec<Daemon> = Vec::with_capacity(3);
    daemons.push(start_nsqlookupd(&config.lookupd)?);

    // Start the rest in order; on failure stop what is already running
    // 按顺序启动；失败时停止已启动的进程
    let started = match start_nsqd(&config.nsqd) {
        Ok(nsqd) => {
            if let Some(path) = nsqd.data_path() {
                info!("nsqd data path: {}", path.display());
            }
            daemons.push(nsqd);
            start_nsqadmin(&config.admin).map(|admin| daemons.push(admin))
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &started {
        error!("Failed to start NSQ services: {}", e);
    } else {
        info!("NSQ services started:");
        info!("  - nsqlookupd tcp={} http={}", config.lookupd.tcp_address, config.lookupd.http_address);
        info!("  - nsqd tcp={} http={}", config.nsqd.tcp_address, config.nsqd.http_address);
        info!("  - nsqadmin http={}", config.admin.http_address);
        shutdown_signal().await;
    }

    // Stop in reverse start order / 按启动的相反顺序停止
    while let Some(daemon) = daemons.pop() {
        let name = daemon.name();
        if let Err(e) = daemon.exit().await {
            error!("Failed to stop {}: {}", name, e);
        }
    }
    info!("NSQ services stopped");

    started.map_err(Into::into)
}
