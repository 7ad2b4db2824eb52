//! Server entrypoint: binding, TLS, middleware and graceful shutdown
//! 服务入口：绑定、TLS、中间件和优雅关闭

use super::{middleware::Middleware, Router, ServerError, ServerResult};
use crate::config::ServerConfig;
use crate::utils::is_exist;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// HTTP(S) entrypoint / HTTP(S)服务入口
pub struct Entrypoint {
    config: ServerConfig,
    middlewares: Vec<Middleware>,
    handle: Handle,
    shutdown: CancellationToken,
    server_task: Option<JoinHandle<std::io::Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl Entrypoint {
    /// Create a new entrypoint / 创建新的服务入口
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            middlewares: Vec::new(),
            handle: Handle::new(),
            shutdown: CancellationToken::new(),
            server_task: None,
            local_addr: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address actually bound, known after `start` / 实际绑定地址（启动后可用）
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Add a middleware; the first attached runs outermost
    /// 添加中间件；最先添加的位于最外层
    pub fn attach_middleware(&mut self, middleware: Middleware) {
        self.middlewares.push(middleware);
    }

    /// Token cancelled when the entrypoint begins shutting down
    /// 入口开始关闭时被取消的令牌
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn build(&mut self, router: Router) -> axum::Router {
        let mut app = router.into_axum();
        for middleware in self.middlewares.drain(..).rev() {
            app = middleware(app);
        }
        app
    }

    async fn tls_config(&self) -> ServerResult<Option<RustlsConfig>> {
        let Some((cert, key)) = self.config.tls_paths() else {
            return Ok(None);
        };
        if !is_exist(&cert) || !is_exist(&key) {
            return Err(ServerError::TlsConfig(
                "cert or key file in the TLS configuration does not exist".to_string(),
            ));
        }
        let config = RustlsConfig::from_pem_file(&cert, &key)
            .await
            .map_err(|e| ServerError::TlsConfig(e.to_string()))?;
        Ok(Some(config))
    }

    /// Bind and start serving in the background / 绑定并在后台开始服务
    pub async fn start(&mut self, router: Router) -> ServerResult<()> {
        if self.server_task.is_some() {
            return Err(ServerError::AlreadyStarted);
        }
        if router.is_empty() {
            return Err(ServerError::NoRouter);
        }

        let tls = self.tls_config().await?;
        let app = self.build(router);
        let addr = self.config.addr;
        let handle = self.handle.clone();

        let task = match tls {
            Some(tls) => tokio::spawn(async move {
                axum_server::bind_rustls(addr, tls)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }),
            None => tokio::spawn(async move {
                axum_server::bind(addr)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }),
        };

        match self.handle.listening().await {
            Some(bound) => {
                self.local_addr = Some(bound);
                self.server_task = Some(task);
            }
            None => {
                // Bind failed; surface the serve error
                return match task.await {
                    Ok(Err(e)) => Err(ServerError::Io(e)),
                    Ok(Ok(())) => Err(ServerError::Internal("server exited before listening".into())),
                    Err(e) => Err(ServerError::Internal(e.to_string())),
                };
            }
        }

        self.listen_signals();
        info!(
            "Serving on: {}{}",
            if self.config.enable_tls { "https://" } else { "http://" },
            self.local_addr.map(|a| a.to_string()).unwrap_or_default()
        );
        Ok(())
    }

    fn listen_signals(&self) {
        let handle = self.handle.clone();
        let token = self.shutdown.clone();
        let grace = Duration::from_secs(self.config.shutdown_timeout);
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
            info!("Shutting down server, grace period {:?}", grace);
            handle.graceful_shutdown(Some(grace));
        });
    }

    /// Wait until the server stops / 等待服务停止
    pub async fn run(&mut self) -> ServerResult<()> {
        let task = self.server_task.take().ok_or(ServerError::NotStarted)?;
        match task.await {
            Ok(Ok(())) => {
                info!("Server stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Server error: {}", e);
                Err(ServerError::Io(e))
            }
            Err(e) => Err(ServerError::Internal(e.to_string())),
        }
    }

    /// Begin graceful shutdown; open connections get the configured grace period
    /// 开始优雅关闭；已有连接获得配置的宽限期
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

/// Resolve on Ctrl+C or SIGTERM / 收到Ctrl+C或SIGTERM时返回
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received terminate signal, starting graceful shutdown"),
    }
}
