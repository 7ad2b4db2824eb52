//! HTTP server toolkit over axum / 基于axum的HTTP服务端工具包
//!
//! - [`Router`]: handlers receive a [`Context`] and may be guarded by filters
//! - [`Entrypoint`]: binds, optionally serves TLS, applies middlewares and
//!   shuts down gracefully on SIGINT/SIGTERM
//! - [`middleware`]: logger, panic recovery, CORS and JWT

mod context;
mod entrypoint;
mod error;
pub mod middleware;
mod router;

pub use context::Context;
pub use entrypoint::{shutdown_signal, Entrypoint};
pub use error::{error_response, ServerError, ServerResult};
pub use middleware::Middleware;
pub use router::{filter, ErrorHandler, Filter, Router, MAX_BODY_BYTES};

#[cfg(test)]
mod router_test;
