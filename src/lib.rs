//! apix: API clients and service wrappers
//! apix：API客户端与服务封装

// Shared modules / 共享模块
pub mod config;
pub mod http;
pub mod utils;

// Service-specific modules / 服务特定模块
pub mod cos;
pub mod geoip2;
pub mod nsq;

// Re-exports / 重新导出
pub use config::*;
pub use utils::*;
