//! Middleware constructors for [`super::Entrypoint`]
//! 入口点使用的中间件构造函数
//!
//! A middleware is a function that wraps the finished axum router, usually
//! by adding a tower layer.
//! 中间件是包装axum路由器的函数，通常通过添加tower层实现。

mod cors;
mod jwt;
mod logger;
mod recover;

pub use cors::{cors, cors_allow_all, CorsOptions};
pub use jwt::{jwt, sign_token, JwtClaims, JwtErrorHandler, JwtOptions, Skipper};
pub use logger::logger;
pub use recover::recover;


/// Router wrapper applied when the entrypoint starts / 入口点启动时应用的路由包装
pub type Middleware = Box<dyn FnOnce(axum::Router) -> axum::Router + Send>;
