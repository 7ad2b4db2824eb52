//! HTTP toolkit: a thin client over reqwest and a server layer over axum
//! HTTP工具包：基于reqwest的客户端和基于axum的服务端

pub mod client;
pub mod constants;
pub mod server;

pub use client::{Client, ClientOptions, HttpClientError, HttpClientResult, Request, Response};
pub use server::{Context, Entrypoint, Router, ServerError, ServerResult};
