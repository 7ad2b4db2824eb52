//! NSQ messaging: client and local daemons / NSQ消息：客户端与本地守护进程

mod client;
mod config;
mod error;
mod service;

pub use client::{MessageHandler, NsqClient, NsqClientOptions, NsqMessage};
pub use config::{dial_address, CliArgs, LookupdOptions, NsqServiceConfig, NsqadminOptions, NsqdOptions};
pub use error::{NsqError, NsqResult};
pub use service::{start_nsqadmin, start_nsqd, start_nsqlookupd, Daemon};
