//! Shared helpers for filesystem, time and runtime sizing
//! 文件系统、时间和运行时规模的通用工具

pub mod cpu;
pub mod file;
pub mod time;

pub use cpu::{parse_cpu, worker_threads, CpuError};
pub use file::{ensure_dir, file_name, is_dir_exist, is_exist, is_permission_denied};
pub use time::time_to_millis;
