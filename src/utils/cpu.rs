//! Worker thread sizing from a CPU spec / 根据CPU参数确定工作线程数

use thiserror::Error;

/// CPU spec parse errors / CPU参数解析错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CpuError {
    #[error("invalid CPU value: percentage must be between 1-100")]
    InvalidPercent,
    #[error("invalid CPU value: provide a number or percent greater than 0")]
    InvalidNumber,
}

/// Resolve `"N"` or `"N%"` against `available` cores
/// 根据可用核数解析`"N"`或`"N%"`
///
/// The result is at least 1 and never more than `available`.
pub fn parse_cpu(spec: &str, available: usize) -> Result<usize, CpuError> {
    let spec = spec.trim();
    let wanted = if let Some(pct) = spec.strip_suffix('%') {
        let pct: usize = pct.parse().map_err(|_| CpuError::InvalidPercent)?;
        if !(1..=100).contains(&pct) {
            return Err(CpuError::InvalidPercent);
        }
        (available * pct / 100).max(1)
    } else {
        let num: usize = spec.parse().map_err(|_| CpuError::InvalidNumber)?;
        if num < 1 {
            return Err(CpuError::InvalidNumber);
        }
        num
    };
    Ok(wanted.min(available.max(1)))
}

/// Worker threads for this host / 当前主机的工作线程数
pub fn worker_threads(spec: &str) -> Result<usize, CpuError> {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    parse_cpu(spec, available)
}
