//! Launch NSQ daemons as child processes / 以子进程方式启动NSQ守护进程

use super::{LookupdOptions, NsqError, NsqResult, NsqadminOptions, NsqdOptions};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::info;

/// Handle to a running daemon / 运行中守护进程的句柄
#[derive(Debug)]
pub struct Daemon {
    name: &'static str,
    child: Child,
    data_path: Option<PathBuf>,
}

impl Daemon {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// OS process id, `None` once reaped / 进程号，回收后为`None`
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// nsqd data directory / nsqd数据目录
    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    /// Kill the daemon if still running and wait for it / 结束守护进程并等待其退出
    pub async fn exit(mut self) -> NsqResult<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }
        self.child.start_kill()?;
        let status = self.child.wait().await?;
        info!("{} exited: {}", self.name, status);
        Ok(status)
    }
}

fn spawn(name: &'static str, binary: &Path, args: Vec<String>) -> NsqResult<Child> {
    let child = Command::new(binary)
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| NsqError::Spawn {
            name: format!("{} ({})", name, binary.display()),
            source,
        })?;
    info!("Started {} pid={:?} args={:?}", name, child.id(), args);
    Ok(child)
}

/// Start nsqlookupd / 启动nsqlookupd
pub fn start_nsqlookupd(opts: &LookupdOptions) -> NsqResult<Daemon> {
    let child = spawn("nsqlookupd", &opts.binary, opts.to_args())?;
    Ok(Daemon {
        name: "nsqlookupd",
        child,
        data_path: None,
    })
}

/// Start nsqd; an empty `data_path` gets a fresh temporary directory
/// 启动nsqd；`data_path`为空时使用新的临时目录
pub fn start_nsqd(opts: &NsqdOptions) -> NsqResult<Daemon> {
    let mut opts = opts.clone();
    if opts.data_path.as_os_str().is_empty() {
        opts.data_path = std::env::temp_dir().join(format!("nsq-{}", uuid::Uuid::new_v4()));
    }
    std::fs::create_dir_all(&opts.data_path)?;

    let child = spawn("nsqd", &opts.binary, opts.to_args())?;
    Ok(Daemon {
        name: "nsqd",
        child,
        data_path: Some(opts.data_path),
    })
}

/// Start nsqadmin / 启动nsqadmin
pub fn start_nsqadmin(opts: &NsqadminOptions) -> NsqResult<Daemon> {
    let child = spawn("nsqadmin", &opts.binary, opts.to_args())?;
    Ok(Daemon {
        name: "nsqadmin",
        child,
        data_path: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary() {
        // Test spawn failure / 测试启动失败
        let opts = LookupdOptions {
            binary: PathBuf::from("/nonexistent/nsqlookupd"),
            ..LookupdOptions::default()
        };
        let err = start_nsqlookupd(&opts).unwrap_err();
        assert!(matches!(err, NsqError::Spawn { .. }));
        assert!(err.to_string().contains("nsqlookupd"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nsqd_temp_data_path() {
        // `sleep` stands in for nsqd; it rejects the flags and exits
        // 用`sleep`代替nsqd
        let opts = NsqdOptions {
            binary: PathBuf::from("sleep"),
            ..NsqdOptions::default()
        };
        let daemon = start_nsqd(&opts).unwrap();
        let data_path = daemon.data_path().unwrap().to_path_buf();
        assert!(data_path.is_dir());
        assert!(data_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("nsq-"));
        daemon.exit().await.unwrap();
        std::fs::remove_dir_all(data_path).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_kills_running_daemon() {
        let child = spawn("sleep", Path::new("sleep"), vec!["30".to_string()]).unwrap();
        let daemon = Daemon {
            name: "sleep",
            child,
            data_path: None,
        };
        assert!(daemon.pid().is_some());
        let status = daemon.exit().await.unwrap();
        assert!(!status.success());
    }
}
