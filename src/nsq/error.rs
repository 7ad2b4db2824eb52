use thiserror::Error;

/// NSQ error types / NSQ错误类型
#[derive(Error, Debug)]
pub enum NsqError {
    #[error("no topic or message")]
    EmptyTopicOrMessage,

    /// Topic or channel name rejected by NSQ naming rules / 主题或通道名不符合NSQ命名规则
    #[error("invalid topic or channel name: {0}")]
    InvalidName(String),

    #[error("use subscribe instead of set_handler, \"{0}\" is new")]
    NotSubscribed(String),

    #[error("publish failed: {0}")]
    Publish(String),

    /// nsqd did not become healthy or acknowledge in time / nsqd未及时就绪或确认
    #[error("timed out waiting for nsqd")]
    Timeout,

    #[error("producer connection is unhealthy")]
    Unhealthy,

    #[error("producer closed")]
    Closed,

    #[error("failed to start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for NSQ operations / NSQ操作的结果类型别名
pub type NsqResult<T> = Result<T, NsqError>;
