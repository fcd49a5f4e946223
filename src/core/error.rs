use thiserror::Error;

/// 致命错误：中止整个视频的分析请求
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Video source unreadable: {source_name}: {reason}")]
    SourceUnreadable { source_name: String, reason: String },
    #[error("Frame storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("No frames successfully scored ({sampled} sampled, {failed} failed)")]
    NoFramesScored { sampled: usize, failed: usize },
    #[error("Deadline exceeded after {elapsed_ms}ms during {stage}")]
    DeadlineExceeded { elapsed_ms: u64, stage: &'static str },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl AnalysisError {
    pub fn source_unreadable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// 稳定的错误类型名，给 api 层和日志用
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnreadable { .. } => "SourceUnreadable",
            Self::Storage(_) => "Storage",
            Self::NoFramesScored { .. } => "NoFramesScored",
            Self::DeadlineExceeded { .. } => "DeadlineExceeded",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::WorkerPool(_) => "WorkerPool",
        }
    }
}

/// 单帧可恢复错误：只计数，不会升级为致命错误
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Scorer failed: {0}")]
    Scorer(#[from] ScoreError),
    #[error("Invalid confidence: {0}")]
    InvalidConfidence(f32),
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed classifier output: {0}")]
    Malformed(String),
    #[error("Classifier timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

/// 解码中途出错；采样器把它当作流结束处理
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Truncated frame: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("Corrupt frame: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),
}
