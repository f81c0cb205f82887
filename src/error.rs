use crate::policy::RejectReason;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WrtPilotError {
    /// provider 응답에서 플랜 JSON을 복구하지 못함
    #[error("Failed to parse plan: {0}")]
    Parse(String),

    #[error("Plan rejected by policy: command {index} {reason}")]
    PolicyRejection { index: usize, reason: RejectReason },

    /// 전송/인증/쿼터 등 provider 측 실패
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 대화형 세션의 잘못된 입력 (`set`, `!N` 등)
    #[error("{0}")]
    Session(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("User cancelled")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for WrtPilotError {
    fn from(e: reqwest::Error) -> Self {
        // URL에 쿼리 파라미터로 들어간 인증 정보가 메시지에 남지 않도록 제거
        WrtPilotError::Provider(e.without_url().to_string())
    }
}

pub type Result<T> = std::result::Result<T, WrtPilotError>;

/// 단일 명령어 실행 실패 (배치 전체에는 치명적이지 않음)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionFailure {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to start: {0}")]
    Spawn(String),

    #[error("exit status {0}")]
    NonZeroExit(i32),

    #[error("terminated by signal {0}")]
    Signaled(i32),

    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,
}
