//! 生成管线错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 GenerationError 决定换凭证重试 / 标记凭证失效后重试 / 终止。

use std::time::Duration;

use thiserror::Error;

/// 传输层错误分类（决定是否需要把凭证标记为失效）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// 鉴权失败（Key 无效、被吊销）
    Auth,
    /// 服务端限流 / 配额耗尽
    RateLimited,
    /// 网络层错误（连接、DNS、读写）
    Network,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::Auth => write!(f, "auth"),
            TransportErrorKind::RateLimited => write!(f, "rate-limited"),
            TransportErrorKind::Network => write!(f, "network"),
            TransportErrorKind::Other => write!(f, "other"),
        }
    }
}

/// 生成管线中可能出现的错误（凭证、传输、解析、重试预算、任务管理、配置）
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("All API keys are either failed or rate limited")]
    ExhaustedCredentials,

    /// 本次调用已有失败、随后凭证耗尽；保留耗尽前最后一次失败的原因
    #[error("All API keys are either failed or rate limited; last failure: {last_failure}")]
    ExhaustedAfterFailure {
        #[source]
        last_failure: Box<GenerationError>,
    },

    #[error("Failed to create generation client for key {credential}: {reason}")]
    ClientConstructionFailed { credential: String, reason: String },

    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("Generation request timed out after {0:?}")]
    Timeout(Duration),

    /// 围栏剥离后仍无法解析为 JSON；snippet 为截断后的原文，便于排查
    #[error("Malformed response: {reason}; response: {snippet}")]
    MalformedResponse { reason: String, snippet: String },

    #[error("Generation cancelled")]
    Cancelled,

    #[error("{operation} failed after {attempts} attempts: {source}")]
    GenerationFailed {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: Box<GenerationError>,
    },

    #[error("Automation task not found: {0}")]
    TaskNotFound(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl GenerationError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        GenerationError::Transport {
            kind,
            message: message.into(),
        }
    }

    /// 由 serde_json 错误构造 MalformedResponse，原文最多保留 200 字符
    pub fn malformed(err: &serde_json::Error, raw: &str) -> Self {
        let snippet: String = raw.chars().take(200).collect();
        GenerationError::MalformedResponse {
            reason: err.to_string(),
            snippet,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            GenerationError::ExhaustedCredentials | GenerationError::ExhaustedAfterFailure { .. }
        )
    }

    /// GenerationFailed 包裹的最终原因；其它错误返回自身
    pub fn root_cause(&self) -> &GenerationError {
        match self {
            GenerationError::GenerationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 换一个凭证重建客户端后重试（解析失败、超时、普通网络错误）
    Rotate,
    /// 先将当前凭证标记为失效，再换凭证重试（鉴权失败、限流）
    MarkFailedAndRotate,
    /// 终止当前调用
    Abort,
}
