//! 错误恢复引擎
//!
//! 根据 GenerationError 类型返回 RecoveryAction，供重试循环决定是换凭证、标记失效还是终止。

use crate::core::{GenerationError, RecoveryAction, TransportErrorKind};

/// 语义化错误恢复：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &GenerationError) -> RecoveryAction {
        match err {
            GenerationError::Transport { kind, .. } => match kind {
                TransportErrorKind::Auth | TransportErrorKind::RateLimited => {
                    RecoveryAction::MarkFailedAndRotate
                }
                TransportErrorKind::Network | TransportErrorKind::Other => RecoveryAction::Rotate,
            },
            GenerationError::MalformedResponse { .. }
            | GenerationError::Timeout(_)
            | GenerationError::ClientConstructionFailed { .. } => RecoveryAction::Rotate,
            // 凭证耗尽需等待冷却，继续重试没有意义
            GenerationError::ExhaustedCredentials
            | GenerationError::ExhaustedAfterFailure { .. } => RecoveryAction::Abort,
            GenerationError::Cancelled => RecoveryAction::Abort,
            _ => RecoveryAction::Abort,
        }
    }
}
