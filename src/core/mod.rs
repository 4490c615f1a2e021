//! 核心层：错误类型与恢复策略

pub mod error;
pub mod recovery;

pub use error::{GenerationError, RecoveryAction, TransportErrorKind};
pub use recovery::RecoveryEngine;
