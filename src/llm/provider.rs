//! 客户端提供者：每次调用都重新选 Key、重新构建客户端
//!
//! 重试循环只依赖 ClientProvider，不关心 Key 如何轮换；凭证策略集中在 PooledClientProvider。

use std::sync::Arc;

use crate::core::GenerationError;
use crate::credentials::{Credential, CredentialPool, CredentialStatus};
use crate::llm::{ClientFactory, GenerationClient, ModelProfile};

/// 一次租用：客户端及其绑定的凭证（失败时据此回报）
#[derive(Clone)]
pub struct ClientLease {
    pub credential: Credential,
    pub client: Arc<dyn GenerationClient>,
}

impl std::fmt::Debug for ClientLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLease")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

pub trait ClientProvider: Send + Sync {
    /// 获取一个全新的客户端（换 Key）
    fn acquire(&self, profile: &ModelProfile) -> Result<ClientLease, GenerationError>;

    /// 回报凭证失效（鉴权失败、限流）
    fn report_failure(&self, credential: &Credential);

    /// 凭证健康快照；不基于凭证池的实现返回空
    fn status(&self) -> Vec<CredentialStatus> {
        Vec::new()
    }
}

/// 基于凭证池的提供者：最多尝试 client_attempts 次「选 Key + 构建客户端」
pub struct PooledClientProvider {
    pool: Arc<CredentialPool>,
    factory: Arc<dyn ClientFactory>,
    client_attempts: u32,
}

impl PooledClientProvider {
    pub fn new(pool: Arc<CredentialPool>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            pool,
            factory,
            client_attempts: 3,
        }
    }

    pub fn with_client_attempts(mut self, attempts: u32) -> Self {
        self.client_attempts = attempts.max(1);
        self
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    /// 创建客户端：选 Key 或构建失败都记录下来并换下一个 Key，用尽次数后返回最后一个错误
    pub fn create_client(
        &self,
        profile: &ModelProfile,
        max_attempts: u32,
    ) -> Result<ClientLease, GenerationError> {
        let mut last_error: Option<GenerationError> = None;

        for attempt in 1..=max_attempts {
            let built = self.pool.select().and_then(|credential| {
                self.factory
                    .build(&credential, profile)
                    .map(|client| ClientLease { credential, client })
            });

            match built {
                Ok(lease) => return Ok(lease),
                Err(e) => {
                    tracing::error!(
                        "Failed to create generation client (attempt {}/{}): {}",
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(GenerationError::ExhaustedCredentials))
    }
}

impl ClientProvider for PooledClientProvider {
    fn acquire(&self, profile: &ModelProfile) -> Result<ClientLease, GenerationError> {
        self.create_client(profile, self.client_attempts)
    }

    fn report_failure(&self, credential: &Credential) {
        self.pool.mark_failed(credential);
    }

    fn status(&self) -> Vec<CredentialStatus> {
        self.pool.status()
    }
}
