//! Mock 生成客户端（用于测试与离线运行，无需 API）
//!
//! 所有由同一个 MockClientFactory 构建的客户端共享一份脚本：每次 generate 依次弹出一条回复，
//! 脚本耗尽后使用 fallback。工厂记录每次构建用到的凭证，便于断言「每次重试换了 Key」。

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::core::{GenerationError, TransportErrorKind};
use crate::credentials::Credential;
use crate::llm::{ClientFactory, GenerationClient, ModelProfile, TokenUsage};

/// 脚本中的一条回复
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(TransportErrorKind, String),
    /// 永不返回（用于超时与取消测试）
    Hang,
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        MockReply::Text(content.into())
    }
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockReply>,
    prompts: Vec<String>,
    builds: Vec<Credential>,
}

/// Mock 客户端：从共享脚本中取回复；token 按空白分词计数
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
    fallback: MockReply,
    usage: Mutex<TokenUsage>,
}

#[async_trait]
impl GenerationClient for MockClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let reply = {
            let mut state = lock(&self.state);
            state.prompts.push(prompt.to_string());
            state
                .script
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        };

        match reply {
            MockReply::Text(text) => {
                let counted = TokenUsage::new(
                    prompt.split_whitespace().count() as u64,
                    text.split_whitespace().count() as u64,
                );
                *self.usage.lock().unwrap_or_else(PoisonError::into_inner) += counted;
                Ok(text)
            }
            MockReply::Fail(kind, message) => Err(GenerationError::transport(kind, message)),
            MockReply::Hang => {
                std::future::pending::<()>().await;
                Err(GenerationError::Cancelled)
            }
        }
    }

    fn token_usage(&self) -> TokenUsage {
        *self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock 工厂：按脚本构建客户端，可指定某些 Key 构建失败
#[derive(Clone)]
pub struct MockClientFactory {
    state: Arc<Mutex<MockState>>,
    fallback: MockReply,
    rejected: Arc<HashSet<String>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            fallback: MockReply::text("{}"),
            rejected: Arc::new(HashSet::new()),
        }
    }

    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        lock(&self.state).script.extend(replies);
        self
    }

    pub fn with_fallback(mut self, fallback: MockReply) -> Self {
        self.fallback = fallback;
        self
    }

    /// 使用该 Key 构建客户端时返回 ClientConstructionFailed
    pub fn reject_key(mut self, secret: impl Into<String>) -> Self {
        let mut rejected = (*self.rejected).clone();
        rejected.insert(secret.into());
        self.rejected = Arc::new(rejected);
        self
    }

    /// 已发送的指令（按顺序）
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.state).prompts.clone()
    }

    /// 每次成功构建客户端时绑定的凭证（按顺序）
    pub fn builds(&self) -> Vec<Credential> {
        lock(&self.state).builds.clone()
    }
}

impl Default for MockClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for MockClientFactory {
    fn build(
        &self,
        credential: &Credential,
        _profile: &ModelProfile,
    ) -> Result<Arc<dyn GenerationClient>, GenerationError> {
        if self.rejected.contains(credential.secret()) {
            return Err(GenerationError::ClientConstructionFailed {
                credential: credential.redacted(),
                reason: "rejected by mock factory".to_string(),
            });
        }

        lock(&self.state).builds.push(credential.clone());
        Ok(Arc::new(MockClient {
            state: Arc::clone(&self.state),
            fallback: self.fallback.clone(),
            usage: Mutex::new(TokenUsage::default()),
        }))
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
