//! 生成客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 GenerationClient：输入一段指令文本，返回模型原始文本。
//! ClientFactory 负责为某个凭证构建一个客户端；一次构建只绑定一个凭证。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::GenerationError;
use crate::credentials::Credential;

/// 生成客户端：单条指令进、原始文本出
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// 该客户端累计消耗的 token；不统计的后端返回零值
    fn token_usage(&self) -> TokenUsage {
        TokenUsage::default()
    }
}

/// Token 消耗（提示词 / 补全）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// 模型参数（不同操作使用不同的模型与采样温度）
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl ModelProfile {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 8192,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// 按凭证构建客户端；构建失败返回 ClientConstructionFailed
pub trait ClientFactory: Send + Sync {
    fn build(
        &self,
        credential: &Credential,
        profile: &ModelProfile,
    ) -> Result<Arc<dyn GenerationClient>, GenerationError>;
}
