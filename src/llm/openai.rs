//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；默认指向 Gemini 的 OpenAI 兼容接口。
//! 每个客户端只绑定一个 API Key，由 OpenAiClientFactory 按凭证构建。

use std::sync::{Arc, Mutex, PoisonError};

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::core::{GenerationError, TransportErrorKind};
use crate::credentials::Credential;
use crate::llm::{ClientFactory, GenerationClient, ModelProfile, TokenUsage};

pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// 优先看 API 返回的结构化 code / type；请求层错误看 HTTP 状态；都没有时才退回文本匹配
pub fn classify_openai_error(error: &OpenAIError) -> TransportErrorKind {
    match error {
        OpenAIError::ApiError(api) => {
            classify_api_error(api.code.as_deref(), api.r#type.as_deref())
                .unwrap_or_else(|| classify_error(&api.message))
        }
        OpenAIError::Reqwest(e) => match e.status().map(|s| s.as_u16()) {
            Some(status) => classify_status(status).unwrap_or(TransportErrorKind::Other),
            None => TransportErrorKind::Network,
        },
        other => classify_error(&other.to_string()),
    }
}

/// 按 OpenAI 风格的错误 code / type 分类；未知值返回 None
pub fn classify_api_error(code: Option<&str>, kind: Option<&str>) -> Option<TransportErrorKind> {
    [code, kind]
        .into_iter()
        .flatten()
        .find_map(|marker| match marker.to_ascii_lowercase().as_str() {
            "rate_limit_exceeded" | "rate_limit_error" | "insufficient_quota"
            | "resource_exhausted" | "429" => Some(TransportErrorKind::RateLimited),
            "invalid_api_key" | "authentication_error" | "permission_error"
            | "permission_denied" | "unauthenticated" | "401" | "403" => {
                Some(TransportErrorKind::Auth)
            }
            _ => None,
        })
}

fn classify_status(status: u16) -> Option<TransportErrorKind> {
    match status {
        429 => Some(TransportErrorKind::RateLimited),
        401 | 403 => Some(TransportErrorKind::Auth),
        500..=599 => Some(TransportErrorKind::Network),
        _ => None,
    }
}

/// 文本兜底：状态码只认独立的数字词，关键字在前
pub fn classify_error(message: &str) -> TransportErrorKind {
    let lower = message.to_lowercase();
    let mentions = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));

    if mentions(&["rate limit", "rate_limit", "quota", "resource_exhausted", "too many requests"]) {
        return TransportErrorKind::RateLimited;
    }
    if mentions(&[
        "api key",
        "api_key",
        "unauthorized",
        "permission_denied",
        "unauthenticated",
    ]) {
        return TransportErrorKind::Auth;
    }
    if mentions(&["connection", "timed out", "dns", "http error", "network"]) {
        return TransportErrorKind::Network;
    }

    lower
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|word| word.parse::<u16>().ok())
        .find_map(classify_status)
        .unwrap_or(TransportErrorKind::Other)
}

/// OpenAI 兼容客户端：持有 Client 与模型参数，generate 时发送单条 user 消息并取首条 content
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    profile: ModelProfile,
    usage: Mutex<TokenUsage>,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, api_key: &str, profile: ModelProfile) -> Self {
        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            profile,
            usage: Mutex::new(TokenUsage::default()),
        }
    }

    fn user_message(prompt: &str) -> Result<ChatCompletionRequestMessage, GenerationError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| GenerationError::transport(TransportErrorKind::Other, e.to_string()))?;
        Ok(ChatCompletionRequestMessage::User(message))
    }
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    fn token_usage(&self) -> TokenUsage {
        *self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.profile.model)
            .messages(vec![Self::user_message(prompt)?])
            .temperature(self.profile.temperature)
            .top_p(self.profile.top_p)
            .max_completion_tokens(self.profile.max_tokens)
            .build()
            .map_err(|e| GenerationError::transport(TransportErrorKind::Other, e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GenerationError::transport(classify_openai_error(&e), e.to_string()))?;

        if let Some(usage) = &response.usage {
            *self.usage.lock().unwrap_or_else(PoisonError::into_inner) += TokenUsage::new(
                u64::from(usage.prompt_tokens),
                u64::from(usage.completion_tokens),
            );
        }

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

/// 为每个凭证构建 OpenAiClient
#[derive(Debug, Clone, Default)]
pub struct OpenAiClientFactory {
    base_url: Option<String>,
}

impl OpenAiClientFactory {
    pub fn new(base_url: Option<String>) -> Self {
        Self { base_url }
    }
}

impl ClientFactory for OpenAiClientFactory {
    fn build(
        &self,
        credential: &Credential,
        profile: &ModelProfile,
    ) -> Result<Arc<dyn GenerationClient>, GenerationError> {
        let secret = credential.secret().trim();
        if secret.is_empty() || secret.chars().any(char::is_whitespace) {
            return Err(GenerationError::ClientConstructionFailed {
                credential: credential.redacted(),
                reason: "API key is empty or contains whitespace".to_string(),
            });
        }

        Ok(Arc::new(OpenAiClient::new(
            self.base_url.as_deref(),
            secret,
            profile.clone(),
        )))
    }
}
