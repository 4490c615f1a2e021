//! 生成编排：布局、虚拟环境、作息优化
//!
//! 三个操作共用同一重试协议：组装提示词 -> 取客户端 -> 调用（带超时与取消） -> 剥离围栏解析 JSON -> 归一化。
//! 解析失败与传输失败走同一条路：按 RecoveryEngine 的建议换 Key（必要时先标记失效）后重试，直到预算用尽。

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::{GenerationError, RecoveryAction, RecoveryEngine};
use crate::credentials::{CredentialPool, CredentialStatus};
use crate::domain::{LayoutAnalysis, LayoutRequest, VirtualEnvironment};
use crate::generation::normalize::{normalize_environment, normalize_layout, normalize_schedule};
use crate::generation::prompts::{environment_prompt, layout_prompt, schedule_prompt};
use crate::generation::response::parse_json;
use crate::llm::{ClientFactory, ClientProvider, ModelProfile, PooledClientProvider, TokenUsage};

/// 重试预算与单次请求超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct GenerationService {
    provider: Arc<dyn ClientProvider>,
    policy: RetryPolicy,
    layout_profile: ModelProfile,
    environment_profile: ModelProfile,
    recovery: RecoveryEngine,
    /// 成功调用累计消耗的 token
    usage: Mutex<TokenUsage>,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        let defaults = AppConfig::default();
        Self {
            provider,
            policy: RetryPolicy::default(),
            layout_profile: defaults.layout_profile(),
            environment_profile: defaults.environment_profile(),
            recovery: RecoveryEngine::new(),
            usage: Mutex::new(TokenUsage::default()),
        }
    }

    /// 由配置构建：凭证池 + 指定工厂（OpenAI 兼容或 Mock）
    pub fn from_config(
        config: &AppConfig,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        let pool = CredentialPool::new(config.resolved_api_keys(), config.pool_settings())?;
        let provider = PooledClientProvider::new(Arc::new(pool), factory)
            .with_client_attempts(config.generation.client_attempts);

        Ok(Self::new(Arc::new(provider))
            .with_policy(RetryPolicy {
                max_attempts: config.generation.max_attempts,
                request_timeout: config.request_timeout(),
            })
            .with_profiles(config.layout_profile(), config.environment_profile()))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = RetryPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        self
    }

    pub fn with_profiles(mut self, layout: ModelProfile, environment: ModelProfile) -> Self {
        self.layout_profile = layout;
        self.environment_profile = environment;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn credential_status(&self) -> Vec<CredentialStatus> {
        self.provider.status()
    }

    pub fn token_usage(&self) -> TokenUsage {
        *self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn generate_layout(
        &self,
        request: &LayoutRequest,
    ) -> Result<LayoutAnalysis, GenerationError> {
        self.generate_layout_with_cancel(request, &CancellationToken::new())
            .await
    }

    pub async fn generate_layout_with_cancel(
        &self,
        request: &LayoutRequest,
        cancel: &CancellationToken,
    ) -> Result<LayoutAnalysis, GenerationError> {
        let prompt = layout_prompt(request);
        let value = self
            .run("generate_layout", &prompt, &self.layout_profile, cancel)
            .await?;
        let layout = normalize_layout(&value, request);
        tracing::info!(
            "Layout generated: {} levels, dimensions {:?}",
            layout.levels,
            layout.dimensions()
        );
        Ok(layout)
    }

    pub async fn generate_virtual_environment(
        &self,
        layout: &LayoutAnalysis,
    ) -> Result<VirtualEnvironment, GenerationError> {
        self.generate_virtual_environment_with_cancel(layout, &CancellationToken::new())
            .await
    }

    pub async fn generate_virtual_environment_with_cancel(
        &self,
        layout: &LayoutAnalysis,
        cancel: &CancellationToken,
    ) -> Result<VirtualEnvironment, GenerationError> {
        let prompt = environment_prompt(layout);
        let value = self
            .run(
                "generate_virtual_environment",
                &prompt,
                &self.environment_profile,
                cancel,
            )
            .await?;
        let environment = normalize_environment(&value, layout);
        tracing::info!(
            "Virtual environment generated: {} tasks, {} monitoring points",
            environment.automation_tasks.len(),
            environment.monitoring_points.len()
        );
        Ok(environment)
    }

    /// 重新生成作息表，其余字段原样保留
    pub async fn optimize_schedule(
        &self,
        environment: &VirtualEnvironment,
    ) -> Result<VirtualEnvironment, GenerationError> {
        self.optimize_schedule_with_cancel(environment, &CancellationToken::new())
            .await
    }

    pub async fn optimize_schedule_with_cancel(
        &self,
        environment: &VirtualEnvironment,
        cancel: &CancellationToken,
    ) -> Result<VirtualEnvironment, GenerationError> {
        let prompt = schedule_prompt(environment);
        let value = self
            .run(
                "optimize_schedule",
                &prompt,
                &self.environment_profile,
                cancel,
            )
            .await?;

        // 模型有时把作息表包在 {"schedule": {...}} 里
        let schedule_value = match value.get("schedule") {
            Some(inner) if value.get("lighting").is_none() => inner,
            _ => &value,
        };

        Ok(VirtualEnvironment {
            schedule: normalize_schedule(Some(schedule_value), &environment.schedule),
            ..environment.clone()
        })
    }

    /// 共用重试循环：每次尝试都重新获取客户端；返回解析后的 JSON
    async fn run(
        &self,
        operation: &'static str,
        prompt: &str,
        profile: &ModelProfile,
        cancel: &CancellationToken,
    ) -> Result<Value, GenerationError> {
        let max_attempts = self.policy.max_attempts;
        let mut last_error: Option<GenerationError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            let lease = match self.provider.acquire(profile) {
                Ok(lease) => lease,
                Err(e) => {
                    if self.recovery.handle(&e) == RecoveryAction::Abort {
                        let e = match (e, last_error) {
                            (GenerationError::ExhaustedCredentials, Some(previous)) => {
                                tracing::warn!(
                                    "{} ran out of API keys after: {}",
                                    operation,
                                    previous
                                );
                                GenerationError::ExhaustedAfterFailure {
                                    last_failure: Box::new(previous),
                                }
                            }
                            (e, _) => e,
                        };
                        tracing::error!("{} aborted: {}", operation, e);
                        return Err(e);
                    }
                    tracing::warn!(
                        "{} attempt {}/{} could not acquire a client: {}",
                        operation,
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = Some(e);
                    continue;
                }
            };

            tracing::debug!(
                "{} attempt {}/{} using key {}",
                operation,
                attempt,
                max_attempts,
                lease.credential
            );

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(GenerationError::Cancelled),
                result = timeout(self.policy.request_timeout, lease.client.generate(prompt)) => {
                    match result {
                        Ok(Ok(text)) => parse_json(&text),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(GenerationError::Timeout(self.policy.request_timeout)),
                    }
                }
            };

            let err = match outcome {
                Ok(value) => {
                    let usage = lease.client.token_usage();
                    *self.usage.lock().unwrap_or_else(PoisonError::into_inner) += usage;
                    tracing::info!(
                        "{} succeeded on attempt {}/{} (tokens: {} prompt + {} completion)",
                        operation,
                        attempt,
                        max_attempts,
                        usage.prompt_tokens,
                        usage.completion_tokens
                    );
                    return Ok(value);
                }
                Err(e) => e,
            };

            match self.recovery.handle(&err) {
                RecoveryAction::Abort => {
                    tracing::warn!("{} aborted on attempt {}: {}", operation, attempt, err);
                    return Err(err);
                }
                RecoveryAction::MarkFailedAndRotate => {
                    self.provider.report_failure(&lease.credential);
                }
                RecoveryAction::Rotate => {}
            }

            tracing::warn!(
                "{} failed (attempt {}/{}): {}",
                operation,
                attempt,
                max_attempts,
                err
            );
            last_error = Some(err);
        }

        Err(GenerationError::GenerationFailed {
            operation,
            attempts: max_attempts,
            source: Box::new(last_error.unwrap_or(GenerationError::ExhaustedCredentials)),
        })
    }
}
