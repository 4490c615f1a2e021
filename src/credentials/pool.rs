//! 凭证池与选择器
//!
//! 轮询游标 + 每个 Key 的失效标记与限流窗口。所有状态集中在 PoolState 中，由一把 Mutex 保护：
//! 选择、计数、标记失效、重置都是「读-改-写」，必须在同一把锁内完成。
//!
//! 全部 Key 失效后记录时间点，冷却期过后的下一次访问自动清空失效标记（惰性执行，无需后台定时器）。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::GenerationError;
use crate::credentials::{Clock, SystemClock};

/// 日志中只展示 Key 的前 8 个字符
const REDACTED_PREFIX_LEN: usize = 8;

/// 单个 API Key（不透明字符串）；Debug / Display 均脱敏
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    secret: String,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// 原始密钥，仅在构建客户端时使用
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn redacted(&self) -> String {
        let prefix: String = self.secret.chars().take(REDACTED_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.redacted()).finish()
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

/// 限流与冷却参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// 每个窗口内单 Key 最多请求数
    pub rate_limit_per_window: u32,
    pub rate_window: Duration,
    /// 全部 Key 失效后多久自动恢复
    pub failure_cooldown: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            rate_limit_per_window: 60,
            rate_window: Duration::from_secs(60),
            failure_cooldown: Duration::from_secs(60),
        }
    }
}

/// 单个 Key 的健康状态快照（诊断用）
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CredentialStatus {
    pub key: String,
    pub failed: bool,
    pub requests_in_window: u32,
    pub used: bool,
}

#[derive(Debug)]
struct KeyState {
    credential: Credential,
    failed: bool,
    last_used: Option<Instant>,
    request_count: u32,
    window_start: Instant,
}

#[derive(Debug)]
struct PoolState {
    keys: Vec<KeyState>,
    cursor: usize,
    /// 全部 Key 失效的时刻；冷却期满后自动清空失效标记
    all_failed_since: Option<Instant>,
}

/// 凭证池：有序、非空的 Key 列表及其状态
#[derive(Debug)]
pub struct CredentialPool {
    state: Mutex<PoolState>,
    settings: PoolSettings,
    clock: Arc<dyn Clock>,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>, settings: PoolSettings) -> Result<Self, GenerationError> {
        Self::with_clock(keys, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        keys: Vec<String>,
        settings: PoolSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GenerationError> {
        if keys.is_empty() {
            return Err(GenerationError::ConfigError(
                "at least one API key is required".to_string(),
            ));
        }

        let now = clock.now();
        let keys = keys
            .into_iter()
            .map(|secret| KeyState {
                credential: Credential::new(secret),
                failed: false,
                last_used: None,
                request_count: 0,
                window_start: now,
            })
            .collect();

        Ok(Self {
            state: Mutex::new(PoolState {
                keys,
                cursor: 0,
                all_failed_since: None,
            }),
            settings,
            clock,
        })
    }

    pub fn len(&self) -> usize {
        self.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn settings(&self) -> PoolSettings {
        self.settings
    }

    /// 选出下一个可用 Key：跳过失效与限流的 Key，最多扫描一整圈
    pub fn select(&self) -> Result<Credential, GenerationError> {
        let now = self.clock.now();
        let mut state = self.lock();
        self.expire_cooldown(&mut state, now);

        let len = state.keys.len();
        for _ in 0..len {
            let index = state.cursor;
            state.cursor = (state.cursor + 1) % len;

            let key = &mut state.keys[index];
            if key.failed {
                continue;
            }

            if now.saturating_duration_since(key.window_start) > self.settings.rate_window {
                key.request_count = 0;
                key.window_start = now;
            }

            if key.request_count >= self.settings.rate_limit_per_window {
                tracing::debug!("API key rate limited, skipping: {}", key.credential);
                continue;
            }

            key.request_count += 1;
            key.last_used = Some(now);
            tracing::debug!(
                "Selected API key {} ({}/{} in window)",
                key.credential,
                key.request_count,
                self.settings.rate_limit_per_window
            );
            return Ok(key.credential.clone());
        }

        Err(GenerationError::ExhaustedCredentials)
    }

    /// 标记 Key 失效；若因此全部失效，冷却期后自动恢复
    pub fn mark_failed(&self, credential: &Credential) {
        let now = self.clock.now();
        let mut state = self.lock();

        let Some(key) = state
            .keys
            .iter_mut()
            .find(|k| &k.credential == credential)
        else {
            return;
        };
        key.failed = true;
        tracing::warn!("API key marked as failed: {}", credential);

        if state.keys.iter().all(|k| k.failed) && state.all_failed_since.is_none() {
            state.all_failed_since = Some(now);
            tracing::warn!(
                "All API keys failed, resetting in {}s",
                self.settings.failure_cooldown.as_secs()
            );
        }
    }

    /// 手动清除 Key 的失效标记
    pub fn reset(&self, credential: &Credential) {
        let mut state = self.lock();
        if let Some(key) = state
            .keys
            .iter_mut()
            .find(|k| &k.credential == credential)
        {
            key.failed = false;
            state.all_failed_since = None;
        }
    }

    pub fn status(&self) -> Vec<CredentialStatus> {
        let now = self.clock.now();
        let mut state = self.lock();
        self.expire_cooldown(&mut state, now);

        state
            .keys
            .iter()
            .map(|k| CredentialStatus {
                key: k.credential.redacted(),
                failed: k.failed,
                requests_in_window: k.request_count,
                used: k.last_used.is_some(),
            })
            .collect()
    }

    fn expire_cooldown(&self, state: &mut PoolState, now: Instant) {
        let Some(since) = state.all_failed_since else {
            return;
        };
        if now.saturating_duration_since(since) >= self.settings.failure_cooldown {
            for key in state.keys.iter_mut() {
                key.failed = false;
            }
            state.all_failed_since = None;
            tracing::info!("Resetting failed API keys status");
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
