//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HYDRO__*` 覆盖（双下划线表示嵌套，如 `HYDRO__GENERATION__MAX_ATTEMPTS=5`）。
//! API Key 另外从 `HYDRO_API_KEYS`（逗号分隔）与 `GEMINI_API_KEY` 追加。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::GenerationError;
use crate::credentials::PoolSettings;
use crate::llm::{ModelProfile, GEMINI_OPENAI_BASE_URL};

/// 逗号分隔的额外 Key
pub const API_KEYS_ENV: &str = "HYDRO_API_KEYS";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub credentials: CredentialsSection,
    pub generation: GenerationSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：端点、各操作的模型参数与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_layout_model")]
    pub layout: ModelSection,
    #[serde(default = "default_environment_model")]
    pub environment: ModelSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            layout: default_layout_model(),
            environment: default_environment_model(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_base_url() -> String {
    GEMINI_OPENAI_BASE_URL.to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_model_name() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_layout_model() -> ModelSection {
    ModelSection {
        model: default_model_name(),
        temperature: 0.6,
        top_p: 0.9,
    }
}

fn default_environment_model() -> ModelSection {
    ModelSection {
        model: default_model_name(),
        temperature: 0.7,
        top_p: 0.8,
    }
}

/// [llm.layout] / [llm.environment]
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSection {
    #[serde(default = "default_model_name")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次生成请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [credentials] 段：Key 列表、限流窗口与失效冷却
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsSection {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_window: u32,
    #[serde(default = "default_window_secs")]
    pub rate_window_secs: u64,
    #[serde(default = "default_window_secs")]
    pub failure_cooldown_secs: u64,
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            rate_limit_per_window: default_rate_limit(),
            rate_window_secs: default_window_secs(),
            failure_cooldown_secs: default_window_secs(),
        }
    }
}

fn default_rate_limit() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}

/// [generation] 段：重试预算与每次获取客户端的构建次数
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSection {
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_attempts")]
    pub client_attempts: u32,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            max_attempts: default_attempts(),
            client_attempts: default_attempts(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}

impl AppConfig {
    /// 配置文件中的 Key + HYDRO_API_KEYS + GEMINI_API_KEY，去空白、去重并保持顺序
    pub fn resolved_api_keys(&self) -> Vec<String> {
        let from_list = std::env::var(API_KEYS_ENV).unwrap_or_default();
        let single = std::env::var(GEMINI_API_KEY_ENV).unwrap_or_default();
        merge_keys(
            self.credentials
                .api_keys
                .iter()
                .map(String::as_str)
                .chain(from_list.split(','))
                .chain(std::iter::once(single.as_str())),
        )
    }

    /// 拒绝会让管线失效的零值：限流额度为 0 时任何 Key 都不可选，窗口或超时为 0 时每次请求立即失败
    pub fn validate(&self) -> Result<(), GenerationError> {
        let checks = [
            (
                "credentials.rate_limit_per_window",
                u64::from(self.credentials.rate_limit_per_window),
            ),
            ("credentials.rate_window_secs", self.credentials.rate_window_secs),
            ("llm.timeouts.request", self.llm.timeouts.request),
            ("generation.max_attempts", u64::from(self.generation.max_attempts)),
            ("generation.client_attempts", u64::from(self.generation.client_attempts)),
        ];
        match checks.iter().find(|(_, value)| *value == 0) {
            Some((key, _)) => Err(GenerationError::ConfigError(format!(
                "{key} must be greater than 0"
            ))),
            None => Ok(()),
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            rate_limit_per_window: self.credentials.rate_limit_per_window,
            rate_window: Duration::from_secs(self.credentials.rate_window_secs),
            failure_cooldown: Duration::from_secs(self.credentials.failure_cooldown_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeouts.request)
    }

    pub fn layout_profile(&self) -> ModelProfile {
        self.profile(&self.llm.layout)
    }

    pub fn environment_profile(&self) -> ModelProfile {
        self.profile(&self.llm.environment)
    }

    fn profile(&self, section: &ModelSection) -> ModelProfile {
        ModelProfile::new(section.model.clone())
            .with_temperature(section.temperature)
            .with_top_p(section.top_p)
            .with_max_tokens(self.llm.max_tokens)
    }
}

fn merge_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in keys.map(str::trim).filter(|k| !k.is_empty()) {
        if !out.iter().any(|k| k == key) {
            out.push(key.to_string());
        }
    }
    out
}

/// 从 config 目录加载配置，环境变量 HYDRO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HYDRO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HYDRO")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
