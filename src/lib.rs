//! Hydro Planner - 水培种植规划的生成管线
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与恢复策略
//! - **credentials**: API Key 池（轮询、限流窗口、失效冷却）
//! - **domain**: 组件编码、布局、虚拟环境与自动化任务
//! - **generation**: 提示词、响应解析、归一化与重试编排
//! - **llm**: 生成客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化

pub mod config;
pub mod core;
pub mod credentials;
pub mod domain;
pub mod generation;
pub mod llm;
pub mod observability;

pub use generation::{GenerationService, RetryPolicy};
