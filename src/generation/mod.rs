//! 生成管线：提示词、响应解析、原始形状、归一化与带重试的编排服务

pub mod normalize;
pub mod prompts;
pub mod raw;
pub mod response;
pub mod service;

pub use normalize::{
    empty_matrix, normalize_environment, normalize_layout, normalize_matrix, normalize_schedule,
    MAX_MATRIX_SIDE,
};
pub use prompts::{environment_prompt, layout_prompt, schedule_prompt, DEFAULT_MAX_HEIGHT};
pub use response::{parse_json, strip_code_fences};
pub use service::{GenerationService, RetryPolicy};
