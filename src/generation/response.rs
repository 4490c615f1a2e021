//! 模型原始文本 -> JSON：剥离 Markdown 代码围栏后严格解析，失败即返回 MalformedResponse

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::core::GenerationError;

static LEADING_FENCE_RE: OnceLock<Regex> = OnceLock::new();
static TRAILING_FENCE_RE: OnceLock<Regex> = OnceLock::new();
static EMBEDDED_BLOCK_RE: OnceLock<Regex> = OnceLock::new();

/// 去掉首尾的 ``` / ```json 围栏与空白；若围栏前后还夹着说明文字，取第一个围栏块的内容
pub fn strip_code_fences(raw: &str) -> String {
    let leading = LEADING_FENCE_RE
        .get_or_init(|| Regex::new(r"^\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?").unwrap());
    let trailing =
        TRAILING_FENCE_RE.get_or_init(|| Regex::new(r"\r?\n?[ \t]*```\s*$").unwrap());

    let without_leading = leading.replace(raw, "");
    let cleaned = trailing.replace(&without_leading, "");
    let cleaned = cleaned.trim();

    let looks_like_json = cleaned.starts_with('{') || cleaned.starts_with('[');
    if !looks_like_json && cleaned.contains("```") {
        let embedded = EMBEDDED_BLOCK_RE
            .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").unwrap());
        if let Some(inner) = embedded.captures(raw).and_then(|c| c.get(1)) {
            return inner.as_str().trim().to_string();
        }
    }

    cleaned.to_string()
}

/// 剥离围栏后解析 JSON；不做任何局部修补
pub fn parse_json(raw: &str) -> Result<Value, GenerationError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| GenerationError::malformed(&e, &cleaned))
}
