//! 语言代码工具
//!
//! 语言代码统一为小写、以 `-` 分隔（`zh_CN` -> `zh-cn`）。

use crate::error::{Result, SeaBridgeError};

/// 自动检测源语言时使用的代码
pub const AUTO_LANGUAGE: &str = "auto";

/// 规整语言代码
pub fn normalize_language(code: &str) -> String {
    code.trim().replace('_', "-").to_ascii_lowercase()
}

/// 语言代码的基础部分（`zh-cn` -> `zh`）
pub fn base_language(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// 校验目标语言代码，返回规整后的代码
///
/// 格式为 2-3 位字母的基础代码，可带一个 2-4 位的地区/文字后缀。
/// `supported` 非空时，基础代码必须在其中。
pub fn validate_language_code(code: &str, supported: &[String]) -> Result<String> {
    let normalized = normalize_language(code);
    if normalized.is_empty() {
        return Err(SeaBridgeError::validation("language code must be non-empty"));
    }

    let mut parts = normalized.split('-');
    let base = parts.next().unwrap_or_default();
    let region = parts.next();
    let well_formed = (2..=3).contains(&base.len())
        && base.chars().all(|c| c.is_ascii_lowercase())
        && region.is_none_or(|r| {
            (2..=4).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric())
        })
        && parts.next().is_none();

    if !well_formed {
        return Err(SeaBridgeError::validation(format!(
            "invalid language code '{}'",
            code
        )));
    }

    if !supported.is_empty() && !supported.iter().any(|lang| lang == base) {
        return Err(SeaBridgeError::validation(format!(
            "unsupported language '{}'",
            normalized
        )));
    }

    Ok(normalized)
}

/// 校验源语言代码（允许 `auto`，不限制支持列表）
pub fn validate_source_language(code: Option<&str>) -> Result<Option<String>> {
    match code.map(normalize_language) {
        None => Ok(None),
        Some(code) if code.is_empty() || code == AUTO_LANGUAGE => Ok(None),
        Some(code) => validate_language_code(&code, &[]).map(Some),
    }
}
