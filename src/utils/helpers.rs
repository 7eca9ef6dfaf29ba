//! 辅助工具函数模块
//!
//! 文件名、存储路径片段与文本度量

/// 提取小写扩展名（不含点），无扩展名时返回 None
pub fn file_extension(file_name: &str) -> Option<String> {
    let trimmed = file_name.trim();
    let dot_index = trimmed.rfind('.')?;
    if dot_index == trimmed.len() - 1 {
        return None;
    }
    let ext = &trimmed[dot_index + 1..];
    if ext.contains(['/', '\\']) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// 将任意字符串规整为安全的对象存储路径片段
pub fn sanitize_segment(segment: &str) -> String {
    let trimmed = segment.trim_matches('/');
    let mut sanitized = String::with_capacity(trimmed.len());

    for ch in trimmed.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_lowercase() || lower.is_ascii_digit() || lower == '-' || lower == '_' {
            sanitized.push(lower);
        } else {
            sanitized.push('-');
        }
    }

    sanitized.trim_matches('-').to_string()
}

/// UTF-8 字节长度
pub fn byte_len(text: &str) -> u64 {
    text.len() as u64
}

/// 行数（空文本为 0 行，末尾换行不额外计数）
pub fn line_count(text: &str) -> u64 {
    text.lines().count() as u64
}
