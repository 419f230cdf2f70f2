//! # JSON 文件读写
//!
//! 杂质输入、参数、LDA+U 设置和流程状态都以 JSON 文件交换，统一经过这里读写。
//!
//! ## 依赖关系
//! - 被 `commands/`, `workflow/`, `combine/ldau.rs` 使用
//! - 使用 `serde_json`

use crate::error::{KkrError, Result};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// 读取 JSON 文件，文件不存在时返回 `FileNotFound`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(KkrError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|e| KkrError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// 写出格式化 JSON
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).map_err(|e| KkrError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
