//! # 工具函数模块
//!
//! 提供美化输出、进度条和 JSON 文件读写工具。
//!
//! ## 依赖关系
//! - 被 `commands/`, `batch/`, `workflow/`, `combine/` 和 `main.rs` 使用
//! - 子模块: json, output, progress

pub mod json;
pub mod output;
pub mod progress;
