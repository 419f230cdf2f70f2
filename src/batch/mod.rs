//! # 批量处理模块
//!
//! 批量扫描多个 KKR 运行目录。
//!
//! ## 功能
//! - 收集运行目录
//! - 并行解析
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/scan.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::RunCollector;
pub use runner::{BatchRunner, ProcessResult};
