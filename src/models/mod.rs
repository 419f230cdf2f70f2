//! # 数据模型模块
//!
//! 定义 KKR 输出记录和杂质团簇的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `combine/`, `analysis/` 和 `commands/` 使用
//! - 子模块: output, impurity

pub mod impurity;
pub mod output;

pub use impurity::{HostStructure, ImpurityInfo, KickoutRecord, Offset, Source};
pub use output::OutputRecord;
