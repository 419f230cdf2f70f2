//! # state 子命令 CLI 定义
//!
//! 查看合并流程的状态，并记录外部作业 (SCF, Jij) 报告的事件
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/state.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// state 子命令参数
#[derive(Args, Debug)]
pub struct StateArgs {
    /// Output directory of `combine` (holds workflow_state.json)
    pub dir: PathBuf,

    /// Event reported by the job runner
    #[arg(long, value_enum)]
    pub event: Option<StateEvent>,
}

/// 外部作业事件
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StateEvent {
    /// The impurity SCF run was submitted
    ScfSubmitted,
    /// The impurity SCF run finished and converged
    ScfFinished,
    /// The impurity SCF run failed
    ScfFailed,
    /// The Jij run finished
    JijFinished,
    /// The Jij run failed
    JijFailed,
}
