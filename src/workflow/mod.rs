//! # 工作流支持模块
//!
//! 合并流程和 DOS 流程中与外部调度无关的部分: 收敛判定、状态机和参数处理。
//!
//! ## 子模块
//! - `convergence`: 按输入来源判定收敛
//! - `combine`: 合并流程状态机与输入
//! - `params`: 参数合并, Jij 参数, DOS 参数
//!
//! ## 依赖关系
//! - 被 `commands/combine.rs`, `commands/state.rs`, `commands/dos.rs`, `commands/parse.rs` 使用

pub mod combine;
pub mod convergence;
pub mod params;

pub use combine::{CombineEvent, CombineState, ImpurityInput, WorkflowState};
pub use convergence::ConvergenceSource;
pub use params::{read_params, Params};
