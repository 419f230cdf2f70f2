//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `combine/`, `analysis/`, `workflow/`, `utils/`
//! - 子模块: parse, scan, combine, state, jij, dos

pub mod combine;
pub mod dos;
pub mod jij;
pub mod parse;
pub mod scan;
pub mod state;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Parse(args) => parse::execute(args),
        Commands::Scan(args) => scan::execute(args),
        Commands::Combine(args) => combine::execute(args),
        Commands::State(args) => state::execute(args),
        Commands::Jij(args) => jij::execute(args),
        Commands::Dos(args) => dos::execute(args),
    }
}
