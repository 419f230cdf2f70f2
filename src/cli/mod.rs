//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `parse`: 解析单个 KKR 运行目录
//! - `scan`: 批量解析多个运行目录
//! - `combine`: 合并两个单杂质计算
//! - `state`: 查看合并流程状态, 记录外部作业事件
//! - `jij`: 约化交换张量
//! - `dos`: DOS 相关（嵌套子命令）
//!   - `interpolate`: 复能量 DOS 延拓到实轴
//!   - `params`: 生成 DOS 计算参数
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: parse, scan, combine, state, jij, dos

pub mod combine;
pub mod dos;
pub mod jij;
pub mod parse;
pub mod scan;
pub mod state;

use clap::{Parser, Subcommand};

/// kkrtools - KKR 输出解析与杂质合并工具箱
#[derive(Parser)]
#[command(name = "kkrtools")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Output parsing and impurity combination toolkit for KKR calculations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Parse the output files of one KKR run directory
    Parse(parse::ParseArgs),

    /// Parse many KKR run directories in parallel and summarise them
    Scan(scan::ScanArgs),

    /// Combine two converged single-impurity calculations
    Combine(combine::CombineArgs),

    /// Show the combine workflow state or record an event of an external job
    State(state::StateArgs),

    /// Reduce the exchange tensor of a Jij run
    Jij(jij::JijArgs),

    /// Density-of-states tools
    Dos(dos::DosArgs),
}
