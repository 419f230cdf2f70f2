//! # kkrtools - KKR 输出解析与杂质合并工具箱
//!
//! 处理 KKR Green 函数计算的输出端：解析输出文件、合并单杂质计算、约化交换张量和 DOS。
//!
//! ## 子命令
//! - `parse` - 解析单个运行目录
//! - `scan` - 批量解析多个运行目录
//! - `combine` - 合并两个单杂质计算
//! - `state` - 合并流程状态与外部事件
//! - `jij` - 交换张量约化
//! - `dos` - DOS 相关
//!   - `interpolate` - 复能量 DOS 延拓到实轴
//!   - `params` - DOS 计算参数
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (输出文件解析)
//!   │     ├── combine/   (团簇/势/LDA+U 合并)
//!   │     ├── analysis/  (Jij, DOS)
//!   │     ├── workflow/  (收敛判定, 状态机, 参数)
//!   │     ├── batch/     (并行扫描)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod analysis;
mod batch;
mod cli;
mod combine;
mod commands;
mod error;
mod models;
mod parsers;
mod utils;
mod workflow;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_fatal(&e);
        std::process::exit(e.exit_code());
    }
}
