//! # dos 子命令 CLI 定义
//!
//! DOS 相关功能，包含多个子命令：
//! - `interpolate`: 复能量 DOS 延拓到实轴并换算为 eV
//! - `params`: 把 DOS 围道写入 KKR 参数
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/dos.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// Dos 主命令
// ─────────────────────────────────────────────────────────────

/// dos 主命令参数
#[derive(Args, Debug)]
pub struct DosArgs {
    #[command(subcommand)]
    pub command: DosCommands,
}

/// dos 子命令
#[derive(Subcommand, Debug)]
pub enum DosCommands {
    /// Interpolate a complex-energy DOS onto the real axis
    Interpolate(InterpolateArgs),

    /// Build KKR parameters for a DOS run
    Params(ParamsArgs),
}

// ─────────────────────────────────────────────────────────────
// 插值子命令
// ─────────────────────────────────────────────────────────────

/// interpolate 子命令参数
#[derive(Args, Debug)]
pub struct InterpolateArgs {
    /// complex.dos file
    pub input: PathBuf,

    /// Filename for the CSV output
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Filename for the plot (PNG, or SVG by extension)
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Title for the plot
    #[arg(long, default_value = "Density of states")]
    pub title: String,

    /// Figure width in pixels
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Figure height in pixels
    #[arg(long, default_value_t = 800)]
    pub height: u32,
}

// ─────────────────────────────────────────────────────────────
// 参数子命令
// ─────────────────────────────────────────────────────────────

/// params 子命令参数
#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// KKR parameters of the parent SCF run (JSON)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Workflow parameters with a "dos_params" entry (JSON, defaults when absent)
    #[arg(long)]
    pub wf_parameters: Option<PathBuf>,

    /// Output file (stdout when absent)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
