//! # parse 子命令 CLI 定义
//!
//! 解析一个 KKR 运行目录。各输出文件名可单独覆盖。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/parse.rs`

use crate::parsers::kkr_run::{
    DEFAULT_NONCO_ANGLES, DEFAULT_OUTPUT_0INIT, DEFAULT_OUTPUT_000, DEFAULT_OUTPUT_2,
    DEFAULT_OUT_KKR, DEFAULT_POTENTIAL, DEFAULT_TIMING,
};

use clap::Args;
use std::path::PathBuf;

/// parse 子命令参数
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// KKR run directory
    pub dir: PathBuf,

    /// Write the output record as JSON to this file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// DOS/qdos run: skip the SCF-related extractors
    #[arg(long, default_value_t = false)]
    pub skip_readin: bool,

    /// Print the underlying reason of every failure
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    // ─────────────────────────────────────────────────────────────
    // 文件名
    // ─────────────────────────────────────────────────────────────
    /// Main output log
    #[arg(long, default_value = DEFAULT_OUT_KKR)]
    pub out_kkr: String,

    /// Initialisation log
    #[arg(long, default_value = DEFAULT_OUTPUT_0INIT)]
    pub output_0init: String,

    /// Per-iteration log
    #[arg(long, default_value = DEFAULT_OUTPUT_000)]
    pub output_000: String,

    /// Fallback log for the SCF info
    #[arg(long, default_value = DEFAULT_OUTPUT_2)]
    pub output_2: String,

    /// Timing file
    #[arg(long, default_value = DEFAULT_TIMING)]
    pub timing: String,

    /// Output potential
    #[arg(long, default_value = DEFAULT_POTENTIAL)]
    pub potential: String,

    /// Non-collinear angle file
    #[arg(long, default_value = DEFAULT_NONCO_ANGLES)]
    pub nonco_angles: String,
}
