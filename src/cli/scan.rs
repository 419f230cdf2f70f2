//! # scan 子命令 CLI 定义
//!
//! 批量解析根目录下的 KKR 运行目录
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/scan.rs`

use clap::Args;
use std::path::PathBuf;

/// scan 子命令参数
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Root directory containing KKR run directories
    pub root: PathBuf,

    /// Glob pattern for run directory names (comma separated, e.g. "scf*,dos*")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0, env = "KKRTOOLS_JOBS")]
    pub jobs: usize,

    /// Treat all runs as DOS/qdos runs (skip SCF-related extractors)
    #[arg(long, default_value_t = false)]
    pub skip_readin: bool,

    /// Filename for the summary CSV output
    #[arg(long)]
    pub output_csv: Option<PathBuf>,
}
