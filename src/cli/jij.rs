//! # jij 子命令 CLI 定义
//!
//! 从 Jij 运行的输出约化交换张量
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/jij.rs`

use clap::Args;
use std::path::PathBuf;

/// jij 子命令参数
#[derive(Args, Debug)]
pub struct JijArgs {
    /// out_Jijmatrix file, run directory, or output_all.tar.gz archive
    pub input: PathBuf,

    /// Combined impurity cluster (JSON, as written by `combine`)
    #[arg(long)]
    pub impurity_info: PathBuf,

    /// Nuclear charges of the two impurities (default: Zimp of the cluster)
    #[arg(long, num_args = 2)]
    pub zimp: Option<Vec<f64>>,

    /// Filename for the pair table CSV output
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Filename for the text summary
    #[arg(long)]
    pub output_txt: Option<PathBuf>,
}
