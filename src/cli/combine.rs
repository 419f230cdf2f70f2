//! # combine 子命令 CLI 定义
//!
//! 合并两个收敛的单杂质计算。杂质输入为 JSON:
//! `{"impurity_info": {...}, "host_structure": {...}, "nspin": 2, "convergence": {...}}`
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/combine.rs`

use crate::models::Offset;

use clap::{ArgGroup, Args};
use std::path::PathBuf;

/// combine 子命令参数
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("offset").required(true).args(["offset_index", "offset_vector"])))]
pub struct CombineArgs {
    /// First impurity calculation (JSON)
    #[arg(long)]
    pub imp1: PathBuf,

    /// Second impurity calculation (JSON)
    #[arg(long)]
    pub imp2: PathBuf,

    /// Offset of impurity 2 as index of the in-plane neighbour (0 = same site)
    #[arg(long, allow_negative_numbers = true)]
    pub offset_index: Option<i64>,

    /// Offset of impurity 2 as Cartesian vector in alat units ("x,y,z")
    #[arg(long, value_parser = parse_vector, allow_negative_numbers = true)]
    pub offset_vector: Option<[f64; 3]>,

    /// Converged potential of impurity 1
    #[arg(long)]
    pub pot1: PathBuf,

    /// Converged potential of impurity 2
    #[arg(long)]
    pub pot2: PathBuf,

    /// LDA+U settings of impurity 1 (JSON)
    #[arg(long)]
    pub ldau1: Option<PathBuf>,

    /// LDA+U settings of impurity 2 (JSON)
    #[arg(long)]
    pub ldau2: Option<PathBuf>,

    /// Workflow parameters of the impurity SCF (JSON)
    #[arg(long)]
    pub wf_parameters: Option<PathBuf>,

    /// Overrides applied on top of the workflow parameters (JSON)
    #[arg(long)]
    pub wf_parameters_overwrite: Option<PathBuf>,

    /// KKRimp parameters of the converged combined run, used to prepare the Jij step (JSON)
    #[arg(long)]
    pub kkrimp_parameters: Option<PathBuf>,

    /// The host Green's function for the combined cluster has been written out
    #[arg(long, default_value_t = false)]
    pub host_gf_ready: bool,

    /// The host Green's function writeout failed
    #[arg(long, default_value_t = false, conflicts_with = "host_gf_ready")]
    pub host_gf_failed: bool,

    /// Output directory
    #[arg(short, long, default_value = "combined")]
    pub output_dir: PathBuf,
}

impl CombineArgs {
    /// 偏移参数
    pub fn offset(&self) -> Option<Offset> {
        match (self.offset_index, self.offset_vector) {
            (Some(index), _) => Some(Offset::Index(index)),
            (None, Some(v)) => Some(Offset::Vector(v)),
            (None, None) => None,
        }
    }
}

/// 解析 "x,y,z"
pub fn parse_vector(input: &str) -> Result<[f64; 3], String> {
    let parts: Vec<f64> = input
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid vector '{}': {}", input, e))?;
    match parts.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("expected three components, got '{}'", input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1, -0.5,0").unwrap(), [1.0, -0.5, 0.0]);
        assert!(parse_vector("1,2").is_err());
        assert!(parse_vector("a,b,c").is_err());
    }
}
