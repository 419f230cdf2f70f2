//! # jij 命令实现
//!
//! 读取 Jij 运行的输出 (单文件、运行目录或 `output_all.tar.gz`)，
//! 合并交换张量并列出两个杂质物种之间的格点对。
//!
//! ## 依赖关系
//! - 使用 `cli/jij.rs` 定义的参数
//! - 使用 `parsers/jij_matrix.rs` 读取数据
//! - 使用 `analysis/jij.rs` 约化, `analysis/export.rs` 导出
//! - 使用 `tabled` 打印表格

use crate::analysis::{export, jij};
use crate::cli::jij::JijArgs;
use crate::error::{KkrError, Result};
use crate::models::ImpurityInfo;
use crate::parsers::jij_matrix;
use crate::utils::{json, output, progress};

use tabled::{Table, Tabled};

/// 表格显示行
#[derive(Tabled)]
struct PairRow {
    #[tabled(rename = "i")]
    i: usize,
    #[tabled(rename = "j")]
    j: usize,
    #[tabled(rename = "|r| (alat)")]
    distance: String,
    #[tabled(rename = "J (meV)")]
    j_mev: String,
    #[tabled(rename = "|D| (meV)")]
    d_mev: String,
    #[tabled(rename = "D (meV)")]
    d_vec: String,
}

impl From<&jij::JijPair> for PairRow {
    fn from(p: &jij::JijPair) -> Self {
        Self {
            i: p.i,
            j: p.j,
            distance: format!("{:.4}", (p.rx * p.rx + p.ry * p.ry + p.rz * p.rz).sqrt()),
            j_mev: format!("{:.4}", p.j_mev),
            d_mev: format!("{:.4}", p.d_mev),
            d_vec: format!("({:.3}, {:.3}, {:.3})", p.dx, p.dy, p.dz),
        }
    }
}

/// 杂质核电荷: 优先取参数，否则取团簇的 Zimp
fn impurity_charges(args: &JijArgs, info: &ImpurityInfo) -> Result<(f64, f64)> {
    let zimp = args.zimp.as_deref().unwrap_or(&info.zimp);
    match zimp {
        [z1, z2] => Ok((*z1, *z2)),
        other => Err(KkrError::InvalidArgument(format!(
            "two impurity charges are needed, got {:?} (use --zimp Z1 Z2)",
            other
        ))),
    }
}

/// 执行 jij 命令
pub fn execute(args: JijArgs) -> Result<()> {
    output::print_header("Exchange Tensor Reduction");

    let info: ImpurityInfo = json::read_json(&args.impurity_info)?;
    let (z1, z2) = impurity_charges(&args, &info)?;

    let spinner = progress::create_spinner(&format!("Reading {}", args.input.display()));
    let values = jij_matrix::read_jij_values(&args.input);
    spinner.finish_and_clear();
    let values = values?;

    let analysis = jij::analyze(&values, &info, z1, z2)?;
    output::print_info(&format!(
        "{} atoms, {} pairs between Z = {} and Z = {}",
        analysis.tensor.natom,
        analysis.pairs.len(),
        z1,
        z2
    ));

    if analysis.pairs.is_empty() {
        output::print_warning("No site pairs of the impurity species in the cluster");
    } else {
        let rows: Vec<PairRow> = analysis.pairs.iter().map(PairRow::from).collect();
        println!("{}", Table::new(&rows));
    }

    if let Some(path) = &args.output_csv {
        export::jij_to_csv(&analysis.pairs, path)?;
        output::print_written("pair table", path);
    }
    if let Some(path) = &args.output_txt {
        std::fs::write(path, jij::summary_text(&analysis.pairs)).map_err(|e| {
            KkrError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        output::print_written("summary", path);
    }

    output::print_done("Jij reduction finished");
    Ok(())
}
