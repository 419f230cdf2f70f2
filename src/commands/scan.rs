//! # scan 命令实现
//!
//! 并行解析根目录下所有 KKR 运行目录，打印汇总表并可导出 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/scan.rs` 定义的参数
//! - 使用 `batch/` 收集目录并并行处理
//! - 使用 `parsers/kkr_run.rs`
//! - 使用 `tabled` 打印表格, `csv` 导出

use crate::batch::{BatchRunner, ProcessResult, RunCollector};
use crate::cli::scan::ScanArgs;
use crate::error::{KkrError, Result};
use crate::parsers::{parse_kkr_output, ParseOptions, RunFiles};
use crate::utils::output;

use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 一个运行目录的汇总
#[derive(Debug, Clone, Serialize)]
pub struct ScanRow {
    pub run: String,
    pub success: bool,
    pub failed_extractors: usize,
    pub converged: bool,
    pub iterations: Option<usize>,
    pub rms: Option<f64>,
    pub fermi_energy: Option<f64>,
    #[serde(rename = "total_energy_Ry")]
    pub total_energy_ry: Option<f64>,
}

/// 表格显示行
#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Run")]
    run: String,
    #[tabled(rename = "Parsed")]
    parsed: String,
    #[tabled(rename = "Conv.")]
    converged: String,
    #[tabled(rename = "Iter")]
    iterations: String,
    #[tabled(rename = "rms")]
    rms: String,
    #[tabled(rename = "EF (Ry)")]
    fermi_energy: String,
    #[tabled(rename = "E_tot (Ry)")]
    total_energy: String,
}

impl From<&ScanRow> for TableRow {
    fn from(row: &ScanRow) -> Self {
        let opt = |v: Option<f64>, f: fn(f64) -> String| v.map(f).unwrap_or_else(|| "-".to_string());
        Self {
            run: row.run.clone(),
            parsed: if row.success {
                "ok".to_string()
            } else {
                format!("{} failed", row.failed_extractors)
            },
            converged: if row.converged { "yes" } else { "no" }.to_string(),
            iterations: row
                .iterations
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            rms: opt(row.rms, |v| format!("{:.3e}", v)),
            fermi_energy: opt(row.fermi_energy, |v| format!("{:.6}", v)),
            total_energy: opt(row.total_energy_ry, |v| format!("{:.6}", v)),
        }
    }
}

/// 解析一个运行目录并汇总
pub fn scan_run(dir: &Path, options: ParseOptions) -> ScanRow {
    let outcome = parse_kkr_output(&RunFiles::from_dir(dir), options);
    let record = &outcome.record;
    let conv = record.convergence_group.as_ref();
    ScanRow {
        run: dir.display().to_string(),
        success: outcome.success,
        failed_extractors: outcome.messages.len(),
        converged: record.is_converged(),
        iterations: conv.and_then(|c| c.number_of_iterations),
        rms: conv.and_then(|c| c.rms),
        fermi_energy: record.fermi_energy,
        total_energy_ry: record.total_energy_ry,
    }
}

/// 执行 scan 命令
pub fn execute(args: ScanArgs) -> Result<()> {
    output::print_header("KKR Run Scan");

    let mut collector = RunCollector::new(args.root.clone()).recursive(args.recursive);
    if let Some(pattern) = &args.pattern {
        collector = collector.with_pattern(pattern)?;
    }
    let runs = collector.collect()?;
    output::print_info(&format!("Found {} run directories", runs.len()));

    let options = ParseOptions {
        skip_readin: args.skip_readin,
    };
    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(runs, |dir: &PathBuf| {
        if dir.is_dir() {
            ProcessResult::Success(scan_run(dir, options))
        } else {
            ProcessResult::Failed(dir.display().to_string(), "directory vanished".to_string())
        }
    })?;

    let rows: Vec<TableRow> = result.items.iter().map(TableRow::from).collect();
    println!("{}", Table::new(&rows));

    output::print_separator();
    let parsed = result.items.iter().filter(|r| r.success).count();
    let converged = result.items.iter().filter(|r| r.converged).count();
    output::print_success(&format!(
        "Scan complete: {} runs, {} parsed cleanly, {} converged",
        result.total(),
        parsed,
        converged
    ));
    for (path, err) in &result.failures {
        output::print_error(&format!("  {}: {}", path, err));
    }

    if let Some(path) = &args.output_csv {
        write_csv(&result.items, path)?;
        output::print_written("scan summary", path);
    }

    Ok(())
}

/// 导出汇总 CSV
fn write_csv(rows: &[ScanRow], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| KkrError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
    }

    #[test]
    fn test_scan_reference_runs() {
        let row = scan_run(&fixture("kkr_run_slab_soc_simple"), ParseOptions::default());
        assert!(row.success);
        assert_eq!(row.failed_extractors, 0);
        assert!(row.rms.is_some());
        assert!(row.fermi_energy.is_some());

        let empty = tempfile::tempdir().unwrap();
        let row = scan_run(empty.path(), ParseOptions::default());
        assert!(!row.success);
        assert_eq!(row.failed_extractors, 21);
        assert!(!row.converged);
    }

    #[test]
    fn test_csv_export() {
        let row = scan_run(&fixture("kkr_run_slab_nosoc"), ParseOptions::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        write_csv(&[row], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "run,success,failed_extractors,converged,iterations,rms,fermi_energy,total_energy_Ry\n"
        ));
        assert_eq!(text.lines().count(), 2);
    }
}
