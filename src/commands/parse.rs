//! # parse 命令实现
//!
//! 解析一个 KKR 运行目录，打印主要物理量和错误消息，可导出 JSON。
//!
//! ## 依赖关系
//! - 使用 `cli/parse.rs` 定义的参数
//! - 使用 `parsers/kkr_run.rs` 汇总解析
//! - 使用 `workflow/convergence.rs` 判定收敛
//! - 使用 `utils/output.rs`, `utils/json.rs`

use crate::cli::parse::ParseArgs;
use crate::error::{KkrError, Result};
use crate::models::OutputRecord;
use crate::parsers::{parse_kkr_output, ParseOptions, ParseOutcome, RunFiles};
use crate::utils::{json, output};
use crate::workflow::ConvergenceSource;

use serde::Serialize;

/// 导出的 JSON 文档: 记录的键加上错误列表
#[derive(Serialize)]
struct ParseReport<'a> {
    success: bool,
    parser_errors: &'a [String],
    #[serde(flatten)]
    record: &'a OutputRecord,
}

/// 执行 parse 命令
pub fn execute(args: ParseArgs) -> Result<()> {
    output::print_header("KKR Output Parsing");

    if !args.dir.is_dir() {
        return Err(KkrError::DirectoryNotFound {
            path: args.dir.display().to_string(),
        });
    }

    let files = run_files(&args);
    let options = ParseOptions {
        skip_readin: args.skip_readin,
    };
    let outcome = parse_kkr_output(&files, options);

    print_summary(&outcome.record);
    output::print_separator();
    print_messages(&outcome, args.verbose);

    if let Some(path) = &args.json {
        let report = ParseReport {
            success: outcome.success,
            parser_errors: &outcome.messages,
            record: &outcome.record,
        };
        json::write_json(&report, path)?;
        output::print_written("output record", path);
    }

    if outcome.success {
        output::print_done(&format!("Parsed '{}'", args.dir.display()));
        Ok(())
    } else {
        Err(KkrError::Other(format!(
            "{} extractor(s) failed for '{}'",
            outcome.messages.len(),
            args.dir.display()
        )))
    }
}

/// 按参数中的文件名构造文件集合
fn run_files(args: &ParseArgs) -> RunFiles {
    let dir = &args.dir;
    RunFiles {
        out_kkr: dir.join(&args.out_kkr),
        output_0init: dir.join(&args.output_0init),
        output_000: dir.join(&args.output_000),
        output_2: dir.join(&args.output_2),
        timing: dir.join(&args.timing),
        potential: dir.join(&args.potential),
        nonco_angles: dir.join(&args.nonco_angles),
    }
}

fn print_summary(record: &OutputRecord) {
    output::print_kv("quantity groups", record.present_keys().len());
    if let Some(info) = &record.code_info_group {
        output::print_kv("code version", &info.code_version);
    }
    if let (Some(nspin), Some(natom)) = (record.nspin, record.number_of_atoms_in_unit_cell) {
        output::print_kv("nspin / natom", format!("{} / {}", nspin, natom));
    }
    if let Some(conv) = &record.convergence_group {
        if let (Some(n), Some(max)) = (conv.number_of_iterations, conv.number_of_iterations_max) {
            output::print_kv("iterations", format!("{} / {}", n, max));
        }
        if let Some(rms) = conv.rms {
            output::print_kv("rms-error", format!("{:.4e}", rms));
        }
    }
    if let Some(source) = ConvergenceSource::from_record(record) {
        output::print_kv("converged", source.is_converged());
    }
    if let Some(ef) = record.fermi_energy {
        output::print_kv("Fermi energy (Ry)", format!("{:.6}", ef));
    }
    if let Some(e) = record.total_energy_ry {
        output::print_kv("total energy (Ry)", format!("{:.8}", e));
    }
    if let Some(m) = record.magnetism_group.as_ref().and_then(|m| m.total_spin_moment) {
        output::print_kv("total spin moment (mu_B)", format!("{:.5}", m));
    }
    if let Some(w) = &record.warnings_group {
        if w.number_of_warnings > 0 {
            output::print_warning(&format!("{} warning(s) in output", w.number_of_warnings));
        }
    }
}

fn print_messages(outcome: &ParseOutcome, verbose: bool) {
    if outcome.success {
        output::print_success("All extractors succeeded");
        return;
    }
    for (extractor, reason) in &outcome.diagnostics {
        let reason = verbose.then_some(reason.as_str());
        output::print_failure(&extractor.message(), reason);
    }
}
