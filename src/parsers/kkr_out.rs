//! # out_kkr 主日志提取器
//!
//! 从 KKR 主输出 `out_kkr` 中提取版本信息、警告以及每次 SCF 迭代的收敛历史
//! （rms 误差、电荷中性、磁矩、费米能、DOS(E_F)、总能）。
//!
//! 每个 `extract_*` 函数只读文件，先算出全部数值，最后一次性写入记录。
//!
//! ## 依赖关系
//! - 被 `parsers/kkr_run.rs` 调度
//! - 使用 `parsers/scanner.rs`, `parsers/init_out.rs` (nspin/natom), `parsers/nonco.rs`
//! - 使用 `regex` 解析序列号

use crate::error::{KkrError, Result};
use crate::models::output::{CodeInfo, OutputRecord, WarningsGroup, RY_TO_EV};
use crate::parsers::kkr_run::RunFiles;
use crate::parsers::{init_out, nonco, scanner};

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const FORMAT: &str = "out_kkr";

// ─────────────────────────────────────────────────────────────
// 锚点
// ─────────────────────────────────────────────────────────────

const ANCHOR_RMS: &str = "average rms-error";
const ANCHOR_NEUTRALITY: &str = "charge neutrality in unit cell";
const ANCHOR_TOTAL_MOMENT: &str = "TOTAL mag. moment in unit cell";
const ANCHOR_FERMI: &str = "E FERMI";
const ANCHOR_DOS_EF: &str = "DOS(E_F)";
const ANCHOR_TOTAL_ENERGY: &str = "TOTAL ENERGY in ryd.";
const ANCHOR_MOMENTS: &str = "m_spin";
const ANCHOR_CONVERGED: &str = "SCF ITERATION CONVERGED";
const ANCHOR_EXHAUSTED: &str = "NUMBER OF SCF STEPS EXHAUSTED";

// ─────────────────────────────────────────────────────────────
// 公共辅助
// ─────────────────────────────────────────────────────────────

/// 收集所有锚点行上的数值，保持文件顺序
///
/// 任一行解析失败即整体失败；没有锚点行时返回空列表。
pub(crate) fn collect_values<F>(
    lines: &[String],
    anchor: &str,
    format: &str,
    path: &Path,
    parse: F,
) -> Result<Vec<f64>>
where
    F: Fn(&str) -> Option<f64>,
{
    scanner::find_all(lines, anchor)
        .into_iter()
        .map(|i| {
            parse(&lines[i]).ok_or_else(|| {
                KkrError::parse(
                    format,
                    path.display(),
                    format!("malformed value in line {}: '{}'", i + 1, lines[i].trim()),
                )
            })
        })
        .collect()
}

/// 至少要有一次迭代的历史
fn require_history(values: Vec<f64>, anchor: &str, path: &Path) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(KkrError::parse(
            FORMAT,
            path.display(),
            format!("anchor '{}' not found", anchor),
        ));
    }
    Ok(values)
}

/// rms 误差历史，每次迭代一项
///
/// 迭代次数以它为准，`output.000.txt` 中的逐原子数据按此切分。
pub(crate) fn rms_history(files: &RunFiles) -> Result<Vec<f64>> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let values = collect_values(&lines, ANCHOR_RMS, FORMAT, &files.out_kkr, |l| {
        scanner::value_after_last(l, "=")
    })?;
    require_history(values, ANCHOR_RMS, &files.out_kkr)
}

/// SCF 结束标记 (已收敛, 步数用尽)
pub(crate) fn scf_flags(files: &RunFiles) -> Result<(bool, bool)> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let converged = scanner::find_first(&lines, ANCHOR_CONVERGED).is_some();
    let exhausted = scanner::find_first(&lines, ANCHOR_EXHAUSTED).is_some();
    Ok((converged, exhausted))
}

/// 标记之后的整段文本
fn text_after(lines: &[String], marker: &str) -> Option<String> {
    let line = &lines[scanner::find_first(lines, marker)?];
    let pos = line.find(marker)?;
    let text = line[pos + marker.len()..].trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

// ─────────────────────────────────────────────────────────────
// 纯函数 (按行解析)
// ─────────────────────────────────────────────────────────────

/// 解析代码版本信息，头部缺失时回退到 `# serial:` 行
pub fn parse_code_info(lines: &[String]) -> Option<CodeInfo> {
    let version = text_after(lines, "Code version:");
    let options = text_after(lines, "Compile options:");
    let serial = text_after(lines, "serial number for files:");

    match (version, options, serial) {
        (Some(code_version), Some(compile_options), Some(calculation_serial_number)) => {
            Some(CodeInfo {
                code_version,
                compile_options,
                calculation_serial_number,
            })
        }
        _ => text_after(lines, "# serial:").and_then(|s| code_info_from_serial(&s)),
    }
}

/// 从序列号 `kkrjm_<version>_<options>_<timestamp>` 还原版本信息
pub fn code_info_from_serial(serial: &str) -> Option<CodeInfo> {
    static SERIAL: OnceLock<Regex> = OnceLock::new();
    let re = SERIAL.get_or_init(|| {
        Regex::new(r"^[A-Za-z]+_(?P<version>[^_]+)_(?P<options>.+)_(?P<stamp>\d+)$")
            .expect("static regex")
    });
    let serial = serial.split_whitespace().next()?;
    let caps = re.captures(serial)?;
    Some(CodeInfo {
        code_version: caps["version"].to_string(),
        compile_options: caps["options"].to_string(),
        calculation_serial_number: serial.to_string(),
    })
}

/// 读取每次迭代 `m_spin` 表头之后 natom 行中的某一列
///
/// 列号从 0 开始：3 为自旋磁矩，4 为轨道磁矩。
pub fn moment_blocks(lines: &[String], natom: usize, column: usize) -> Option<Vec<Vec<f64>>> {
    scanner::find_all(lines, ANCHOR_MOMENTS)
        .into_iter()
        .map(|header| {
            (1..=natom)
                .map(|offset| {
                    let row = lines.get(header + offset)?;
                    scanner::parse_float(row.split_whitespace().nth(column)?)
                })
                .collect::<Option<Vec<f64>>>()
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────
// 提取器
// ─────────────────────────────────────────────────────────────

/// Version Info
pub fn extract_version(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let info = parse_code_info(&lines).ok_or_else(|| {
        KkrError::parse(FORMAT, files.out_kkr.display(), "code version header not found")
    })?;
    record.code_info_group = Some(info);
    Ok(())
}

/// search for warnings
pub fn extract_warnings(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let warnings_list: Vec<String> = scanner::find_all(&lines, "WARNING")
        .into_iter()
        .map(|i| lines[i].trim().to_string())
        .collect();
    record.warnings_group = Some(WarningsGroup {
        number_of_warnings: warnings_list.len(),
        warnings_list,
    });
    Ok(())
}

/// rms-error: 历史来自 out_kkr，最后一次迭代的逐原子值来自 output.000.txt
pub fn extract_rms(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let history = rms_history(files)?;
    let niter = history.len();

    let lines_000 = scanner::read_lines(&files.output_000)?;
    let per_atom_all = collect_values(
        &lines_000,
        "rms-error for atom",
        "output.000.txt",
        &files.output_000,
        |l| scanner::value_after_last(l, "="),
    )?;
    let natom = per_atom_all.len() / niter;
    if natom == 0 {
        return Err(KkrError::parse(
            "output.000.txt",
            files.output_000.display(),
            "per-atom rms-error lines not found",
        ));
    }
    let per_atom = per_atom_all[per_atom_all.len() - natom..].to_vec();

    let conv = record.convergence_mut();
    conv.rms = history.last().copied();
    conv.rms_unit = Some("unitless".to_string());
    conv.rms_all_iterations = Some(history);
    conv.rms_per_atom = Some(per_atom);
    Ok(())
}

/// charge neutrality
pub fn extract_charge_neutrality(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let values = collect_values(&lines, ANCHOR_NEUTRALITY, FORMAT, &files.out_kkr, |l| {
        scanner::value_after(l, "=")
    })?;
    let history = require_history(values, ANCHOR_NEUTRALITY, &files.out_kkr)?;

    let conv = record.convergence_mut();
    conv.charge_neutrality = history.last().copied();
    conv.charge_neutrality_unit = Some("electrons".to_string());
    conv.charge_neutrality_all_iterations = Some(history);
    Ok(())
}

/// total magnetic moment
///
/// 非磁计算没有 `TOTAL mag. moment` 行，不算失败，也不写入任何字段。
pub fn extract_total_moment(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let history = collect_values(&lines, ANCHOR_TOTAL_MOMENT, FORMAT, &files.out_kkr, |l| {
        scanner::value_after(l, "=")
    })?;
    let Some(&last) = history.last() else {
        return Ok(());
    };

    record.convergence_mut().total_spin_moment_all_iterations = Some(history);
    let mag = record.magnetism_mut();
    mag.total_spin_moment = Some(last);
    mag.total_spin_moment_unit = Some("mu_Bohr".to_string());
    Ok(())
}

/// spin moment per atom
///
/// 只对 nspin = 2 有意义。NEWSOSOL 求解器还需要 `nonco_angle_out.dat` 给出磁矩方向。
pub fn extract_spin_moments(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let dims = init_out::read_dimensions(files)?;
    let lines = scanner::read_lines(&files.out_kkr)?;
    if dims.nspin != 2 {
        return Ok(());
    }

    let history = moment_blocks(&lines, dims.natom, 3)
        .filter(|blocks| !blocks.is_empty())
        .ok_or_else(|| {
            KkrError::parse(FORMAT, files.out_kkr.display(), "spin moment blocks not found")
        })?;
    let last = history.last().cloned().unwrap_or_default();

    let directions = if dims.use_newsosol {
        let angles = nonco::read_angles(&files.nonco_angles, dims.natom)?;
        let vectors: Vec<[f64; 3]> = last
            .iter()
            .zip(angles.iter())
            .map(|(&m, a)| nonco::moment_vector(m, a[0], a[1]))
            .collect();
        Some((vectors, angles))
    } else {
        None
    };

    record.convergence_mut().spin_moment_per_atom_all_iterations = Some(history);
    let mag = record.magnetism_mut();
    mag.spin_moment_per_atom = Some(last);
    mag.spin_moment_unit = Some("mu_Bohr".to_string());
    if let Some((vectors, angles)) = directions {
        mag.spin_moment_vector_per_atom = Some(vectors);
        mag.spin_moment_angles_per_atom = Some(angles);
        mag.spin_moment_angles_per_atom_unit = Some("degree".to_string());
    }
    Ok(())
}

/// orbital moment (仅 nspin = 2 且使用 NEWSOSOL)
pub fn extract_orbital_moments(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let dims = init_out::read_dimensions(files)?;
    let lines = scanner::read_lines(&files.out_kkr)?;
    if dims.nspin != 2 || !dims.use_newsosol {
        return Ok(());
    }

    let history = moment_blocks(&lines, dims.natom, 4)
        .filter(|blocks| !blocks.is_empty())
        .ok_or_else(|| {
            KkrError::parse(FORMAT, files.out_kkr.display(), "orbital moment column not found")
        })?;
    let last = history.last().cloned().unwrap_or_default();
    let total: f64 = last.iter().sum();

    record.convergence_mut().orbital_moment_per_atom_all_iterations = Some(history);
    let mag = record.magnetism_mut();
    mag.orbital_moment_per_atom = Some(last);
    mag.total_orbital_moment = Some(total);
    mag.orbital_moment_unit = Some("mu_Bohr".to_string());
    Ok(())
}

/// EF
pub fn extract_fermi_energy(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let values = collect_values(&lines, ANCHOR_FERMI, FORMAT, &files.out_kkr, |l| {
        scanner::value_after(l, "FERMI")
    })?;
    let history = require_history(values, ANCHOR_FERMI, &files.out_kkr)?;

    record.fermi_energy = history.last().copied();
    record.fermi_energy_units = Some("Ry".to_string());
    record.convergence_mut().fermi_energy_all_iterations = Some(history);
    Ok(())
}

/// DOS@EF
pub fn extract_dos_at_fermi_energy(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let values = collect_values(&lines, ANCHOR_DOS_EF, FORMAT, &files.out_kkr, |l| {
        scanner::value_after_last(l, "=")
    })?;
    let history = require_history(values, ANCHOR_DOS_EF, &files.out_kkr)?;

    record.dos_at_fermi_energy = history.last().copied();
    record.convergence_mut().dos_at_fermi_energy_all_iterations = Some(history);
    Ok(())
}

/// total energy
pub fn extract_total_energy(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.out_kkr)?;
    let values = collect_values(&lines, ANCHOR_TOTAL_ENERGY, FORMAT, &files.out_kkr, |l| {
        scanner::value_after_last(l, ":")
    })?;
    let history = require_history(values, ANCHOR_TOTAL_ENERGY, &files.out_kkr)?;
    let last = history[history.len() - 1];

    record.energy = Some(last * RY_TO_EV);
    record.energy_unit = Some("eV".to_string());
    record.total_energy_ry = Some(last);
    record.total_energy_ry_unit = Some("Rydberg".to_string());
    record.convergence_mut().total_energy_ry_all_iterations = Some(history);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_code_info_header() {
        let l = lines(
            "  Code version: v2.2-22-g4f8f5ff\n  Compile options: openmp\n  serial number for files: kkrjm_v2.2-22-g4f8f5ff_openmp_20171208103325\n",
        );
        let info = parse_code_info(&l).unwrap();
        assert_eq!(info.code_version, "v2.2-22-g4f8f5ff");
        assert_eq!(info.compile_options, "openmp");
        assert_eq!(
            info.calculation_serial_number,
            "kkrjm_v2.2-22-g4f8f5ff_openmp_20171208103325"
        );
    }

    #[test]
    fn test_parse_code_info_serial_fallback() {
        let l = lines(" # serial: kkrjm_v2.3-1-gabcdef_mpi-hybrid_20180101120000\n");
        let info = parse_code_info(&l).unwrap();
        assert_eq!(info.code_version, "v2.3-1-gabcdef");
        assert_eq!(info.compile_options, "mpi-hybrid");

        assert!(parse_code_info(&lines("no header here\n")).is_none());
        assert!(code_info_from_serial("garbage").is_none());
    }

    #[test]
    fn test_moment_blocks() {
        let text = "\
   atom     N_tot      N_val      m_spin      m_orb
     1     0.0035     0.0035      0.0005     -0.0000
     2     0.2134     0.2134      0.0214     -0.0001
   atom     N_tot      N_val      m_spin      m_orb
     1     0.0035     0.0035      0.0004      0.0000
     2     0.2134     0.2134      0.0200     -0.0002
";
        let l = lines(text);
        let spin = moment_blocks(&l, 2, 3).unwrap();
        assert_eq!(spin, vec![vec![0.0005, 0.0214], vec![0.0004, 0.0200]]);
        let orb = moment_blocks(&l, 2, 4).unwrap();
        assert_eq!(orb[1], vec![0.0, -0.0002]);
        // 没有轨道磁矩列
        assert!(moment_blocks(&l, 2, 5).is_none());
        // 行数不足
        assert!(moment_blocks(&l[..2], 2, 3).is_none());
    }

    #[test]
    fn test_collect_values_rejects_malformed() {
        let l = lines(" average rms-error : v+ + v- =  2.3466D+00\n average rms-error : v+ + v- = ******\n");
        let path = Path::new("out_kkr");
        let err = collect_values(&l, ANCHOR_RMS, FORMAT, path, |x| scanner::value_after_last(x, "="));
        assert!(err.is_err());
        let ok = collect_values(&l[..1], ANCHOR_RMS, FORMAT, path, |x| {
            scanner::value_after_last(x, "=")
        })
        .unwrap();
        assert_eq!(ok, vec![2.3466]);
    }
}
