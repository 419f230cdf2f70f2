//! # output.000.txt 迭代日志提取器
//!
//! 每次 SCF 迭代重复输出的逐原子信息：能带能量、电荷、rms 误差、每个能量点的 k 网格，
//! 以及迭代计数器 `ITERATION :`。
//!
//! ## 依赖关系
//! - 被 `parsers/kkr_run.rs` 调度
//! - 被 `parsers/init_out.rs` 使用 (`read_kmesh_energypoints`)
//! - 使用 `parsers/scanner.rs`, `parsers/kkr_out.rs` (迭代次数, SCF 标记),
//!   `parsers/init_out.rs` (混合参数)

use crate::error::{KkrError, Result};
use crate::models::output::{OutputRecord, RY_TO_EV};
use crate::parsers::kkr_run::RunFiles;
use crate::parsers::{init_out, kkr_out, scanner};

use std::path::Path;

const FORMAT: &str = "output.000.txt";
const ANCHOR_ITERATION: &str = "ITERATION :";

/// 迭代计数 (当前迭代, 最大迭代数)，取最后一次出现
pub fn parse_iteration_counter(lines: &[String]) -> Option<(usize, usize)> {
    let line = &lines[scanner::find_last(lines, ANCHOR_ITERATION)?];
    let rest = &line[line.find(ANCHOR_ITERATION)? + ANCHOR_ITERATION.len()..];
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let niter = tokens.first()?.parse::<usize>().ok()?;
    let nitermax = tokens.get(3)?.parse::<usize>().ok()?;
    Some((niter, nitermax))
}

/// 第一个迭代块中每个能量点的 k 网格编号
pub fn parse_kmesh_energypoints(lines: &[String]) -> Option<Vec<usize>> {
    let iterations = scanner::find_all(lines, ANCHOR_ITERATION);
    let start = iterations.first().copied().unwrap_or(0);
    let end = iterations.get(1).copied().unwrap_or(lines.len());

    let points: Vec<usize> = lines[start..end]
        .iter()
        .filter(|l| l.contains("KMESH ="))
        .map(|l| usize::try_from(scanner::last_int(l)?).ok())
        .collect::<Option<Vec<_>>>()?;
    if points.is_empty() {
        None
    } else {
        Some(points)
    }
}

/// 最后一个迭代块 (没有迭代标记时为整个文件)
fn last_iteration_block(lines: &[String]) -> &[String] {
    match scanner::find_last(lines, ANCHOR_ITERATION) {
        Some(start) => &lines[start..],
        None => lines,
    }
}

/// 按迭代次数切出最后一次迭代的逐原子数值
fn last_iteration_values(values: &[f64], niter: usize) -> Option<Vec<f64>> {
    let natom = values.len() / niter.max(1);
    if natom == 0 {
        return None;
    }
    Some(values[values.len() - natom..].to_vec())
}

fn malformed(path: &Path, what: &str) -> KkrError {
    KkrError::parse(FORMAT, path.display(), format!("{} not found or malformed", what))
}

/// 供 kmesh 提取器使用
pub(crate) fn read_kmesh_energypoints(files: &RunFiles) -> Result<Vec<usize>> {
    let lines = scanner::read_lines(&files.output_000)?;
    parse_kmesh_energypoints(&lines).ok_or_else(|| malformed(&files.output_000, "KMESH lines"))
}

// ─────────────────────────────────────────────────────────────
// 提取器
// ─────────────────────────────────────────────────────────────

/// single particle energies (最后一次迭代的能带能量, eV)
pub fn extract_single_particle_energies(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.output_000)?;
    let block = last_iteration_block(&lines);
    let energies = kkr_out::collect_values(
        block,
        "band energy per atom",
        FORMAT,
        &files.output_000,
        scanner::last_float,
    )?;
    if energies.is_empty() {
        return Err(malformed(&files.output_000, "band energy per atom"));
    }

    record.single_particle_energies = Some(energies.iter().map(|e| e * RY_TO_EV).collect());
    record.single_particle_energies_unit = Some("eV".to_string());
    Ok(())
}

/// charges: 每次迭代输出一遍，原子数 = 行数 / 迭代次数
pub fn extract_charges(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let niter = kkr_out::rms_history(files)?.len();
    let lines = scanner::read_lines(&files.output_000)?;
    let read = |anchor: &str| {
        kkr_out::collect_values(&lines, anchor, FORMAT, &files.output_000, scanner::last_float)
    };

    let ws_all = read("charge in wigner seitz")?;
    let nuclear_all = read("nuclear charge")?;
    let core_all = read("core charge")?;

    let nuclear = last_iteration_values(&nuclear_all, niter)
        .ok_or_else(|| malformed(&files.output_000, "nuclear charge"))?;
    let core = last_iteration_values(&core_all, niter)
        .ok_or_else(|| malformed(&files.output_000, "core charge"))?;
    let ws = last_iteration_values(&ws_all, niter)
        .ok_or_else(|| malformed(&files.output_000, "charge in wigner seitz cell"))?;

    // 价电荷只在三组长度一致时给出
    let valence = if ws.len() == core.len() {
        Some(ws.iter().zip(core.iter()).map(|(w, c)| w - c).collect::<Vec<f64>>())
    } else {
        None
    };

    let unit = || Some("electron charge".to_string());
    record.nuclear_charge_per_atom = Some(nuclear);
    record.nuclear_charge_per_atom_unit = unit();
    record.charge_core_states_per_atom = Some(core);
    record.charge_core_states_per_atom_unit = unit();
    if let Some(valence) = valence {
        record.charge_valence_states_per_atom = Some(valence);
        record.charge_valence_states_per_atom_unit = unit();
    }
    record.total_charge_per_atom = Some(ws);
    record.total_charge_per_atom_unit = unit();
    Ok(())
}

/// scfinfo: 迭代计数、收敛标记与混合参数
///
/// output.000.txt 存在但缺少迭代计数时，回退到 output.2.txt。
pub fn extract_scfinfo(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.output_000)?;
    let (niter, nitermax) = match parse_iteration_counter(&lines) {
        Some(counter) => counter,
        None => {
            let fallback = scanner::read_lines(&files.output_2)?;
            parse_iteration_counter(&fallback)
                .ok_or_else(|| malformed(&files.output_2, "iteration counter"))?
        }
    };
    let (converged, exhausted) = kkr_out::scf_flags(files)?;
    let mixing = init_out::read_mixing(files)?;

    let conv = record.convergence_mut();
    conv.number_of_iterations = Some(niter);
    conv.number_of_iterations_max = Some(nitermax);
    conv.calculation_converged = Some(converged);
    conv.nsteps_exhausted = Some(exhausted);
    conv.strmix = Some(mixing.strmix);
    conv.fcm = Some(mixing.fcm);
    conv.qbound = Some(mixing.qbound);
    conv.brymix = Some(mixing.brymix);
    conv.imix = Some(mixing.imix);
    conv.idtbry = Some(mixing.idtbry);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    const TWO_ITERATIONS: &str = "\
   ITERATION :    1 OUT OF   10
   IE =   1  KMESH =    4
   IE =   2  KMESH =    3
   band energy per atom     0.0100000000
   band energy per atom     0.0200000000
   ITERATION :    2 OUT OF   10
   IE =   1  KMESH =    4
   IE =   2  KMESH =    3
   band energy per atom     0.0300000000
   band energy per atom     0.0400000000
";

    #[test]
    fn test_iteration_counter_takes_last() {
        assert_eq!(parse_iteration_counter(&lines(TWO_ITERATIONS)), Some((2, 10)));
        assert_eq!(parse_iteration_counter(&lines("nothing\n")), None);
    }

    #[test]
    fn test_kmesh_only_first_iteration() {
        assert_eq!(parse_kmesh_energypoints(&lines(TWO_ITERATIONS)), Some(vec![4, 3]));
        assert_eq!(parse_kmesh_energypoints(&lines("no kmesh\n")), None);
    }

    #[test]
    fn test_last_iteration_block() {
        let l = lines(TWO_ITERATIONS);
        let block = last_iteration_block(&l);
        assert_eq!(block.len(), 5);
        assert!(block[3].contains("0.0300000000"));
    }

    #[test]
    fn test_last_iteration_values() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(last_iteration_values(&values, 3), Some(vec![6.0]));
        assert_eq!(last_iteration_values(&values, 2), Some(vec![4.0, 5.0, 6.0]));
        assert_eq!(last_iteration_values(&values[..1], 2), None);
    }
}
