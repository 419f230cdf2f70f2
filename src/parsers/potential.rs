//! # KKR 势文件解析
//!
//! 势文件由若干势块组成，每个原子每个自旋一个块，块以含 `exc:` 的表头行开始。
//! 块内前几行是定宽 Fortran 格式：
//!
//! ```text
//! 0  表头 (exc: ...)
//! 1  rmt alat rmtnew
//! 2  Z
//! 3  rws efnew vbc
//! 4  irws
//! 5  a b            (D 指数)
//! 6  ncore inew     (2i2 定宽)
//! 7… lcore ecore    (ncore 行)
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/kkr_run.rs` 调度 (core_states)
//! - 被 `combine/potential.rs` 使用 (按格点拼接势块)
//! - 使用 `parsers/scanner.rs`

use crate::error::{KkrError, Result};
use crate::models::output::{CoreStatesGroup, OutputRecord};
use crate::parsers::kkr_run::RunFiles;
use crate::parsers::scanner;

use std::path::Path;

const HEADER_MARKER: &str = "exc:";
const NO_CORE_STATES: &str = "no core states";
const L_LETTERS: [char; 5] = ['s', 'p', 'd', 'f', 'g'];

/// 一个芯态能级
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreState {
    pub l: usize,
    /// 能量 (Ry)
    pub energy: f64,
}

/// 一个势块 (一个原子的一个自旋通道)
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialBlock {
    /// 原始文本行，合并势时原样写出
    pub lines: Vec<String>,
    pub z: f64,
    pub core_states: Vec<CoreState>,
}

impl PotentialBlock {
    /// 解析块头部
    fn parse(lines: Vec<String>) -> Option<Self> {
        let z = scanner::parse_float(lines.get(2)?.split_whitespace().next()?)?;

        let ncore_line = lines.get(6)?;
        let ncore = match ncore_line.split_whitespace().next().map(str::parse::<usize>) {
            Some(Ok(n)) if ncore_line.split_whitespace().count() >= 2 => n,
            _ => usize::try_from(scanner::fixed_width_ints(ncore_line, 2, 2)?[0]).ok()?,
        };

        let core_states = (0..ncore)
            .map(|i| {
                let tokens = scanner::split_glued(lines.get(7 + i)?);
                let l = tokens.first()?.parse::<usize>().ok()?;
                let energy = scanner::parse_float(tokens.get(1)?)?;
                Some(CoreState { l, energy })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            lines,
            z,
            core_states,
        })
    }

    /// 能量最高的芯态 (能量, 描述如 `3p`)
    pub fn highest_core_state(&self) -> Option<(f64, String)> {
        let (index, state) = self
            .core_states
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.energy.total_cmp(&b.energy))?;
        Some((state.energy, core_descriptor(&self.core_states, index)))
    }
}

/// 芯态的主量子数和角量子数记号
///
/// 同一 l 的芯态按出现顺序递增主量子数，n = l + 1 + 前面同 l 态的个数。
pub fn core_descriptor(states: &[CoreState], index: usize) -> String {
    let l = states[index].l;
    let before = states[..index].iter().filter(|s| s.l == l).count();
    let n = l + 1 + before;
    let letter = L_LETTERS.get(l).copied().unwrap_or('?');
    format!("{}{}", n, letter)
}

/// 完整势文件
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialFile {
    pub blocks: Vec<PotentialBlock>,
}

impl PotentialFile {
    /// 从文件读取
    pub fn read(path: &Path) -> Result<Self> {
        let lines = scanner::read_lines(path)?;
        Self::parse(&lines).map_err(|reason| KkrError::parse("potential", path.display(), reason))
    }

    /// 按表头切块并解析
    pub fn parse(lines: &[String]) -> std::result::Result<Self, String> {
        let headers = scanner::find_all(lines, HEADER_MARKER);
        if headers.is_empty() {
            return Err("no potential block header found".to_string());
        }

        let mut blocks = Vec::with_capacity(headers.len());
        for (k, &start) in headers.iter().enumerate() {
            let end = headers.get(k + 1).copied().unwrap_or(lines.len());
            let block = PotentialBlock::parse(lines[start..end].to_vec())
                .ok_or_else(|| format!("malformed potential block {} (line {})", k + 1, start + 1))?;
            blocks.push(block);
        }
        Ok(Self { blocks })
    }

    /// 由已有的势块构造
    pub fn from_blocks(blocks: Vec<PotentialBlock>) -> Self {
        Self { blocks }
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// 第 site 个格点的 nspin 个势块
    pub fn site_blocks(&self, nspin: usize, site: usize) -> Option<&[PotentialBlock]> {
        let start = site.checked_mul(nspin)?;
        self.blocks.get(start..start + nspin)
    }

    /// 写回文本
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for block in &self.blocks {
            for line in &block.lines {
                text.push_str(line);
                text.push('\n');
            }
        }
        text
    }
}

/// core_states: 每个势块一项，没有芯态的块给出哨兵描述
pub fn extract_core_states(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let potential = PotentialFile::read(&files.potential)?;

    let mut counts = Vec::with_capacity(potential.n_blocks());
    let mut energies = Vec::with_capacity(potential.n_blocks());
    let mut descriptions = Vec::with_capacity(potential.n_blocks());
    for block in &potential.blocks {
        counts.push(block.core_states.len());
        match block.highest_core_state() {
            Some((energy, descr)) => {
                energies.push(Some(energy));
                descriptions.push(descr);
            }
            None => {
                energies.push(None);
                descriptions.push(NO_CORE_STATES.to_string());
            }
        }
    }

    record.core_states_group = Some(CoreStatesGroup {
        number_of_core_states_per_atom: counts,
        energy_highest_lying_core_state_per_atom: energies,
        energy_highest_lying_core_state_per_atom_unit: "Rydberg".to_string(),
        descr_highest_lying_core_state_per_atom: descriptions,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str = "\
 Vac      POTENTIAL SPIN DOWN   exc: Vosko,Wilk,Nusair
   1.21000000  5.42351400  1.21000000
    0.00000
   1.26400000  0.49301097  0.00000000
  484
  0.25000000D-01  0.20000000D-03
 0 1
  -0.10000000000000D+01 -0.10000000000000D+01 -0.10000000000000D+01 -0.10000000000000D+01
 Fe       POTENTIAL SPIN DOWN   exc: Vosko,Wilk,Nusair
   1.21000000  5.42351400  1.21000000
   26.00000
   1.26400000  0.49301097  0.00000000
  484
  0.25000000D-01  0.20000000D-03
 5 1
    0   -0.51400123456D+03
    0   -0.60300100000D+02
    1   -0.52100200000D+02
    0   -0.65400300000D+01
    1   -0.33807366413D+01
  -0.52000000000000D+02 -0.52000000000000D+02 -0.52000000000000D+02 -0.52000000000000D+02
";

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_blocks_and_core_states() {
        let pot = PotentialFile::parse(&lines(TWO_BLOCKS)).unwrap();
        assert_eq!(pot.n_blocks(), 2);
        assert_eq!(pot.blocks[0].z, 0.0);
        assert!(pot.blocks[0].core_states.is_empty());
        assert!(pot.blocks[0].highest_core_state().is_none());

        let fe = &pot.blocks[1];
        assert_eq!(fe.z, 26.0);
        assert_eq!(fe.core_states.len(), 5);
        let (energy, descr) = fe.highest_core_state().unwrap();
        assert!((energy + 3.3807366413).abs() < 1e-10);
        assert_eq!(descr, "3p");
    }

    #[test]
    fn test_core_descriptor_sequence() {
        let states: Vec<CoreState> = [0, 0, 1, 0, 1]
            .iter()
            .map(|&l| CoreState { l, energy: -1.0 })
            .collect();
        let names: Vec<String> = (0..5).map(|i| core_descriptor(&states, i)).collect();
        assert_eq!(names, vec!["1s", "2s", "2p", "3s", "3p"]);
    }

    #[test]
    fn test_text_round_trip_and_site_blocks() {
        let pot = PotentialFile::parse(&lines(TWO_BLOCKS)).unwrap();
        let again = PotentialFile::parse(&lines(&pot.to_text())).unwrap();
        assert_eq!(pot, again);
        assert_eq!(pot.site_blocks(1, 1).unwrap()[0].z, 26.0);
        assert!(pot.site_blocks(2, 1).is_none());
    }

    #[test]
    fn test_missing_header_is_error() {
        assert!(PotentialFile::parse(&lines("1.0 2.0\n")).is_err());
    }
}
