//! # complex.dos 复能量 DOS 文件解析
//!
//! DOS 计算在复能量围道上给出每个势块、每个角动量通道的态密度 n(z)。
//!
//! ```text
//! <表头行>
//! npot
//! nspin
//! EF
//! nchannels
//! # IPOT 1
//! npoints
//! Re(E) Im(E) Re(n_1) Im(n_1) ... Re(n_nch) Im(n_nch)
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `analysis/dos.rs`, `commands/dos.rs` 使用
//! - 使用 `parsers/scanner.rs`, `num-complex`

use crate::error::{KkrError, Result};
use crate::parsers::scanner;

use num_complex::Complex64;
use std::path::Path;

const FORMAT: &str = "complex.dos";

/// 一个势块的复能量 DOS
#[derive(Debug, Clone, PartialEq)]
pub struct DosBlock {
    /// 势块编号 (从 1 开始)
    pub ipot: usize,
    pub energies: Vec<Complex64>,
    /// `values[点][通道]`
    pub values: Vec<Vec<Complex64>>,
}

/// 完整的 complex.dos 文件
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexDos {
    pub nspin: usize,
    /// 费米能 (Ry)
    pub fermi_energy: f64,
    pub n_channels: usize,
    pub blocks: Vec<DosBlock>,
}

impl ComplexDos {
    /// 从文件读取
    pub fn read(path: &Path) -> Result<Self> {
        let lines = scanner::read_lines(path)?;
        Self::parse(&lines).map_err(|reason| KkrError::parse(FORMAT, path.display(), reason))
    }

    /// 解析文本行
    pub fn parse(lines: &[String]) -> std::result::Result<Self, String> {
        // 跳过表头和空行
        let mut rows = lines.iter().skip(1).filter(|l| !l.trim().is_empty());
        let mut header_int = |what: &str| -> std::result::Result<usize, String> {
            rows.next()
                .and_then(|l| scanner::first_int(l))
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| format!("missing or malformed {}", what))
        };
        let npot = header_int("npot")?;
        let nspin = header_int("nspin")?;

        let fermi_energy = rows
            .next()
            .and_then(|l| scanner::parse_float(l.split_whitespace().next()?))
            .ok_or("missing or malformed Fermi energy")?;
        let n_channels = rows
            .next()
            .and_then(|l| scanner::first_int(l))
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n >= 1)
            .ok_or("missing or malformed number of channels")?;

        let mut blocks = Vec::with_capacity(npot);
        for k in 0..npot {
            let marker = rows.next().ok_or_else(|| format!("missing block {}", k + 1))?;
            let ipot = marker
                .trim_start_matches(|c: char| c == '#' || c.is_whitespace())
                .strip_prefix("IPOT")
                .and_then(|rest| rest.trim().parse::<usize>().ok())
                .ok_or_else(|| format!("expected '# IPOT', found '{}'", marker.trim()))?;
            let npoints = rows
                .next()
                .and_then(|l| scanner::first_int(l))
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| format!("missing number of points for IPOT {}", ipot))?;

            let mut energies = Vec::with_capacity(npoints);
            let mut values = Vec::with_capacity(npoints);
            for ie in 0..npoints {
                let row = rows
                    .next()
                    .and_then(|l| scanner::all_floats(l))
                    .filter(|r| r.len() >= 2 + 2 * n_channels)
                    .ok_or_else(|| format!("malformed energy point {} of IPOT {}", ie + 1, ipot))?;
                energies.push(Complex64::new(row[0], row[1]));
                values.push(
                    (0..n_channels)
                        .map(|c| Complex64::new(row[2 + 2 * c], row[3 + 2 * c]))
                        .collect(),
                );
            }
            blocks.push(DosBlock {
                ipot,
                energies,
                values,
            });
        }

        Ok(Self {
            nspin,
            fermi_energy,
            n_channels,
            blocks,
        })
    }
}
