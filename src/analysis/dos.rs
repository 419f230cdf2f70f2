//! # 态密度插值与单位换算
//!
//! KKR 在离实轴 η 的复能量 z = E + iη 上计算 n(z)。直接取 Im n(z) 得到展宽的 DOS；
//! 用一阶 Taylor 展开把 n 延拓回实轴，n(E) ≈ n(z) − iη·dn/dz，得到插值 DOS。
//! 导数用沿围道的中心差分，两端用单侧差分。
//!
//! 输出统一换算到 eV: E → (E − EF)·Ry2eV，DOS → DOS / Ry2eV。
//!
//! ## 依赖关系
//! - 被 `commands/dos.rs` 使用
//! - 使用 `parsers/complex_dos.rs`, `num-complex`

use crate::models::output::RY_TO_EV;
use crate::parsers::complex_dos::{ComplexDos, DosBlock};

use num_complex::Complex64;

/// 角动量通道名
const CHANNEL_NAMES: [&str; 6] = ["tot", "s", "p", "d", "f", "g"];

/// 通道名: 前 n−1 个取自 `tot, s, p, d, f, g`，最后一个为 `ns`
pub fn channel_names(n_channels: usize) -> Vec<String> {
    let mut names: Vec<String> = CHANNEL_NAMES
        .iter()
        .take(n_channels.saturating_sub(1))
        .map(|s| s.to_string())
        .collect();
    if n_channels > 0 {
        names.push("ns".to_string());
    }
    names
}

/// 一个势块的实数 DOS 曲线
#[derive(Debug, Clone, PartialEq)]
pub struct DosCurve {
    pub ipot: usize,
    /// E − EF (eV)
    pub energies: Vec<f64>,
    /// `channels[通道][点]` (states/eV)
    pub channels: Vec<Vec<f64>>,
}

/// 原始与插值两套 DOS
#[derive(Debug, Clone)]
pub struct DosData {
    pub names: Vec<String>,
    pub raw: Vec<DosCurve>,
    pub interpolated: Vec<DosCurve>,
}

/// 沿围道的 dn/dz
fn derivative(energies: &[Complex64], values: &[Complex64]) -> Vec<Complex64> {
    let n = energies.len();
    if n < 2 {
        return vec![Complex64::new(0.0, 0.0); n];
    }
    (0..n)
        .map(|k| {
            let (lo, hi) = match k {
                0 => (0, 1),
                k if k == n - 1 => (n - 2, n - 1),
                k => (k - 1, k + 1),
            };
            let dz = energies[hi] - energies[lo];
            if dz.norm() == 0.0 {
                Complex64::new(0.0, 0.0)
            } else {
                (values[hi] - values[lo]) / dz
            }
        })
        .collect()
}

/// 一个块的某个通道在每个能量点上的值
fn channel_values(block: &DosBlock, channel: usize) -> Vec<Complex64> {
    block.values.iter().map(|row| row[channel]).collect()
}

fn to_ev_energies(block: &DosBlock, fermi_energy: f64) -> Vec<f64> {
    block
        .energies
        .iter()
        .map(|z| (z.re - fermi_energy) * RY_TO_EV)
        .collect()
}

/// 未插值的 DOS: Im n(z)
pub fn raw_dos(dos: &ComplexDos) -> Vec<DosCurve> {
    dos.blocks
        .iter()
        .map(|block| DosCurve {
            ipot: block.ipot,
            energies: to_ev_energies(block, dos.fermi_energy),
            channels: (0..dos.n_channels)
                .map(|c| {
                    channel_values(block, c)
                        .iter()
                        .map(|n| n.im / RY_TO_EV)
                        .collect()
                })
                .collect(),
        })
        .collect()
}

/// 延拓到实轴的 DOS: Im[n(z) − iη·dn/dz]
pub fn interpolated_dos(dos: &ComplexDos) -> Vec<DosCurve> {
    dos.blocks
        .iter()
        .map(|block| DosCurve {
            ipot: block.ipot,
            energies: to_ev_energies(block, dos.fermi_energy),
            channels: (0..dos.n_channels)
                .map(|c| {
                    let values = channel_values(block, c);
                    let slope = derivative(&block.energies, &values);
                    values
                        .iter()
                        .zip(&slope)
                        .zip(&block.energies)
                        .map(|((n, dn), z)| {
                            let shift = Complex64::new(0.0, z.im) * dn;
                            (n - shift).im / RY_TO_EV
                        })
                        .collect()
                })
                .collect(),
        })
        .collect()
}

/// 两套 DOS 一起计算
pub fn process(dos: &ComplexDos) -> DosData {
    DosData {
        names: channel_names(dos.n_channels),
        raw: raw_dos(dos),
        interpolated: interpolated_dos(dos),
    }
}
