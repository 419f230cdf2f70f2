//! # 交换张量 Jij 约化
//!
//! Jij 计算对磁矩取三个方向各做一次 (θ,φ = (0,0), (90,0), (90,90))，
//! 每次只有部分张量分量可靠。这里把三次的结果拼成完整的 3×3 张量，
//! 再给出各向同性交换 J 和 Dzyaloshinskii-Moriya 矢量 D。
//!
//! 原始数据形状为 (3, natom, natom, 3, 3)：迭代、格点 i、格点 j、张量分量 k、l。
//!
//! ## 依赖关系
//! - 被 `commands/jij.rs` 使用
//! - 使用 `models/impurity.rs` (团簇坐标与核电荷)

use crate::error::{KkrError, Result};
use crate::models::output::RY_TO_EV;
use crate::models::ImpurityInfo;

use serde::Serialize;

/// Z 比较容差
const Z_TOLERANCE: f64 = 1e-6;

/// 三个方向合并后的交换张量 (meV)，只填 i < j 的上三角
#[derive(Debug, Clone, PartialEq)]
pub struct JijTensor {
    pub natom: usize,
    data: Vec<[[f64; 3]; 3]>,
}

impl JijTensor {
    /// 从原始数值合并三次迭代并换算为 meV
    ///
    /// 正值表示铁磁耦合。
    pub fn from_raw(values: &[f64]) -> std::result::Result<Self, String> {
        let natom = infer_natom(values.len())?;
        let raw = |iter: usize, i: usize, j: usize, k: usize, l: usize| {
            values[(((iter * natom + i) * natom + j) * 3 + k) * 3 + l]
        };

        let scale = -RY_TO_EV * 1000.0;
        let mut data = vec![[[0.0; 3]; 3]; natom * natom];
        for i in 0..natom {
            for j in i + 1..natom {
                let t = &mut data[i * natom + j];
                // (0,0): 面内分量
                t[0][0] = raw(0, i, j, 0, 0);
                t[0][1] = raw(0, i, j, 0, 1);
                t[1][0] = raw(0, i, j, 1, 0);
                t[1][1] = raw(0, i, j, 1, 1);
                // (90,0)
                t[1][2] = raw(1, i, j, 1, 2);
                t[2][1] = raw(1, i, j, 2, 1);
                // (90,90)
                t[0][2] = raw(2, i, j, 0, 2);
                t[2][0] = raw(2, i, j, 2, 0);
                // zz 取后两次的平均
                t[2][2] = 0.5 * (raw(1, i, j, 2, 2) + raw(2, i, j, 2, 2));

                for row in t.iter_mut() {
                    for v in row.iter_mut() {
                        *v *= scale;
                    }
                }
            }
        }
        Ok(Self { natom, data })
    }

    /// 格点对 (i, j) 的张量
    pub fn get(&self, i: usize, j: usize) -> &[[f64; 3]; 3] {
        &self.data[i * self.natom + j]
    }

    /// 各向同性交换 J = tr/3
    pub fn isotropic(&self, i: usize, j: usize) -> f64 {
        let t = self.get(i, j);
        (t[0][0] + t[1][1] + t[2][2]) / 3.0
    }

    /// DM 矢量 (yz−zy, zx−xz, xy−yx)
    pub fn dm_vector(&self, i: usize, j: usize) -> [f64; 3] {
        let t = self.get(i, j);
        [t[1][2] - t[2][1], t[2][0] - t[0][2], t[0][1] - t[1][0]]
    }
}

/// 由数值个数推断原子数: len = 3·3·3·natom²
fn infer_natom(len: usize) -> std::result::Result<usize, String> {
    if len == 0 || len % 27 != 0 {
        return Err(format!("{} values cannot be reshaped to (3, n, n, 3, 3)", len));
    }
    let squared = len / 27;
    let natom = (squared as f64).sqrt().round() as usize;
    if natom * natom != squared {
        return Err(format!("{} values cannot be reshaped to (3, n, n, 3, 3)", len));
    }
    Ok(natom)
}

/// 一对磁性格点的交换参数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JijPair {
    pub i: usize,
    pub j: usize,
    /// r_j − r_i (alat)
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    #[serde(rename = "J_meV")]
    pub j_mev: f64,
    #[serde(rename = "D_meV")]
    pub d_mev: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

/// 团簇中核电荷等于两个杂质之一的格点
pub fn active_sites(info: &ImpurityInfo, zimp1: f64, zimp2: f64) -> Vec<usize> {
    info.imp_cls
        .iter()
        .enumerate()
        .filter(|(_, s)| (s.z - zimp1).abs() < Z_TOLERANCE || (s.z - zimp2).abs() < Z_TOLERANCE)
        .map(|(i, _)| i)
        .collect()
}

/// 约化结果
#[derive(Debug, Clone)]
pub struct JijAnalysis {
    pub tensor: JijTensor,
    pub pairs: Vec<JijPair>,
}

/// 合并张量并列出磁性格点对
pub fn analyze(values: &[f64], info: &ImpurityInfo, zimp1: f64, zimp2: f64) -> Result<JijAnalysis> {
    let tensor = JijTensor::from_raw(values).map_err(KkrError::InvalidArgument)?;
    if tensor.natom != info.n_sites() {
        return Err(KkrError::InvalidArgument(format!(
            "Jij matrix has {} atoms but the impurity cluster has {} sites",
            tensor.natom,
            info.n_sites()
        )));
    }

    let active = active_sites(info, zimp1, zimp2);
    let mut pairs = Vec::new();
    for i in 0..tensor.natom {
        for j in i + 1..tensor.natom {
            if !active.contains(&i) || !active.contains(&j) {
                continue;
            }
            let d = tensor.dm_vector(i, j);
            let (pi, pj) = (info.imp_cls[i].position, info.imp_cls[j].position);
            pairs.push(JijPair {
                i,
                j,
                rx: pj[0] - pi[0],
                ry: pj[1] - pi[1],
                rz: pj[2] - pi[2],
                j_mev: tensor.isotropic(i, j),
                d_mev: (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt(),
                dx: d[0],
                dy: d[1],
                dz: d[2],
            });
        }
    }
    Ok(JijAnalysis { tensor, pairs })
}

/// 文本摘要: `i j J |D| |D|/J`
pub fn summary_text(pairs: &[JijPair]) -> String {
    let mut text = String::from(
        "Output Jij values between magnetic impurities:\n\
         i   j     Jij (meV)       Dij(meV)        D/J\n\
         -----------------------------------------------\n",
    );
    for p in pairs {
        text.push_str(&format!(
            "{:3} {:3} {:>15} {:>15} {:>15}\n",
            p.i,
            p.j,
            c_exp(p.j_mev, 5),
            c_exp(p.d_mev, 5),
            c_exp(p.d_mev / p.j_mev, 5)
        ));
    }
    text
}

/// C 风格科学计数 (`1.23450e+01`)
fn c_exp(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}
