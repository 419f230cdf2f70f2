//! # 杂质团簇合并
//!
//! 把两个单杂质团簇合并为一个双杂质团簇：
//! 1. 校验偏移、单杂质条件和宿主结构一致性 (在任何数值计算之前)
//! 2. 求第二个杂质中心相对第一个杂质中心的偏移矢量
//! 3. 平移团簇 2，与团簇 1 合并，去掉重合格点并记录 kickout 映射
//!
//! 重合判定阈值为 `DEDUP_TOLERANCE` (alat)。重合时保留团簇 1 的格点，
//! 但杂质中心总是替换掉与之重合的宿主格点。
//!
//! ## 依赖关系
//! - 被 `commands/combine.rs` 调用
//! - 使用 `models/impurity.rs` 数据结构
//! - 使用 `error.rs` 的 ValidationError

use crate::error::{KkrError, Result, ValidationError};
use crate::models::impurity::{
    norm, ClusterSite, HostStructure, ImpurityInfo, KickoutRecord, Offset, SiteOrigin, Source,
};

use std::collections::HashMap;
use std::f64::consts::TAU;

/// 去重阈值 (alat)
pub const DEDUP_TOLERANCE: f64 = 1e-4;

/// 宿主结构比较阈值
const HOST_TOLERANCE: f64 = 1e-6;

/// 面内矢量排序时长度视为相等的阈值
const LENGTH_TOLERANCE: f64 = 1e-8;

/// 允许的最大偏移索引
pub const MAX_OFFSET_INDEX: i64 = 10_000;

/// 合并结果
#[derive(Debug, Clone)]
pub struct CombinedCluster {
    pub info: ImpurityInfo,
    pub kickout: KickoutRecord,
    /// 实际使用的偏移矢量 (alat)
    pub offset: [f64; 3],
}

// ─────────────────────────────────────────────────────────────
// 校验
// ─────────────────────────────────────────────────────────────

/// 偏移索引校验: 不能为负，不能超过 `MAX_OFFSET_INDEX`；同一层时不能为 0
pub fn check_offset(imp1: &ImpurityInfo, imp2: &ImpurityInfo, offset: &Offset) -> Result<()> {
    if let Offset::Index(index) = *offset {
        if index < 0 {
            return Err(ValidationError::InplaneNeighborTooSmall {
                index,
                reason: "index must be non-negative".to_string(),
            }
            .into());
        }
        if index > MAX_OFFSET_INDEX {
            return Err(ValidationError::InplaneNeighborTooSmall {
                index,
                reason: format!("index must not exceed {}", MAX_OFFSET_INDEX),
            }
            .into());
        }
        if imp1.ilayer_center == imp2.ilayer_center && index < 1 {
            return Err(ValidationError::InplaneNeighborTooSmall {
                index,
                reason: format!(
                    "both impurities sit in layer {}, index must be at least 1",
                    imp1.ilayer_center
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// 单杂质校验: zimp 必须恰好一个
pub fn check_single_impurity(info: &ImpurityInfo, label: &str) -> Result<f64> {
    match info.zimp.as_slice() {
        [z] => Ok(*z),
        other => Err(ValidationError::InputNotSingleImpCalc {
            label: label.to_string(),
            count: other.len(),
        }
        .into()),
    }
}

/// 两个宿主结构是否一致 (晶胞和格点在阈值内相同)
pub fn hosts_match(a: &HostStructure, b: &HostStructure) -> bool {
    let close = |x: &[f64; 3], y: &[f64; 3]| x.iter().zip(y).all(|(p, q)| (p - q).abs() < HOST_TOLERANCE);

    a.sites.len() == b.sites.len()
        && a.cell.iter().zip(&b.cell).all(|(x, y)| close(x, y))
        && a.sites
            .iter()
            .zip(&b.sites)
            .all(|(s, t)| (s.z - t.z).abs() < HOST_TOLERANCE && close(&s.position, &t.position))
}

// ─────────────────────────────────────────────────────────────
// 偏移矢量
// ─────────────────────────────────────────────────────────────

/// 面内平移 n1·a1 + n2·a2，按长度排序，等长时按方位角排序；第 0 个为零矢量
///
/// 从系数方框 |n1|, |n2| ≤ r 中取矢量，方框外的平移长度不小于 σ·(r+1)，
/// σ 为 (a1, a2) 的最小奇异值。方框不够大时把 r 加倍重来，
/// 所以开销只随 `count` 线性增长。晶胞面内退化时返回空列表。
pub fn inplane_vectors(host: &HostStructure, count: usize) -> Vec<[f64; 3]> {
    let [a1, a2, _] = host.cell;
    let dot = |u: &[f64; 3], v: &[f64; 3]| u[0] * v[0] + u[1] * v[1] + u[2] * v[2];
    let (g11, g22, g12) = (dot(&a1, &a1), dot(&a2, &a2), dot(&a1, &a2));
    let lambda_min = 0.5 * (g11 + g22) - (0.25 * (g11 - g22).powi(2) + g12 * g12).sqrt();
    let sigma = lambda_min.max(0.0).sqrt();
    if count == 0 || sigma < LENGTH_TOLERANCE {
        return Vec::new();
    }

    let mut range = (count as f64).sqrt().ceil() as i64 + 1;
    loop {
        let mut vectors = lattice_box(&a1, &a2, range);
        sort_inplane(&mut vectors);
        if vectors.len() >= count {
            let longest = norm(&vectors[count - 1]);
            if sigma * (range + 1) as f64 > longest + LENGTH_TOLERANCE {
                vectors.truncate(count);
                return vectors;
            }
        }
        range *= 2;
    }
}

/// |n1|, |n2| ≤ range 的全部平移
fn lattice_box(a1: &[f64; 3], a2: &[f64; 3], range: i64) -> Vec<[f64; 3]> {
    let side = (2 * range + 1) as usize;
    let mut vectors = Vec::with_capacity(side * side);
    for n1 in -range..=range {
        for n2 in -range..=range {
            let (f1, f2) = (n1 as f64, n2 as f64);
            vectors.push([
                f1 * a1[0] + f2 * a2[0],
                f1 * a1[1] + f2 * a2[1],
                f1 * a1[2] + f2 * a2[2],
            ]);
        }
    }
    vectors
}

/// 按长度排序，等长 (LENGTH_TOLERANCE 内) 时按 [0, 2π) 方位角排序
fn sort_inplane(vectors: &mut [[f64; 3]]) {
    let angle = |v: &[f64; 3]| {
        if v[0].abs() < LENGTH_TOLERANCE && v[1].abs() < LENGTH_TOLERANCE {
            0.0
        } else {
            v[1].atan2(v[0]).rem_euclid(TAU)
        }
    };
    let mut keyed: Vec<(f64, f64, [f64; 3])> = vectors.iter().map(|v| (norm(v), angle(v), *v)).collect();
    keyed.sort_by(|(lu, au, _), (lv, av, _)| {
        if (lu - lv).abs() > LENGTH_TOLERANCE {
            lu.total_cmp(lv)
        } else {
            au.total_cmp(av)
        }
    });
    for (slot, (_, _, v)) in vectors.iter_mut().zip(keyed) {
        *slot = v;
    }
}

/// 第二个杂质中心相对第一个杂质中心的偏移
pub fn offset_vector(
    imp1: &ImpurityInfo,
    imp2: &ImpurityInfo,
    host: &HostStructure,
    offset: &Offset,
) -> Result<[f64; 3]> {
    match *offset {
        Offset::Vector(v) => Ok(v),
        Offset::Index(index) => {
            let k = usize::try_from(index)
                .map_err(|_| KkrError::InvalidArgument(format!("offset index {}", index)))?;
            let site = |layer: usize| {
                host.sites.get(layer).map(|s| s.position).ok_or_else(|| {
                    KkrError::InvalidArgument(format!(
                        "layer {} outside host structure with {} sites",
                        layer,
                        host.sites.len()
                    ))
                })
            };
            let p1 = site(imp1.ilayer_center)?;
            let p2 = site(imp2.ilayer_center)?;
            let shift = inplane_vectors(host, k + 1)
                .get(k)
                .copied()
                .ok_or_else(|| KkrError::InvalidArgument(format!("no in-plane vector {}", k)))?;
            Ok([
                p2[0] - p1[0] + shift[0],
                p2[1] - p1[1] + shift[1],
                p2[2] - p1[2] + shift[2],
            ])
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 合并
// ─────────────────────────────────────────────────────────────

/// 合并两个单杂质团簇
///
/// 校验顺序: 偏移 (850) → 单杂质 (800) → 宿主一致 (900)。
pub fn combine_clusters(
    imp1: &ImpurityInfo,
    host1: &HostStructure,
    imp2: &ImpurityInfo,
    host2: &HostStructure,
    offset: &Offset,
) -> Result<CombinedCluster> {
    check_offset(imp1, imp2, offset)?;
    let z1 = check_single_impurity(imp1, "imp1")?;
    let z2 = check_single_impurity(imp2, "imp2")?;
    if !hosts_match(host1, host2) {
        return Err(ValidationError::HostStructuresInconsistent(
            "impurities were computed on different host structures".to_string(),
        )
        .into());
    }

    let shift = offset_vector(imp1, imp2, host1, offset)?;
    if norm(&shift) < DEDUP_TOLERANCE {
        let index = match *offset {
            Offset::Index(i) => i,
            Offset::Vector(_) => 0,
        };
        return Err(ValidationError::InplaneNeighborTooSmall {
            index,
            reason: "both impurity centres fall on the same site".to_string(),
        }
        .into());
    }

    let shifted: Vec<ClusterSite> = imp2
        .imp_cls
        .iter()
        .map(|s| {
            ClusterSite::new(
                [
                    s.position[0] + shift[0],
                    s.position[1] + shift[1],
                    s.position[2] + shift[2],
                ],
                s.layer,
                s.z,
            )
        })
        .collect();

    let centres1 = imp1.center_indices(DEDUP_TOLERANCE);
    let centres2 = imp2.center_indices(DEDUP_TOLERANCE);
    let (n1, n2) = (imp1.n_sites(), shifted.len());

    // 团簇 2 的每个格点在团簇 1 中的重合格点
    let partner: Vec<Option<usize>> = shifted
        .iter()
        .map(|s2| {
            imp1.imp_cls.iter().position(|s1| {
                let d = [
                    s1.position[0] - s2.position[0],
                    s1.position[1] - s2.position[1],
                    s1.position[2] - s2.position[2],
                ];
                norm(&d) < DEDUP_TOLERANCE
            })
        })
        .collect();

    let mut kicked1 = vec![false; n1];
    let mut kicked2 = vec![false; n2];
    for (j, i) in partner.iter().enumerate() {
        if let Some(i) = *i {
            if centres2.contains(&j) && !centres1.contains(&i) {
                kicked1[i] = true;
            } else {
                kicked2[j] = true;
            }
        }
    }

    let mut origins = Vec::with_capacity(n1 + n2);
    let mut sites = Vec::with_capacity(n1 + n2);
    for (i, site) in imp1.imp_cls.iter().enumerate() {
        if !kicked1[i] {
            origins.push(SiteOrigin { source: Source::Imp1, index: i });
            sites.push(site.clone());
        }
    }
    for (j, site) in shifted.into_iter().enumerate() {
        if !kicked2[j] {
            origins.push(SiteOrigin { source: Source::Imp2, index: j });
            sites.push(site);
        }
    }

    let position: HashMap<SiteOrigin, usize> =
        origins.iter().enumerate().map(|(k, o)| (*o, k)).collect();
    let lookup = |source: Source, index: usize| -> Result<usize> {
        position
            .get(&SiteOrigin { source, index })
            .copied()
            .ok_or_else(|| {
                ValidationError::SomethingWentWrong(format!(
                    "site {} of {:?} has no place in the combined cluster",
                    index, source
                ))
                .into()
            })
    };

    let mut map_imp1 = Vec::with_capacity(n1);
    for i in 0..n1 {
        let target = if kicked1[i] {
            let j = partner
                .iter()
                .position(|p| *p == Some(i))
                .ok_or_else(|| ValidationError::SomethingWentWrong(format!("lost partner of site {}", i)))?;
            lookup(Source::Imp2, j)?
        } else {
            lookup(Source::Imp1, i)?
        };
        map_imp1.push(target);
    }

    let mut map_imp2 = Vec::with_capacity(n2);
    for j in 0..n2 {
        let target = match partner[j] {
            Some(i) if kicked2[j] => lookup(Source::Imp1, i)?,
            _ => lookup(Source::Imp2, j)?,
        };
        map_imp2.push(target);
    }

    let kickout = KickoutRecord {
        origins,
        map_imp1,
        map_imp2,
        kicked_out_imp1: (0..n1).filter(|&i| kicked1[i]).collect(),
        kicked_out_imp2: (0..n2).filter(|&j| kicked2[j]).collect(),
    };
    if !kickout.is_bijective() {
        return Err(ValidationError::SomethingWentWrong(
            "combined cluster does not map one-to-one onto its sources".to_string(),
        )
        .into());
    }

    let rcut = match (imp1.rcut, imp2.rcut) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };

    Ok(CombinedCluster {
        info: ImpurityInfo {
            zimp: vec![z1, z2],
            ilayer_center: imp1.ilayer_center,
            rcut,
            imp_cls: sites,
        },
        kickout,
        offset: shift,
    })
}
