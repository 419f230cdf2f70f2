//! # 杂质团簇数据模型
//!
//! 单杂质计算的团簇描述、宿主结构以及合并后的 kickout 记录。
//! 团簇坐标以杂质中心为原点，单位为晶格常数 alat。
//!
//! ## 依赖关系
//! - 被 `combine/` 模块使用
//! - 被 `commands/combine.rs`, `commands/jij.rs` 读写 (JSON)
//! - 使用 `serde` 序列化

use serde::{Deserialize, Serialize};

/// 团簇中的一个格点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSite {
    /// 相对杂质中心的位置 (alat)
    pub position: [f64; 3],
    /// 宿主层编号 (宿主晶胞中的格点序号)
    pub layer: usize,
    /// 核电荷数
    pub z: f64,
}

impl ClusterSite {
    pub fn new(position: [f64; 3], layer: usize, z: f64) -> Self {
        Self { position, layer, z }
    }

    /// 到原点的距离
    pub fn distance(&self) -> f64 {
        norm(&self.position)
    }
}

/// 单个 (或合并后的) 杂质团簇描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpurityInfo {
    /// 杂质核电荷数，单杂质计算只有一个
    #[serde(rename = "Zimp")]
    pub zimp: Vec<f64>,
    /// 杂质所在的宿主层
    pub ilayer_center: usize,
    /// 团簇截断半径 (alat)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcut: Option<f64>,
    /// 团簇格点，第一项是杂质中心
    pub imp_cls: Vec<ClusterSite>,
}

impl ImpurityInfo {
    /// 团簇格点数
    pub fn n_sites(&self) -> usize {
        self.imp_cls.len()
    }

    /// 杂质中心格点的序号 (位于原点且 Z 为杂质的格点)
    pub fn center_indices(&self, tolerance: f64) -> Vec<usize> {
        self.imp_cls
            .iter()
            .enumerate()
            .filter(|(_, s)| s.distance() < tolerance)
            .map(|(i, _)| i)
            .collect()
    }
}

/// 宿主晶胞中的格点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSite {
    /// 笛卡尔坐标 (alat)
    pub position: [f64; 3],
    pub z: f64,
}

/// 宿主结构 (slab 或体材料)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStructure {
    /// 晶格矢量 (alat)，前两个为面内矢量
    pub cell: [[f64; 3]; 3],
    pub sites: Vec<HostSite>,
}

/// 第二个杂质相对第一个杂质的偏移
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Offset {
    /// 笛卡尔偏移矢量 (alat)
    Vector([f64; 3]),
    /// 面内第 k 近邻晶格矢量，0 为零矢量
    Index(i64),
}

/// 合并后格点的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Imp1,
    Imp2,
}

/// 合并团簇中一个格点的来源 (源, 源中的序号)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteOrigin {
    pub source: Source,
    pub index: usize,
}

/// 合并团簇时的去重记录
///
/// `origins[k]` 给出合并团簇第 k 个格点的来源；`map_imp1[i]`/`map_imp2[i]`
/// 给出源团簇第 i 个格点在合并团簇中的序号 (被去重的格点映射到保留下来的那一个)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KickoutRecord {
    pub origins: Vec<SiteOrigin>,
    pub map_imp1: Vec<usize>,
    pub map_imp2: Vec<usize>,
    /// 被去重掉的源格点序号
    pub kicked_out_imp1: Vec<usize>,
    pub kicked_out_imp2: Vec<usize>,
}

impl KickoutRecord {
    /// 某源格点映射到的合并序号
    pub fn combined_index(&self, source: Source, index: usize) -> Option<usize> {
        match source {
            Source::Imp1 => self.map_imp1.get(index).copied(),
            Source::Imp2 => self.map_imp2.get(index).copied(),
        }
    }

    /// 某源格点是否被去重
    pub fn is_kicked_out(&self, source: Source, index: usize) -> bool {
        match source {
            Source::Imp1 => self.kicked_out_imp1.contains(&index),
            Source::Imp2 => self.kicked_out_imp2.contains(&index),
        }
    }

    /// 去重格点数
    pub fn n_duplicates(&self) -> usize {
        self.kicked_out_imp1.len() + self.kicked_out_imp2.len()
    }

    /// `origins` 与映射是否构成合并团簇上的双射
    pub fn is_bijective(&self) -> bool {
        let n = self.origins.len();
        let mut seen = vec![false; n];
        for (k, origin) in self.origins.iter().enumerate() {
            if self.combined_index(origin.source, origin.index) != Some(k) {
                return false;
            }
            if self.is_kicked_out(origin.source, origin.index) {
                return false;
            }
            seen[k] = true;
        }
        let targets_valid = self
            .map_imp1
            .iter()
            .chain(self.map_imp2.iter())
            .all(|&k| k < n);
        seen.into_iter().all(|s| s) && targets_valid
    }
}

/// 矢量模长
pub fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
