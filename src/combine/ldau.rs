//! # LDA+U 设置重映射
//!
//! LDA+U 设置按杂质团簇中的原子序号 (从 1 开始) 存放，JSON 形式为
//! `{"iatom=3": {"L": 2, "U": 3.0, "J": 0.9, "Eref": 0.0}}`。
//! 合并团簇后用 kickout 映射把两边的序号换到合并团簇上，被去重的格点的设置丢弃。
//!
//! ## 依赖关系
//! - 被 `commands/combine.rs` 调用
//! - 使用 `models/impurity.rs` 的 KickoutRecord
//! - 使用 `serde` 描述格式, `utils/json.rs` 读取

use crate::error::{KkrError, Result};
use crate::models::{KickoutRecord, Source};
use crate::utils::json;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const KEY_PREFIX: &str = "iatom=";

/// 单个原子的 LDA+U 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdauEntry {
    #[serde(rename = "L")]
    pub l: u32,
    /// eV
    #[serde(rename = "U")]
    pub u: f64,
    /// eV
    #[serde(rename = "J")]
    pub j: f64,
    /// Ry
    #[serde(rename = "Eref")]
    pub eref: f64,
}

/// 一个团簇的 LDA+U 设置，键为从 1 开始的原子序号
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, LdauEntry>",
    into = "BTreeMap<String, LdauEntry>"
)]
pub struct LdauSettings {
    pub entries: BTreeMap<usize, LdauEntry>,
}

impl TryFrom<BTreeMap<String, LdauEntry>> for LdauSettings {
    type Error = String;

    fn try_from(map: BTreeMap<String, LdauEntry>) -> std::result::Result<Self, Self::Error> {
        let mut entries = BTreeMap::new();
        for (key, entry) in map {
            let iatom = key
                .strip_prefix(KEY_PREFIX)
                .and_then(|n| n.trim().parse::<usize>().ok())
                .filter(|&n| n >= 1)
                .ok_or_else(|| format!("invalid LDA+U key '{}', expected 'iatom=N' with N >= 1", key))?;
            entries.insert(iatom, entry);
        }
        Ok(Self { entries })
    }
}

impl From<LdauSettings> for BTreeMap<String, LdauEntry> {
    fn from(settings: LdauSettings) -> Self {
        settings
            .entries
            .into_iter()
            .map(|(iatom, entry)| (format!("{}{}", KEY_PREFIX, iatom), entry))
            .collect()
    }
}

impl LdauSettings {
    /// 从 JSON 文件读取
    pub fn read(path: &Path) -> Result<Self> {
        json::read_json(path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 把一侧的设置换到合并团簇的序号上
fn remap_into(
    combined: &mut BTreeMap<usize, LdauEntry>,
    settings: &LdauSettings,
    kickout: &KickoutRecord,
    source: Source,
) -> Result<()> {
    for (&iatom, entry) in &settings.entries {
        let old = iatom - 1;
        let new = kickout.combined_index(source, old).ok_or_else(|| {
            KkrError::InvalidArgument(format!(
                "LDA+U setting for atom {} of {:?} is outside its cluster",
                iatom, source
            ))
        })?;
        if kickout.is_kicked_out(source, old) {
            continue;
        }
        combined.insert(new + 1, entry.clone());
    }
    Ok(())
}

/// 合并两侧的 LDA+U 设置，任一侧都可以缺省
pub fn combine_ldau(
    kickout: &KickoutRecord,
    ldau1: Option<&LdauSettings>,
    ldau2: Option<&LdauSettings>,
) -> Result<LdauSettings> {
    let mut entries = BTreeMap::new();
    if let Some(settings) = ldau1 {
        remap_into(&mut entries, settings, kickout, Source::Imp1)?;
    }
    if let Some(settings) = ldau2 {
        remap_into(&mut entries, settings, kickout, Source::Imp2)?;
    }
    Ok(LdauSettings { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::impurity::SiteOrigin;

    fn kickout() -> KickoutRecord {
        KickoutRecord {
            origins: vec![
                SiteOrigin { source: Source::Imp1, index: 0 },
                SiteOrigin { source: Source::Imp1, index: 2 },
                SiteOrigin { source: Source::Imp2, index: 0 },
                SiteOrigin { source: Source::Imp2, index: 1 },
            ],
            map_imp1: vec![0, 2, 1],
            map_imp2: vec![2, 3, 0],
            kicked_out_imp1: vec![1],
            kicked_out_imp2: vec![2],
        }
    }

    fn entry(u: f64) -> LdauEntry {
        LdauEntry { l: 2, u, j: 0.9, eref: 0.0 }
    }

    #[test]
    fn test_json_keys() {
        let settings: LdauSettings =
            serde_json::from_str(r#"{"iatom=1": {"L": 2, "U": 3.0, "J": 0.9, "Eref": 0.0}}"#).unwrap();
        assert_eq!(settings.entries[&1], entry(3.0));

        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"iatom=1\""));
        assert!(json.contains("\"Eref\""));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let result: std::result::Result<LdauSettings, _> =
            serde_json::from_str(r#"{"iatom=0": {"L": 2, "U": 3.0, "J": 0.9, "Eref": 0.0}}"#);
        assert!(result.is_err());
        let result: std::result::Result<LdauSettings, _> =
            serde_json::from_str(r#"{"atom1": {"L": 2, "U": 3.0, "J": 0.9, "Eref": 0.0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_remap_both_sides() {
        let ldau1 = LdauSettings {
            entries: BTreeMap::from([(1, entry(3.0)), (2, entry(1.0))]),
        };
        let ldau2 = LdauSettings {
            entries: BTreeMap::from([(1, entry(4.0)), (3, entry(2.0))]),
        };
        let combined = combine_ldau(&kickout(), Some(&ldau1), Some(&ldau2)).unwrap();

        // imp1 原子 2 与 imp2 原子 3 被去重，设置丢弃
        assert_eq!(combined.entries.len(), 2);
        assert_eq!(combined.entries[&1], entry(3.0));
        assert_eq!(combined.entries[&3], entry(4.0));
    }

    #[test]
    fn test_one_side_absent() {
        let ldau2 = LdauSettings {
            entries: BTreeMap::from([(2, entry(4.0))]),
        };
        let combined = combine_ldau(&kickout(), None, Some(&ldau2)).unwrap();
        assert_eq!(combined.entries.keys().copied().collect::<Vec<_>>(), vec![4]);
        assert!(combine_ldau(&kickout(), None, None).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_atom() {
        let ldau1 = LdauSettings {
            entries: BTreeMap::from([(9, entry(3.0))]),
        };
        assert!(combine_ldau(&kickout(), Some(&ldau1), None).is_err());
    }
}
