//! # 杂质势合并
//!
//! 按 kickout 记录把两个收敛的杂质势拼成合并团簇的初始势。
//! 合并团簇第 k 个格点的 nspin 个势块取自其来源团簇的对应格点。
//!
//! ## 依赖关系
//! - 被 `commands/combine.rs` 调用
//! - 使用 `parsers/potential.rs` 的 PotentialFile
//! - 使用 `models/impurity.rs` 的 KickoutRecord

use crate::error::{Result, ValidationError};
use crate::models::{KickoutRecord, Source};
use crate::parsers::potential::PotentialFile;

/// 一个参与合并的杂质势
#[derive(Debug, Clone, Copy)]
pub struct PotentialSource<'a> {
    pub potential: &'a PotentialFile,
    pub nspin: usize,
    /// 源团簇格点数
    pub n_sites: usize,
}

impl PotentialSource<'_> {
    /// 势块数必须等于 nspin × 格点数
    fn check(&self, label: &str) -> Result<()> {
        let expected = self.nspin * self.n_sites;
        if self.potential.n_blocks() != expected {
            return Err(ValidationError::PotentialInconsistent(format!(
                "potential of {} has {} blocks, expected nspin {} x {} sites = {}",
                label,
                self.potential.n_blocks(),
                self.nspin,
                self.n_sites,
                expected
            ))
            .into());
        }
        Ok(())
    }
}

/// 合并两个杂质势
pub fn combine_potentials(
    kickout: &KickoutRecord,
    pot1: PotentialSource<'_>,
    pot2: PotentialSource<'_>,
) -> Result<PotentialFile> {
    if pot1.nspin != pot2.nspin {
        return Err(ValidationError::InconsistentNspinValues {
            nspin1: pot1.nspin,
            nspin2: pot2.nspin,
        }
        .into());
    }
    pot1.check("imp1")?;
    pot2.check("imp2")?;

    let nspin = pot1.nspin;
    let mut blocks = Vec::with_capacity(kickout.origins.len() * nspin);
    for (k, origin) in kickout.origins.iter().enumerate() {
        let source = match origin.source {
            Source::Imp1 => pot1.potential,
            Source::Imp2 => pot2.potential,
        };
        let site = source.site_blocks(nspin, origin.index).ok_or_else(|| {
            ValidationError::PotentialInconsistent(format!(
                "combined site {} refers to missing site {} of {:?}",
                k, origin.index, origin.source
            ))
        })?;
        blocks.extend_from_slice(site);
    }

    Ok(PotentialFile::from_blocks(blocks))
}
