//! # 分析结果导出
//!
//! 导出 DOS 曲线和 Jij 格点对表到 CSV。
//!
//! ## 支持格式
//! - DOS CSV: `ipot, e_minus_ef_eV`, 然后每个通道一列原始值和一列插值
//! - Jij CSV: `i, j, rx, ry, rz, J_meV, D_meV, dx, dy, dz`
//!
//! ## 依赖关系
//! - 被 `commands/dos.rs`, `commands/jij.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::analysis::dos::DosData;
use crate::analysis::jij::JijPair;
use crate::error::{KkrError, Result};

use std::path::Path;

/// 导出 DOS 为 CSV
pub fn dos_to_csv(data: &DosData, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    let mut header = vec!["ipot".to_string(), "e_minus_ef_eV".to_string()];
    for name in &data.names {
        header.push(format!("dos_{}", name));
        header.push(format!("interpolated_dos_{}", name));
    }
    wtr.write_record(&header)?;

    for (raw, smooth) in data.raw.iter().zip(&data.interpolated) {
        for (k, energy) in raw.energies.iter().enumerate() {
            let mut row = vec![raw.ipot.to_string(), format!("{:.6}", energy)];
            for (r, s) in raw.channels.iter().zip(&smooth.channels) {
                row.push(format!("{:.8e}", r[k]));
                row.push(format!("{:.8e}", s[k]));
            }
            wtr.write_record(&row)?;
        }
    }

    wtr.flush().map_err(|e| KkrError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// 导出 Jij 格点对为 CSV
pub fn jij_to_csv(pairs: &[JijPair], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    for pair in pairs {
        wtr.serialize(pair)?;
    }
    wtr.flush().map_err(|e| KkrError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    Ok(())
}
