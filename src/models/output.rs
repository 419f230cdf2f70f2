//! # KKR 输出记录数据模型
//!
//! 一次 KKR 计算解析后的结构化结果。所有字段都是可选的，
//! 只有成功的提取器才会写入对应字段，序列化时缺省字段不出现。
//!
//! ## 依赖关系
//! - 被 `parsers/` 下的提取器写入
//! - 被 `commands/parse.rs`, `commands/scan.rs` 输出
//! - 使用 `serde` 序列化

use serde::{Deserialize, Serialize};

/// Rydberg -> eV 换算常数
pub const RY_TO_EV: f64 = 13.605693009;

/// 代码版本信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInfo {
    pub code_version: String,
    pub compile_options: String,
    pub calculation_serial_number: String,
}

/// 警告列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningsGroup {
    pub number_of_warnings: usize,
    pub warnings_list: Vec<String>,
}

/// 能量围道参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyContour {
    pub emin: f64,
    pub emin_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emax_unit: Option<String>,
    pub number_of_energy_points: usize,
    pub temperature: f64,
    pub temperature_unit: String,
    pub npol: usize,
    pub n1: usize,
    pub n2: usize,
    pub n3: usize,
}

/// 每个 k 网格的点数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpointsPerKmesh {
    pub n_kx: Vec<usize>,
    pub n_ky: Vec<usize>,
    pub n_kz: Vec<usize>,
    pub number_of_kpts: Vec<usize>,
}

/// k 网格描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmeshGroup {
    pub number_different_kmeshes: usize,
    pub number_kpoints_per_kmesh: KpointsPerKmesh,
    /// 每个能量点使用的 k 网格编号
    pub kmesh_energypoint: Vec<usize>,
}

/// 对称操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryOperation {
    pub name: String,
    /// 欧拉角 (degree)
    pub euler_angles: [f64; 3],
    pub has_inversion: bool,
    pub is_unitary: bool,
}

/// 对称性描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetriesGroup {
    pub number_of_lattice_symmetries: usize,
    pub number_of_used_symmetries: usize,
    pub symmetry_description: Vec<SymmetryOperation>,
}

/// Ewald 求和模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EwaldMode {
    #[serde(rename = "3D")]
    Bulk,
    #[serde(rename = "2D")]
    Slab,
}

impl std::fmt::Display for EwaldMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EwaldMode::Bulk => write!(f, "3D"),
            EwaldMode::Slab => write!(f, "2D"),
        }
    }
}

/// Madelung 势的 Ewald 求和参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EwaldSumGroup {
    pub ewald_summation_mode: EwaldMode,
    pub rsum_cutoff: f64,
    pub rsum_cutoff_unit: String,
    pub rsum_number_of_vectors: usize,
    pub rsum_number_of_shells: usize,
    pub gsum_cutoff: f64,
    pub gsum_cutoff_unit: String,
    pub gsum_number_of_vectors: usize,
    pub gsum_number_of_shells: usize,
    /// 仅 2D (slab) 模式: 面内实空间截断半径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmax_2d: Option<f64>,
    /// 仅 2D (slab) 模式: 面内倒空间截断半径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmax_2d: Option<f64>,
}

/// 收敛历史
///
/// 由多个提取器共同填充，每个字段只由一个提取器写入。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceGroup {
    // rms-error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_all_iterations: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_per_atom: Option<Vec<f64>>,

    // charge neutrality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_neutrality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_neutrality_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_neutrality_all_iterations: Option<Vec<f64>>,

    // magnetism
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spin_moment_all_iterations: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_moment_per_atom_all_iterations: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_moment_per_atom_all_iterations: Option<Vec<Vec<f64>>>,

    // EF, DOS(EF), total energy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fermi_energy_all_iterations: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dos_at_fermi_energy_all_iterations: Option<Vec<f64>>,
    #[serde(rename = "total_energy_Ry_all_iterations")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_energy_ry_all_iterations: Option<Vec<f64>>,

    // scfinfo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_iterations_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_converged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsteps_exhausted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imix: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strmix: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idtbry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brymix: Option<f64>,
}

/// 磁性信息（最后一次迭代）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MagnetismGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spin_moment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spin_moment_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_moment_per_atom: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_moment_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_moment_vector_per_atom: Option<Vec<[f64; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_moment_angles_per_atom: Option<Vec<[f64; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_moment_angles_per_atom_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_moment_per_atom: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_orbital_moment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbital_moment_unit: Option<String>,
}

/// 芯态信息，每个势块一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreStatesGroup {
    pub number_of_core_states_per_atom: Vec<usize>,
    pub energy_highest_lying_core_state_per_atom: Vec<Option<f64>>,
    pub energy_highest_lying_core_state_per_atom_unit: String,
    pub descr_highest_lying_core_state_per_atom: Vec<String>,
}

/// 一次 KKR 计算的解析结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_info_group: Option<CodeInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nspin: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_atoms_in_unit_cell: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_newsosol: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings_group: Option<WarningsGroup>,

    /// (阶段名, 秒)，保持文件中的顺序
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings_group: Option<Vec<(String, f64)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_contour_group: Option<EnergyContour>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alat_internal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alat_internal_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_pi_over_alat_internal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_pi_over_alat_internal_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kmesh_group: Option<KmeshGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symmetries_group: Option<SymmetriesGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ewald_sum_group: Option<EwaldSumGroup>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence_group: Option<ConvergenceGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnetism_group: Option<MagnetismGroup>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fermi_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fermi_energy_units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dos_at_fermi_energy: Option<f64>,

    /// 总能 (eV)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_unit: Option<String>,
    #[serde(rename = "total_energy_Ry")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_energy_ry: Option<f64>,
    #[serde(rename = "total_energy_Ry_unit")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_energy_ry_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_particle_energies: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_particle_energies_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nuclear_charge_per_atom: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nuclear_charge_per_atom_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_core_states_per_atom: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_core_states_per_atom_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_valence_states_per_atom: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_valence_states_per_atom_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_charge_per_atom: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_charge_per_atom_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_states_group: Option<CoreStatesGroup>,
}

impl OutputRecord {
    /// 创建空记录
    pub fn new() -> Self {
        Self::default()
    }

    /// 收敛组，不存在时创建
    pub fn convergence_mut(&mut self) -> &mut ConvergenceGroup {
        self.convergence_group.get_or_insert_with(ConvergenceGroup::default)
    }

    /// 磁性组，不存在时创建
    pub fn magnetism_mut(&mut self) -> &mut MagnetismGroup {
        self.magnetism_group.get_or_insert_with(MagnetismGroup::default)
    }

    /// 计算是否收敛（缺少 scfinfo 时视为未收敛）
    pub fn is_converged(&self) -> bool {
        self.convergence_group
            .as_ref()
            .and_then(|c| c.calculation_converged)
            .unwrap_or(false)
    }

    /// 序列化后顶层出现的键
    pub fn present_keys(&self) -> Vec<String> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_has_no_keys() {
        let record = OutputRecord::new();
        assert!(record.present_keys().is_empty());
        assert!(!record.is_converged());
    }

    #[test]
    fn test_renamed_keys() {
        let mut record = OutputRecord::new();
        record.total_energy_ry = Some(-1.0);
        record.convergence_mut().total_energy_ry_all_iterations = Some(vec![-1.0]);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"total_energy_Ry\""));
        assert!(json.contains("\"total_energy_Ry_all_iterations\""));
        assert_eq!(record.present_keys(), vec!["convergence_group", "total_energy_Ry"]);
    }

    #[test]
    fn test_ewald_mode_serialization() {
        assert_eq!(serde_json::to_string(&EwaldMode::Bulk).unwrap(), "\"3D\"");
        assert_eq!(EwaldMode::Slab.to_string(), "2D");
    }
}
