//! # KKR 运行目录解析与校验
//!
//! 依次运行全部提取器，把失败汇总为按固定顺序排列的错误消息。
//! 每个提取器只读取文件并写入自己负责的字段，彼此之间没有副作用，
//! 所以失败的提取器不会影响其他提取器的结果。
//!
//! ```text
//! RunFiles ──► [Extractor; 21] ──► OutputRecord
//!                    │
//!                    └─ Err ──► "Error parsing output of KKR: <label>"
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/parse.rs`, `commands/scan.rs` 使用
//! - 调度 `kkr_out`, `init_out`, `iteration_out`, `timing`, `potential` 中的提取器

use crate::error::Result;
use crate::models::output::OutputRecord;
use crate::parsers::{init_out, iteration_out, kkr_out, potential, timing};

use std::path::{Path, PathBuf};

/// 错误消息前缀
pub const MESSAGE_PREFIX: &str = "Error parsing output of KKR: ";

// ─────────────────────────────────────────────────────────────
// 运行目录文件
// ─────────────────────────────────────────────────────────────

/// 默认文件名
pub const DEFAULT_OUT_KKR: &str = "out_kkr";
pub const DEFAULT_OUTPUT_0INIT: &str = "output.0.txt";
pub const DEFAULT_OUTPUT_000: &str = "output.000.txt";
pub const DEFAULT_OUTPUT_2: &str = "output.2.txt";
pub const DEFAULT_TIMING: &str = "out_timing.000.txt";
pub const DEFAULT_POTENTIAL: &str = "out_potential";
pub const DEFAULT_NONCO_ANGLES: &str = "nonco_angle_out.dat";

/// 一次 KKR 计算的输出文件集合
#[derive(Debug, Clone, PartialEq)]
pub struct RunFiles {
    /// 主日志
    pub out_kkr: PathBuf,
    /// 初始化日志
    pub output_0init: PathBuf,
    /// 逐迭代日志
    pub output_000: PathBuf,
    /// scfinfo 的备用日志
    pub output_2: PathBuf,
    pub timing: PathBuf,
    pub potential: PathBuf,
    pub nonco_angles: PathBuf,
}

impl RunFiles {
    /// 以默认文件名构造
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            out_kkr: dir.join(DEFAULT_OUT_KKR),
            output_0init: dir.join(DEFAULT_OUTPUT_0INIT),
            output_000: dir.join(DEFAULT_OUTPUT_000),
            output_2: dir.join(DEFAULT_OUTPUT_2),
            timing: dir.join(DEFAULT_TIMING),
            potential: dir.join(DEFAULT_POTENTIAL),
            nonco_angles: dir.join(DEFAULT_NONCO_ANGLES),
        }
    }

    /// 目录是否像一个 KKR 运行目录 (至少有主日志)
    pub fn looks_like_run(dir: &Path) -> bool {
        dir.join(DEFAULT_OUT_KKR).is_file()
    }
}

// ─────────────────────────────────────────────────────────────
// 提取器
// ─────────────────────────────────────────────────────────────

/// 提取器，声明顺序即错误消息的排列顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extractor {
    VersionInfo,
    Dimensions,
    Warnings,
    Timings,
    EnergyContour,
    Alat,
    Kmesh,
    Symmetries,
    Ewald,
    RmsError,
    ChargeNeutrality,
    TotalMagneticMoment,
    SpinMomentPerAtom,
    OrbitalMoment,
    FermiEnergy,
    DosAtFermiEnergy,
    TotalEnergy,
    SingleParticleEnergies,
    Charges,
    ScfInfo,
    CoreStates,
}

type ExtractFn = fn(&RunFiles, &mut OutputRecord) -> Result<()>;

impl Extractor {
    pub const ALL: [Extractor; 21] = [
        Extractor::VersionInfo,
        Extractor::Dimensions,
        Extractor::Warnings,
        Extractor::Timings,
        Extractor::EnergyContour,
        Extractor::Alat,
        Extractor::Kmesh,
        Extractor::Symmetries,
        Extractor::Ewald,
        Extractor::RmsError,
        Extractor::ChargeNeutrality,
        Extractor::TotalMagneticMoment,
        Extractor::SpinMomentPerAtom,
        Extractor::OrbitalMoment,
        Extractor::FermiEnergy,
        Extractor::DosAtFermiEnergy,
        Extractor::TotalEnergy,
        Extractor::SingleParticleEnergies,
        Extractor::Charges,
        Extractor::ScfInfo,
        Extractor::CoreStates,
    ];

    /// 错误消息中使用的标签 (下游按字面匹配，不可修改)
    pub fn label(self) -> &'static str {
        match self {
            Extractor::VersionInfo => "Version Info",
            Extractor::Dimensions => "nspin/natom",
            Extractor::Warnings => "search for warnings",
            Extractor::Timings => "timings",
            Extractor::EnergyContour => "energy contour",
            Extractor::Alat => "alat, 2*pi/alat",
            Extractor::Kmesh => "kmesh",
            Extractor::Symmetries => "symmetries",
            Extractor::Ewald => "ewald summation for madelung poterntial",
            Extractor::RmsError => "rms-error",
            Extractor::ChargeNeutrality => "charge neutrality",
            Extractor::TotalMagneticMoment => "total magnetic moment",
            Extractor::SpinMomentPerAtom => "spin moment per atom",
            Extractor::OrbitalMoment => "orbital moment",
            Extractor::FermiEnergy => "EF",
            Extractor::DosAtFermiEnergy => "DOS@EF",
            Extractor::TotalEnergy => "total energy",
            Extractor::SingleParticleEnergies => "single particle energies",
            Extractor::Charges => "charges",
            Extractor::ScfInfo => "scfinfo",
            Extractor::CoreStates => "core_states",
        }
    }

    /// 完整错误消息
    pub fn message(self) -> String {
        format!("{}{}", MESSAGE_PREFIX, self.label())
    }

    /// 只在 SCF 运行中才有意义的提取器 (DOS/qdos 运行跳过)
    pub fn requires_readin(self) -> bool {
        (Extractor::Ewald..=Extractor::ScfInfo).contains(&self)
    }

    fn function(self) -> ExtractFn {
        match self {
            Extractor::VersionInfo => kkr_out::extract_version,
            Extractor::Dimensions => init_out::extract_dimensions,
            Extractor::Warnings => kkr_out::extract_warnings,
            Extractor::Timings => timing::extract_timings,
            Extractor::EnergyContour => init_out::extract_energy_contour,
            Extractor::Alat => init_out::extract_alat,
            Extractor::Kmesh => init_out::extract_kmesh,
            Extractor::Symmetries => init_out::extract_symmetries,
            Extractor::Ewald => init_out::extract_ewald,
            Extractor::RmsError => kkr_out::extract_rms,
            Extractor::ChargeNeutrality => kkr_out::extract_charge_neutrality,
            Extractor::TotalMagneticMoment => kkr_out::extract_total_moment,
            Extractor::SpinMomentPerAtom => kkr_out::extract_spin_moments,
            Extractor::OrbitalMoment => kkr_out::extract_orbital_moments,
            Extractor::FermiEnergy => kkr_out::extract_fermi_energy,
            Extractor::DosAtFermiEnergy => kkr_out::extract_dos_at_fermi_energy,
            Extractor::TotalEnergy => kkr_out::extract_total_energy,
            Extractor::SingleParticleEnergies => iteration_out::extract_single_particle_energies,
            Extractor::Charges => iteration_out::extract_charges,
            Extractor::ScfInfo => iteration_out::extract_scfinfo,
            Extractor::CoreStates => potential::extract_core_states,
        }
    }

    /// 运行提取器
    pub fn run(self, files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
        (self.function())(files, record)
    }
}

// ─────────────────────────────────────────────────────────────
// 汇总
// ─────────────────────────────────────────────────────────────

/// 解析选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// DOS/qdos 运行: 跳过 SCF 相关的提取器
    pub skip_readin: bool,
}

/// 解析结果
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub success: bool,
    /// 按提取器顺序排列的错误消息
    pub messages: Vec<String>,
    /// (失败的提取器, 原因)
    pub diagnostics: Vec<(Extractor, String)>,
    pub record: OutputRecord,
}

impl ParseOutcome {
    /// 失败的提取器
    pub fn failed(&self) -> Vec<Extractor> {
        self.diagnostics.iter().map(|(e, _)| *e).collect()
    }
}

/// 解析一个 KKR 运行的全部输出
pub fn parse_kkr_output(files: &RunFiles, options: ParseOptions) -> ParseOutcome {
    let mut record = OutputRecord::new();
    let mut diagnostics = Vec::new();

    for extractor in Extractor::ALL {
        if options.skip_readin && extractor.requires_readin() {
            continue;
        }
        if let Err(e) = extractor.run(files, &mut record) {
            diagnostics.push((extractor, e.to_string()));
        }
    }

    diagnostics.sort_by_key(|(e, _)| *e);
    let messages: Vec<String> = diagnostics.iter().map(|(e, _)| e.message()).collect();

    ParseOutcome {
        success: messages.is_empty(),
        messages,
        diagnostics,
        record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::output::{EwaldMode, RY_TO_EV};

    use std::fs;

    const SOC_SIMPLE: &str = "fixtures/kkr_run_slab_soc_simple";
    const SOC_MAG: &str = "fixtures/kkr_run_slab_soc_mag";
    const NOSOC: &str = "fixtures/kkr_run_slab_nosoc";

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(name)
    }

    fn parse_fixture(name: &str) -> ParseOutcome {
        parse_kkr_output(&RunFiles::from_dir(&fixture(name)), ParseOptions::default())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * (1.0 + b.abs())
    }

    fn all_close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| close(*x, *y))
    }

    /// 复制参考运行到临时目录，再删除一个文件
    fn ablated(name: &str, removed: &str) -> (tempfile::TempDir, ParseOutcome) {
        let dir = tempfile::tempdir().unwrap();
        for entry in fs::read_dir(fixture(name)).unwrap() {
            let entry = entry.unwrap();
            if entry.file_name() != removed {
                fs::copy(entry.path(), dir.path().join(entry.file_name())).unwrap();
            }
        }
        let outcome = parse_kkr_output(&RunFiles::from_dir(dir.path()), ParseOptions::default());
        (dir, outcome)
    }

    fn messages(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| format!("{}{}", MESSAGE_PREFIX, l)).collect()
    }

    #[test]
    fn test_labels_and_order() {
        assert_eq!(Extractor::ALL.len(), 21);
        assert!(Extractor::ALL.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            Extractor::Ewald.message(),
            "Error parsing output of KKR: ewald summation for madelung poterntial"
        );
        let readin: Vec<_> = Extractor::ALL.iter().filter(|e| e.requires_readin()).collect();
        assert_eq!(readin.len(), 12);
        assert!(!Extractor::Symmetries.requires_readin());
        assert!(!Extractor::CoreStates.requires_readin());
    }

    #[test]
    fn test_complete_soc_run() {
        let outcome = parse_fixture(SOC_SIMPLE);
        assert!(outcome.success, "{:?}", outcome.diagnostics);
        assert!(outcome.messages.is_empty());

        let r = &outcome.record;
        let info = r.code_info_group.as_ref().unwrap();
        assert_eq!(info.code_version, "v2.2-22-g4f8f5ff");
        assert_eq!(info.compile_options, "openmp");
        assert_eq!(
            info.calculation_serial_number,
            "kkrjm_v2.2-22-g4f8f5ff_openmp_20171208103325"
        );

        assert_eq!(r.nspin, Some(2));
        assert_eq!(r.number_of_atoms_in_unit_cell, Some(6));
        assert_eq!(r.use_newsosol, Some(true));

        assert!(close(r.fermi_energy.unwrap(), 0.4930109676));
        assert!(close(r.dos_at_fermi_energy.unwrap(), 15.032559));
        assert!(close(r.total_energy_ry.unwrap(), -5081.91711436));
        assert!(close(r.energy.unwrap(), -5081.91711436 * RY_TO_EV));

        let conv = r.convergence_group.as_ref().unwrap();
        assert!(close(conv.rms.unwrap(), 0.23807));
        assert!(close(conv.charge_neutrality.unwrap(), -0.275847));
        assert_eq!(conv.calculation_converged, Some(false));
        assert_eq!(conv.nsteps_exhausted, Some(true));
        assert!(all_close(
            conv.rms_per_atom.as_ref().unwrap(),
            &[0.31221, 0.092203, 0.15861, 0.15861, 0.092203, 0.31221]
        ));

        let timings = r.timings_group.as_ref().unwrap();
        assert_eq!(timings[0], ("main0".to_string(), 22.6841));
        assert_eq!(timings[2], ("main1a".to_string(), 46.106));
        assert_eq!(timings[4], ("main1b".to_string(), 72.2102));

        let charges = r.nuclear_charge_per_atom.as_ref().unwrap();
        assert_eq!(charges, &vec![0.0, 0.0, 26.0, 26.0, 0.0, 0.0]);
        let core = r.charge_core_states_per_atom.as_ref().unwrap();
        assert_eq!(core, &vec![0.0, 0.0, 18.0, 18.0, 0.0, 0.0]);
        let valence = r.charge_valence_states_per_atom.as_ref().unwrap();
        assert!(close(valence[2], 7.628189));

        let core_states = r.core_states_group.as_ref().unwrap();
        assert_eq!(core_states.number_of_core_states_per_atom.len(), 12);
        assert_eq!(core_states.number_of_core_states_per_atom[0], 0);
        assert_eq!(core_states.descr_highest_lying_core_state_per_atom[0], "no core states");
        assert_eq!(core_states.energy_highest_lying_core_state_per_atom[0], None);
        assert_eq!(core_states.number_of_core_states_per_atom[4], 5);
        assert_eq!(core_states.descr_highest_lying_core_state_per_atom[4], "3p");
        assert!(close(
            core_states.energy_highest_lying_core_state_per_atom[4].unwrap(),
            -3.38073664131
        ));

        let ewald = r.ewald_sum_group.as_ref().unwrap();
        assert_eq!(ewald.ewald_summation_mode, EwaldMode::Bulk);
        assert_eq!(ewald.rsum_number_of_vectors, 425);
        assert_eq!(ewald.gsum_number_of_vectors, 16167);

        let kmesh = r.kmesh_group.as_ref().unwrap();
        assert_eq!(kmesh.kmesh_energypoint.len(), 45);
    }

    #[test]
    fn test_scalars_equal_last_history_entry() {
        let r = parse_fixture(SOC_SIMPLE).record;
        let conv = r.convergence_group.unwrap();
        assert_eq!(conv.rms, conv.rms_all_iterations.as_ref().and_then(|v| v.last().copied()));
        assert_eq!(
            conv.charge_neutrality,
            conv.charge_neutrality_all_iterations.as_ref().and_then(|v| v.last().copied())
        );
        assert_eq!(
            r.fermi_energy,
            conv.fermi_energy_all_iterations.as_ref().and_then(|v| v.last().copied())
        );
        assert_eq!(
            r.dos_at_fermi_energy,
            conv.dos_at_fermi_energy_all_iterations.as_ref().and_then(|v| v.last().copied())
        );
        assert_eq!(
            r.total_energy_ry,
            conv.total_energy_ry_all_iterations.as_ref().and_then(|v| v.last().copied())
        );
    }

    #[test]
    fn test_magnetic_soc_run() {
        let outcome = parse_fixture(SOC_MAG);
        assert!(outcome.success, "{:?}", outcome.diagnostics);
        let mag = outcome.record.magnetism_group.unwrap();
        assert!(close(mag.total_spin_moment.unwrap(), 4.346569));
        assert!(close(mag.total_orbital_moment.unwrap(), 0.1194));
        assert_eq!(mag.spin_moment_per_atom.as_ref().unwrap().len(), 6);
        assert_eq!(mag.spin_moment_vector_per_atom.as_ref().unwrap().len(), 6);
        assert_eq!(mag.spin_moment_angles_per_atom.unwrap()[0], [0.0, 0.0]);
        let orbital = mag.orbital_moment_per_atom.unwrap();
        let sum: f64 = orbital.iter().sum();
        assert!(close(sum, 0.1194));
    }

    #[test]
    fn test_nosoc_run() {
        let outcome = parse_fixture(NOSOC);
        assert!(outcome.success, "{:?}", outcome.diagnostics);
        let r = outcome.record;
        assert_eq!(r.use_newsosol, Some(false));

        let sym = r.symmetries_group.unwrap();
        assert_eq!(sym.number_of_used_symmetries, 4);
        let names: Vec<&str> = sym.symmetry_description.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["E", "C2z", "IC2x", "IC2y"]);
        assert_eq!(sym.symmetry_description[1].euler_angles, [180.0, 0.0, 0.0]);
        assert!(sym.symmetry_description[2].has_inversion);
        assert!(!sym.symmetry_description[1].has_inversion);

        let kmesh = r.kmesh_group.unwrap();
        assert_eq!(kmesh.number_kpoints_per_kmesh.number_of_kpts, vec![310, 112, 45, 12]);
        assert_eq!(kmesh.kmesh_energypoint.len(), 90);

        let mag = r.magnetism_group.unwrap();
        assert!(mag.spin_moment_per_atom.is_some());
        assert!(mag.total_spin_moment.is_some());
        assert!(mag.orbital_moment_per_atom.is_none());
        assert!(mag.total_orbital_moment.is_none());
        assert!(mag.spin_moment_vector_per_atom.is_none());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = serde_json::to_string(&parse_fixture(SOC_SIMPLE).record).unwrap();
        let second = serde_json::to_string(&parse_fixture(SOC_SIMPLE).record).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rms_cross_check() {
        let conv = parse_fixture(SOC_SIMPLE).record.convergence_group.unwrap();
        let history = conv.rms_all_iterations.unwrap();
        assert_eq!(conv.number_of_iterations, Some(history.len()));
    }

    #[test]
    fn test_missing_out_kkr() {
        let (_dir, outcome) = ablated(SOC_SIMPLE, DEFAULT_OUT_KKR);
        assert!(!outcome.success);
        assert_eq!(
            outcome.messages,
            messages(&[
                "Version Info",
                "search for warnings",
                "rms-error",
                "charge neutrality",
                "total magnetic moment",
                "spin moment per atom",
                "orbital moment",
                "EF",
                "DOS@EF",
                "total energy",
                "charges",
                "scfinfo",
            ])
        );
        assert!(outcome.record.code_info_group.is_none());
        assert!(outcome.record.nspin.is_some());
    }

    #[test]
    fn test_missing_output_0init() {
        let (_dir, outcome) = ablated(SOC_SIMPLE, DEFAULT_OUTPUT_0INIT);
        assert_eq!(
            outcome.messages,
            messages(&[
                "nspin/natom",
                "energy contour",
                "alat, 2*pi/alat",
                "kmesh",
                "symmetries",
                "ewald summation for madelung poterntial",
                "spin moment per atom",
                "orbital moment",
                "scfinfo",
            ])
        );
    }

    #[test]
    fn test_missing_output_000() {
        let (_dir, outcome) = ablated(SOC_SIMPLE, DEFAULT_OUTPUT_000);
        assert_eq!(
            outcome.messages,
            messages(&["kmesh", "rms-error", "single particle energies", "charges", "scfinfo"])
        );
    }

    #[test]
    fn test_missing_timing() {
        let (_dir, outcome) = ablated(SOC_SIMPLE, DEFAULT_TIMING);
        assert_eq!(outcome.messages, messages(&["timings"]));
        assert!(outcome.record.timings_group.is_none());
    }

    #[test]
    fn test_missing_potential() {
        let (_dir, outcome) = ablated(SOC_SIMPLE, DEFAULT_POTENTIAL);
        assert_eq!(outcome.messages, messages(&["core_states"]));
        assert_eq!(outcome.diagnostics[0].0, Extractor::CoreStates);
    }

    #[test]
    fn test_missing_nonco_angles() {
        let (_dir, outcome) = ablated(SOC_MAG, DEFAULT_NONCO_ANGLES);
        assert_eq!(outcome.messages, messages(&["spin moment per atom"]));
        let mag = outcome.record.magnetism_group.unwrap();
        assert!(mag.spin_moment_per_atom.is_none());
        assert!(mag.total_spin_moment.is_some());
    }

    #[test]
    fn test_skip_readin_cannot_fail_scf_extractors() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = parse_kkr_output(
            &RunFiles::from_dir(dir.path()),
            ParseOptions { skip_readin: true },
        );
        let failed = outcome.failed();
        assert_eq!(failed.len(), 9);
        assert!(failed.iter().all(|e| !e.requires_readin()));
    }

    #[test]
    fn test_empty_directory_fails_everything() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = parse_kkr_output(&RunFiles::from_dir(dir.path()), ParseOptions::default());
        assert_eq!(outcome.messages.len(), 21);
        assert!(outcome.record.present_keys().is_empty());
    }
}
