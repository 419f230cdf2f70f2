//! # combine 命令实现
//!
//! 合并两个收敛的单杂质计算，生成双杂质 SCF 的全部输入:
//! 1. 读取杂质输入并检查收敛
//! 2. 合并团簇 (`impurity_info.json`, `kickout_info.json`)
//! 3. 合并工作流参数 (`scf_wf_parameters.json`, `gf_parameters.json`, `run_options.json`)
//! 4. 宿主 GF 就绪后合并势 (`host_imp_startpot`) 和 LDA+U 设置 (`settings_LDAU.json`)
//! 5. 需要 Jij 步骤时准备 `jij_parameters.json`
//!
//! 每一步都推进 `workflow_state.json` 中的状态机；校验失败时状态记为 Failed(退出码)。
//!
//! ## 依赖关系
//! - 使用 `cli/combine.rs` 定义的参数
//! - 使用 `combine/` 合并引擎, `workflow/` 状态机与参数
//! - 使用 `utils/output.rs`, `utils/json.rs`

use crate::cli::combine::CombineArgs;
use crate::combine::{combine_clusters, combine_ldau, combine_potentials, LdauSettings, PotentialSource};
use crate::error::{KkrError, Result, ValidationError};
use crate::parsers::potential::PotentialFile;
use crate::utils::{json, output};
use crate::workflow::params::{jij_parameters, update_params};
use crate::workflow::{read_params, CombineEvent, ImpurityInput, Params, WorkflowState};

use std::fs;
use std::path::Path;

pub const IMPURITY_INFO_FILE: &str = "impurity_info.json";
pub const KICKOUT_FILE: &str = "kickout_info.json";
pub const POTENTIAL_FILE: &str = "host_imp_startpot";
pub const LDAU_FILE: &str = "settings_LDAU.json";
pub const SCF_PARAMS_FILE: &str = "scf_wf_parameters.json";
pub const GF_PARAMS_FILE: &str = "gf_parameters.json";
pub const RUN_OPTIONS_FILE: &str = "run_options.json";
pub const JIJ_PARAMS_FILE: &str = "jij_parameters.json";

/// 本命令写出的全部结果文件
const OUTPUT_FILES: [&str; 8] = [
    IMPURITY_INFO_FILE,
    KICKOUT_FILE,
    POTENTIAL_FILE,
    LDAU_FILE,
    SCF_PARAMS_FILE,
    GF_PARAMS_FILE,
    RUN_OPTIONS_FILE,
    JIJ_PARAMS_FILE,
];

/// 执行 combine 命令
pub fn execute(args: CombineArgs) -> Result<()> {
    output::print_header("Combine Impurity Calculations");

    fs::create_dir_all(&args.output_dir).map_err(|e| KkrError::FileWriteError {
        path: args.output_dir.display().to_string(),
        source: e,
    })?;

    if let Ok(previous) = WorkflowState::load(&args.output_dir) {
        output::print_warning(&format!(
            "Replacing previous workflow state {:?} in '{}'",
            previous.state,
            args.output_dir.display()
        ));
    }

    clear_outputs(&args.output_dir)?;

    let mut state = WorkflowState::default();
    let result = run_steps(&args, &mut state);

    if let Err(KkrError::Validation(err)) = &result {
        if !state.state.is_terminal() {
            state.apply(CombineEvent::Aborted(err.clone()))?;
        }
    }
    state.save(&args.output_dir)?;
    output::print_info(&format!("Workflow state: {:?}", state.state));
    result
}

/// 删除上一次运行留下的结果文件，目录中只保留与新状态一致的输出
fn clear_outputs(dir: &Path) -> Result<()> {
    for name in OUTPUT_FILES {
        let path = dir.join(name);
        if path.is_file() {
            fs::remove_file(&path).map_err(|e| KkrError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// 依次执行各步骤并推进状态
fn run_steps(args: &CombineArgs, state: &mut WorkflowState) -> Result<()> {
    let dir = &args.output_dir;

    // ─────────────────────────────────────────────────────────────
    // 输入
    // ─────────────────────────────────────────────────────────────
    let imp1 = ImpurityInput::read(&args.imp1, "imp1")?;
    let imp2 = ImpurityInput::read(&args.imp2, "imp2")?;
    output::print_info(&format!(
        "imp1: Zimp {:?}, layer {}, {} sites",
        imp1.impurity_info.zimp,
        imp1.impurity_info.ilayer_center,
        imp1.impurity_info.n_sites()
    ));
    output::print_info(&format!(
        "imp2: Zimp {:?}, layer {}, {} sites",
        imp2.impurity_info.zimp,
        imp2.impurity_info.ilayer_center,
        imp2.impurity_info.n_sites()
    ));

    let offset = args
        .offset()
        .ok_or_else(|| KkrError::InvalidArgument("an offset is required".to_string()))?;

    // ─────────────────────────────────────────────────────────────
    // 团簇
    // ─────────────────────────────────────────────────────────────
    let combined = combine_clusters(
        &imp1.impurity_info,
        &imp1.host_structure,
        &imp2.impurity_info,
        &imp2.host_structure,
        &offset,
    )?;
    state.apply(CombineEvent::ClusterCombined)?;
    state.kickout = Some(combined.kickout.clone());

    output::print_success(&format!(
        "Combined cluster: {} sites ({} + {} - {} duplicates), offset [{:.4}, {:.4}, {:.4}]",
        combined.info.n_sites(),
        imp1.impurity_info.n_sites(),
        imp2.impurity_info.n_sites(),
        combined.kickout.n_duplicates(),
        combined.offset[0],
        combined.offset[1],
        combined.offset[2]
    ));
    write_output(&combined.info, dir, IMPURITY_INFO_FILE, "combined cluster")?;
    write_output(&combined.kickout, dir, KICKOUT_FILE, "kickout record")?;

    // ─────────────────────────────────────────────────────────────
    // 参数
    // ─────────────────────────────────────────────────────────────
    let scf = match &args.wf_parameters {
        Some(path) => read_params(path)?,
        None => Params::new(),
    };
    let overwrite = args.wf_parameters_overwrite.as_deref().map(read_params).transpose()?;
    let merged = update_params(scf, overwrite.as_ref());
    for change in &merged.changes {
        match &change.old {
            Some(old) => output::print_info(&format!(
                "Parameter {} set from {} to {}",
                change.key, old, change.new
            )),
            None => output::print_info(&format!("Parameter {} added as {}", change.key, change.new)),
        }
    }
    write_output(&merged.scf, dir, SCF_PARAMS_FILE, "SCF parameters")?;
    write_output(&merged.flex, dir, GF_PARAMS_FILE, "GF writeout parameters")?;
    write_output(&merged.run_options, dir, RUN_OPTIONS_FILE, "run options")?;

    // ─────────────────────────────────────────────────────────────
    // 宿主 GF
    // ─────────────────────────────────────────────────────────────
    if args.host_gf_failed {
        state.apply(CombineEvent::HostGfFinished { ok: false })?;
        return Err(ValidationError::HostGfCalcFailed(
            "host Green's function writeout did not finish".to_string(),
        )
        .into());
    }
    if !args.host_gf_ready {
        output::print_warning(&format!(
            "Host GF for the combined cluster is not ready: run the writeout with '{}' and '{}', then rerun with --host-gf-ready",
            IMPURITY_INFO_FILE, GF_PARAMS_FILE
        ));
        return Ok(());
    }
    state.apply(CombineEvent::HostGfFinished { ok: true })?;

    // ─────────────────────────────────────────────────────────────
    // 势
    // ─────────────────────────────────────────────────────────────
    let pot1 = PotentialFile::read(&args.pot1)?;
    let pot2 = PotentialFile::read(&args.pot2)?;
    let potential = combine_potentials(
        &combined.kickout,
        PotentialSource {
            potential: &pot1,
            nspin: imp1.nspin,
            n_sites: imp1.impurity_info.n_sites(),
        },
        PotentialSource {
            potential: &pot2,
            nspin: imp2.nspin,
            n_sites: imp2.impurity_info.n_sites(),
        },
    )?;
    let pot_path = dir.join(POTENTIAL_FILE);
    fs::write(&pot_path, potential.to_text()).map_err(|e| KkrError::FileWriteError {
        path: pot_path.display().to_string(),
        source: e,
    })?;
    output::print_written(&format!("start potential ({} blocks)", potential.n_blocks()), &pot_path);
    state.apply(CombineEvent::PotentialCombined)?;

    // ─────────────────────────────────────────────────────────────
    // LDA+U
    // ─────────────────────────────────────────────────────────────
    let ldau1 = args.ldau1.as_deref().map(LdauSettings::read).transpose()?;
    let ldau2 = args.ldau2.as_deref().map(LdauSettings::read).transpose()?;
    if ldau1.is_some() || ldau2.is_some() {
        let ldau = combine_ldau(&combined.kickout, ldau1.as_ref(), ldau2.as_ref())?;
        output::print_info(&format!("LDA+U settings for {} atoms", ldau.entries.len()));
        write_output(&ldau, dir, LDAU_FILE, "LDA+U settings")?;
    } else {
        output::print_skip("No LDA+U settings");
    }

    // ─────────────────────────────────────────────────────────────
    // Jij
    // ─────────────────────────────────────────────────────────────
    if merged.jij_run() {
        match &args.kkrimp_parameters {
            Some(path) => {
                let params = jij_parameters(&read_params(path)?);
                write_output(&params, dir, JIJ_PARAMS_FILE, "Jij parameters")?;
            }
            None => output::print_warning(
                "jij_run is set but no --kkrimp-parameters were given, Jij parameters not written",
            ),
        }
    }

    output::print_done(&format!("Combined inputs written to '{}'", dir.display()));
    Ok(())
}

fn write_output<T: serde::Serialize>(value: &T, dir: &Path, name: &str, what: &str) -> Result<()> {
    let path = dir.join(name);
    json::write_json(value, &path)?;
    output::print_written(what, &path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::impurity::{ClusterSite, HostSite, HostStructure, ImpurityInfo};
    use crate::workflow::combine::{CombineState, STATE_FILE};
    use crate::workflow::convergence::ConvergenceSource;

    use std::path::PathBuf;

    const POTENTIAL_BLOCK: &str = "\
 Cu       POTENTIAL   exc: Vosko,Wilk,Nusair
   1.21000000  5.42351400  1.21000000
   29.00000
   1.26400000  0.49301097  0.00000000
  484
  0.25000000D-01  0.20000000D-03
 0 1
  -0.52000000000000D+02 -0.52000000000000D+02
";

    fn input(z: f64, layer: usize, converged: bool) -> ImpurityInput {
        let mut imp_cls = vec![ClusterSite::new([0.0; 3], layer, z)];
        for p in [[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]] {
            imp_cls.push(ClusterSite::new(p, layer, 29.0));
        }
        ImpurityInput {
            impurity_info: ImpurityInfo {
                zimp: vec![z],
                ilayer_center: layer,
                rcut: None,
                imp_cls,
            },
            host_structure: HostStructure {
                cell: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 4.0]],
                sites: vec![HostSite { position: [0.0; 3], z: 29.0 }],
            },
            nspin: 1,
            convergence: ConvergenceSource::SubWorkflow {
                convergence_reached: converged,
            },
        }
    }

    fn setup(dir: &Path, converged2: bool) -> CombineArgs {
        json::write_json(&input(26.0, 0, true), &dir.join("imp1.json")).unwrap();
        json::write_json(&input(27.0, 0, converged2), &dir.join("imp2.json")).unwrap();
        let pot = POTENTIAL_BLOCK.repeat(3);
        fs::write(dir.join("pot1"), &pot).unwrap();
        fs::write(dir.join("pot2"), &pot).unwrap();
        CombineArgs {
            imp1: dir.join("imp1.json"),
            imp2: dir.join("imp2.json"),
            offset_index: Some(1),
            offset_vector: None,
            pot1: dir.join("pot1"),
            pot2: dir.join("pot2"),
            ldau1: None,
            ldau2: None,
            wf_parameters: None,
            wf_parameters_overwrite: None,
            kkrimp_parameters: None,
            host_gf_ready: true,
            host_gf_failed: false,
            output_dir: dir.join("out"),
        }
    }

    fn out(dir: &Path, name: &str) -> PathBuf {
        dir.join("out").join(name)
    }

    #[test]
    fn test_full_combination() {
        let dir = tempfile::tempdir().unwrap();
        let args = setup(dir.path(), true);
        execute(args).unwrap();

        let info: ImpurityInfo = json::read_json(&out(dir.path(), IMPURITY_INFO_FILE)).unwrap();
        // 两个 3 格点团簇沿 x 错开一个格点，重合 2 个
        assert_eq!(info.n_sites(), 4);
        assert_eq!(info.zimp, vec![26.0, 27.0]);

        let pot = PotentialFile::read(&out(dir.path(), POTENTIAL_FILE)).unwrap();
        assert_eq!(pot.n_blocks(), 4);

        let state = WorkflowState::load(&dir.path().join("out")).unwrap();
        assert_eq!(state.state, CombineState::PotentialBuilt);
    }

    #[test]
    fn test_waits_for_host_gf() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = setup(dir.path(), true);
        args.host_gf_ready = false;
        execute(args).unwrap();

        assert!(out(dir.path(), IMPURITY_INFO_FILE).is_file());
        assert!(!out(dir.path(), POTENTIAL_FILE).exists());
        let state = WorkflowState::load(&dir.path().join("out")).unwrap();
        assert_eq!(state.state, CombineState::ClusterBuilt);
    }

    #[test]
    fn test_validation_failure_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = setup(dir.path(), true);
        args.offset_index = Some(0);
        let err = execute(args).unwrap_err();
        assert_eq!(err.exit_code(), 850);

        let text = fs::read_to_string(out(dir.path(), STATE_FILE)).unwrap();
        let state: WorkflowState = serde_json::from_str(&text).unwrap();
        assert_eq!(state.state, CombineState::Failed(850));
        assert!(state.message.unwrap().contains("ERROR_INPLANE_NEIGHBOR_TOO_SMALL"));
    }

    #[test]
    fn test_unconverged_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = setup(dir.path(), false);
        let err = execute(args).unwrap_err();
        assert_eq!(err.exit_code(), 750);
    }

    #[test]
    fn test_failed_rerun_clears_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        execute(setup(dir.path(), true)).unwrap();
        assert!(out(dir.path(), IMPURITY_INFO_FILE).is_file());
        assert!(out(dir.path(), POTENTIAL_FILE).is_file());

        let err = execute(setup(dir.path(), false)).unwrap_err();
        assert_eq!(err.exit_code(), 750);
        for name in OUTPUT_FILES {
            assert!(!out(dir.path(), name).exists(), "{} left behind", name);
        }
        let state = WorkflowState::load(&dir.path().join("out")).unwrap();
        assert_eq!(state.state, CombineState::Failed(750));
    }
}
