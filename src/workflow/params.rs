//! # 工作流参数
//!
//! - 合并工作流参数: `wf_parameters_overwrite` 覆盖 SCF 参数，
//!   再把属于 GF 步骤 (`retrieve_kkrflex`) 和运行选项 (`jij_run`) 的键移出
//! - Jij 重启参数: 去掉空值并打开 `CALCJIJMAT`
//! - DOS 参数: 默认围道和 KKR 关键字映射
//!
//! ## 依赖关系
//! - 被 `commands/combine.rs`, `commands/dos.rs` 使用
//! - 使用 `serde_json` 表示自由形式的参数字典, `utils/json.rs` 读取参数文件

use crate::error::{KkrError, Result};
use crate::utils::json::read_json;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;

/// 自由形式的参数字典
pub type Params = Map<String, Value>;

/// 读取 JSON 参数字典
pub fn read_params(path: &Path) -> Result<Params> {
    match read_json::<Value>(path)? {
        Value::Object(map) => Ok(map),
        other => Err(KkrError::parse(
            "parameters",
            path.display(),
            format!("expected a JSON object, found {}", other),
        )),
    }
}

// ─────────────────────────────────────────────────────────────
// 合并工作流参数
// ─────────────────────────────────────────────────────────────

/// GF 写出步骤的默认参数
pub fn default_flex_params() -> Params {
    let mut params = Params::new();
    params.insert("retrieve_kkrflex".to_string(), Value::Bool(false));
    params
}

/// 默认运行选项
pub fn default_run_options() -> Params {
    let mut params = Params::new();
    params.insert("jij_run".to_string(), Value::Bool(false));
    params
}

/// 一次参数改动
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamChange {
    pub key: String,
    /// 原值，新增的键为 None
    pub old: Option<Value>,
    pub new: Value,
}

/// 合并后的三组参数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedParams {
    /// 传给杂质 SCF 的参数
    pub scf: Params,
    /// 传给 GF 写出步骤的参数
    pub flex: Params,
    pub run_options: Params,
    /// 覆盖过程中实际改变的键
    #[serde(skip)]
    pub changes: Vec<ParamChange>,
}

impl MergedParams {
    /// 是否需要 Jij 步骤
    pub fn jij_run(&self) -> bool {
        self.run_options
            .get("jij_run")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// 合并 SCF 参数与覆盖参数，并拆出 GF 参数和运行选项
pub fn update_params(scf: Params, overwrite: Option<&Params>) -> MergedParams {
    let mut scf = scf;
    let mut changes = Vec::new();

    if let Some(overwrite) = overwrite {
        for (key, value) in overwrite {
            match scf.get(key) {
                Some(old) if old == value => {}
                old => {
                    changes.push(ParamChange {
                        key: key.clone(),
                        old: old.cloned(),
                        new: value.clone(),
                    });
                    scf.insert(key.clone(), value.clone());
                }
            }
        }
    }

    let mut flex = default_flex_params();
    let mut run_options = default_run_options();
    let moved: Vec<String> = scf
        .keys()
        .filter(|k| flex.contains_key(*k) || run_options.contains_key(*k))
        .cloned()
        .collect();
    for key in moved {
        if let Some(value) = scf.remove(&key) {
            if flex.contains_key(&key) {
                flex.insert(key, value);
            } else {
                run_options.insert(key, value);
            }
        }
    }

    MergedParams {
        scf,
        flex,
        run_options,
        changes,
    }
}

/// Jij 重启参数: 去掉空值，打开 CALCJIJMAT
pub fn jij_parameters(params: &Params) -> Params {
    let mut out: Params = params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    out.insert("CALCJIJMAT".to_string(), json!(1));
    out
}

// ─────────────────────────────────────────────────────────────
// DOS 参数
// ─────────────────────────────────────────────────────────────

/// DOS 围道参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DosParams {
    /// 围道上的能量点数
    pub nepts: usize,
    /// 温度 (K)
    pub tempr: f64,
    /// 围道起点 (Ry, 相对 EF)
    pub emin: f64,
    /// 围道终点 (Ry, 相对 EF)
    pub emax: f64,
    /// DOS 计算的 k 网格
    pub kmesh: [usize; 3],
}

impl Default for DosParams {
    fn default() -> Self {
        Self {
            nepts: 61,
            tempr: 200.0,
            emin: -1.0,
            emax: 1.0,
            kmesh: [30, 30, 30],
        }
    }
}

/// DOS 工作流参数文件 `{"dos_params": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DosWorkflowParams {
    #[serde(default)]
    pub dos_params: DosParams,
}

impl DosParams {
    /// 映射到 KKR 关键字，极点和围道竖直段总是关闭
    pub fn to_kkr_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("NPOL".to_string(), json!(0));
        params.insert("NPT1".to_string(), json!(0));
        params.insert("NPT3".to_string(), json!(0));
        params.insert("NPT2".to_string(), json!(self.nepts));
        params.insert("IEMXD".to_string(), json!(self.nepts));
        params.insert("EMIN".to_string(), json!(self.emin));
        params.insert("EMAX".to_string(), json!(self.emax));
        params.insert("TEMPR".to_string(), json!(self.tempr));
        params.insert("BZDIVIDE".to_string(), json!(self.kmesh));
        params
    }

    /// 用 DOS 围道覆盖一组 KKR 参数
    pub fn apply_to(&self, params: &mut Params) {
        for (key, value) in self.to_kkr_params() {
            params.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_overwrite_and_split() {
        let scf = params(json!({
            "kkr_runmax": 5,
            "convergence_criterion": 1e-7,
            "retrieve_kkrflex": true,
        }));
        let overwrite = params(json!({
            "kkr_runmax": 10,
            "convergence_criterion": 1e-7,
            "jij_run": true,
            "mag_init": true,
        }));

        let merged = update_params(scf, Some(&overwrite));

        assert_eq!(merged.scf["kkr_runmax"], json!(10));
        assert_eq!(merged.scf["mag_init"], json!(true));
        assert!(!merged.scf.contains_key("retrieve_kkrflex"));
        assert!(!merged.scf.contains_key("jij_run"));
        assert_eq!(merged.flex["retrieve_kkrflex"], json!(true));
        assert!(merged.jij_run());

        let changed: Vec<&str> = merged.changes.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(changed, vec!["jij_run", "kkr_runmax", "mag_init"]);
        assert_eq!(merged.changes[1].old, Some(json!(5)));
        assert_eq!(merged.changes[0].old, None);
    }

    #[test]
    fn test_defaults_without_overwrite() {
        let merged = update_params(params(json!({"kkr_runmax": 5})), None);
        assert_eq!(merged.flex["retrieve_kkrflex"], json!(false));
        assert!(!merged.jij_run());
        assert!(merged.changes.is_empty());
    }

    #[test]
    fn test_jij_parameters() {
        let input = params(json!({"NSPIN": 2, "HFIELD": null, "CALCJIJMAT": 0}));
        let out = jij_parameters(&input);
        assert_eq!(out["CALCJIJMAT"], json!(1));
        assert_eq!(out["NSPIN"], json!(2));
        assert!(!out.contains_key("HFIELD"));
    }

    #[test]
    fn test_dos_defaults_to_kkr_keys() {
        let kkr = DosParams::default().to_kkr_params();
        assert_eq!(kkr["NPT2"], json!(61));
        assert_eq!(kkr["IEMXD"], json!(61));
        assert_eq!(kkr["TEMPR"], json!(200.0));
        assert_eq!(kkr["EMIN"], json!(-1.0));
        assert_eq!(kkr["BZDIVIDE"], json!([30, 30, 30]));
        assert_eq!(kkr["NPOL"], json!(0));
        assert_eq!(kkr["NPT1"], json!(0));
        assert_eq!(kkr["NPT3"], json!(0));
    }

    #[test]
    fn test_partial_dos_params() {
        let wf: DosWorkflowParams = serde_json::from_str(r#"{"dos_params": {"nepts": 101}}"#).unwrap();
        assert_eq!(wf.dos_params.nepts, 101);
        assert_eq!(wf.dos_params.kmesh, [30, 30, 30]);

        let mut kkr = params(json!({"NPOL": 7, "RMAX": 10.0}));
        wf.dos_params.apply_to(&mut kkr);
        assert_eq!(kkr["NPOL"], json!(0));
        assert_eq!(kkr["RMAX"], json!(10.0));
    }

    #[test]
    fn test_read_params_requires_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"NSPIN": 2}"#).unwrap();
        assert_eq!(read_params(&path).unwrap()["NSPIN"], json!(2));

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(read_params(&path), Err(KkrError::ParseError { .. })));
        assert!(matches!(
            read_params(&dir.path().join("missing.json")),
            Err(KkrError::FileNotFound { .. })
        ));
    }
}
