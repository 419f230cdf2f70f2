//! # 收敛来源
//!
//! 单杂质输入可能来自一次计算、一个 SCF 子工作流或一个组合工作流，
//! 三者用不同的键报告收敛状态。读入时按 `process` 标签一次性分派。
//!
//! JSON 形式:
//! ```json
//! {"process": "calculation", "calculation_converged": true}
//! {"process": "sub_workflow", "convergence_reached": true}
//! {"process": "composite_workflow", "converged": true}
//! ```
//!
//! ## 依赖关系
//! - 被 `workflow/combine.rs` 使用
//! - 使用 `models/output.rs` 从解析结果构造

use crate::error::{Result, ValidationError};
use crate::models::OutputRecord;

use serde::{Deserialize, Serialize};

/// 收敛状态的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "process", rename_all = "snake_case")]
pub enum ConvergenceSource {
    Calculation { calculation_converged: bool },
    SubWorkflow { convergence_reached: bool },
    CompositeWorkflow { converged: bool },
}

impl ConvergenceSource {
    /// 由一次计算的解析结果构造，缺少 scfinfo 时返回 None
    pub fn from_record(record: &OutputRecord) -> Option<Self> {
        let converged = record.convergence_group.as_ref()?.calculation_converged?;
        Some(ConvergenceSource::Calculation {
            calculation_converged: converged,
        })
    }

    pub fn is_converged(&self) -> bool {
        match *self {
            ConvergenceSource::Calculation {
                calculation_converged,
            } => calculation_converged,
            ConvergenceSource::SubWorkflow { convergence_reached } => convergence_reached,
            ConvergenceSource::CompositeWorkflow { converged } => converged,
        }
    }

    /// 未收敛时给出 `ERROR_INPUT_NOT_CONVERGED`
    pub fn require_converged(&self, label: &str) -> Result<()> {
        if self.is_converged() {
            Ok(())
        } else {
            Err(ValidationError::InputNotConverged(label.to_string()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::output::ConvergenceGroup;

    #[test]
    fn test_tagged_json() {
        let calc: ConvergenceSource =
            serde_json::from_str(r#"{"process": "calculation", "calculation_converged": true}"#).unwrap();
        assert!(calc.is_converged());

        let sub: ConvergenceSource =
            serde_json::from_str(r#"{"process": "sub_workflow", "convergence_reached": false}"#).unwrap();
        assert!(!sub.is_converged());

        let composite: ConvergenceSource =
            serde_json::from_str(r#"{"process": "composite_workflow", "converged": true}"#).unwrap();
        assert_eq!(composite, ConvergenceSource::CompositeWorkflow { converged: true });

        // 键与标签不匹配时拒绝
        let wrong: std::result::Result<ConvergenceSource, _> =
            serde_json::from_str(r#"{"process": "sub_workflow", "converged": true}"#);
        assert!(wrong.is_err());
    }

    #[test]
    fn test_not_converged_error() {
        let err = ConvergenceSource::SubWorkflow {
            convergence_reached: false,
        }
        .require_converged("imp2")
        .unwrap_err();
        assert_eq!(err.exit_code(), 750);
    }

    #[test]
    fn test_from_record() {
        let mut record = OutputRecord::new();
        assert!(ConvergenceSource::from_record(&record).is_none());

        record.convergence_group = Some(ConvergenceGroup {
            calculation_converged: Some(true),
            ..Default::default()
        });
        assert_eq!(
            ConvergenceSource::from_record(&record),
            Some(ConvergenceSource::Calculation {
                calculation_converged: true
            })
        );
    }
}
