//! # 统一错误处理模块
//!
//! 定义 kkrtools 的所有错误类型，使用 `thiserror` 派生。
//!
//! - `KkrError`: I/O、解析、参数等通用错误
//! - `ValidationError`: 合并引擎的结构化校验错误，每个变体带有固定名称和退出码
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// kkrtools 统一错误类型
#[derive(Error, Debug)]
pub enum KkrError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Archive error in {path}: {reason}")]
    ArchiveError { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 校验错误 (合并引擎)
    // ─────────────────────────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No run directories found under: {path}")]
    NoRunsFound { path: String },

    #[error("{0}")]
    Other(String),
}

impl KkrError {
    /// 构造解析错误的便捷函数
    pub fn parse(format: &str, path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        KkrError::ParseError {
            format: format.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// 进程退出码，校验错误使用各自的退出码
    pub fn exit_code(&self) -> i32 {
        match self {
            KkrError::Validation(v) => v.exit_code(),
            _ => 1,
        }
    }
}

/// 合并引擎的结构化校验错误
///
/// 这些错误会中止整个合并步骤，由调用者映射为工作流的终止状态。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("ERROR_SOMETHING_WENT_WRONG: {0}")]
    SomethingWentWrong(String),

    #[error("ERROR_HOST_STRUCTURES_INCONSISTENT: {0}")]
    HostStructuresInconsistent(String),

    #[error("ERROR_INPUT_NOT_SINGLE_IMP_CALC: impurity '{label}' has {count} impurity species")]
    InputNotSingleImpCalc { label: String, count: usize },

    #[error("ERROR_INPLANE_NEIGHBOR_TOO_SMALL: offset index {index} is not allowed ({reason})")]
    InplaneNeighborTooSmall { index: i64, reason: String },

    #[error("ERROR_INCONSISTENT_NSPIN_VALUES: nspin {nspin1} != {nspin2}")]
    InconsistentNspinValues { nspin1: usize, nspin2: usize },

    #[error("ERROR_HOST_GF_CALC_FAILED: {0}")]
    HostGfCalcFailed(String),

    #[error("ERROR_INPUT_NOT_CONVERGED: impurity '{0}' is not converged")]
    InputNotConverged(String),

    #[error("ERROR_POTENTIAL_INCONSISTENT: {0}")]
    PotentialInconsistent(String),
}

impl ValidationError {
    /// 错误名称 (与退出码一一对应)
    pub fn name(&self) -> &'static str {
        match self {
            ValidationError::SomethingWentWrong(_) => "ERROR_SOMETHING_WENT_WRONG",
            ValidationError::HostStructuresInconsistent(_) => "ERROR_HOST_STRUCTURES_INCONSISTENT",
            ValidationError::InputNotSingleImpCalc { .. } => "ERROR_INPUT_NOT_SINGLE_IMP_CALC",
            ValidationError::InplaneNeighborTooSmall { .. } => "ERROR_INPLANE_NEIGHBOR_TOO_SMALL",
            ValidationError::InconsistentNspinValues { .. } => "ERROR_INCONSISTENT_NSPIN_VALUES",
            ValidationError::HostGfCalcFailed(_) => "ERROR_HOST_GF_CALC_FAILED",
            ValidationError::InputNotConverged(_) => "ERROR_INPUT_NOT_CONVERGED",
            ValidationError::PotentialInconsistent(_) => "ERROR_POTENTIAL_INCONSISTENT",
        }
    }

    /// 退出码
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidationError::SomethingWentWrong(_) => 999,
            ValidationError::HostStructuresInconsistent(_) => 900,
            ValidationError::InputNotSingleImpCalc { .. } => 800,
            ValidationError::InplaneNeighborTooSmall { .. } => 850,
            ValidationError::InconsistentNspinValues { .. } => 950,
            ValidationError::HostGfCalcFailed(_) => 700,
            ValidationError::InputNotConverged(_) => 750,
            ValidationError::PotentialInconsistent(_) => 960,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, KkrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_exit_codes() {
        let err = ValidationError::InconsistentNspinValues { nspin1: 1, nspin2: 2 };
        assert_eq!(err.exit_code(), 950);
        assert_eq!(err.name(), "ERROR_INCONSISTENT_NSPIN_VALUES");

        let wrapped: KkrError = err.into();
        assert_eq!(wrapped.exit_code(), 950);
        assert!(wrapped.to_string().starts_with("ERROR_INCONSISTENT_NSPIN_VALUES"));
    }

    #[test]
    fn test_generic_errors_exit_with_one() {
        let err = KkrError::parse("out_kkr", "run/out_kkr", "anchor not found");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("anchor not found"));
    }
}
