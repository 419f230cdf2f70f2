//! # 双杂质合并流程
//!
//! 合并流程的状态机和它的输入。状态转移是纯函数，状态连同历史
//! 以 JSON 持久化在输出目录的 `workflow_state.json` 中。
//!
//! ```text
//! Started → ClusterBuilt → GfReady → PotentialBuilt → ScfRunning ─┬→ Done
//!                │                                                └→ JijRunning → Done
//!                └→ Failed(700)          任意非终止状态 → Failed(code)
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/combine.rs` 使用
//! - 使用 `workflow/convergence.rs`, `models/impurity.rs`
//! - 使用 `utils/json.rs` 持久化

use crate::error::{KkrError, Result, ValidationError};
use crate::models::{HostStructure, ImpurityInfo, KickoutRecord};
use crate::utils::json;
use crate::workflow::ConvergenceSource;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 状态文件名
pub const STATE_FILE: &str = "workflow_state.json";

// ─────────────────────────────────────────────────────────────
// 输入
// ─────────────────────────────────────────────────────────────

/// 一个收敛的单杂质计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpurityInput {
    pub impurity_info: ImpurityInfo,
    pub host_structure: HostStructure,
    pub nspin: usize,
    pub convergence: ConvergenceSource,
}

impl ImpurityInput {
    /// 读取并检查收敛
    pub fn read(path: &Path, label: &str) -> Result<Self> {
        let input: ImpurityInput = json::read_json(path)?;
        input.convergence.require_converged(label)?;
        Ok(input)
    }
}

// ─────────────────────────────────────────────────────────────
// 状态机
// ─────────────────────────────────────────────────────────────

/// 合并流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "exit_code", rename_all = "snake_case")]
pub enum CombineState {
    Started,
    ClusterBuilt,
    GfReady,
    PotentialBuilt,
    ScfRunning,
    JijRunning,
    Done,
    Failed(i32),
}

/// 驱动状态转移的事件
#[derive(Debug, Clone, PartialEq)]
pub enum CombineEvent {
    ClusterCombined,
    HostGfFinished { ok: bool },
    PotentialCombined,
    ScfSubmitted,
    ScfFinished { ok: bool, jij_run: bool },
    JijFinished { ok: bool },
    /// 校验失败，流程终止
    Aborted(ValidationError),
}

impl CombineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CombineState::Done | CombineState::Failed(_))
    }

    /// 状态转移，不合法的事件返回错误且不改变状态
    pub fn next(self, event: &CombineEvent) -> Result<CombineState> {
        use CombineEvent as E;
        use CombineState as S;

        let failed = |err: ValidationError| S::Failed(err.exit_code());
        let next = match (self, event) {
            (s, E::Aborted(err)) if !s.is_terminal() => failed(err.clone()),
            (S::Started, E::ClusterCombined) => S::ClusterBuilt,
            (S::ClusterBuilt, E::HostGfFinished { ok: true }) => S::GfReady,
            (S::ClusterBuilt, E::HostGfFinished { ok: false }) => {
                failed(ValidationError::HostGfCalcFailed(String::new()))
            }
            (S::GfReady, E::PotentialCombined) => S::PotentialBuilt,
            (S::PotentialBuilt, E::ScfSubmitted) => S::ScfRunning,
            (S::ScfRunning, E::ScfFinished { ok: true, jij_run: true }) => S::JijRunning,
            (S::ScfRunning, E::ScfFinished { ok: true, jij_run: false }) => S::Done,
            (S::JijRunning, E::JijFinished { ok: true }) => S::Done,
            (S::ScfRunning, E::ScfFinished { ok: false, .. })
            | (S::JijRunning, E::JijFinished { ok: false }) => {
                failed(ValidationError::SomethingWentWrong(String::new()))
            }
            (state, event) => {
                return Err(KkrError::InvalidArgument(format!(
                    "event {:?} is not allowed in state {:?}",
                    event, state
                )))
            }
        };
        Ok(next)
    }
}

/// 持久化的流程状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub state: CombineState,
    /// 经过的状态，含当前状态
    pub history: Vec<CombineState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickout: Option<KickoutRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            state: CombineState::Started,
            history: vec![CombineState::Started],
            kickout: None,
            message: None,
        }
    }
}

impl WorkflowState {
    /// 应用一个事件，失败事件同时记录原因
    pub fn apply(&mut self, event: CombineEvent) -> Result<CombineState> {
        let next = self.state.next(&event)?;
        if let CombineEvent::Aborted(err) = &event {
            self.message = Some(err.to_string());
        }
        self.state = next;
        self.history.push(next);
        Ok(next)
    }

    /// 写入 `<dir>/workflow_state.json`
    pub fn save(&self, dir: &Path) -> Result<()> {
        json::write_json(self, &dir.join(STATE_FILE))
    }

    /// 读取 `<dir>/workflow_state.json`
    pub fn load(dir: &Path) -> Result<Self> {
        json::read_json(&dir.join(STATE_FILE))
    }
}
