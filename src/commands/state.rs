//! # state 命令实现
//!
//! 读取 `workflow_state.json`，可选地应用一个外部事件后写回，并打印状态和历史。
//! SCF 完成后是否进入 Jij 步骤由同目录下的 `run_options.json` 决定。
//!
//! ## 依赖关系
//! - 使用 `cli/state.rs` 定义的参数
//! - 使用 `workflow/combine.rs` 状态机, `workflow/params.rs` 运行选项

use crate::cli::state::{StateArgs, StateEvent};
use crate::error::Result;
use crate::utils::output;
use crate::workflow::{read_params, CombineEvent, CombineState, WorkflowState};

use serde_json::Value;
use std::path::Path;

use super::combine::RUN_OPTIONS_FILE;

/// 执行 state 命令
pub fn execute(args: StateArgs) -> Result<()> {
    output::print_header("Combine Workflow State");

    let mut state = WorkflowState::load(&args.dir)?;
    if let Some(event) = args.event {
        let event = to_event(event, &args.dir)?;
        let previous = state.state;
        state.apply(event)?;
        state.save(&args.dir)?;
        output::print_success(&format!("{:?} -> {:?}", previous, state.state));
    }

    print_state(&state);
    Ok(())
}

fn to_event(event: StateEvent, dir: &Path) -> Result<CombineEvent> {
    Ok(match event {
        StateEvent::ScfSubmitted => CombineEvent::ScfSubmitted,
        StateEvent::ScfFinished => CombineEvent::ScfFinished {
            ok: true,
            jij_run: jij_run(dir)?,
        },
        StateEvent::ScfFailed => CombineEvent::ScfFinished {
            ok: false,
            jij_run: false,
        },
        StateEvent::JijFinished => CombineEvent::JijFinished { ok: true },
        StateEvent::JijFailed => CombineEvent::JijFinished { ok: false },
    })
}

/// 运行选项中的 `jij_run`，文件缺失时为 false
fn jij_run(dir: &Path) -> Result<bool> {
    let path = dir.join(RUN_OPTIONS_FILE);
    if !path.is_file() {
        return Ok(false);
    }
    let options = read_params(&path)?;
    Ok(options.get("jij_run").and_then(Value::as_bool).unwrap_or(false))
}

fn print_state(state: &WorkflowState) {
    output::print_kv("state", format!("{:?}", state.state));
    let history: Vec<String> = state.history.iter().map(|s| format!("{:?}", s)).collect();
    output::print_kv("history", history.join(" -> "));
    if let Some(kickout) = &state.kickout {
        output::print_kv(
            "combined sites",
            format!("{} ({} duplicates)", kickout.origins.len(), kickout.n_duplicates()),
        );
    }
    if let Some(message) = &state.message {
        output::print_kv("message", message);
    }
    match state.state {
        CombineState::Done => output::print_done("Workflow finished"),
        CombineState::Failed(code) => output::print_error(&format!("Workflow failed with exit code {}", code)),
        _ => {}
    }
}
