//! # out_timing.000.txt 计时文件提取器
//!
//! 计时文件每次迭代重复输出各阶段耗时，只取每个阶段第一次出现的值。
//!
//! ## 依赖关系
//! - 被 `parsers/kkr_run.rs` 调度
//! - 使用 `parsers/scanner.rs`

use crate::error::{KkrError, Result};
use crate::models::output::OutputRecord;
use crate::parsers::kkr_run::RunFiles;
use crate::parsers::scanner;

/// 阶段名，与行中去掉末尾数值后的标签整体比较
const PHASES: [&str; 9] = [
    "main0",
    "main1a - tbref",
    "main1a",
    "main1b - calctref13",
    "main1b",
    "main1c - serial part",
    "main1c",
    "main2",
    "Time in Iteration",
];

/// 行标签和耗时: 末尾 token 为数值，其余 token 以单个空格连接
fn phase_entry(line: &str) -> Option<(String, f64)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (last, head) = tokens.split_last()?;
    let seconds = scanner::parse_float(last)?;
    let label = head.join(" ");
    Some((label.trim_end_matches(':').trim_end().to_string(), seconds))
}

/// 按固定阶段顺序解析耗时
pub fn parse_timings(lines: &[String]) -> Vec<(String, f64)> {
    let entries: Vec<(String, f64)> = lines.iter().filter_map(|l| phase_entry(l)).collect();
    PHASES
        .iter()
        .filter_map(|phase| {
            entries
                .iter()
                .find(|(label, _)| label == phase)
                .map(|(_, seconds)| (phase.to_string(), *seconds))
        })
        .collect()
}

/// timings
pub fn extract_timings(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.timing)?;
    let timings = parse_timings(&lines);
    if timings.is_empty() {
        return Err(KkrError::parse(
            "out_timing",
            files.timing.display(),
            "no timing phase found",
        ));
    }
    record.timings_group = Some(timings);
    record.timings_unit = Some("seconds".to_string());
    Ok(())
}
