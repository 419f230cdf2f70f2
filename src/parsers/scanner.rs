//! # 行扫描器
//!
//! KKR 输出文件都是定宽 Fortran 文本，所有段落提取器共用这里的锚点查找与数值解析。
//!
//! ## 功能
//! - 整文件读入（不保留句柄，非 UTF-8 字节按替换字符处理）
//! - 锚点行查找，返回 0 起始的行号
//! - Fortran 数值解析：`D` 指数、无指数字母的 `1.234-05`、粘连的定宽列
//!
//! 数值解析失败一律返回 `None`，由调用方转换为提取失败。
//!
//! ## 依赖关系
//! - 被 `parsers/` 下的所有提取器使用
//! - 使用 `regex` 拆分粘连列

use crate::error::{KkrError, Result};

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// 整文件按行读入
///
/// 非 UTF-8 字节 (例如 Latin-1 的度数符号) 替换为 U+FFFD，不影响其余行。
/// 文件不存在时返回 `FileNotFound`，与"锚点不存在"区分开。
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(KkrError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let bytes = std::fs::read(path).map_err(|e| KkrError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect())
}

// ─────────────────────────────────────────────────────────────
// 锚点查找
// ─────────────────────────────────────────────────────────────

/// 所有包含锚点的行号
pub fn find_all(lines: &[String], anchor: &str) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(anchor))
        .map(|(i, _)| i)
        .collect()
}

/// 第一个包含锚点的行号
pub fn find_first(lines: &[String], anchor: &str) -> Option<usize> {
    lines.iter().position(|line| line.contains(anchor))
}

/// 最后一个包含锚点的行号
pub fn find_last(lines: &[String], anchor: &str) -> Option<usize> {
    lines.iter().rposition(|line| line.contains(anchor))
}

// ─────────────────────────────────────────────────────────────
// 数值解析
// ─────────────────────────────────────────────────────────────

/// 解析 Fortran 风格浮点数
///
/// 支持 `1.0E-05`, `1.0D-05`, `1.0d-05` 以及省略指数字母的 `1.0-05`。
pub fn parse_float(token: &str) -> Option<f64> {
    let t = token.trim().trim_end_matches([',', ';']);
    if t.is_empty() {
        return None;
    }

    if let Ok(v) = t.parse::<f64>() {
        return Some(v).filter(|v| v.is_finite());
    }

    let normalized = t.replace(['D', 'd'], "E");
    if let Ok(v) = normalized.parse::<f64>() {
        return Some(v).filter(|v| v.is_finite());
    }

    // 省略指数字母: 尾部的符号前一位是数字
    let bytes = normalized.as_bytes();
    for i in (1..bytes.len()).rev() {
        if (bytes[i] == b'-' || bytes[i] == b'+') && bytes[i - 1].is_ascii_digit() {
            let candidate = format!("{}E{}", &normalized[..i], &normalized[i..]);
            return candidate.parse::<f64>().ok().filter(|v| v.is_finite());
        }
    }

    None
}

/// 解析整数，容忍 `10.` 这类带小数点的写法
pub fn parse_int(token: &str) -> Option<i64> {
    let t = token.trim().trim_end_matches([',', ';']);
    if let Ok(v) = t.parse::<i64>() {
        return Some(v);
    }
    let v = parse_float(t)?;
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// 标记之后的第一个数值（取第一次出现的标记）
pub fn value_after(line: &str, marker: &str) -> Option<f64> {
    let pos = line.find(marker)?;
    let rest = &line[pos + marker.len()..];
    parse_float(rest.split_whitespace().next()?)
}

/// 标记之后的第一个数值（取最后一次出现的标记）
pub fn value_after_last(line: &str, marker: &str) -> Option<f64> {
    let pos = line.rfind(marker)?;
    let rest = &line[pos + marker.len()..];
    parse_float(rest.split_whitespace().next()?)
}

/// 标记之后的第一个整数
pub fn int_after(line: &str, marker: &str) -> Option<i64> {
    let pos = line.find(marker)?;
    let rest = &line[pos + marker.len()..];
    parse_int(rest.split_whitespace().next()?)
}

/// 行中最后一个 token 解析为浮点数
pub fn last_float(line: &str) -> Option<f64> {
    parse_float(line.split_whitespace().last()?)
}

/// 行中最后一个 token 解析为整数
pub fn last_int(line: &str) -> Option<i64> {
    parse_int(line.split_whitespace().last()?)
}

/// 行中第一个可解析为整数的 token
pub fn first_int(line: &str) -> Option<i64> {
    line.split_whitespace().find_map(|t| t.parse::<i64>().ok())
}

/// 把一行全部解析为浮点数，任一 token 非法则返回 `None`
pub fn all_floats(line: &str) -> Option<Vec<f64>> {
    line.split_whitespace().map(parse_float).collect()
}

/// 拆分粘连的定宽列，例如 `0-180.00000` -> `0`, `-180.00000`
pub fn split_glued(line: &str) -> Vec<String> {
    static GLUED: OnceLock<Regex> = OnceLock::new();
    let re = GLUED.get_or_init(|| Regex::new(r"(\d)-").expect("static regex"));
    re.replace_all(line, "$1 -")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// 读取 Fortran `nIw` 定宽整数字段
///
/// 字段不足或非整数时返回 `None`。
pub fn fixed_width_ints(line: &str, width: usize, count: usize) -> Option<Vec<i64>> {
    if width == 0 {
        return None;
    }
    let chars: Vec<char> = line.chars().collect();
    (0..count)
        .map(|i| {
            let start = i * width;
            if start >= chars.len() {
                return None;
            }
            let end = (start + width).min(chars.len());
            let field: String = chars[start..end].iter().collect();
            field.trim().parse::<i64>().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_read_lines_tolerates_latin1_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_timing.000.txt");
        std::fs::write(&path, b"Temperature 800.0 \xb0K\r\n main1a   0.5\n").unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Temperature 800.0 "));
        assert!(lines[0].contains('\u{FFFD}'));
        assert_eq!(last_float(&lines[1]), Some(0.5));

        assert!(matches!(
            read_lines(&dir.path().join("missing")),
            Err(KkrError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_find_anchors() {
        let l = lines("alpha\n beta = 1\nalpha again\n");
        assert_eq!(find_all(&l, "alpha"), vec![0, 2]);
        assert_eq!(find_first(&l, "alpha"), Some(0));
        assert_eq!(find_last(&l, "alpha"), Some(2));
        assert!(find_all(&l, "gamma").is_empty());
        assert_eq!(find_first(&l, "gamma"), None);
    }

    #[test]
    fn test_parse_fortran_floats() {
        assert_eq!(parse_float("2.3466D+00"), Some(2.3466));
        assert_eq!(parse_float("0.25000000d-01"), Some(0.025));
        assert_eq!(parse_float("1.5E3"), Some(1500.0));
        assert_eq!(parse_float("-3.38073664131"), Some(-3.38073664131));
        assert!((parse_float("1.234-05").unwrap() - 1.234e-5).abs() < 1e-18);
        assert_eq!(parse_float("-0.0000"), Some(-0.0));
        assert_eq!(parse_float("******"), None);
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("40"), Some(40));
        assert_eq!(parse_int("10."), Some(10));
        assert_eq!(parse_int("3,"), Some(3));
        assert_eq!(parse_int("3.5"), None);
        assert_eq!(parse_int("x"), None);
    }

    #[test]
    fn test_value_after_markers() {
        let line = "  ** new E FERMI   0.4656657829   DOS(E_F) =   15.315281";
        assert_eq!(value_after(line, "FERMI"), Some(0.4656657829));
        assert_eq!(value_after_last(line, "="), Some(15.315281));
        assert_eq!(value_after(line, "missing"), None);
        assert_eq!(int_after("  NSPIN =    2", "="), Some(2));
        assert_eq!(last_float("   band energy per atom     0.0242666255"), Some(0.0242666255));
        assert_eq!(last_int("  KMESH =    4"), Some(4));
        assert_eq!(first_int("    4 symmetries will be used"), Some(4));
    }

    #[test]
    fn test_split_glued_columns() {
        let tokens = split_glued("    2   IC2x        1-180.00000 180.00000   0.00000   T");
        assert_eq!(tokens, vec!["2", "IC2x", "1", "-180.00000", "180.00000", "0.00000", "T"]);
        // 指数中的负号不拆开
        assert_eq!(split_glued("1.0E-05"), vec!["1.0E-05"]);
    }

    #[test]
    fn test_fixed_width_ints() {
        assert_eq!(fixed_width_ints(" 5 1", 2, 2), Some(vec![5, 1]));
        assert_eq!(fixed_width_ints("12 1", 2, 2), Some(vec![12, 1]));
        assert_eq!(fixed_width_ints(" 5", 2, 2), None);
        assert_eq!(fixed_width_ints(" x 1", 2, 2), None);
    }

    #[test]
    fn test_all_floats() {
        assert_eq!(all_floats(" 1.0  2.0D+00 -3"), Some(vec![1.0, 2.0, -3.0]));
        assert_eq!(all_floats(" 1.0 oops"), None);
    }
}
