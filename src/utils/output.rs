//! # 美化输出工具
//!
//! 提供统一的终端输出样式。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块和 `main.rs` 使用
//! - 使用 `colored` crate

use crate::error::KkrError;

use colored::Colorize;
use std::path::Path;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印跳过消息
pub fn print_skip(msg: &str) {
    println!("{} {}", "[SKIP]".dimmed(), msg);
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 打印写出文件消息
pub fn print_written(what: &str, path: &Path) {
    println!(
        "{} {} {} {}",
        "[OK]".green().bold(),
        what.dimmed(),
        "->".cyan(),
        path.display()
    );
}

/// 打印一条解析失败消息，可附带原因
pub fn print_failure(message: &str, reason: Option<&str>) {
    match reason {
        Some(reason) => println!("{} {} {}", "[ERR]".red().bold(), message, format!("({})", reason).dimmed()),
        None => println!("{} {}", "[ERR]".red().bold(), message),
    }
}

/// 打印顶层错误，校验错误带名称和退出码
pub fn print_fatal(err: &KkrError) {
    match err {
        KkrError::Validation(v) => eprintln!(
            "{} {} {}",
            "[ERR]".red().bold(),
            err,
            format!("[{} / exit {}]", v.name(), v.exit_code()).dimmed()
        ),
        _ => print_error(&err.to_string()),
    }
}

/// 打印键值行
pub fn print_kv(key: &str, value: impl std::fmt::Display) {
    println!("  {:<28} {}", key.dimmed(), value);
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}
