//! # 运行目录收集器
//!
//! 在根目录下查找 KKR 运行目录 (含主日志 `out_kkr` 的目录)。
//!
//! ## 功能
//! - 根目录本身就是运行目录时直接返回
//! - 目录名 glob 模式过滤 (逗号分隔多模式)
//! - 递归目录搜索
//!
//! ## 依赖关系
//! - 被 `commands/scan.rs` 调用
//! - 使用 `walkdir` 遍历目录, `glob` 匹配目录名
//! - 使用 `parsers/kkr_run.rs` 判断运行目录

use crate::error::{KkrError, Result};
use crate::parsers::kkr_run::RunFiles;

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 运行目录收集器
pub struct RunCollector {
    /// 根目录
    root: PathBuf,
    /// 目录名匹配模式
    patterns: Vec<Pattern>,
    /// 是否递归
    recursive: bool,
}

impl RunCollector {
    /// 创建新的收集器
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置目录名匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Pattern::new(s)
                    .map_err(|e| KkrError::InvalidArgument(format!("pattern '{}': {}", s, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有运行目录，按路径排序
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(KkrError::DirectoryNotFound {
                path: self.root.display().to_string(),
            });
        }

        if RunFiles::looks_like_run(&self.root) {
            return Ok(vec![self.root.clone()]);
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut runs: Vec<PathBuf> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter(|e| self.matches_patterns(e.path()))
            .filter(|e| RunFiles::looks_like_run(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        runs.sort();

        if runs.is_empty() {
            return Err(KkrError::NoRunsFound {
                path: self.root.display().to_string(),
            });
        }
        Ok(runs)
    }

    /// 检查目录名是否匹配任一模式，未设置模式时全部匹配
    fn matches_patterns(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        self.patterns.iter().any(|p| p.matches(name))
    }
}
