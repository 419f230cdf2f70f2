//! # Jij 矩阵文件读取
//!
//! Jij 计算输出 `out_Jijmatrix`，一列纯数字。计算结束后它通常被打包进
//! `output_all.tar.gz`，这里两种来源都支持。
//!
//! ## 依赖关系
//! - 被 `commands/jij.rs` 使用
//! - 使用 `flate2` + `tar` 读取压缩包成员, `parsers/scanner.rs` 解析数字

use crate::error::{KkrError, Result};
use crate::parsers::scanner;

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const JIJ_FILE: &str = "out_Jijmatrix";
pub const ARCHIVE_FILE: &str = "output_all.tar.gz";

/// 读取 Jij 矩阵的全部数值
///
/// `path` 可以是 `out_Jijmatrix` 本身、包含它的压缩包，或者含有其中之一的目录。
pub fn read_jij_values(path: &Path) -> Result<Vec<f64>> {
    let text = if path.is_dir() {
        let plain = path.join(JIJ_FILE);
        if plain.is_file() {
            read_text(&plain)?
        } else {
            read_archive_member(&path.join(ARCHIVE_FILE), JIJ_FILE)?
        }
    } else if is_archive(path) {
        read_archive_member(path, JIJ_FILE)?
    } else {
        read_text(path)?
    };

    parse_values(&text)
        .ok_or_else(|| KkrError::parse(JIJ_FILE, path.display(), "non-numeric token in Jij matrix"))
}

/// 按空白切分全部数值，`#` 开头的行为注释
pub fn parse_values(text: &str) -> Option<Vec<f64>> {
    text.lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(scanner::parse_float)
        .collect()
}

fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(".tar.gz") || n.ends_with(".tgz"))
        .unwrap_or(false)
}

fn read_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(KkrError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| KkrError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 从 tar.gz 中读取一个成员的文本 (按文件名匹配，忽略目录前缀)
pub fn read_archive_member(archive: &Path, member: &str) -> Result<String> {
    let file = File::open(archive).map_err(|e| KkrError::FileReadError {
        path: archive.display().to_string(),
        source: e,
    })?;
    let archive_error = |reason: String| KkrError::ArchiveError {
        path: archive.display().to_string(),
        reason,
    };

    let mut tar = tar::Archive::new(GzDecoder::new(file));
    let entries = tar.entries().map_err(|e| archive_error(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(e.to_string()))?;
        let matches = entry
            .path()
            .map_err(|e| archive_error(e.to_string()))?
            .file_name()
            .map(|n| n == member)
            .unwrap_or(false);
        if matches {
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|e| archive_error(e.to_string()))?;
            return Ok(text);
        }
    }
    Err(archive_error(format!("member '{}' not found", member)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_archive(path: &Path, member: &str, content: &str) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, member, content.as_bytes()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_parse_values() {
        let v = parse_values("# header\n 1.0 -2.0D-01\n3\n").unwrap();
        assert_eq!(v, vec![1.0, -0.2, 3.0]);
        assert!(parse_values("1.0 abc").is_none());
    }

    #[test]
    fn test_read_plain_and_archive() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join(JIJ_FILE);
        std::fs::write(&plain, "1.0 2.0\n3.0\n").unwrap();
        assert_eq!(read_jij_values(&plain).unwrap(), vec![1.0, 2.0, 3.0]);

        let archive_dir = tempfile::tempdir().unwrap();
        let archive = archive_dir.path().join(ARCHIVE_FILE);
        write_archive(&archive, JIJ_FILE, "4.0 5.0\n");
        assert_eq!(read_jij_values(&archive).unwrap(), vec![4.0, 5.0]);
        // 目录中只有压缩包
        assert_eq!(read_jij_values(archive_dir.path()).unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_missing_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join(ARCHIVE_FILE);
        write_archive(&archive, "out_other", "1.0\n");
        let err = read_jij_values(&archive).unwrap_err();
        assert!(matches!(err, KkrError::ArchiveError { .. }));
    }
}
