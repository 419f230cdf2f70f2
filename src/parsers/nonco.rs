//! # 非共线磁矩方向文件解析
//!
//! `nonco_angle_out.dat` 每行给出一个原子磁矩的极角 θ 和方位角 φ (degree)。
//!
//! ## 依赖关系
//! - 被 `parsers/kkr_out.rs` 使用
//! - 使用 `parsers/scanner.rs`

use crate::error::{KkrError, Result};
use crate::parsers::scanner;

use std::path::Path;

/// 读取前 natom 个原子的 (θ, φ)
pub fn read_angles(path: &Path, natom: usize) -> Result<Vec<[f64; 2]>> {
    let lines = scanner::read_lines(path)?;
    parse_angles(&lines, natom).ok_or_else(|| {
        KkrError::parse(
            "nonco_angle_out.dat",
            path.display(),
            format!("expected angles for {} atoms", natom),
        )
    })
}

/// 按行解析角度，空行跳过，行数不足返回 `None`
pub fn parse_angles(lines: &[String], natom: usize) -> Option<Vec<[f64; 2]>> {
    let angles: Vec<[f64; 2]> = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .take(natom)
        .map(|l| {
            let mut tokens = l.split_whitespace();
            let theta = scanner::parse_float(tokens.next()?)?;
            let phi = scanner::parse_float(tokens.next()?)?;
            Some([theta, phi])
        })
        .collect::<Option<Vec<_>>>()?;

    if angles.len() == natom {
        Some(angles)
    } else {
        None
    }
}

/// 磁矩矢量 m·(sinθcosφ, sinθsinφ, cosθ)
pub fn moment_vector(moment: f64, theta_deg: f64, phi_deg: f64) -> [f64; 3] {
    let theta = theta_deg.to_radians();
    let phi = phi_deg.to_radians();
    [
        moment * theta.sin() * phi.cos(),
        moment * theta.sin() * phi.sin(),
        moment * theta.cos(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_angles() {
        let lines: Vec<String> = vec!["  0.0  0.0".into(), "".into(), " 90.0 45.0  1".into()];
        let angles = parse_angles(&lines, 2).unwrap();
        assert_eq!(angles, vec![[0.0, 0.0], [90.0, 45.0]]);
        assert!(parse_angles(&lines, 3).is_none());
    }

    #[test]
    fn test_moment_vector() {
        let v = moment_vector(2.0, 0.0, 0.0);
        assert!((v[2] - 2.0).abs() < 1e-12);
        let v = moment_vector(2.0, 90.0, 90.0);
        assert!(v[0].abs() < 1e-12);
        assert!((v[1] - 2.0).abs() < 1e-12);
        assert!(v[2].abs() < 1e-12);
    }
}
