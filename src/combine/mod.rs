//! # 双杂质合并模块
//!
//! 把两个收敛的单杂质计算合并为一个双杂质计算的输入。
//!
//! ## 子模块
//! - `cluster`: 团簇合并与 kickout 记录
//! - `potential`: 按 kickout 记录拼接初始势
//! - `ldau`: LDA+U 原子序号重映射
//!
//! ## 依赖关系
//! - 被 `commands/combine.rs` 使用
//! - 使用 `models/impurity.rs`, `parsers/potential.rs`

pub mod cluster;
pub mod ldau;
pub mod potential;

pub use cluster::combine_clusters;
pub use ldau::{combine_ldau, LdauSettings};
pub use potential::{combine_potentials, PotentialSource};
