//! # 分析模块
//!
//! 对后续计算的输出做物理量约化：Jij 交换张量、复能量 DOS 插值，以及结果导出和绘图。
//!
//! ## 子模块
//! - `jij`: 交换张量合并, J 与 DM 矢量
//! - `dos`: DOS 延拓到实轴, eV 换算
//! - `export`: CSV 导出
//! - `plot`: DOS 图表
//!
//! ## 依赖关系
//! - 被 `commands/jij.rs`, `commands/dos.rs` 使用
//! - 使用 `parsers/complex_dos.rs`, `models/impurity.rs`

pub mod dos;
pub mod export;
pub mod jij;
pub mod plot;
