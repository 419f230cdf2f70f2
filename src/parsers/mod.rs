//! # 解析器模块
//!
//! KKR 输出文件的读取与提取。
//!
//! ```text
//! scanner ─┬─ kkr_out        (out_kkr)
//!          ├─ init_out       (output.0.txt)
//!          ├─ iteration_out  (output.000.txt / output.2.txt)
//!          ├─ timing         (out_timing.000.txt)
//!          ├─ potential      (out_potential)
//!          ├─ nonco          (nonco_angle_out.dat)
//!          ├─ complex_dos    (complex.dos)
//!          └─ jij_matrix     (out_Jijmatrix / output_all.tar.gz)
//!
//! kkr_run: 调度全部提取器，汇总错误消息
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/`, `combine/`, `batch/` 使用
//! - 使用 `models/` 数据模型

pub mod complex_dos;
pub mod init_out;
pub mod iteration_out;
pub mod jij_matrix;
pub mod kkr_out;
pub mod kkr_run;
pub mod nonco;
pub mod potential;
pub mod scanner;
pub mod timing;

pub use kkr_run::{parse_kkr_output, ParseOptions, ParseOutcome, RunFiles};
