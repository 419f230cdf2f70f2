//! # dos 命令实现
//!
//! - `interpolate`: 读取 complex.dos，输出原始和插值 DOS (eV)，可导出 CSV 和图表
//! - `params`: 把 DOS 围道写入父计算的 KKR 参数
//!
//! ## 依赖关系
//! - 使用 `cli/dos.rs` 定义的参数
//! - 使用 `parsers/complex_dos.rs`, `analysis/dos.rs`, `analysis/export.rs`, `analysis/plot.rs`
//! - 使用 `workflow/params.rs` 的 DOS 参数

use crate::analysis::{dos, export, plot};
use crate::cli::dos::{DosArgs, DosCommands, InterpolateArgs, ParamsArgs};
use crate::error::Result;
use crate::parsers::complex_dos::ComplexDos;
use crate::utils::{json, output};
use crate::workflow::params::DosWorkflowParams;
use crate::workflow::{read_params, Params};

/// 执行 dos 命令
pub fn execute(args: DosArgs) -> Result<()> {
    match args.command {
        DosCommands::Interpolate(args) => interpolate(args),
        DosCommands::Params(args) => params(args),
    }
}

fn interpolate(args: InterpolateArgs) -> Result<()> {
    output::print_header("DOS Interpolation");

    let raw = ComplexDos::read(&args.input)?;
    output::print_kv("potential blocks", raw.blocks.len());
    output::print_kv("nspin", raw.nspin);
    output::print_kv("Fermi energy (Ry)", format!("{:.6}", raw.fermi_energy));

    let data = dos::process(&raw);
    output::print_kv("channels", data.names.join(", "));
    if let Some(curve) = data.interpolated.first() {
        if let (Some(first), Some(last)) = (curve.energies.first(), curve.energies.last()) {
            output::print_kv("E - EF range (eV)", format!("{:.3} .. {:.3}", first, last));
        }
    }

    if let Some(path) = &args.output_csv {
        export::dos_to_csv(&data, path)?;
        output::print_written("DOS table", path);
    }
    if let Some(path) = &args.plot {
        plot::generate_dos_plot(&data, path, &args.title, args.width, args.height)?;
        output::print_written("DOS plot", path);
    }

    output::print_done("DOS interpolation finished");
    Ok(())
}

fn params(args: ParamsArgs) -> Result<()> {
    let mut params = match &args.input {
        Some(path) => read_params(path)?,
        None => Params::new(),
    };
    let wf: DosWorkflowParams = match &args.wf_parameters {
        Some(path) => json::read_json(path)?,
        None => DosWorkflowParams::default(),
    };
    wf.dos_params.apply_to(&mut params);

    match &args.output {
        Some(path) => {
            json::write_json(&params, path)?;
            output::print_written("DOS parameters", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&params)?),
    }
    Ok(())
}
