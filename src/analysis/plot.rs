//! # DOS 图表生成
//!
//! 使用 `plotters` 绘制每个势块的总 DOS 曲线，插值结果为实线，原始结果为浅色虚线。
//!
//! ## 依赖关系
//! - 被 `commands/dos.rs` 调用
//! - 使用 `analysis/dos.rs` 的 DosData 结构
//! - 使用 `plotters` 渲染图表

use crate::analysis::dos::{DosCurve, DosData};
use crate::error::{KkrError, Result};

use plotters::prelude::*;
use std::path::Path;

const PALETTE: [RGBColor; 6] = [
    RGBColor(0, 102, 204),
    RGBColor(204, 51, 0),
    RGBColor(0, 153, 76),
    RGBColor(153, 0, 153),
    RGBColor(230, 138, 0),
    RGBColor(90, 90, 90),
];

/// 生成 DOS 图表，扩展名为 `.svg` 时输出 SVG，否则 PNG
pub fn generate_dos_plot(
    data: &DosData,
    output_path: &Path,
    title: &str,
    width: u32,
    height: u32,
) -> Result<()> {
    let use_svg = output_path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_dos_chart(&root, data, title)?;
        root.present().map_err(|e| KkrError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_dos_chart(&root, data, title)?;
        root.present().map_err(|e| KkrError::Other(e.to_string()))?;
    }
    Ok(())
}

/// 所有曲线第 0 通道的范围
fn axis_ranges(curves: &[DosCurve]) -> ((f64, f64), (f64, f64)) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (0.0_f64, f64::NEG_INFINITY);
    for curve in curves {
        for &e in &curve.energies {
            x = (x.0.min(e), x.1.max(e));
        }
        if let Some(total) = curve.channels.first() {
            for &d in total {
                y = (y.0.min(d), y.1.max(d));
            }
        }
    }
    if !x.0.is_finite() || x.0 >= x.1 {
        x = (-1.0, 1.0);
    }
    if !y.1.is_finite() || y.0 >= y.1 {
        y = (0.0, 1.0);
    }
    (x, (y.0, y.1 * 1.1))
}

/// 绘制 DOS 图表的核心逻辑
fn draw_dos_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    data: &DosData,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| KkrError::Other(format!("{:?}", e)))?;

    let ((x_min, x_max), (y_min, y_max)) = axis_ranges(&data.interpolated);
    let total_name = data.names.first().map(String::as_str).unwrap_or("tot");

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| KkrError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("E - EF (eV)")
        .y_desc(format!("DOS {} (states/eV)", total_name))
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| KkrError::Other(format!("{:?}", e)))?;

    for (k, (interpolated, raw)) in data.interpolated.iter().zip(&data.raw).enumerate() {
        let color = PALETTE[k % PALETTE.len()];
        let (Some(smooth), Some(broad)) = (interpolated.channels.first(), raw.channels.first())
        else {
            continue;
        };

        chart
            .draw_series(LineSeries::new(
                raw.energies.iter().zip(broad).map(|(x, y)| (*x, *y)),
                color.mix(0.35).stroke_width(1),
            ))
            .map_err(|e| KkrError::Other(format!("{:?}", e)))?;

        chart
            .draw_series(LineSeries::new(
                interpolated.energies.iter().zip(smooth).map(|(x, y)| (*x, *y)),
                color.stroke_width(2),
            ))
            .map_err(|e| KkrError::Other(format!("{:?}", e)))?
            .label(format!("IPOT {}", interpolated.ipot))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    // 费米能位置
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, y_min), (0.0, y_max)],
            BLACK.mix(0.5).stroke_width(1),
        )))
        .map_err(|e| KkrError::Other(format!("{:?}", e)))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| KkrError::Other(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_ranges() {
        let curves = vec![DosCurve {
            ipot: 1,
            energies: vec![-2.0, 0.0, 3.0],
            channels: vec![vec![0.5, 2.0, 1.0]],
        }];
        let ((x0, x1), (y0, y1)) = axis_ranges(&curves);
        assert_eq!((x0, x1), (-2.0, 3.0));
        assert_eq!(y0, 0.0);
        assert!((y1 - 2.2).abs() < 1e-12);
    }

    #[test]
    fn test_axis_ranges_empty() {
        assert_eq!(axis_ranges(&[]), ((-1.0, 1.0), (0.0, 1.1)));
    }
}
