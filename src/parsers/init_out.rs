//! # output.0.txt 初始化日志提取器
//!
//! 初始化阶段只输出一次的信息：nspin/原子数、能量围道、晶格常数、k 网格、
//! 对称操作、Ewald 求和参数以及混合参数。这些块都在锚点之后的固定行偏移处。
//!
//! ## 依赖关系
//! - 被 `parsers/kkr_run.rs` 调度
//! - 被 `parsers/kkr_out.rs`, `parsers/iteration_out.rs` 使用 (`read_dimensions`, `read_mixing`)
//! - 使用 `parsers/scanner.rs`

use crate::error::{KkrError, Result};
use crate::models::output::{
    EnergyContour, EwaldMode, EwaldSumGroup, KmeshGroup, KpointsPerKmesh, OutputRecord,
    SymmetriesGroup, SymmetryOperation,
};
use crate::parsers::kkr_run::RunFiles;
use crate::parsers::{iteration_out, scanner};

const FORMAT: &str = "output.0.txt";

/// 体系维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub nspin: usize,
    pub natom: usize,
    pub use_newsosol: bool,
}

/// 混合参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mixing {
    pub strmix: f64,
    pub fcm: f64,
    pub qbound: f64,
    pub brymix: f64,
    pub imix: i64,
    pub idtbry: i64,
}

// ─────────────────────────────────────────────────────────────
// 纯函数 (按行解析)
// ─────────────────────────────────────────────────────────────

/// NSPIN, NATYP 以及是否使用 NEWSOSOL 求解器
pub fn parse_dimensions(lines: &[String]) -> Option<Dimensions> {
    let nspin = scanner::last_int(&lines[scanner::find_first(lines, "NSPIN")?])?;
    let natom = scanner::last_int(&lines[scanner::find_first(lines, "NATYP")?])?;
    if !(1..=2).contains(&nspin) || natom <= 0 {
        return None;
    }
    Some(Dimensions {
        nspin: nspin as usize,
        natom: natom as usize,
        use_newsosol: scanner::find_first(lines, "NEWSOSOL").is_some(),
    })
}

/// 能量围道，五个字段缺一即失败
pub fn parse_energy_contour(lines: &[String]) -> Option<EnergyContour> {
    let line_of = |anchor: &str| scanner::find_first(lines, anchor).map(|i| lines[i].as_str());

    let emin = scanner::value_after(line_of("E min =")?, "E min =")?;
    let temperature = scanner::value_after(line_of("Temperature =")?, "Temperature =")?;
    let npoints = scanner::int_after(
        line_of("Number of energy points :")?,
        "Number of energy points :",
    )?;
    let npoints = usize::try_from(npoints).ok()?;

    // DOS 围道: 只有实轴上的一段，没有极点
    if scanner::find_first(lines, "Density-of-States calculation").is_some() {
        let emax = scanner::value_after(line_of("E max =")?, "E max =")?;
        return Some(EnergyContour {
            emin,
            emin_unit: "Rydberg".to_string(),
            emax: Some(emax),
            emax_unit: Some("Rydberg".to_string()),
            number_of_energy_points: npoints,
            temperature,
            temperature_unit: "Kelvin".to_string(),
            npol: 0,
            n1: 0,
            n2: npoints,
            n3: 0,
        });
    }

    let npol = usize::try_from(scanner::int_after(line_of("poles =")?, "poles =")?).ok()?;

    // "contour: N1 = 3, N2 = 32, N3 = 3"
    let contour = line_of("contour:")?;
    let rest = &contour[contour.find("contour:")? + "contour:".len()..];
    let tokens: Vec<String> = rest.replace(',', " ").split_whitespace().map(str::to_string).collect();
    let segment = |i: usize| -> Option<usize> { tokens.get(i)?.parse::<usize>().ok() };

    Some(EnergyContour {
        emin,
        emin_unit: "Rydberg".to_string(),
        emax: None,
        emax_unit: None,
        number_of_energy_points: npoints,
        temperature,
        temperature_unit: "Kelvin".to_string(),
        npol,
        n1: segment(2)?,
        n2: segment(5)?,
        n3: segment(8)?,
    })
}

/// (alat, 2π/alat)
pub fn parse_alat(lines: &[String]) -> Option<(f64, f64)> {
    let line = &lines[scanner::find_first(lines, "Lattice constants :")?];
    let alat = scanner::value_after(line, "ALAT =")?;
    let two_pi_over_alat = scanner::value_after(line, "2*PI/ALAT =")?;
    Some((alat, two_pi_over_alat))
}

/// k 网格表: `index nofks nkx nky nkz`
pub fn parse_kmeshes(lines: &[String]) -> Option<(usize, KpointsPerKmesh)> {
    let count_line = &lines[scanner::find_first(lines, "number of different k-meshes :")?];
    let nkmesh = usize::try_from(scanner::int_after(count_line, ":")?).ok()?;
    let table = scanner::find_first(lines, "k-mesh NofKs")?;

    let mut kpts = KpointsPerKmesh::default();
    for ik in 0..nkmesh {
        let row: Vec<usize> = lines
            .get(table + 1 + ik)?
            .split_whitespace()
            .take(5)
            .map(|t| t.parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()?;
        if row.len() < 5 {
            return None;
        }
        kpts.number_of_kpts.push(row[1]);
        kpts.n_kx.push(row[2]);
        kpts.n_ky.push(row[3]);
        kpts.n_kz.push(row[4]);
    }
    Some((nkmesh, kpts))
}

/// 对称操作表 (<SYMTAUMAT> 之后第 4 行开始)
pub fn parse_symmetries(lines: &[String]) -> Option<SymmetriesGroup> {
    let lattice_line = &lines[scanner::find_first(lines, "symmetries found for this lattice:")?];
    let nlattice = scanner::int_after(lattice_line, "symmetries found for this lattice:")?;
    let used_line = &lines[scanner::find_first(lines, "symmetries will be used")?];
    let nused = scanner::first_int(used_line)?;
    let (nlattice, nused) = (usize::try_from(nlattice).ok()?, usize::try_from(nused).ok()?);

    let table = scanner::find_first(lines, "<SYMTAUMAT>")?;
    let mut operations = Vec::with_capacity(nused);
    for isym in 0..nused {
        let tokens = scanner::split_glued(lines.get(table + 4 + isym)?);
        if tokens.len() < 7 {
            return None;
        }
        let inversion = tokens[2].parse::<i64>().ok()?;
        let euler_angles = [
            scanner::parse_float(&tokens[3])?,
            scanner::parse_float(&tokens[4])?,
            scanner::parse_float(&tokens[5])?,
        ];
        operations.push(SymmetryOperation {
            name: tokens[1].clone(),
            euler_angles,
            has_inversion: inversion == 1,
            is_unitary: tokens[6] == "T",
        });
    }

    Some(SymmetriesGroup {
        number_of_lattice_symmetries: nlattice,
        number_of_used_symmetries: nused,
        symmetry_description: operations,
    })
}

/// Ewald 求和表的一行: `<名称> <名称> nvec nshell cutoff`
fn ewald_row(line: &str) -> Option<(usize, usize, f64)> {
    let tokens: Vec<&str> = line.split_whitespace().skip(2).collect();
    if tokens.len() < 3 {
        return None;
    }
    Some((
        tokens[0].parse().ok()?,
        tokens[1].parse().ok()?,
        scanner::parse_float(tokens[2])?,
    ))
}

/// Ewald 求和参数，体材料 (3D) 与 slab (2D) 的表格位置不同
pub fn parse_ewald(lines: &[String]) -> Option<EwaldSumGroup> {
    let bulk = scanner::find_first(lines, "setting bulk Madelung coefficients").is_some();
    let (mode, anchor, offset) = if bulk {
        (EwaldMode::Bulk, "< LATTICE3D >", 7)
    } else {
        (EwaldMode::Slab, "< LATTICE2D >", 13)
    };

    let start = scanner::find_first(lines, anchor)?;
    let (rvec, rshell, rcut) = ewald_row(lines.get(start + offset)?)?;
    let (gvec, gshell, gcut) = ewald_row(lines.get(start + offset + 1)?)?;

    // 2D 模式额外给出面内截断半径
    let (rmax_2d, gmax_2d) = match mode {
        EwaldMode::Bulk => (None, None),
        EwaldMode::Slab => {
            let block = &lines[start..start + offset];
            let rmax = scanner::find_first(block, "R max =")
                .and_then(|i| scanner::value_after(&block[i], "R max ="))?;
            let gmax = scanner::find_first(block, "G max =")
                .and_then(|i| scanner::value_after(&block[i], "G max ="))?;
            (Some(rmax), Some(gmax))
        }
    };

    Some(EwaldSumGroup {
        ewald_summation_mode: mode,
        rsum_cutoff: rcut,
        rsum_cutoff_unit: "a_Bohr".to_string(),
        rsum_number_of_vectors: rvec,
        rsum_number_of_shells: rshell,
        gsum_cutoff: gcut,
        gsum_cutoff_unit: "1/a_Bohr".to_string(),
        gsum_number_of_vectors: gvec,
        gsum_number_of_shells: gshell,
        rmax_2d,
        gmax_2d,
    })
}

/// 混合参数表
pub fn parse_mixing(lines: &[String]) -> Option<Mixing> {
    let strmix_at = scanner::find_first(lines, "STRMIX        FCM       QBOUND")?;
    let row = scanner::all_floats(lines.get(strmix_at + 1)?)?;
    if row.len() < 3 {
        return None;
    }
    let brymix = scanner::parse_float(lines.get(strmix_at + 4)?.split_whitespace().next()?)?;

    let imix_at = scanner::find_first(lines, "IMIX    IGF    ICC")?;
    let imix = scanner::parse_int(lines.get(imix_at + 1)?.split_whitespace().next()?)?;
    let idtbry = scanner::parse_int(lines.get(imix_at + 4)?.split_whitespace().next()?)?;

    Some(Mixing {
        strmix: row[0],
        fcm: row[1],
        qbound: row[2],
        brymix,
        imix,
        idtbry,
    })
}

// ─────────────────────────────────────────────────────────────
// 供其他提取器使用
// ─────────────────────────────────────────────────────────────

/// 读取 nspin/natom
pub(crate) fn read_dimensions(files: &RunFiles) -> Result<Dimensions> {
    let lines = scanner::read_lines(&files.output_0init)?;
    parse_dimensions(&lines).ok_or_else(|| missing(files, "NSPIN/NATYP"))
}

/// 读取混合参数
pub(crate) fn read_mixing(files: &RunFiles) -> Result<Mixing> {
    let lines = scanner::read_lines(&files.output_0init)?;
    parse_mixing(&lines).ok_or_else(|| missing(files, "mixing parameters"))
}

fn missing(files: &RunFiles, what: &str) -> KkrError {
    KkrError::parse(
        FORMAT,
        files.output_0init.display(),
        format!("{} block not found or malformed", what),
    )
}

// ─────────────────────────────────────────────────────────────
// 提取器
// ─────────────────────────────────────────────────────────────

/// nspin/natom
pub fn extract_dimensions(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let dims = read_dimensions(files)?;
    record.nspin = Some(dims.nspin);
    record.number_of_atoms_in_unit_cell = Some(dims.natom);
    record.use_newsosol = Some(dims.use_newsosol);
    Ok(())
}

/// energy contour
pub fn extract_energy_contour(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.output_0init)?;
    let contour = parse_energy_contour(&lines).ok_or_else(|| missing(files, "energy contour"))?;
    record.energy_contour_group = Some(contour);
    Ok(())
}

/// alat, 2*pi/alat
pub fn extract_alat(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.output_0init)?;
    let (alat, tpia) = parse_alat(&lines).ok_or_else(|| missing(files, "lattice constants"))?;
    record.alat_internal = Some(alat);
    record.alat_internal_unit = Some("a_Bohr".to_string());
    record.two_pi_over_alat_internal = Some(tpia);
    record.two_pi_over_alat_internal_unit = Some("1/a_Bohr".to_string());
    Ok(())
}

/// kmesh: 网格表来自初始化日志，每个能量点所用网格来自 output.000.txt
pub fn extract_kmesh(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.output_0init)?;
    let (nkmesh, kpts) = parse_kmeshes(&lines).ok_or_else(|| missing(files, "k-mesh"))?;
    let energypoints = iteration_out::read_kmesh_energypoints(files)?;

    record.kmesh_group = Some(KmeshGroup {
        number_different_kmeshes: nkmesh,
        number_kpoints_per_kmesh: kpts,
        kmesh_energypoint: energypoints,
    });
    Ok(())
}

/// symmetries
pub fn extract_symmetries(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.output_0init)?;
    let group = parse_symmetries(&lines).ok_or_else(|| missing(files, "symmetry"))?;
    record.symmetries_group = Some(group);
    Ok(())
}

/// ewald summation for madelung potential
pub fn extract_ewald(files: &RunFiles, record: &mut OutputRecord) -> Result<()> {
    let lines = scanner::read_lines(&files.output_0init)?;
    let group = parse_ewald(&lines).ok_or_else(|| missing(files, "Ewald summation"))?;
    record.ewald_sum_group = Some(group);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_dimensions() {
        let l = lines("  NSPIN =    2\n  NATYP =    6\n  solver: NEWSOSOL\n");
        let dims = parse_dimensions(&l).unwrap();
        assert_eq!(dims, Dimensions { nspin: 2, natom: 6, use_newsosol: true });
        assert!(parse_dimensions(&lines("  NSPIN =    3\n  NATYP =    6\n")).is_none());
        assert!(parse_dimensions(&lines("  NATYP =    6\n")).is_none());
    }

    #[test]
    fn test_energy_contour_requires_all_fields() {
        let full = "\
 E min =   -0.600000 (Ry)        Fermi energy =    0.459241 (Ry)
 Temperature =  800.000000 (K)
 Number of energy points :   45      poles =    7
 contour: N1 = 3, N2 = 32, N3 = 3
";
        let c = parse_energy_contour(&lines(full)).unwrap();
        assert_eq!((c.npol, c.n1, c.n2, c.n3), (7, 3, 32, 3));
        assert_eq!(c.number_of_energy_points, 45);
        assert!((c.emin + 0.6).abs() < 1e-12);
        assert!(c.emax.is_none());

        let without_contour: Vec<String> = lines(full).into_iter().take(3).collect();
        assert!(parse_energy_contour(&without_contour).is_none());
    }

    #[test]
    fn test_dos_contour() {
        let text = "\
 Density-of-States calculation
 E min =   -1.000000 (Ry)
 E max =    1.000000 (Ry)
 Temperature =  200.000000 (K)
 Number of energy points :   61
";
        let c = parse_energy_contour(&lines(text)).unwrap();
        assert_eq!((c.npol, c.n1, c.n2, c.n3), (0, 0, 61, 0));
        assert_eq!(c.emax, Some(1.0));
    }

    #[test]
    fn test_symmetries_with_glued_columns() {
        let text = "\
    4 symmetries found for this lattice:    4
    2 symmetries will be used
 <SYMTAUMAT> : rotation matrices acting on t/G matrices
 -------------------------------------------------------------
   ISYM            INV          Euler angles      Unitarity
 -------------------------------------------------------------
    1   E           0   0.00000   0.00000   0.00000   T
    2   IC2x        1-180.00000 180.00000   0.00000   F
";
        let g = parse_symmetries(&lines(text)).unwrap();
        assert_eq!(g.number_of_lattice_symmetries, 4);
        assert_eq!(g.number_of_used_symmetries, 2);
        assert_eq!(g.symmetry_description[1].name, "IC2x");
        assert!(g.symmetry_description[1].has_inversion);
        assert!(!g.symmetry_description[1].is_unitary);
        assert_eq!(g.symmetry_description[1].euler_angles, [-180.0, 180.0, 0.0]);
    }

    #[test]
    fn test_ewald_slab_mode_adds_keys() {
        let text = "\
  < LATTICE2D > : generating direct/reciprocal lattice vectors

       R max = 30.00000 (a.u.)
       G max =  9.00000 (1/a.u.)

       in-plane lattice summation, layers are treated separately
       ------------------------------------------------------------
       layer pairs                          21
       ------------------------------------------------------------


                   vectors  shells  max. R
                  ------------------------------
    Direct  lattice    313     41   30.00000
    Recipr. lattice   2287    203    9.00000
";
        let g = parse_ewald(&lines(text)).unwrap();
        assert_eq!(g.ewald_summation_mode, EwaldMode::Slab);
        assert_eq!(g.rsum_number_of_vectors, 313);
        assert_eq!(g.gsum_number_of_shells, 203);
        assert_eq!(g.rmax_2d, Some(30.0));
        assert_eq!(g.gmax_2d, Some(9.0));
    }

    #[test]
    fn test_parse_mixing() {
        let text = "\
  STRMIX        FCM       QBOUND
  0.010000   20.000000    0.000000
 ---+---------+---------+---------
  BRYMIX
  0.010000
  IMIX    IGF    ICC
     0      0      0
 ---+---------+---------+---------
  IDTBRY
    40
";
        let m = parse_mixing(&lines(text)).unwrap();
        assert_eq!(m.imix, 0);
        assert_eq!(m.idtbry, 40);
        assert!((m.fcm - 20.0).abs() < 1e-12);
        assert!((m.brymix - 0.01).abs() < 1e-12);
    }
}
