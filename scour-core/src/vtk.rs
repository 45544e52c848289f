//! Legacy VTK output for flow solutions.
//!
//! Writes the ASCII legacy format (`# vtk DataFile Version 3.0`) read by ParaView
//! and PyVista:
//!
//! ```text
//! # vtk DataFile Version 3.0
//! FEM Flow Solution
//! ASCII
//! DATASET UNSTRUCTURED_GRID
//! POINTS n float          x y 0.0 per node
//! CELLS m 4m              3 i0 i1 i2 per triangle
//! CELL_TYPES m            5 (VTK_TRIANGLE) per triangle
//! POINT_DATA n
//! VECTORS velocity float  u v 0.0 per node
//! SCALARS velocity_magnitude float 1
//! SCALARS pressure float 1            (if present)
//! SCALARS wall_shear_stress float 1   (if given)
//! ```
//!
//! A small reader recovers the block counts for round-trip checks.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::postprocess::FlowSolution;

const VTK_VERSION_LINE: &str = "# vtk DataFile Version 3.0";
const VTK_TITLE: &str = "FEM Flow Solution";
const VTK_TRIANGLE: u8 = 5;

/// Legacy VTK writer helper.
struct LegacyVtkWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> LegacyVtkWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    fn write_header(&mut self) -> std::io::Result<()> {
        writeln!(self.writer, "{}", VTK_VERSION_LINE)?;
        writeln!(self.writer, "{}", VTK_TITLE)?;
        writeln!(self.writer, "ASCII")?;
        writeln!(self.writer, "DATASET UNSTRUCTURED_GRID")
    }

    fn write_points(&mut self, mesh: &Mesh) -> std::io::Result<()> {
        writeln!(self.writer, "POINTS {} float", mesh.n_nodes())?;
        for p in mesh.nodes() {
            writeln!(self.writer, "{} {} 0.0", p.x, p.y)?;
        }
        Ok(())
    }

    fn write_cells(&mut self, mesh: &Mesh) -> std::io::Result<()> {
        let n_cells = mesh.n_elements();
        writeln!(self.writer, "CELLS {} {}", n_cells, 4 * n_cells)?;
        for [a, b, c] in mesh.elements() {
            writeln!(self.writer, "3 {} {} {}", a, b, c)?;
        }

        writeln!(self.writer, "CELL_TYPES {}", n_cells)?;
        for _ in 0..n_cells {
            writeln!(self.writer, "{}", VTK_TRIANGLE)?;
        }
        Ok(())
    }

    fn write_velocity(&mut self, flow: &FlowSolution) -> std::io::Result<()> {
        writeln!(self.writer, "VECTORS velocity float")?;
        for (u, v) in flow.velocity_x.iter().zip(&flow.velocity_y) {
            writeln!(self.writer, "{:e} {:e} 0.0", u, v)?;
        }
        Ok(())
    }

    fn write_scalars(&mut self, name: &str, data: &[f64]) -> std::io::Result<()> {
        writeln!(self.writer, "SCALARS {} float 1", name)?;
        writeln!(self.writer, "LOOKUP_TABLE default")?;
        for value in data {
            writeln!(self.writer, "{:e}", value)?;
        }
        Ok(())
    }

    fn finish(mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Write the mesh and flow fields in legacy VTK format.
///
/// # Errors
///
/// * [`Error::Vtk`] if a field length does not match the node count
/// * [`Error::Io`] on write failure
pub fn write_legacy_vtk<W: Write>(
    writer: W,
    mesh: &Mesh,
    flow: &FlowSolution,
    wall_shear: Option<&[f64]>,
) -> Result<()> {
    let n_nodes = mesh.n_nodes();
    check_field_len("velocity", flow.n_nodes(), n_nodes)?;
    if let Some(pressure) = &flow.pressure {
        check_field_len("pressure", pressure.len(), n_nodes)?;
    }
    if let Some(shear) = wall_shear {
        check_field_len("wall_shear_stress", shear.len(), n_nodes)?;
    }

    let mut vtk = LegacyVtkWriter::new(writer);
    vtk.write_header()?;
    vtk.write_points(mesh)?;
    vtk.write_cells(mesh)?;

    writeln!(vtk.writer, "POINT_DATA {}", n_nodes)?;
    vtk.write_velocity(flow)?;
    vtk.write_scalars("velocity_magnitude", &flow.velocity_magnitude)?;
    if let Some(pressure) = &flow.pressure {
        vtk.write_scalars("pressure", pressure)?;
    }
    if let Some(shear) = wall_shear {
        vtk.write_scalars("wall_shear_stress", shear)?;
    }
    vtk.finish()?;

    Ok(())
}

/// Write a legacy VTK file to `path`.
pub fn write_vtk_file(
    path: impl AsRef<Path>,
    mesh: &Mesh,
    flow: &FlowSolution,
    wall_shear: Option<&[f64]>,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_legacy_vtk(file, mesh, flow, wall_shear)?;
    log::debug!("Wrote VTK file {}", path.display());
    Ok(())
}

fn check_field_len(name: &str, len: usize, n_nodes: usize) -> Result<()> {
    if len != n_nodes {
        return Err(Error::Vtk(format!(
            "field '{}' has {} values, mesh has {} nodes",
            name, len, n_nodes
        )));
    }
    Ok(())
}

/// Block counts recovered from a legacy VTK file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VtkSummary {
    pub title: String,
    pub n_points: usize,
    pub n_cells: usize,
    pub n_cell_types: usize,
    pub n_point_data: usize,
    /// Point-data field names in file order.
    pub fields: Vec<String>,
}

/// Whitespace-separated tokens of the file body.
struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn next_token(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    fn require(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| Error::Vtk(format!("unexpected end of file, expected {}", what)))
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let token = self.require(what)?;
        token
            .parse()
            .map_err(|_| Error::Vtk(format!("invalid {} '{}'", what, token)))
    }

    /// Consume `n` numeric values.
    fn skip_numbers(&mut self, n: usize, block: &str) -> Result<()> {
        for _ in 0..n {
            let token = self.require(block)?;
            token
                .parse::<f64>()
                .map_err(|_| Error::Vtk(format!("non-numeric value '{}' in {}", token, block)))?;
        }
        Ok(())
    }
}

/// Parse a legacy VTK stream written by [`write_legacy_vtk`].
pub fn read_vtk_summary<R: BufRead>(reader: R) -> Result<VtkSummary> {
    let mut lines = reader.lines();
    let mut header = |what: &str| -> Result<String> {
        lines
            .next()
            .transpose()?
            .ok_or_else(|| Error::Vtk(format!("missing {} line", what)))
    };

    let version = header("version")?;
    if !version.starts_with("# vtk DataFile") {
        return Err(Error::Vtk(format!("not a legacy VTK file: '{}'", version)));
    }
    let title = header("title")?.trim().to_string();
    let format = header("format")?;
    if format.trim() != "ASCII" {
        return Err(Error::Vtk(format!("unsupported format '{}'", format.trim())));
    }

    let body = lines.collect::<std::io::Result<Vec<_>>>()?.join("\n");
    let mut tokens = Tokens {
        inner: body.split_whitespace(),
    };

    let mut summary = VtkSummary {
        title,
        ..Default::default()
    };

    while let Some(keyword) = tokens.next_token() {
        match keyword {
            "DATASET" => {
                let kind = tokens.require("dataset type")?;
                if kind != "UNSTRUCTURED_GRID" {
                    return Err(Error::Vtk(format!("unsupported dataset '{}'", kind)));
                }
            }
            "POINTS" => {
                summary.n_points = tokens.count("point count")?;
                tokens.require("point type")?;
                tokens.skip_numbers(3 * summary.n_points, "POINTS")?;
            }
            "CELLS" => {
                summary.n_cells = tokens.count("cell count")?;
                let size = tokens.count("cell list size")?;
                tokens.skip_numbers(size, "CELLS")?;
            }
            "CELL_TYPES" => {
                summary.n_cell_types = tokens.count("cell type count")?;
                tokens.skip_numbers(summary.n_cell_types, "CELL_TYPES")?;
            }
            "POINT_DATA" => {
                summary.n_point_data = tokens.count("point data count")?;
            }
            "VECTORS" => {
                summary.fields.push(tokens.require("field name")?.to_string());
                tokens.require("field type")?;
                tokens.skip_numbers(3 * summary.n_point_data, "VECTORS")?;
            }
            "SCALARS" => {
                summary.fields.push(tokens.require("field name")?.to_string());
                tokens.require("field type")?;
                let components = match tokens.next_token() {
                    Some("LOOKUP_TABLE") => 1,
                    Some(n) => {
                        let n = n
                            .parse::<usize>()
                            .map_err(|_| Error::Vtk(format!("invalid component count '{}'", n)))?;
                        if tokens.require("LOOKUP_TABLE")? != "LOOKUP_TABLE" {
                            return Err(Error::Vtk("SCALARS without LOOKUP_TABLE".to_string()));
                        }
                        n
                    }
                    None => return Err(Error::Vtk("truncated SCALARS header".to_string())),
                };
                tokens.require("lookup table name")?;
                tokens.skip_numbers(components * summary.n_point_data, "SCALARS")?;
            }
            other => {
                return Err(Error::Vtk(format!("unexpected keyword '{}'", other)));
            }
        }
    }

    Ok(summary)
}

/// Parse a legacy VTK file from disk.
pub fn read_vtk_summary_file(path: impl AsRef<Path>) -> Result<VtkSummary> {
    let file = File::open(path)?;
    read_vtk_summary(BufReader::new(file))
}
