//! Point-set reading and OBJ output.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::extract::OutputMesh;

/// Generator points parsed from a text file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSet {
    /// Flat `[x, y, z, ...]` coordinates.
    pub coords: Vec<f64>,
    /// Tokens that did not parse as finite numbers.
    pub skipped_tokens: usize,
    /// Trailing coordinates that did not complete a triple.
    pub dropped_coords: usize,
}

impl PointSet {
    pub fn nb_points(&self) -> usize {
        self.coords.len() / 3
    }
}

/// Reads generator points from a whitespace-separated text file, three
/// coordinates per point. Parsing is lenient: lines starting with `#` are
/// comments, tokens that do not parse as finite numbers are skipped and
/// counted, and a trailing incomplete triple is dropped.
pub fn read_points<P: AsRef<Path>>(path: P) -> io::Result<PointSet> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut set = PointSet::default();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            continue;
        }
        for token in trimmed.split_whitespace() {
            match token.parse::<f64>() {
                Ok(value) if value.is_finite() => set.coords.push(value),
                _ => set.skipped_tokens += 1,
            }
        }
    }
    set.dropped_coords = set.coords.len() % 3;
    set.coords.truncate(set.coords.len() - set.dropped_coords);

    if set.skipped_tokens > 0 {
        log::warn!(
            "Skipped {} token(s) in the points file that were not finite numbers",
            set.skipped_tokens
        );
    }
    if set.dropped_coords > 0 {
        log::warn!(
            "Dropped {} trailing coordinate(s), points need full x y z triples",
            set.dropped_coords
        );
    }
    log::info!("Read {} points", set.nb_points());
    Ok(set)
}

/// Writes the output mesh as Wavefront OBJ. When cell ids are present each
/// cell becomes a `g cell_<id>` group.
pub fn write_obj<P: AsRef<Path>>(mesh: &OutputMesh, path: P) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    for v in mesh.vertices.chunks_exact(3) {
        writeln!(out, "v {} {} {}", v[0], v[1], v[2])?;
    }

    let mut current_cell = None;
    for f in 0..mesh.nb_facets() {
        if let Some(cell) = mesh.facet_cell(f) {
            if current_cell != Some(cell) {
                writeln!(out, "g cell_{cell}")?;
                current_cell = Some(cell);
            }
        }
        write!(out, "f")?;
        // OBJ indices are 1-based.
        for &v in mesh.facet(f) {
            write!(out, " {}", v + 1)?;
        }
        writeln!(out)?;
    }
    out.flush()
}
