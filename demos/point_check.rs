//! Reads a generator point file, tessellates a fixed box domain around it
//! and writes the resulting cell complex as OBJ.
//!
//! Usage: `point_check <points-file> [output.obj]`
//!
//! The point file holds whitespace-separated coordinates, three per point;
//! `#` starts a comment line. A missing or unreadable file is reported and
//! treated as an empty point set, which still exercises the full pipeline.
//! Library diagnostics go through the `log` facade and stay silent here.

use std::env;
use std::process;

use voromesh::{read_points, run, write_obj, PipelineConfig, PointSet};

const DOMAIN_MIN: [f64; 3] = [-5.0, -4.0, 0.0];
const DOMAIN_MAX: [f64; 3] = [15.0, 4.0, 8.0];

fn main() {
    let mut args = env::args().skip(1);
    let Some(points_path) = args.next() else {
        eprintln!("usage: point_check <points-file> [output.obj]");
        process::exit(1);
    };
    let output_path = args.next().unwrap_or_else(|| "cells.obj".to_string());

    let points = match read_points(&points_path) {
        Ok(points) => points,
        Err(err) => {
            eprintln!("cannot read {points_path}: {err}, continuing with no points");
            PointSet::default()
        }
    };
    println!(
        "{}: {} points ({} malformed tokens skipped)",
        points_path,
        points.nb_points(),
        points.skipped_tokens
    );

    let config = PipelineConfig::default();
    let output = match run(DOMAIN_MIN, DOMAIN_MAX, points.coords, &config) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("pipeline failed: {err}");
            process::exit(err.exit_code());
        }
    };

    println!(
        "{} tets, {} cell fragments, domain volume {}",
        output.nb_tets, output.nb_fragments, output.domain_volume
    );
    let covered: f64 = output.cell_volumes.iter().sum();
    println!(
        "{} cells cover {:.2}% of the domain",
        output.mesh.nb_cells(),
        100.0 * covered / output.domain_volume
    );

    if let Err(err) = write_obj(&output.mesh, &output_path) {
        eprintln!("cannot write {output_path}: {err}");
        process::exit(1);
    }
    println!(
        "wrote {} vertices, {} facets to {}",
        output.mesh.nb_vertices(),
        output.mesh.nb_facets(),
        output_path
    );
}
