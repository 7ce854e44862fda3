//! End-to-end pipeline: domain box, preprocessing, tetrahedralization,
//! restricted Voronoi diagram, polyhedron extraction.

use crate::config::PipelineConfig;
use crate::domain::build_box_mesh;
use crate::error::PipelineError;
use crate::extract::{self, OutputMesh};
use crate::preprocess::{self, PreprocessReport};
use crate::rvd::RestrictedVoronoi;
use crate::tetrahedralize::tetrahedralize;

/// Everything the pipeline produced, next to the mesh itself: the
/// preprocessing tallies and the per-generator cell volumes, which sum to
/// `domain_volume` for interior point sets.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub mesh: OutputMesh,
    pub preprocess: PreprocessReport,
    pub nb_tets: usize,
    pub nb_fragments: usize,
    pub domain_volume: f64,
    pub cell_volumes: Vec<f64>,
}

/// Runs the full pipeline over an axis-aligned box domain and a fixed
/// generator point set (flat `[x, y, z, ...]`). Points outside the domain
/// are legal and simply end up with empty cells; an empty point set yields
/// an empty mesh.
pub fn run(
    domain_min: [f64; 3],
    domain_max: [f64; 3],
    mut points: Vec<f64>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    points.truncate(points.len() - points.len() % 3);

    log::info!("=== Domain ===");
    let mut surface = build_box_mesh(domain_min, domain_max);
    log::info!(
        "Box domain [{} {} {}] - [{} {} {}]",
        domain_min[0],
        domain_min[1],
        domain_min[2],
        domain_max[0],
        domain_max[1],
        domain_max[2]
    );

    log::info!("=== Preprocessing ===");
    let preprocess = preprocess::preprocess(&mut surface, &config.preprocess)?;

    log::info!("=== Tetrahedralization ===");
    let tets = tetrahedralize(&surface, &config.tetrahedralize)?;
    let domain_volume = tets.total_volume();
    log::info!(
        "Filled domain with {} tetrahedra, volume {}",
        tets.nb_tets(),
        domain_volume
    );

    log::info!("=== Restricted Voronoi ===");
    let rvd = RestrictedVoronoi::compute(&tets, points, &config.engine);
    let nb_fragments = rvd.fragments().len();

    log::info!("=== Extraction ===");
    let mesh = extract::extract(&rvd, &config.extract);
    let cell_volumes = rvd.cell_volumes();

    Ok(PipelineOutput {
        mesh,
        preprocess,
        nb_tets: tets.nb_tets(),
        nb_fragments,
        domain_volume,
        cell_volumes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, TetrahedralizeError};

    #[test]
    fn test_run_with_defaults() {
        let out = run(
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            vec![0.3, 0.4, 0.5, 0.7, 0.6, 0.5],
            &PipelineConfig::default(),
        )
        .unwrap();
        assert_eq!(out.mesh.nb_cells(), 2);
        let sum: f64 = out.cell_volumes.iter().sum();
        assert!((sum - out.domain_volume).abs() < 1e-9);
        assert!((out.domain_volume - 1.0).abs() < 1e-12);
        assert!(out.nb_fragments > 0);
    }

    #[test]
    fn test_run_empty_points() {
        let out = run(
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            Vec::new(),
            &PipelineConfig::default(),
        )
        .unwrap();
        assert_eq!(out.mesh.nb_facets(), 0);
        assert_eq!(out.mesh.nb_vertices(), 0);
        assert!(out.cell_volumes.is_empty());
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.extract.cells_shrink = 2.0;
        let err = run([0.0; 3], [1.0; 3], Vec::new(), &config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::ShrinkOutOfRange(_))
        ));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_mirrored_extents_are_repaired() {
        // Swapped x extents mirror the box inside out; orientation repair
        // turns it back into a valid domain.
        let out = run(
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 1.0],
            vec![0.5, 0.5, 0.5],
            &PipelineConfig::default(),
        )
        .unwrap();
        assert!((out.domain_volume - 1.0).abs() < 1e-12);
        assert_eq!(out.mesh.nb_cells(), 1);
    }

    #[test]
    fn test_flat_domain_is_a_tetrahedralization_error() {
        let err = run(
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            vec![0.5, 0.5, 0.0],
            &PipelineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Tetrahedralize(TetrahedralizeError::OpenSurface(_))
        ));
    }

    #[test]
    fn test_incomplete_triple_is_truncated() {
        let out = run(
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            vec![0.5, 0.5, 0.5, 9.0],
            &PipelineConfig::default(),
        )
        .unwrap();
        assert_eq!(out.cell_volumes.len(), 1);
        assert!((out.cell_volumes[0] - 1.0).abs() < 1e-12);
    }
}
