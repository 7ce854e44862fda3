use approx::assert_relative_eq;
use voromesh::{run, OutputMesh, PipelineConfig};

const DOMAIN_MIN: [f64; 3] = [-5.0, -4.0, 0.0];
const DOMAIN_MAX: [f64; 3] = [15.0, 4.0, 8.0];
const DOMAIN_VOLUME: f64 = 20.0 * 8.0 * 8.0;

/// Interior lattice of n x n x n generators, half a step off the walls.
fn grid_points(n: usize) -> Vec<f64> {
    let mut generators = Vec::with_capacity(n * n * n * 3);
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                for axis in 0..3 {
                    let extent = DOMAIN_MAX[axis] - DOMAIN_MIN[axis];
                    let step = extent / n as f64;
                    let i = [x, y, z][axis] as f64;
                    generators.push(DOMAIN_MIN[axis] + (i + 0.5) * step);
                }
            }
        }
    }
    generators
}

/// Signed volume of the facets labeled `cell`, via the divergence theorem.
/// Closed outward shells give their enclosed volume.
fn labeled_volume(mesh: &OutputMesh, cell: u32) -> f64 {
    let mut volume = 0.0;
    for f in 0..mesh.nb_facets() {
        if mesh.facet_cell(f) != Some(cell) {
            continue;
        }
        let facet = mesh.facet(f);
        let a = mesh.vertex(facet[0]);
        for i in 1..facet.len() - 1 {
            let b = mesh.vertex(facet[i]);
            let c = mesh.vertex(facet[i + 1]);
            volume += (a[0] * (b[1] * c[2] - b[2] * c[1])
                - b[0] * (a[1] * c[2] - a[2] * c[1])
                + c[0] * (a[1] * b[2] - a[2] * b[1]))
                / 6.0;
        }
    }
    volume
}

fn total_area(mesh: &OutputMesh) -> f64 {
    let mut area = 0.0;
    for f in 0..mesh.nb_facets() {
        let facet = mesh.facet(f);
        let a = mesh.vertex(facet[0]);
        for i in 1..facet.len() - 1 {
            let b = mesh.vertex(facet[i]);
            let c = mesh.vertex(facet[i + 1]);
            let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let n = [
                u[1] * v[2] - u[2] * v[1],
                u[2] * v[0] - u[0] * v[2],
                u[0] * v[1] - u[1] * v[0],
            ];
            area += 0.5 * (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        }
    }
    area
}

#[test]
fn test_volume_conservation_on_box() {
    let output = run(
        DOMAIN_MIN,
        DOMAIN_MAX,
        grid_points(4),
        &PipelineConfig::default(),
    )
    .unwrap();

    assert_relative_eq!(output.domain_volume, DOMAIN_VOLUME, max_relative = 1e-12);
    let covered: f64 = output.cell_volumes.iter().sum();
    assert_relative_eq!(covered, DOMAIN_VOLUME, max_relative = 1e-9);

    // The extracted shells enclose the same volumes as the fragments.
    for (cell, &expected) in output.cell_volumes.iter().enumerate() {
        let shell = labeled_volume(&output.mesh, cell as u32);
        assert!(
            (shell - expected).abs() < 1e-6 * DOMAIN_VOLUME,
            "cell {} shell volume {} vs fragment volume {}",
            cell,
            shell,
            expected
        );
    }
}

#[test]
fn test_each_interior_generator_gets_a_cell() {
    let n = 2;
    let output = run(
        DOMAIN_MIN,
        DOMAIN_MAX,
        grid_points(n),
        &PipelineConfig::default(),
    )
    .unwrap();

    assert_eq!(output.mesh.nb_cells(), n * n * n);
    let cells = output.mesh.facet_cells.as_ref().unwrap();
    for f in 0..output.mesh.nb_facets() {
        assert!((cells[f] as usize) < n * n * n);
    }
}

#[test]
fn test_empty_point_set_is_not_an_error() {
    let output = run(
        DOMAIN_MIN,
        DOMAIN_MAX,
        Vec::new(),
        &PipelineConfig::default(),
    )
    .unwrap();
    assert_eq!(output.mesh.nb_facets(), 0);
    assert_eq!(output.mesh.nb_cells(), 0);
    assert!(output.cell_volumes.is_empty());
    assert!(output.nb_tets > 0);
}

#[test]
fn test_symmetric_pair_splits_evenly() {
    // Mirror images about the box center plane x = 5. The box needs no
    // cleanup, so preprocessing stays off and the builder output goes
    // straight to the tetrahedralizer.
    let points = vec![3.0, 0.5, 4.5, 7.0, -0.5, 3.5];
    let mut config = PipelineConfig::default();
    config.preprocess.enabled = false;
    let output = run(DOMAIN_MIN, DOMAIN_MAX, points, &config).unwrap();

    assert_eq!(output.mesh.nb_cells(), 2);
    assert_relative_eq!(output.cell_volumes[0], DOMAIN_VOLUME / 2.0, epsilon = 1e-6);
    assert_relative_eq!(output.cell_volumes[1], DOMAIN_VOLUME / 2.0, epsilon = 1e-6);
}

#[test]
fn test_generator_outside_domain_gets_empty_cell() {
    let points = vec![5.0, 0.0, 4.0, 100.0, 100.0, 100.0];
    let output = run(DOMAIN_MIN, DOMAIN_MAX, points, &PipelineConfig::default()).unwrap();

    assert_eq!(output.mesh.nb_cells(), 1);
    assert!((output.cell_volumes[0] - DOMAIN_VOLUME).abs() < 1e-9);
    assert_eq!(output.cell_volumes[1], 0.0);
}

#[test]
fn test_shrink_keeps_structure_and_reduces_area() {
    let points = grid_points(2);

    let plain = run(
        DOMAIN_MIN,
        DOMAIN_MAX,
        points.clone(),
        &PipelineConfig::default(),
    )
    .unwrap();

    let mut config = PipelineConfig::default();
    config.extract.cells_shrink = 0.5;
    let shrunk = run(DOMAIN_MIN, DOMAIN_MAX, points, &config).unwrap();

    assert_eq!(shrunk.mesh.nb_facets(), plain.mesh.nb_facets());
    assert_eq!(shrunk.mesh.nb_cells(), plain.mesh.nb_cells());
    let plain_area = total_area(&plain.mesh);
    let shrunk_area = total_area(&shrunk.mesh);
    assert!(
        shrunk_area < 0.3 * plain_area,
        "area {} not reduced from {}",
        shrunk_area,
        plain_area
    );
}

#[test]
fn test_exact_and_plain_predicates_agree_off_ties() {
    // Irrational-ish offsets keep every bisector away from lattice planes.
    let points = vec![1.1, -1.3, 2.7, 8.9, 2.1, 5.3, 12.4, -3.1, 1.9, 4.2, 3.3, 6.8];

    let exact = run(
        DOMAIN_MIN,
        DOMAIN_MAX,
        points.clone(),
        &PipelineConfig::default(),
    )
    .unwrap();

    let mut config = PipelineConfig::default();
    config.engine.exact_predicates = false;
    let plain = run(DOMAIN_MIN, DOMAIN_MAX, points, &config).unwrap();

    assert_eq!(exact.cell_volumes.len(), plain.cell_volumes.len());
    for (e, p) in exact.cell_volumes.iter().zip(&plain.cell_volumes) {
        assert!((e - p).abs() < 1e-6, "volumes diverged: {} vs {}", e, p);
    }
}

#[test]
fn test_disable_ids_drops_labels() {
    let mut config = PipelineConfig::default();
    config.extract.generate_ids = false;
    let output = run(DOMAIN_MIN, DOMAIN_MAX, grid_points(2), &config).unwrap();

    assert!(output.mesh.facet_cells.is_none());
    assert_eq!(output.mesh.nb_cells(), 0);
    assert!(output.mesh.nb_facets() > 0);
}
