//! Volume fill behind a closed-manifold gate.

use crate::config::TetrahedralizeConfig;
use crate::error::TetrahedralizeError;
use crate::surface_mesh::SurfaceMesh;
use crate::tet_mesh::TetMesh;

/// Axis insertion orders generating the six lattice tets of a cube. All six
/// share the cube's main diagonal, and every cube uses the same diagonal
/// direction, which keeps neighboring cubes face-to-face conforming.
const CUBE_PATHS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Fills the volume enclosed by a closed 2-manifold surface with a
/// conforming tetrahedral lattice.
///
/// The surface is validated first; any defect halts the pipeline rather
/// than producing a broken volume. The lattice spans the surface bounding
/// box with `config.subdivisions` cubes along the longest axis, each cube
/// split into six tets, and keeps the tets whose centroid lies inside the
/// surface. For box domains the lattice coincides with the box, so the fill
/// is exact; for other closed surfaces the boundary is approximated at
/// lattice resolution.
pub fn tetrahedralize(
    mesh: &SurfaceMesh,
    config: &TetrahedralizeConfig,
) -> Result<TetMesh, TetrahedralizeError> {
    if mesh.nb_facets() == 0 {
        return Err(TetrahedralizeError::EmptySurface);
    }
    let (border, over_shared) = mesh.manifold_report();
    if over_shared != 0 {
        return Err(TetrahedralizeError::NonManifold(over_shared));
    }
    if border != 0 {
        return Err(TetrahedralizeError::OpenSurface(border));
    }
    if !mesh.orientation_consistent() {
        return Err(TetrahedralizeError::InconsistentOrientation);
    }

    let Some(bbox) = mesh.bbox() else {
        return Err(TetrahedralizeError::EmptySurface);
    };
    let extents = bbox.extents();
    let max_extent = extents[0].max(extents[1]).max(extents[2]);
    if !(max_extent > 0.0) {
        return Err(TetrahedralizeError::EmptyVolume);
    }

    let n: [usize; 3] = std::array::from_fn(|axis| {
        ((config.subdivisions as f64 * extents[axis] / max_extent).round() as usize).max(1)
    });
    let h: [f64; 3] = std::array::from_fn(|axis| extents[axis] / n[axis] as f64);
    let min = [bbox.min_x, bbox.min_y, bbox.min_z];
    let grid_id = |c: [usize; 3]| (c[0] * (n[1] + 1) + c[1]) * (n[2] + 1) + c[2];
    let position = |c: [usize; 3]| -> [f64; 3] {
        [
            min[0] + c[0] as f64 * h[0],
            min[1] + c[1] as f64 * h[1],
            min[2] + c[2] as f64 * h[2],
        ]
    };

    let mut grid_tets: Vec<[usize; 4]> = Vec::new();
    for i in 0..n[0] {
        for j in 0..n[1] {
            for k in 0..n[2] {
                for path in &CUBE_PATHS {
                    let mut corner = [i, j, k];
                    let mut cell = [[0usize; 3]; 4];
                    cell[0] = corner;
                    for (s, &axis) in path.iter().enumerate() {
                        corner[axis] += 1;
                        cell[s + 1] = corner;
                    }
                    let mut centroid = [0.0; 3];
                    for c in cell {
                        let p = position(c);
                        centroid[0] += 0.25 * p[0];
                        centroid[1] += 0.25 * p[1];
                        centroid[2] += 0.25 * p[2];
                    }
                    if mesh.is_inside(centroid) {
                        grid_tets.push([
                            grid_id(cell[0]),
                            grid_id(cell[1]),
                            grid_id(cell[2]),
                            grid_id(cell[3]),
                        ]);
                    }
                }
            }
        }
    }
    if grid_tets.is_empty() {
        return Err(TetrahedralizeError::EmptyVolume);
    }

    // Compact the lattice ids down to the vertices the kept tets use.
    let grid_nb = (n[0] + 1) * (n[1] + 1) * (n[2] + 1);
    let mut dense = vec![usize::MAX; grid_nb];
    let mut vertices = Vec::new();
    let mut tets = Vec::with_capacity(grid_tets.len());
    for grid_tet in &grid_tets {
        let mut tet = [0usize; 4];
        for (slot, &g) in grid_tet.iter().enumerate() {
            if dense[g] == usize::MAX {
                dense[g] = vertices.len() / 3;
                let k = g % (n[2] + 1);
                let j = (g / (n[2] + 1)) % (n[1] + 1);
                let i = g / ((n[1] + 1) * (n[2] + 1));
                let p = position([i, j, k]);
                vertices.extend_from_slice(&p);
            }
            tet[slot] = dense[g];
        }
        tets.push(tet);
    }

    Ok(TetMesh::new(vertices, tets))
}
