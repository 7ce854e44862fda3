//! Construction of the tessellation domain surface.

use crate::surface_mesh::SurfaceMesh;

/// Builds the closed quad surface of an axis-aligned box.
///
/// Corners are emitted in lexicographic (x, y, z) order over
/// (min, max) choices, and the six quads wind so that every normal
/// points out of the box. Degenerate extents are not rejected here;
/// the volume gate downstream reports them.
pub fn build_box_mesh(min: [f64; 3], max: [f64; 3]) -> SurfaceMesh {
    let mut mesh = SurfaceMesh::new();
    for &x in &[min[0], max[0]] {
        for &y in &[min[1], max[1]] {
            for &z in &[min[2], max[2]] {
                mesh.add_vertex(x, y, z);
            }
        }
    }
    mesh.add_quad(7, 6, 2, 3);
    mesh.add_quad(1, 3, 2, 0);
    mesh.add_quad(5, 7, 3, 1);
    mesh.add_quad(4, 6, 7, 5);
    mesh.add_quad(4, 5, 1, 0);
    mesh.add_quad(6, 4, 0, 2);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_is_closed_and_outward() {
        let mesh = build_box_mesh([-5.0, -4.0, 0.0], [15.0, 4.0, 8.0]);
        assert_eq!(mesh.nb_vertices(), 8);
        assert_eq!(mesh.nb_facets(), 6);
        for f in 0..6 {
            assert_eq!(mesh.facet(f).len(), 4);
        }
        assert!(mesh.is_closed());
        assert!(mesh.orientation_consistent());
        assert!((mesh.signed_volume() - 1280.0).abs() < 1e-9);
    }

    #[test]
    fn test_box_face_normals_axis_aligned() {
        let mesh = build_box_mesh([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]);
        let mut axis_hits = [0usize; 6];
        for f in 0..6 {
            let n = mesh.facet_normal(f);
            for axis in 0..3 {
                if (n[axis] - 1.0).abs() < 1e-12 {
                    axis_hits[axis * 2] += 1;
                }
                if (n[axis] + 1.0).abs() < 1e-12 {
                    axis_hits[axis * 2 + 1] += 1;
                }
            }
        }
        assert_eq!(axis_hits, [1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_inverted_extents_have_negative_volume() {
        let mesh = build_box_mesh([1.0, 0.0, 0.0], [0.0, 1.0, 1.0]);
        assert!(mesh.signed_volume() < 0.0);
    }
}
