//! Volumetric tetrahedral meshes in flat-array layout.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Face `k` of a tetrahedron is opposite vertex `k`, wound outward for a
/// positively oriented cell.
pub(crate) const TET_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];

/// Tetrahedra over a shared vertex buffer, with face adjacency computed at
/// construction. Every cell is stored with positive orientation; inverted
/// input cells are rewound.
#[derive(Clone, Debug)]
pub struct TetMesh {
    vertices: Vec<f64>,
    tets: Vec<[usize; 4]>,
    /// Per face: the adjacent tet index, or -1 on the volume boundary.
    neighbors: Vec<[i32; 4]>,
}

impl TetMesh {
    pub fn new(vertices: Vec<f64>, mut tets: Vec<[usize; 4]>) -> Self {
        for tet in &mut tets {
            if signed_volume(&vertices, tet) < 0.0 {
                tet.swap(2, 3);
            }
        }
        let mut neighbors = vec![[-1i32; 4]; tets.len()];
        let mut by_face: HashMap<[usize; 3], (usize, usize)> =
            HashMap::with_capacity(tets.len() * 2);
        for (t, tet) in tets.iter().enumerate() {
            for (k, face) in TET_FACES.iter().enumerate() {
                let mut key = [tet[face[0]], tet[face[1]], tet[face[2]]];
                key.sort_unstable();
                match by_face.entry(key) {
                    Entry::Occupied(e) => {
                        let (s, l) = *e.get();
                        neighbors[t][k] = s as i32;
                        neighbors[s][l] = t as i32;
                    }
                    Entry::Vacant(e) => {
                        e.insert((t, k));
                    }
                }
            }
        }
        Self {
            vertices,
            tets,
            neighbors,
        }
    }

    pub fn nb_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn nb_tets(&self) -> usize {
        self.tets.len()
    }

    pub fn vertex(&self, v: usize) -> [f64; 3] {
        [
            self.vertices[v * 3],
            self.vertices[v * 3 + 1],
            self.vertices[v * 3 + 2],
        ]
    }

    pub fn tet(&self, t: usize) -> [usize; 4] {
        self.tets[t]
    }

    /// The four corner positions of tet `t`.
    pub fn corners(&self, t: usize) -> [[f64; 3]; 4] {
        let tet = self.tets[t];
        [
            self.vertex(tet[0]),
            self.vertex(tet[1]),
            self.vertex(tet[2]),
            self.vertex(tet[3]),
        ]
    }

    pub fn neighbors(&self, t: usize) -> [i32; 4] {
        self.neighbors[t]
    }

    pub fn neighbor(&self, t: usize, k: usize) -> Option<usize> {
        let n = self.neighbors[t][k];
        if n < 0 { None } else { Some(n as usize) }
    }

    pub fn tet_volume(&self, t: usize) -> f64 {
        signed_volume(&self.vertices, &self.tets[t])
    }

    pub fn tet_centroid(&self, t: usize) -> [f64; 3] {
        let c = self.corners(t);
        [
            0.25 * (c[0][0] + c[1][0] + c[2][0] + c[3][0]),
            0.25 * (c[0][1] + c[1][1] + c[2][1] + c[3][1]),
            0.25 * (c[0][2] + c[1][2] + c[2][2] + c[3][2]),
        ]
    }

    pub fn total_volume(&self) -> f64 {
        (0..self.nb_tets()).map(|t| self.tet_volume(t)).sum()
    }

    pub(crate) fn face_vertices(&self, t: usize, k: usize) -> [usize; 3] {
        let tet = self.tets[t];
        let face = TET_FACES[k];
        [tet[face[0]], tet[face[1]], tet[face[2]]]
    }

    /// Outward-wound faces lying on the volume boundary.
    pub fn boundary_facets(&self) -> Vec<[usize; 3]> {
        let mut facets = Vec::new();
        for t in 0..self.nb_tets() {
            for k in 0..4 {
                if self.neighbors[t][k] < 0 {
                    facets.push(self.face_vertices(t, k));
                }
            }
        }
        facets
    }
}

fn signed_volume(vertices: &[f64], tet: &[usize; 4]) -> f64 {
    let p = |v: usize| [vertices[v * 3], vertices[v * 3 + 1], vertices[v * 3 + 2]];
    let a = p(tet[0]);
    let b = p(tet[1]);
    let c = p(tet[2]);
    let d = p(tet[3]);
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let w = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
    (u[0] * (v[1] * w[2] - v[2] * w[1]) - u[1] * (v[0] * w[2] - v[2] * w[0])
        + u[2] * (v[0] * w[1] - v[1] * w[0]))
        / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tets() -> TetMesh {
        // Two tets glued on the face (0, 2, 3).
        let vertices = vec![
            0.0, 0.0, 0.0, // 0
            1.0, 0.0, 0.0, // 1
            0.0, 1.0, 0.0, // 2
            0.0, 0.0, 1.0, // 3
            -1.0, 0.5, 0.5, // 4
        ];
        TetMesh::new(vertices, vec![[0, 1, 2, 3], [0, 2, 4, 3]])
    }

    #[test]
    fn test_adjacency_reciprocal() {
        let mesh = two_tets();
        assert_eq!(mesh.nb_tets(), 2);
        let n0 = mesh.neighbors(0);
        let n1 = mesh.neighbors(1);
        let shared0 = (0..4).find(|&k| n0[k] == 1).expect("tet 0 touches tet 1");
        let shared1 = (0..4).find(|&k| n1[k] == 0).expect("tet 1 touches tet 0");
        let mut f0 = mesh.face_vertices(0, shared0);
        let mut f1 = mesh.face_vertices(1, shared1);
        f0.sort_unstable();
        f1.sort_unstable();
        assert_eq!(f0, f1);
    }

    #[test]
    fn test_boundary_facets_exclude_shared_face() {
        let mesh = two_tets();
        assert_eq!(mesh.boundary_facets().len(), 6);
    }

    #[test]
    fn test_orientation_normalized() {
        let vertices = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
        ];
        // Inverted input tet.
        let mesh = TetMesh::new(vertices, vec![[0, 2, 1, 3]]);
        assert!(mesh.tet_volume(0) > 0.0);
        assert!((mesh.total_volume() - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_outward_faces() {
        let mesh = two_tets();
        // Each boundary face normal points away from its tet centroid.
        for t in 0..mesh.nb_tets() {
            let centroid = mesh.tet_centroid(t);
            for k in 0..4 {
                let [a, b, c] = mesh.face_vertices(t, k);
                let pa = mesh.vertex(a);
                let pb = mesh.vertex(b);
                let pc = mesh.vertex(c);
                let u = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
                let v = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
                let n = [
                    u[1] * v[2] - u[2] * v[1],
                    u[2] * v[0] - u[0] * v[2],
                    u[0] * v[1] - u[1] * v[0],
                ];
                let to_face = [pa[0] - centroid[0], pa[1] - centroid[1], pa[2] - centroid[2]];
                assert!(n[0] * to_face[0] + n[1] * to_face[1] + n[2] * to_face[2] > 0.0);
            }
        }
    }
}
