use std::collections::{HashMap, HashSet};

use crate::bounds::BoundingBox;

/// Ray directions tried in order for containment tests. Irrational-ish
/// components avoid grazing axis-aligned geometry; later entries are
/// fallbacks when a cast reports a degenerate hit.
const RAY_DIRECTIONS: [[f64; 3]; 3] = [
    [0.577_215_664_9, 0.618_033_988_7, 0.533_905_932_7],
    [-0.414_213_562_4, 0.732_050_807_6, 0.236_067_977_5],
    [0.302_775_637_7, -0.645_751_311_1, 0.701_562_118_7],
];

/// A polygon surface mesh in flat-array layout: vertex coordinates in one
/// `[x, y, z, ...]` buffer, facet loops in CSR form. Facets may have any
/// arity of three or more. Adjacency is derived on demand and never stored,
/// so topology edits cannot leave it stale.
#[derive(Clone, Debug)]
pub struct SurfaceMesh {
    vertices: Vec<f64>,
    facet_starts: Vec<usize>,
    facet_indices: Vec<usize>,
    /// Per-vertex anisotropy vectors, present after the anisotropy stage.
    anisotropy: Option<Vec<f64>>,
}

impl Default for SurfaceMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceMesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            facet_starts: vec![0],
            facet_indices: Vec::new(),
            anisotropy: None,
        }
    }

    pub fn nb_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn nb_facets(&self) -> usize {
        self.facet_starts.len() - 1
    }

    pub fn vertex(&self, v: usize) -> [f64; 3] {
        [
            self.vertices[v * 3],
            self.vertices[v * 3 + 1],
            self.vertices[v * 3 + 2],
        ]
    }

    pub fn vertices(&self) -> &[f64] {
        &self.vertices
    }

    pub fn set_vertex(&mut self, v: usize, p: [f64; 3]) {
        self.vertices[v * 3] = p[0];
        self.vertices[v * 3 + 1] = p[1];
        self.vertices[v * 3 + 2] = p[2];
    }

    pub fn add_vertex(&mut self, x: f64, y: f64, z: f64) -> usize {
        let id = self.nb_vertices();
        self.vertices.push(x);
        self.vertices.push(y);
        self.vertices.push(z);
        id
    }

    pub fn add_facet(&mut self, loop_vertices: &[usize]) -> usize {
        let id = self.nb_facets();
        self.facet_indices.extend_from_slice(loop_vertices);
        self.facet_starts.push(self.facet_indices.len());
        id
    }

    pub fn add_triangle(&mut self, a: usize, b: usize, c: usize) -> usize {
        self.add_facet(&[a, b, c])
    }

    pub fn add_quad(&mut self, a: usize, b: usize, c: usize, d: usize) -> usize {
        self.add_facet(&[a, b, c, d])
    }

    pub fn facet(&self, f: usize) -> &[usize] {
        &self.facet_indices[self.facet_starts[f]..self.facet_starts[f + 1]]
    }

    pub fn facets(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.nb_facets()).map(|f| self.facet(f))
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Newell's method: robust for non-planar polygon loops, magnitude is
    /// twice the projected area.
    pub fn facet_normal_raw(&self, f: usize) -> [f64; 3] {
        let loop_vertices = self.facet(f);
        let mut n = [0.0; 3];
        for i in 0..loop_vertices.len() {
            let a = self.vertex(loop_vertices[i]);
            let b = self.vertex(loop_vertices[(i + 1) % loop_vertices.len()]);
            n[0] += (a[1] - b[1]) * (a[2] + b[2]);
            n[1] += (a[2] - b[2]) * (a[0] + b[0]);
            n[2] += (a[0] - b[0]) * (a[1] + b[1]);
        }
        n
    }

    pub fn facet_normal(&self, f: usize) -> [f64; 3] {
        let n = self.facet_normal_raw(f);
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len == 0.0 {
            [0.0; 3]
        } else {
            [n[0] / len, n[1] / len, n[2] / len]
        }
    }

    pub fn facet_area(&self, f: usize) -> f64 {
        let n = self.facet_normal_raw(f);
        0.5 * (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt()
    }

    pub fn facet_centroid(&self, f: usize) -> [f64; 3] {
        let loop_vertices = self.facet(f);
        let mut c = [0.0; 3];
        for &v in loop_vertices {
            let p = self.vertex(v);
            c[0] += p[0];
            c[1] += p[1];
            c[2] += p[2];
        }
        let inv = 1.0 / loop_vertices.len() as f64;
        [c[0] * inv, c[1] * inv, c[2] * inv]
    }

    pub fn total_area(&self) -> f64 {
        (0..self.nb_facets()).map(|f| self.facet_area(f)).sum()
    }

    /// Signed volume of the tetrahedra fanned from the origin over this
    /// facet. Summed over a closed surface this gives the enclosed volume.
    pub fn facet_volume_contribution(&self, f: usize) -> f64 {
        let loop_vertices = self.facet(f);
        if loop_vertices.len() < 3 {
            return 0.0;
        }
        let v0 = self.vertex(loop_vertices[0]);
        let mut vol = 0.0;
        for i in 1..loop_vertices.len() - 1 {
            let v1 = self.vertex(loop_vertices[i]);
            let v2 = self.vertex(loop_vertices[i + 1]);
            vol += v0[0] * (v1[1] * v2[2] - v1[2] * v2[1])
                + v0[1] * (v1[2] * v2[0] - v1[0] * v2[2])
                + v0[2] * (v1[0] * v2[1] - v1[1] * v2[0]);
        }
        vol / 6.0
    }

    /// Signed volume enclosed by the surface, positive for outward-oriented
    /// closed meshes.
    pub fn signed_volume(&self) -> f64 {
        (0..self.nb_facets())
            .map(|f| self.facet_volume_contribution(f))
            .sum()
    }

    pub fn flip_facet(&mut self, f: usize) {
        self.facet_indices[self.facet_starts[f]..self.facet_starts[f + 1]].reverse();
    }

    /// Ear-clips every facet with more than three vertices into triangles,
    /// in place. Collinear loop vertices keep their place in the triangle
    /// edges, so shared-edge conformity with neighbors survives.
    pub fn triangulate(&mut self) {
        if self.facet_starts.windows(2).all(|w| w[1] - w[0] == 3) {
            return;
        }
        let mut starts = vec![0];
        let mut indices = Vec::with_capacity(self.facet_indices.len());
        for f in 0..self.nb_facets() {
            let loop_vertices = self.facet(f);
            if loop_vertices.len() < 3 {
                continue;
            }
            let points: Vec<[f64; 3]> =
                loop_vertices.iter().map(|&v| self.vertex(v)).collect();
            for t in crate::geometry::triangulate_polygon(&points) {
                indices.push(loop_vertices[t[0]]);
                indices.push(loop_vertices[t[1]]);
                indices.push(loop_vertices[t[2]]);
                starts.push(indices.len());
            }
        }
        self.facet_starts = starts;
        self.facet_indices = indices;
    }

    pub(crate) fn set_topology(&mut self, starts: Vec<usize>, indices: Vec<usize>) {
        debug_assert_eq!(starts.first(), Some(&0));
        debug_assert_eq!(starts.last(), Some(&indices.len()));
        self.facet_starts = starts;
        self.facet_indices = indices;
    }

    /// Map from sorted edge key to the facets bordering it.
    pub fn edge_facets(&self) -> HashMap<(usize, usize), Vec<usize>> {
        let mut map: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for f in 0..self.nb_facets() {
            let loop_vertices = self.facet(f);
            for i in 0..loop_vertices.len() {
                let a = loop_vertices[i];
                let b = loop_vertices[(i + 1) % loop_vertices.len()];
                map.entry(edge_key(a, b)).or_default().push(f);
            }
        }
        map
    }

    /// (border edges, edges shared by more than two facets).
    pub fn manifold_report(&self) -> (usize, usize) {
        let mut border = 0;
        let mut over_shared = 0;
        for facets in self.edge_facets().values() {
            match facets.len() {
                1 => border += 1,
                2 => {}
                _ => over_shared += 1,
            }
        }
        (border, over_shared)
    }

    pub fn is_closed(&self) -> bool {
        let (border, over_shared) = self.manifold_report();
        border == 0 && over_shared == 0
    }

    /// Every interior edge must be traversed once in each direction by its
    /// two facets.
    pub fn orientation_consistent(&self) -> bool {
        let mut directed: HashMap<(usize, usize), usize> = HashMap::new();
        for f in 0..self.nb_facets() {
            let loop_vertices = self.facet(f);
            for i in 0..loop_vertices.len() {
                let a = loop_vertices[i];
                let b = loop_vertices[(i + 1) % loop_vertices.len()];
                *directed.entry((a, b)).or_insert(0) += 1;
            }
        }
        directed.iter().all(|(&(a, b), &n)| {
            n == 1 && directed.get(&(b, a)).copied().unwrap_or(0) <= 1
        })
    }

    /// Ordered border loops, following the facet traversal direction.
    pub fn boundary_loops(&self) -> Vec<Vec<usize>> {
        let edge_map = self.edge_facets();
        // Directed border edges a -> b as their single facet traverses them.
        let mut next: HashMap<usize, usize> = HashMap::new();
        for f in 0..self.nb_facets() {
            let loop_vertices = self.facet(f);
            for i in 0..loop_vertices.len() {
                let a = loop_vertices[i];
                let b = loop_vertices[(i + 1) % loop_vertices.len()];
                if edge_map[&edge_key(a, b)].len() == 1 {
                    next.insert(a, b);
                }
            }
        }

        let mut loops = Vec::new();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut starts: Vec<usize> = next.keys().copied().collect();
        starts.sort_unstable();
        for start in starts {
            if visited.contains(&start) {
                continue;
            }
            let mut loop_vertices = vec![start];
            visited.insert(start);
            let mut current = next[&start];
            while current != start {
                loop_vertices.push(current);
                visited.insert(current);
                match next.get(&current) {
                    Some(&n) => current = n,
                    None => break,
                }
                if loop_vertices.len() > next.len() {
                    break;
                }
            }
            loops.push(loop_vertices);
        }
        loops
    }

    /// Facet groups connected through shared edges.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let nb = self.nb_facets();
        let edge_map = self.edge_facets();
        let mut component = vec![usize::MAX; nb];
        let mut components = Vec::new();
        let mut stack = Vec::new();

        for seed in 0..nb {
            if component[seed] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = Vec::new();
            component[seed] = id;
            stack.push(seed);
            while let Some(f) = stack.pop() {
                members.push(f);
                let loop_vertices = self.facet(f);
                for i in 0..loop_vertices.len() {
                    let a = loop_vertices[i];
                    let b = loop_vertices[(i + 1) % loop_vertices.len()];
                    for &g in &edge_map[&edge_key(a, b)] {
                        if component[g] == usize::MAX {
                            component[g] = id;
                            stack.push(g);
                        }
                    }
                }
            }
            components.push(members);
        }
        components
    }

    /// Keep only facets where `keep[f]` holds. Vertices are untouched; run
    /// [`SurfaceMesh::remove_unreferenced_vertices`] afterwards if needed.
    pub fn remove_facets(&mut self, keep: &[bool]) -> usize {
        let mut starts = vec![0];
        let mut indices = Vec::with_capacity(self.facet_indices.len());
        let mut removed = 0;
        for f in 0..self.nb_facets() {
            if keep[f] {
                indices.extend_from_slice(self.facet(f));
                starts.push(indices.len());
            } else {
                removed += 1;
            }
        }
        self.facet_starts = starts;
        self.facet_indices = indices;
        removed
    }

    /// Rewrite facet loops through `map`, collapsing consecutive duplicates
    /// and dropping loops left with fewer than three distinct vertices.
    pub fn remap_vertices(&mut self, map: &[usize]) {
        let mut starts = vec![0];
        let mut indices = Vec::with_capacity(self.facet_indices.len());
        let mut buffer = Vec::new();
        for f in 0..self.nb_facets() {
            buffer.clear();
            for &v in self.facet(f) {
                let m = map[v];
                if buffer.last() != Some(&m) {
                    buffer.push(m);
                }
            }
            while buffer.len() > 1 && buffer.first() == buffer.last() {
                buffer.pop();
            }
            let mut distinct = buffer.clone();
            distinct.sort_unstable();
            distinct.dedup();
            if distinct.len() >= 3 {
                indices.extend_from_slice(&buffer);
                starts.push(indices.len());
            }
        }
        self.facet_starts = starts;
        self.facet_indices = indices;
    }

    /// Drop vertices no facet references, compacting the index space.
    /// Returns the number removed.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        let nb = self.nb_vertices();
        let mut referenced = vec![false; nb];
        for &v in &self.facet_indices {
            referenced[v] = true;
        }
        let mut map = vec![usize::MAX; nb];
        let mut vertices = Vec::with_capacity(self.vertices.len());
        let mut anisotropy = self.anisotropy.as_ref().map(|_| Vec::new());
        let mut kept = 0;
        for v in 0..nb {
            if referenced[v] {
                map[v] = kept;
                kept += 1;
                vertices.extend_from_slice(&self.vertices[v * 3..v * 3 + 3]);
                if let (Some(out), Some(a)) = (&mut anisotropy, &self.anisotropy) {
                    out.extend_from_slice(&a[v * 3..v * 3 + 3]);
                }
            }
        }
        for v in &mut self.facet_indices {
            *v = map[*v];
        }
        self.vertices = vertices;
        self.anisotropy = anisotropy;
        nb - kept
    }

    /// Area-weighted vertex normals, normalized.
    pub fn vertex_normals(&self) -> Vec<f64> {
        let mut normals = vec![0.0; self.vertices.len()];
        for f in 0..self.nb_facets() {
            let n = self.facet_normal_raw(f);
            for &v in self.facet(f) {
                normals[v * 3] += n[0];
                normals[v * 3 + 1] += n[1];
                normals[v * 3 + 2] += n[2];
            }
        }
        for v in 0..self.nb_vertices() {
            let n = &mut normals[v * 3..v * 3 + 3];
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if len > 0.0 {
                n[0] /= len;
                n[1] /= len;
                n[2] /= len;
            }
        }
        normals
    }

    pub fn set_anisotropy(&mut self, vectors: Vec<f64>) {
        debug_assert_eq!(vectors.len(), self.vertices.len());
        self.anisotropy = Some(vectors);
    }

    pub fn anisotropy(&self) -> Option<&[f64]> {
        self.anisotropy.as_deref()
    }

    /// Containment against the surface: true when at least one
    /// outward-oriented shell encloses the point.
    pub fn is_inside(&self, point: [f64; 3]) -> bool {
        self.winding_number(point) > 0
    }

    /// Number of outward-oriented shells enclosing `point`, from signed ray
    /// crossings. Retries alternate directions when a cast grazes an edge;
    /// a point that defeats every direction counts as outside.
    pub fn winding_number(&self, point: [f64; 3]) -> i64 {
        for dir in &RAY_DIRECTIONS {
            if let Some(w) = self.ray_winding(point, *dir) {
                return w;
            }
        }
        0
    }

    /// Signed crossing count along one ray, or `None` when any hit is too
    /// close to a triangle edge to trust.
    fn ray_winding(&self, origin: [f64; 3], dir: [f64; 3]) -> Option<i64> {
        let mut winding = 0;
        for f in 0..self.nb_facets() {
            let loop_vertices = self.facet(f);
            if loop_vertices.len() < 3 {
                continue;
            }
            let v0 = self.vertex(loop_vertices[0]);
            for i in 1..loop_vertices.len() - 1 {
                let v1 = self.vertex(loop_vertices[i]);
                let v2 = self.vertex(loop_vertices[i + 1]);
                match ray_triangle(origin, dir, v0, v1, v2) {
                    RayHit::Miss => {}
                    RayHit::Hit(sign) => winding += sign,
                    RayHit::Grazing => return None,
                }
            }
        }
        Some(winding)
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

enum RayHit {
    Miss,
    /// The crossing sign: +1 where the facet normal points with the ray.
    Hit(i64),
    Grazing,
}

/// Moeller-Trumbore with a conservative band around edges and the ray
/// origin plane; hits inside the band are reported as grazing so the caller
/// can retry with another direction.
fn ray_triangle(origin: [f64; 3], dir: [f64; 3], a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> RayHit {
    const EPS: f64 = 1e-12;
    let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let p = [
        dir[1] * e2[2] - dir[2] * e2[1],
        dir[2] * e2[0] - dir[0] * e2[2],
        dir[0] * e2[1] - dir[1] * e2[0],
    ];
    let det = e1[0] * p[0] + e1[1] * p[1] + e1[2] * p[2];
    if det.abs() < EPS {
        return RayHit::Miss;
    }
    let inv_det = 1.0 / det;
    let t_vec = [origin[0] - a[0], origin[1] - a[1], origin[2] - a[2]];
    let u = (t_vec[0] * p[0] + t_vec[1] * p[1] + t_vec[2] * p[2]) * inv_det;
    let q = [
        t_vec[1] * e1[2] - t_vec[2] * e1[1],
        t_vec[2] * e1[0] - t_vec[0] * e1[2],
        t_vec[0] * e1[1] - t_vec[1] * e1[0],
    ];
    let v = (dir[0] * q[0] + dir[1] * q[1] + dir[2] * q[2]) * inv_det;
    let t = (e2[0] * q[0] + e2[1] * q[1] + e2[2] * q[2]) * inv_det;

    const BAND: f64 = 1e-9;
    if u < -BAND || v < -BAND || u + v > 1.0 + BAND || t < -BAND {
        return RayHit::Miss;
    }
    if u < BAND || v < BAND || u + v > 1.0 - BAND || t < BAND {
        return RayHit::Grazing;
    }
    RayHit::Hit(if det > 0.0 { 1 } else { -1 })
}
