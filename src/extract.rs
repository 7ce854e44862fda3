//! Polyhedral cell extraction from the restricted Voronoi fragment stream.
//!
//! Fragments arrive grouped per generator. Interior tetrahedron walls are
//! dropped wherever the same cell continues on the other side, leaving each
//! cell bounded by bisector facets and domain boundary facets. Depending on
//! the configured simplification level the per-tetrahedron facet pieces are
//! then merged back into whole polygons: bisector pieces of one cell pair
//! are coplanar by construction and always merge, boundary pieces merge
//! when the dihedral angle between them stays under the configured
//! threshold. Output cells are written as vertex-disjoint shells in
//! ascending generator order, so the result is deterministic for a given
//! diagram.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::config::{ExtractConfig, FacetSimplification};
use crate::convex_cell::{BOUNDARY_TAG, wall_tet};
use crate::geometry;
use crate::rvd::{Fragment, RestrictedVoronoi};

/// Final polygonal mesh. Every cell is a self-contained shell with its own
/// vertices; `facet_cells` labels each facet with the generator index of
/// its cell when id generation is enabled.
#[derive(Clone, Debug)]
pub struct OutputMesh {
    pub vertices: Vec<f64>,
    pub facet_starts: Vec<usize>,
    pub facet_indices: Vec<usize>,
    pub facet_cells: Option<Vec<u32>>,
}

impl Default for OutputMesh {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OutputMesh {
    pub fn new(with_ids: bool) -> Self {
        Self {
            vertices: Vec::new(),
            facet_starts: vec![0],
            facet_indices: Vec::new(),
            facet_cells: with_ids.then(Vec::new),
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
            self.vertices[3 * v],
            self.vertices[3 * v + 1],
            self.vertices[3 * v + 2],
        ]
    }

    pub fn facet(&self, f: usize) -> &[usize] {
        &self.facet_indices[self.facet_starts[f]..self.facet_starts[f + 1]]
    }

    /// Generator label of facet `f`, when ids were generated.
    pub fn facet_cell(&self, f: usize) -> Option<u32> {
        self.facet_cells.as_ref().map(|cells| cells[f])
    }

    /// Number of distinct cell labels present, zero when ids are disabled.
    pub fn nb_cells(&self) -> usize {
        match &self.facet_cells {
            Some(cells) => {
                let mut sorted = cells.clone();
                sorted.sort_unstable();
                sorted.dedup();
                sorted.len()
            }
            None => 0,
        }
    }
}

/// Builds the output mesh from a computed diagram.
pub fn extract(rvd: &RestrictedVoronoi, config: &ExtractConfig) -> OutputMesh {
    let mut out = OutputMesh::new(config.generate_ids);
    let fragments = rvd.fragments();
    if fragments.is_empty() {
        log::info!("Extracted 0 cells");
        return out;
    }

    // Weld tolerance scales with the diagram extent. Matching vertices of
    // neighboring fragments differ only by rounding of independent clip
    // sequences, so a tiny relative tolerance is enough.
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for fragment in fragments {
        for v in 0..fragment.cell.nb_vertices() {
            let p = fragment.cell.vertex(v);
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }
    }
    let diag = ((hi[0] - lo[0]).powi(2) + (hi[1] - lo[1]).powi(2) + (hi[2] - lo[2]).powi(2)).sqrt();
    let weld_eps = diag * 1e-9;

    let mut nb_cells = 0;
    for run in fragments.chunk_by(|a, b| a.cell.generator() == b.cell.generator()) {
        extract_cell(rvd, run, config, weld_eps, &mut out);
        nb_cells += 1;
    }
    log::info!(
        "Extracted {} cells, {} facets, {} vertices",
        nb_cells,
        out.nb_facets(),
        out.nb_vertices()
    );
    out
}

fn extract_cell(
    rvd: &RestrictedVoronoi,
    run: &[Fragment],
    config: &ExtractConfig,
    weld_eps: f64,
    out: &mut OutputMesh,
) {
    let g = run[0].cell.generator();
    let (positions, mut faces) = match config.simplify {
        FacetSimplification::None => gather_raw(run),
        FacetSimplification::InternalWalls => gather_welded(rvd, run, weld_eps),
        FacetSimplification::CoplanarFacets => {
            let (positions, faces) = gather_welded(rvd, run, weld_eps);
            let faces = merge_cell_faces(faces, &positions, config.boundary_angle_threshold);
            (positions, faces)
        }
    };
    if config.tessellate_non_convex_facets {
        faces = tessellate_non_convex(&positions, faces);
    }
    let generator = rvd.generator_position(g);
    emit_shell(out, g, &positions, &faces, config.cells_shrink, generator);
}

/// All fragment faces verbatim, walls included. Fragments keep their own
/// vertex blocks.
fn gather_raw(run: &[Fragment]) -> (Vec<f64>, Vec<(i32, Vec<u32>)>) {
    let mut positions = Vec::new();
    let mut faces = Vec::new();
    for fragment in run {
        let offset = (positions.len() / 3) as u32;
        for v in 0..fragment.cell.nb_vertices() {
            positions.extend_from_slice(&fragment.cell.vertex(v));
        }
        for (tag, lp) in fragment.cell.faces() {
            faces.push((tag, lp.iter().map(|&v| offset + v as u32).collect()));
        }
    }
    (positions, faces)
}

/// Faces with interior walls resolved: a wall whose twin fragment exists is
/// internal to the cell and dropped, a wall without one closes the shell
/// and is kept as a boundary facet. Vertices are welded across the cell's
/// fragments.
fn gather_welded(
    rvd: &RestrictedVoronoi,
    run: &[Fragment],
    weld_eps: f64,
) -> (Vec<f64>, Vec<(i32, Vec<u32>)>) {
    let g = run[0].cell.generator();
    let mut welder = Welder::new(weld_eps);
    let mut faces = Vec::new();
    for fragment in run {
        let mut local: Vec<Option<u32>> = vec![None; fragment.cell.nb_vertices()];
        for (tag, lp) in fragment.cell.faces() {
            let tag = if tag <= -2 {
                if rvd.find_fragment(g, wall_tet(tag)).is_some() {
                    continue;
                }
                BOUNDARY_TAG
            } else {
                tag
            };
            let mut welded = Vec::with_capacity(lp.len());
            for &v in lp {
                let v = v as usize;
                let id = match local[v] {
                    Some(id) => id,
                    None => {
                        let id = welder.id(fragment.cell.vertex(v));
                        local[v] = Some(id);
                        id
                    }
                };
                if welded.last() != Some(&id) {
                    welded.push(id);
                }
            }
            while welded.len() > 1 && welded.first() == welded.last() {
                welded.pop();
            }
            if welded.len() >= 3 {
                faces.push((tag, welded));
            }
        }
    }
    (welder.positions, faces)
}

/// Merges facet pieces of one cell. Bisector pieces merge per opposing
/// generator; boundary pieces merge within dihedral-angle groups when the
/// threshold is positive. When a merge cannot produce closed loops the
/// original pieces are kept.
fn merge_cell_faces(
    faces: Vec<(i32, Vec<u32>)>,
    positions: &[f64],
    angle_threshold: f64,
) -> Vec<(i32, Vec<u32>)> {
    let mut boundary: Vec<Vec<u32>> = Vec::new();
    let mut by_tag: BTreeMap<i32, Vec<Vec<u32>>> = BTreeMap::new();
    for (tag, lp) in faces {
        if tag == BOUNDARY_TAG {
            boundary.push(lp);
        } else {
            by_tag.entry(tag).or_default().push(lp);
        }
    }

    let mut out = Vec::new();

    if angle_threshold > 0.0 && boundary.len() > 1 {
        for group in boundary_groups(&boundary, positions, angle_threshold) {
            if group.len() == 1 {
                out.push((BOUNDARY_TAG, boundary[group[0]].clone()));
                continue;
            }
            let loops: Vec<Vec<u32>> = group.iter().map(|&i| boundary[i].clone()).collect();
            match merge_group(&loops) {
                Some(merged) => {
                    for lp in merged {
                        out.push((BOUNDARY_TAG, lp));
                    }
                }
                None => {
                    for lp in loops {
                        out.push((BOUNDARY_TAG, lp));
                    }
                }
            }
        }
    } else {
        for lp in boundary {
            out.push((BOUNDARY_TAG, lp));
        }
    }

    for (tag, loops) in by_tag {
        if loops.len() == 1 {
            out.push((tag, loops.into_iter().next().unwrap_or_default()));
            continue;
        }
        match merge_group(&loops) {
            Some(merged) => {
                for lp in merged {
                    out.push((tag, lp));
                }
            }
            None => {
                for lp in loops {
                    out.push((tag, lp));
                }
            }
        }
    }
    out
}

/// Groups boundary facets by edge adjacency, joining two facets only when
/// their normals stay within the angle threshold (degrees). Groups are
/// returned in order of their first facet.
fn boundary_groups(loops: &[Vec<u32>], positions: &[f64], angle_threshold: f64) -> Vec<Vec<usize>> {
    let normals: Vec<[f64; 3]> = loops
        .iter()
        .map(|lp| {
            let pts: Vec<[f64; 3]> = lp.iter().map(|&v| vertex_at(positions, v)).collect();
            geometry::normalize(geometry::polygon_normal(&pts))
        })
        .collect();

    let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (i, lp) in loops.iter().enumerate() {
        let n = lp.len();
        for k in 0..n {
            let a = lp[k];
            let b = lp[(k + 1) % n];
            let key = (a.min(b), a.max(b));
            edge_faces.entry(key).or_default().push(i);
        }
    }

    let mut parent: Vec<usize> = (0..loops.len()).collect();
    for members in edge_faces.values() {
        for w in 1..members.len() {
            let a = members[0];
            let b = members[w];
            let angle = geometry::dot(normals[a], normals[b]).clamp(-1.0, 1.0).acos();
            if angle.to_degrees() <= angle_threshold {
                union(&mut parent, a, b);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..loops.len() {
        groups.entry(find(&mut parent, i)).or_default().push(i);
    }
    let mut out: Vec<Vec<usize>> = groups.into_values().collect();
    out.sort_by_key(|group| group[0]);
    out
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

/// Replaces a set of edge-connected facet pieces by their union: directed
/// edges shared by two pieces cancel, the survivors chain into boundary
/// loops. Returns `None` when the union has no boundary or a chain cannot
/// close, in which case the caller keeps the pieces.
fn merge_group(loops: &[Vec<u32>]) -> Option<Vec<Vec<u32>>> {
    let mut count: HashMap<(u32, u32), u32> = HashMap::new();
    for lp in loops {
        let n = lp.len();
        for i in 0..n {
            let a = lp[i];
            let b = lp[(i + 1) % n];
            if a == b {
                continue;
            }
            match count.entry((b, a)) {
                Entry::Occupied(mut e) => {
                    *e.get_mut() -= 1;
                    if *e.get() == 0 {
                        e.remove();
                    }
                }
                Entry::Vacant(_) => {
                    *count.entry((a, b)).or_insert(0) += 1;
                }
            }
        }
    }

    let mut edges: Vec<(u32, u32)> = Vec::new();
    for (&(a, b), &c) in &count {
        for _ in 0..c {
            edges.push((a, b));
        }
    }
    if edges.is_empty() {
        return None;
    }
    edges.sort_unstable();

    let mut used = vec![false; edges.len()];
    let mut result = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (first, mut current) = edges[start];
        let mut lp = vec![first];
        while current != first {
            lp.push(current);
            if lp.len() > edges.len() {
                return None;
            }
            let mut next = None;
            let mut i = edges.partition_point(|e| e.0 < current);
            while i < edges.len() && edges[i].0 == current {
                if !used[i] {
                    next = Some(i);
                    break;
                }
                i += 1;
            }
            let i = next?;
            used[i] = true;
            current = edges[i].1;
        }
        if lp.len() < 3 {
            return None;
        }
        result.push(lp);
    }
    Some(result)
}

fn tessellate_non_convex(positions: &[f64], faces: Vec<(i32, Vec<u32>)>) -> Vec<(i32, Vec<u32>)> {
    let mut out = Vec::with_capacity(faces.len());
    for (tag, lp) in faces {
        if lp.len() <= 3 {
            out.push((tag, lp));
            continue;
        }
        let pts: Vec<[f64; 3]> = lp.iter().map(|&v| vertex_at(positions, v)).collect();
        if geometry::is_convex_polygon(&pts) {
            out.push((tag, lp));
            continue;
        }
        for tri in geometry::triangulate_polygon(&pts) {
            out.push((tag, vec![lp[tri[0]], lp[tri[1]], lp[tri[2]]]));
        }
    }
    out
}

fn emit_shell(
    out: &mut OutputMesh,
    g: usize,
    positions: &[f64],
    faces: &[(i32, Vec<u32>)],
    shrink: f64,
    generator: [f64; 3],
) {
    let mut remap: HashMap<u32, usize> = HashMap::new();
    for (_, lp) in faces {
        for &v in lp {
            if let Entry::Vacant(e) = remap.entry(v) {
                let p = vertex_at(positions, v);
                let p = if shrink > 0.0 {
                    [
                        p[0] + shrink * (generator[0] - p[0]),
                        p[1] + shrink * (generator[1] - p[1]),
                        p[2] + shrink * (generator[2] - p[2]),
                    ]
                } else {
                    p
                };
                let id = out.vertices.len() / 3;
                out.vertices.extend_from_slice(&p);
                e.insert(id);
            }
        }
    }
    for (_, lp) in faces {
        for &v in lp {
            out.facet_indices.push(remap[&v]);
        }
        out.facet_starts.push(out.facet_indices.len());
        if let Some(cells) = &mut out.facet_cells {
            cells.push(g as u32);
        }
    }
}

fn vertex_at(positions: &[f64], v: u32) -> [f64; 3] {
    let i = v as usize * 3;
    [positions[i], positions[i + 1], positions[i + 2]]
}

/// Tolerance-based vertex welder over a hash grid. First occurrence wins;
/// candidates are probed in the 27 cells around the query point.
struct Welder {
    eps: f64,
    inv: f64,
    map: HashMap<(i64, i64, i64), Vec<u32>>,
    positions: Vec<f64>,
}

impl Welder {
    fn new(eps: f64) -> Self {
        Self {
            eps,
            inv: if eps > 0.0 { 1.0 / eps } else { 0.0 },
            map: HashMap::new(),
            positions: Vec::new(),
        }
    }

    fn id(&mut self, p: [f64; 3]) -> u32 {
        let kx = (p[0] * self.inv).floor() as i64;
        let ky = (p[1] * self.inv).floor() as i64;
        let kz = (p[2] * self.inv).floor() as i64;
        let eps_sq = self.eps * self.eps;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(bucket) = self.map.get(&(kx + dx, ky + dy, kz + dz)) {
                        for &c in bucket {
                            let q = vertex_at(&self.positions, c);
                            let d2 = (q[0] - p[0]).powi(2)
                                + (q[1] - p[1]).powi(2)
                                + (q[2] - p[2]).powi(2);
                            if d2 <= eps_sq {
                                return c;
                            }
                        }
                    }
                }
            }
        }
        let id = (self.positions.len() / 3) as u32;
        self.positions.extend_from_slice(&p);
        self.map.entry((kx, ky, kz)).or_default().push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, TetrahedralizeConfig};
    use crate::domain::build_box_mesh;
    use crate::tet_mesh::TetMesh;
    use crate::tetrahedralize::tetrahedralize;

    fn unit_box_tets(subdivisions: usize) -> TetMesh {
        let surface = build_box_mesh([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        tetrahedralize(&surface, &TetrahedralizeConfig { subdivisions }).unwrap()
    }

    fn rvd_for(tets: &TetMesh, generators: Vec<f64>) -> RestrictedVoronoi {
        RestrictedVoronoi::compute(
            tets,
            generators,
            &EngineConfig {
                exact_predicates: true,
            },
        )
    }

    fn det3(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }

    fn shell_volume(out: &OutputMesh, cell: Option<u32>) -> f64 {
        let mut volume = 0.0;
        for f in 0..out.nb_facets() {
            if let Some(c) = cell {
                if out.facet_cell(f) != Some(c) {
                    continue;
                }
            }
            let lp = out.facet(f);
            let a = out.vertex(lp[0]);
            for i in 1..lp.len() - 1 {
                volume += det3(a, out.vertex(lp[i]), out.vertex(lp[i + 1]));
            }
        }
        volume / 6.0
    }

    fn facet_points(out: &OutputMesh, f: usize) -> Vec<[f64; 3]> {
        out.facet(f).iter().map(|&v| out.vertex(v)).collect()
    }

    fn total_area(out: &OutputMesh) -> f64 {
        (0..out.nb_facets())
            .map(|f| geometry::polygon_area(&facet_points(out, f)))
            .sum()
    }

    #[test]
    fn test_single_cell_covers_box() {
        let tets = unit_box_tets(1);
        let rvd = rvd_for(&tets, vec![0.5, 0.5, 0.5]);
        let out = extract(&rvd, &ExtractConfig::default());
        assert_eq!(out.nb_cells(), 1);
        assert_eq!(out.nb_facets(), 12);
        assert!((shell_volume(&out, None) - 1.0).abs() < 1e-12);
        assert!((total_area(&out) - 6.0).abs() < 1e-12);
        assert!((0..out.nb_facets()).all(|f| out.facet_cell(f) == Some(0)));
    }

    #[test]
    fn test_bisector_facets_merge_into_one_polygon() {
        let tets = unit_box_tets(3);
        let rvd = rvd_for(&tets, vec![0.25, 0.5, 0.5, 0.75, 0.5, 0.5]);
        let out = extract(&rvd, &ExtractConfig::default());
        assert_eq!(out.nb_cells(), 2);
        assert!((shell_volume(&out, Some(0)) - 0.5).abs() < 1e-9);
        assert!((shell_volume(&out, Some(1)) - 0.5).abs() < 1e-9);

        // Cell 0 keeps exactly one facet on the bisector plane x = 0.5,
        // with the full interface area.
        let on_plane: Vec<usize> = (0..out.nb_facets())
            .filter(|&f| {
                out.facet_cell(f) == Some(0)
                    && facet_points(&out, f)
                        .iter()
                        .all(|p| (p[0] - 0.5).abs() < 1e-9)
            })
            .collect();
        assert_eq!(on_plane.len(), 1);
        let area = geometry::polygon_area(&facet_points(&out, on_plane[0]));
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_internal_walls_level_keeps_pieces_split() {
        let tets = unit_box_tets(3);
        let rvd = rvd_for(&tets, vec![0.25, 0.5, 0.5, 0.75, 0.5, 0.5]);
        let config = ExtractConfig {
            simplify: FacetSimplification::InternalWalls,
            ..ExtractConfig::default()
        };
        let out = extract(&rvd, &config);
        let on_plane = (0..out.nb_facets())
            .filter(|&f| {
                out.facet_cell(f) == Some(0)
                    && facet_points(&out, f)
                        .iter()
                        .all(|p| (p[0] - 0.5).abs() < 1e-9)
            })
            .count();
        assert!(on_plane > 1);
        assert!((shell_volume(&out, Some(0)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_none_level_keeps_walls() {
        let tets = unit_box_tets(1);
        let rvd = rvd_for(&tets, vec![0.5, 0.5, 0.5]);
        let config = ExtractConfig {
            simplify: FacetSimplification::None,
            ..ExtractConfig::default()
        };
        let out = extract(&rvd, &config);
        // Six tetrahedra, four faces each; opposite wall pairs cancel in
        // the signed volume so the shells still enclose the box.
        assert_eq!(out.nb_facets(), 24);
        assert!((shell_volume(&out, None) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_merge_with_angle() {
        let tets = unit_box_tets(2);
        let rvd = rvd_for(&tets, vec![0.5, 0.5, 0.5]);
        let config = ExtractConfig {
            boundary_angle_threshold: 1.0,
            ..ExtractConfig::default()
        };
        let out = extract(&rvd, &config);
        // Coplanar boundary pieces of each box side merge; the 90-degree
        // side-to-side crease stays.
        assert_eq!(out.nb_facets(), 6);
        for f in 0..out.nb_facets() {
            let area = geometry::polygon_area(&facet_points(&out, f));
            assert!((area - 1.0).abs() < 1e-9);
        }
        assert!((shell_volume(&out, None) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_boundary_union_falls_back_to_pieces() {
        let tets = unit_box_tets(1);
        let rvd = rvd_for(&tets, vec![0.5, 0.5, 0.5]);
        let config = ExtractConfig {
            boundary_angle_threshold: 100.0,
            ..ExtractConfig::default()
        };
        let out = extract(&rvd, &config);
        // All twelve boundary triangles join one group whose union is the
        // whole closed box surface; the merge has no boundary loops, so
        // the pieces are kept.
        assert_eq!(out.nb_facets(), 12);
        assert!((shell_volume(&out, None) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shrink_zero_is_noop_and_one_collapses() {
        let tets = unit_box_tets(1);
        let generators = vec![0.25, 0.5, 0.5, 0.75, 0.5, 0.5];

        let rvd = rvd_for(&tets, generators.clone());
        let plain = extract(&rvd, &ExtractConfig::default());
        let zero = extract(
            &rvd,
            &ExtractConfig {
                cells_shrink: 0.0,
                ..ExtractConfig::default()
            },
        );
        assert_eq!(plain.vertices, zero.vertices);

        let collapsed = extract(
            &rvd,
            &ExtractConfig {
                cells_shrink: 1.0,
                ..ExtractConfig::default()
            },
        );
        assert_eq!(collapsed.nb_facets(), plain.nb_facets());
        assert!(shell_volume(&collapsed, None).abs() < 1e-12);
        for f in 0..collapsed.nb_facets() {
            let pts = facet_points(&collapsed, f);
            for p in &pts {
                for k in 0..3 {
                    assert!((p[k] - pts[0][k]).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_ids_can_be_disabled() {
        let tets = unit_box_tets(1);
        let rvd = rvd_for(&tets, vec![0.5, 0.5, 0.5]);
        let config = ExtractConfig {
            generate_ids: false,
            ..ExtractConfig::default()
        };
        let out = extract(&rvd, &config);
        assert!(out.facet_cells.is_none());
        assert_eq!(out.nb_cells(), 0);
        assert_eq!(out.facet_cell(0), None);
    }

    #[test]
    fn test_merge_group_two_squares() {
        let loops = vec![vec![0u32, 1, 2, 3], vec![1, 4, 5, 2]];
        let merged = merge_group(&loops).unwrap();
        assert_eq!(merged, vec![vec![0, 1, 4, 5, 2, 3]]);
    }

    #[test]
    fn test_merge_group_closed_union_is_none() {
        // A tetrahedron's four faces: the union is closed.
        let loops = vec![
            vec![1u32, 2, 3],
            vec![0, 3, 2],
            vec![0, 1, 3],
            vec![0, 2, 1],
        ];
        assert!(merge_group(&loops).is_none());
    }

    #[test]
    fn test_tessellate_non_convex_splits_l_shape() {
        let positions = vec![
            0.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, //
            2.0, 1.0, 0.0, //
            1.0, 1.0, 0.0, //
            1.0, 2.0, 0.0, //
            0.0, 2.0, 0.0,
        ];
        let faces = vec![(BOUNDARY_TAG, vec![0u32, 1, 2, 3, 4, 5])];
        let split = tessellate_non_convex(&positions, faces);
        assert_eq!(split.len(), 4);
        assert!(split.iter().all(|(tag, lp)| *tag == BOUNDARY_TAG && lp.len() == 3));
        let area: f64 = split
            .iter()
            .map(|(_, lp)| {
                let pts: Vec<[f64; 3]> = lp.iter().map(|&v| vertex_at(&positions, v)).collect();
                geometry::polygon_area(&pts)
            })
            .sum();
        assert!((area - 3.0).abs() < 1e-12);
    }
}
