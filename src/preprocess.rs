//! Surface cleanup ahead of tetrahedralization.

use std::collections::{HashMap, HashSet};

use crate::config::PreprocessConfig;
use crate::error::PreprocessError;
use crate::geometry::{cross, dot, length, normalize, polygon_area, sub, triangulate_polygon};
use crate::surface_mesh::SurfaceMesh;

/// Per-stage counters. Zero everywhere means the mesh was already clean.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreprocessReport {
    /// Vertices merged into a nearby representative by the repair passes.
    pub welded_vertices: usize,
    /// Vertices merged by vertex-cluster decimation.
    pub clustered_vertices: usize,
    /// Facets split while resolving self-intersections.
    pub split_facets: usize,
    /// Facets dropped as internal shells.
    pub removed_shell_facets: usize,
    /// Facets dropped with their small connected component.
    pub removed_component_facets: usize,
    /// Border loops closed by hole filling.
    pub filled_holes: usize,
    /// Facets below the zero-area floor.
    pub removed_zero_area_facets: usize,
    /// Border vertices displaced by the margin expansion.
    pub expanded_border_vertices: usize,
}

/// Runs the cleanup stages over `mesh` in a fixed order:
///
/// 1. vertex-cluster decimation, or self-intersection resolution (with
///    optional internal-shell removal), or plain repair, whichever the
///    configuration selects;
/// 2. small-component removal, re-repairing when anything was dropped;
/// 3. hole filling (before intersection resolution when that path is
///    active, after component removal otherwise);
/// 4. anisotropy attribute computation (independent of `enabled`);
/// 5. zero-area facet cleanup (independent of `enabled`);
/// 6. border expansion.
///
/// Fraction-valued tolerances resolve against the bounding-box diagonal and
/// total surface area measured on entry. An empty result is a warning, not
/// an error; downstream validation reports it properly.
pub fn preprocess(
    mesh: &mut SurfaceMesh,
    config: &PreprocessConfig,
) -> Result<PreprocessReport, PreprocessError> {
    let mut report = PreprocessReport::default();
    let diagonal = mesh.bbox().map(|b| b.diagonal()).unwrap_or(0.0);

    if config.enabled {
        let area = mesh.total_area();
        let epsilon = config.epsilon * diagonal;
        let max_hole_area = config.max_hole_area * area;
        let fill = max_hole_area != 0.0 && config.max_hole_edges != 0;

        if config.vcluster_bins != 0 {
            report.clustered_vertices = cluster_vertices(mesh, config.vcluster_bins);
        } else if config.intersect {
            report.welded_vertices += repair(mesh, epsilon);
            if fill {
                report.filled_holes += fill_holes(mesh, max_hole_area, config.max_hole_edges);
            }
            report.split_facets = resolve_intersections(mesh)?;
            if config.remove_internal_shells {
                report.removed_shell_facets = remove_internal_shells(mesh);
            }
            report.welded_vertices += repair(mesh, epsilon);
        } else if config.repair {
            report.welded_vertices += repair(mesh, epsilon);
        }

        if config.min_comp_area != 0.0 {
            let removed = remove_small_components(mesh, config.min_comp_area * area);
            report.removed_component_facets = removed;
            if removed != 0 {
                // Component removal can change the bounds, so the merge
                // tolerance re-resolves against the current diagonal.
                let diagonal = mesh.bbox().map(|b| b.diagonal()).unwrap_or(0.0);
                report.welded_vertices += repair(mesh, config.epsilon * diagonal);
            }
        }

        if !config.intersect && fill {
            report.filled_holes += fill_holes(mesh, max_hole_area, config.max_hole_edges);
        }
    }

    let anisotropy = 0.02 * config.anisotropy;
    if anisotropy != 0.0 {
        apply_anisotropy(mesh, anisotropy, config.normal_smooth_iterations);
    }

    if config.zero_area_cleanup {
        let removed = remove_zero_area_facets(mesh);
        report.removed_zero_area_facets = removed;
        if removed == 0 {
            log::info!("Mesh does not have 0-area facets (good)");
        } else {
            log::info!("Removed {removed} 0-area facets");
        }
    }

    if config.enabled && config.margin != 0.0 {
        report.expanded_border_vertices = expand_border(mesh, config.margin * diagonal);
    }

    if mesh.nb_facets() == 0 {
        log::warn!("After pre-processing, got an empty mesh");
    }

    Ok(report)
}

/// Weld near-duplicate vertices, drop duplicated and degenerate facets,
/// make orientations consistent, and compact the vertex space. Returns the
/// number of vertices welded away.
fn repair(mesh: &mut SurfaceMesh, epsilon: f64) -> usize {
    let welded = weld_vertices(mesh, epsilon);
    remove_duplicate_facets(mesh);
    fix_orientation(mesh);
    mesh.remove_unreferenced_vertices();
    welded
}

/// First-come representative welding through a uniform hash grid. Always
/// remaps facet loops, which also collapses loops degenerated by merging.
fn weld_vertices(mesh: &mut SurfaceMesh, epsilon: f64) -> usize {
    let nb = mesh.nb_vertices();
    if nb == 0 {
        return 0;
    }
    let mut map = vec![usize::MAX; nb];
    if epsilon <= 0.0 {
        let mut seen: HashMap<[u64; 3], usize> = HashMap::new();
        for v in 0..nb {
            let p = mesh.vertex(v);
            let key = [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()];
            map[v] = *seen.entry(key).or_insert(v);
        }
    } else {
        let eps_sq = epsilon * epsilon;
        let mut grid: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
        for v in 0..nb {
            let p = mesh.vertex(v);
            let key = [
                (p[0] / epsilon).floor() as i64,
                (p[1] / epsilon).floor() as i64,
                (p[2] / epsilon).floor() as i64,
            ];
            let mut found = usize::MAX;
            'probe: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(bucket) = grid.get(&[key[0] + dx, key[1] + dy, key[2] + dz])
                        else {
                            continue;
                        };
                        for &u in bucket {
                            let q = mesh.vertex(u);
                            let d = sub(q, p);
                            if dot(d, d) <= eps_sq {
                                found = u;
                                break 'probe;
                            }
                        }
                    }
                }
            }
            if found == usize::MAX {
                grid.entry(key).or_default().push(v);
                map[v] = v;
            } else {
                map[v] = found;
            }
        }
    }
    let welded = map.iter().enumerate().filter(|&(v, &m)| m != v).count();
    mesh.remap_vertices(&map);
    welded
}

fn remove_duplicate_facets(mesh: &mut SurfaceMesh) -> usize {
    let nb = mesh.nb_facets();
    let mut seen: HashSet<Vec<usize>> = HashSet::with_capacity(nb);
    let mut keep = vec![true; nb];
    for f in 0..nb {
        let mut key = mesh.facet(f).to_vec();
        key.sort_unstable();
        if !seen.insert(key) {
            keep[f] = false;
        }
    }
    mesh.remove_facets(&keep)
}

fn traverses(mesh: &SurfaceMesh, f: usize, a: usize, b: usize) -> bool {
    let l = mesh.facet(f);
    (0..l.len()).any(|i| l[i] == a && l[(i + 1) % l.len()] == b)
}

/// Flood-fills orientation over shared edges, flipping facets that traverse
/// a shared edge the same way as an already-oriented neighbor. Closed
/// components are then flipped wholesale if their signed volume is
/// negative, so normals end up outward.
fn fix_orientation(mesh: &mut SurfaceMesh) {
    let nb = mesh.nb_facets();
    if nb == 0 {
        return;
    }
    let edge_map = mesh.edge_facets();
    let mut visited = vec![false; nb];
    let mut stack = Vec::new();
    let mut component = Vec::new();
    for seed in 0..nb {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        stack.push(seed);
        component.clear();
        let mut open = false;
        while let Some(f) = stack.pop() {
            component.push(f);
            let loop_f = mesh.facet(f).to_vec();
            for i in 0..loop_f.len() {
                let a = loop_f[i];
                let b = loop_f[(i + 1) % loop_f.len()];
                let shared = &edge_map[&edge_key(a, b)];
                if shared.len() == 1 {
                    open = true;
                }
                if shared.len() != 2 {
                    continue;
                }
                let g = if shared[0] == f { shared[1] } else { shared[0] };
                if visited[g] {
                    continue;
                }
                if traverses(mesh, g, a, b) {
                    mesh.flip_facet(g);
                }
                visited[g] = true;
                stack.push(g);
            }
        }
        if !open {
            let volume: f64 = component
                .iter()
                .map(|&f| mesh.facet_volume_contribution(f))
                .sum();
            if volume < 0.0 {
                for &f in &component {
                    mesh.flip_facet(f);
                }
            }
        }
    }
}

/// Snaps vertices to a uniform grid sized off the longest bounding-box
/// axis, replacing each occupied bin by the average of its members.
fn cluster_vertices(mesh: &mut SurfaceMesh, nb_bins: usize) -> usize {
    let Some(bbox) = mesh.bbox() else {
        return 0;
    };
    let extents = bbox.extents();
    let max_extent = extents[0].max(extents[1]).max(extents[2]);
    if max_extent <= 0.0 {
        return 0;
    }
    let cell = max_extent / nb_bins as f64;
    let last_bin = nb_bins as i64 - 1;
    let bin = |x: f64, min: f64| (((x - min) / cell).floor() as i64).clamp(0, last_bin);
    let nb = mesh.nb_vertices();
    let mut bins: HashMap<[i64; 3], usize> = HashMap::new();
    let mut sums: HashMap<usize, ([f64; 3], usize)> = HashMap::new();
    let mut map = vec![usize::MAX; nb];
    for v in 0..nb {
        let p = mesh.vertex(v);
        let key = [
            bin(p[0], bbox.min_x),
            bin(p[1], bbox.min_y),
            bin(p[2], bbox.min_z),
        ];
        let rep = *bins.entry(key).or_insert(v);
        map[v] = rep;
        let entry = sums.entry(rep).or_insert(([0.0; 3], 0));
        entry.0[0] += p[0];
        entry.0[1] += p[1];
        entry.0[2] += p[2];
        entry.1 += 1;
    }
    for (&rep, &(s, count)) in &sums {
        let inv = 1.0 / count as f64;
        mesh.set_vertex(rep, [s[0] * inv, s[1] * inv, s[2] * inv]);
    }
    let merged = map.iter().enumerate().filter(|&(v, &m)| m != v).count();
    mesh.remap_vertices(&map);
    remove_duplicate_facets(mesh);
    fix_orientation(mesh);
    mesh.remove_unreferenced_vertices();
    merged
}

fn facet_plane(mesh: &SurfaceMesh, f: usize) -> ([f64; 3], f64) {
    let l = mesh.facet(f);
    let a = mesh.vertex(l[0]);
    let b = mesh.vertex(l[1]);
    let c = mesh.vertex(l[2]);
    let n = cross(sub(b, a), sub(c, a));
    (n, dot(n, a))
}

/// Cuts crossed triangles by each other's supporting planes, round by
/// round, until no transversal facet intersection remains. Cut points are
/// welded exactly and inserted into neighboring facet edges so the mesh
/// stays conformal. Coplanar overlaps are out of reach of plane cutting;
/// whatever remains after the round cap is reported as unresolved.
fn resolve_intersections(mesh: &mut SurfaceMesh) -> Result<usize, PreprocessError> {
    const MAX_ROUNDS: usize = 16;
    let diagonal = mesh.bbox().map(|b| b.diagonal()).unwrap_or(0.0);
    let tol = 1e-9 * diagonal;
    let mut splits = 0;
    for _ in 0..MAX_ROUNDS {
        mesh.triangulate();
        let pairs = intersecting_pairs(mesh, tol);
        if pairs.is_empty() {
            break;
        }
        let first_new_vertex = mesh.nb_vertices();
        let nb = mesh.nb_facets();
        let mut keep = vec![true; nb];
        let mut pieces: Vec<[usize; 3]> = Vec::new();
        for &(f, g) in &pairs {
            // Both facets must still carry the geometry the pair was
            // detected on; split survivors wait for the next round.
            if !keep[f] || !keep[g] {
                continue;
            }
            let plane_g = facet_plane(mesh, g);
            let plane_f = facet_plane(mesh, f);
            if let Some(tris) = split_triangle_by_plane(mesh, f, plane_g, tol) {
                keep[f] = false;
                pieces.extend(tris);
                splits += 1;
            }
            if let Some(tris) = split_triangle_by_plane(mesh, g, plane_f, tol) {
                keep[g] = false;
                pieces.extend(tris);
                splits += 1;
            }
        }
        if pieces.is_empty() {
            break;
        }
        mesh.remove_facets(&keep);
        for t in &pieces {
            mesh.add_triangle(t[0], t[1], t[2]);
        }
        let candidates: Vec<usize> = (first_new_vertex..mesh.nb_vertices()).collect();
        insert_vertices_on_edges(mesh, &candidates, tol);
        weld_vertices(mesh, 0.0);
    }
    mesh.triangulate();
    let remaining = intersecting_pairs(mesh, tol).len();
    if remaining != 0 {
        return Err(PreprocessError::UnresolvedIntersections { remaining });
    }
    Ok(splits)
}

/// Sweep over facet bounding boxes on x, then full AABB, shared-vertex and
/// transversal triangle tests.
fn intersecting_pairs(mesh: &SurfaceMesh, tol: f64) -> Vec<(usize, usize)> {
    let nb = mesh.nb_facets();
    let mut boxes = Vec::with_capacity(nb);
    for f in 0..nb {
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for &v in mesh.facet(f) {
            let p = mesh.vertex(v);
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
        }
        boxes.push((lo, hi));
    }
    let mut order: Vec<usize> = (0..nb).collect();
    order.sort_by(|&a, &b| boxes[a].0[0].total_cmp(&boxes[b].0[0]));

    let mut pairs = Vec::new();
    for i in 0..nb {
        let f = order[i];
        for &g in &order[i + 1..] {
            if boxes[g].0[0] > boxes[f].1[0] + tol {
                break;
            }
            let overlap = (1..3).all(|axis| {
                boxes[f].0[axis] <= boxes[g].1[axis] + tol
                    && boxes[g].0[axis] <= boxes[f].1[axis] + tol
            });
            if !overlap || shares_vertex(mesh, f, g) {
                continue;
            }
            if tri_tri_transversal(mesh, f, g, tol) {
                pairs.push((f.min(g), f.max(g)));
            }
        }
    }
    pairs
}

fn shares_vertex(mesh: &SurfaceMesh, f: usize, g: usize) -> bool {
    mesh.facet(f)
        .iter()
        .any(|v| mesh.facet(g).contains(v))
}

/// Interval of one triangle's plane cut, projected on `axis`.
fn plane_interval(proj: [f64; 3], dist: [f64; 3]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut any = false;
    for i in 0..3 {
        if dist[i] == 0.0 {
            lo = lo.min(proj[i]);
            hi = hi.max(proj[i]);
            any = true;
        }
        let j = (i + 1) % 3;
        if dist[i] * dist[j] < 0.0 {
            let t = dist[i] / (dist[i] - dist[j]);
            let x = proj[i] + t * (proj[j] - proj[i]);
            lo = lo.min(x);
            hi = hi.max(x);
            any = true;
        }
    }
    if any { Some((lo, hi)) } else { None }
}

/// True when the two triangles cross each other transversally with an
/// intersection segment longer than `tol`. Coplanar and merely touching
/// pairs are rejected.
fn tri_tri_transversal(mesh: &SurfaceMesh, f: usize, g: usize, tol: f64) -> bool {
    let pf: Vec<[f64; 3]> = mesh.facet(f).iter().map(|&v| mesh.vertex(v)).collect();
    let pg: Vec<[f64; 3]> = mesh.facet(g).iter().map(|&v| mesh.vertex(v)).collect();

    let snapped_dists = |pts: &[[f64; 3]], n: [f64; 3], d: f64| -> Option<[f64; 3]> {
        let scale = length(n);
        if scale == 0.0 {
            return None;
        }
        let snap = tol * scale;
        let mut out = [0.0; 3];
        for i in 0..3 {
            let v = dot(n, pts[i]) - d;
            out[i] = if v.abs() <= snap { 0.0 } else { v };
        }
        Some(out)
    };
    let crosses = |d: &[f64; 3]| d.iter().any(|&x| x > 0.0) && d.iter().any(|&x| x < 0.0);

    let (ng, dg) = facet_plane(mesh, g);
    let Some(df) = snapped_dists(&pf, ng, dg) else {
        return false;
    };
    if !crosses(&df) {
        return false;
    }
    let (nf, d_f) = facet_plane(mesh, f);
    let Some(dg_dist) = snapped_dists(&pg, nf, d_f) else {
        return false;
    };
    if !crosses(&dg_dist) {
        return false;
    }

    let dir = cross(nf, ng);
    let mut axis = 0;
    for i in 1..3 {
        if dir[i].abs() > dir[axis].abs() {
            axis = i;
        }
    }
    if dir[axis] == 0.0 {
        return false;
    }
    let proj_f = [pf[0][axis], pf[1][axis], pf[2][axis]];
    let proj_g = [pg[0][axis], pg[1][axis], pg[2][axis]];
    let Some((f_lo, f_hi)) = plane_interval(proj_f, df) else {
        return false;
    };
    let Some((g_lo, g_hi)) = plane_interval(proj_g, dg_dist) else {
        return false;
    };
    f_hi.min(g_hi) - f_lo.max(g_lo) > tol
}

/// Splits triangle `f` by the plane `(n, d)`. Returns the replacement
/// triangles (with cut vertices appended to the mesh), or `None` when the
/// triangle does not straddle the plane.
fn split_triangle_by_plane(
    mesh: &mut SurfaceMesh,
    f: usize,
    (n, d): ([f64; 3], f64),
    tol: f64,
) -> Option<Vec<[usize; 3]>> {
    let scale = length(n);
    if scale == 0.0 {
        return None;
    }
    let snap = tol * scale;
    let loop_f: Vec<usize> = mesh.facet(f).to_vec();
    let mut dist = [0.0; 3];
    for i in 0..3 {
        let v = dot(n, mesh.vertex(loop_f[i])) - d;
        dist[i] = if v.abs() <= snap { 0.0 } else { v };
    }
    if !(dist.iter().any(|&x| x > 0.0) && dist.iter().any(|&x| x < 0.0)) {
        return None;
    }

    let mut pos: Vec<usize> = Vec::with_capacity(4);
    let mut neg: Vec<usize> = Vec::with_capacity(4);
    for i in 0..3 {
        let vi = loop_f[i];
        if dist[i] >= 0.0 {
            pos.push(vi);
        }
        if dist[i] <= 0.0 {
            neg.push(vi);
        }
        let j = (i + 1) % 3;
        if dist[i] * dist[j] < 0.0 {
            let t = dist[i] / (dist[i] - dist[j]);
            let a = mesh.vertex(vi);
            let b = mesh.vertex(loop_f[j]);
            let cut = mesh.add_vertex(
                a[0] + t * (b[0] - a[0]),
                a[1] + t * (b[1] - a[1]),
                a[2] + t * (b[2] - a[2]),
            );
            pos.push(cut);
            neg.push(cut);
        }
    }
    let mut tris = Vec::with_capacity(3);
    for poly in [pos, neg] {
        if poly.len() < 3 {
            continue;
        }
        tris.push([poly[0], poly[1], poly[2]]);
        if poly.len() == 4 {
            tris.push([poly[0], poly[2], poly[3]]);
        }
    }
    Some(tris)
}

/// Inserts candidate vertices lying on facet edges into those edge loops,
/// restoring edge conformity after cuts introduced T-junctions.
fn insert_vertices_on_edges(mesh: &mut SurfaceMesh, candidates: &[usize], tol: f64) {
    if candidates.is_empty() {
        return;
    }
    let tol_sq = tol * tol;
    let mut starts = vec![0];
    let mut indices = Vec::new();
    let mut on_edge: Vec<(f64, usize)> = Vec::new();
    for f in 0..mesh.nb_facets() {
        let loop_f = mesh.facet(f).to_vec();
        for i in 0..loop_f.len() {
            let a = loop_f[i];
            let b = loop_f[(i + 1) % loop_f.len()];
            indices.push(a);
            let pa = mesh.vertex(a);
            let pb = mesh.vertex(b);
            let ab = sub(pb, pa);
            let len_sq = dot(ab, ab);
            if len_sq == 0.0 {
                continue;
            }
            on_edge.clear();
            for &c in candidates {
                if loop_f.contains(&c) {
                    continue;
                }
                let pc = mesh.vertex(c);
                let t = dot(sub(pc, pa), ab) / len_sq;
                if t <= 1e-9 || t >= 1.0 - 1e-9 {
                    continue;
                }
                let foot = [pa[0] + t * ab[0], pa[1] + t * ab[1], pa[2] + t * ab[2]];
                let off = sub(pc, foot);
                if dot(off, off) <= tol_sq {
                    on_edge.push((t, c));
                }
            }
            on_edge.sort_by(|x, y| x.0.total_cmp(&y.0));
            for &(_, c) in &on_edge {
                indices.push(c);
            }
        }
        starts.push(indices.len());
    }
    mesh.set_topology(starts, indices);
}

/// Drops connected components that do not separate enclosed space from
/// outside space, probing each component at its largest facet.
fn remove_internal_shells(mesh: &mut SurfaceMesh) -> usize {
    let components = mesh.connected_components();
    if components.len() <= 1 {
        return 0;
    }
    let Some(bbox) = mesh.bbox() else {
        return 0;
    };
    let delta = 1e-6 * bbox.diagonal();
    let mut keep = vec![true; mesh.nb_facets()];
    for comp in &components {
        let probe = comp
            .iter()
            .copied()
            .max_by(|&a, &b| mesh.facet_area(a).total_cmp(&mesh.facet_area(b)));
        let Some(f) = probe else {
            continue;
        };
        let c = mesh.facet_centroid(f);
        let n = mesh.facet_normal(f);
        let front = [c[0] + delta * n[0], c[1] + delta * n[1], c[2] + delta * n[2]];
        let back = [c[0] - delta * n[0], c[1] - delta * n[1], c[2] - delta * n[2]];
        let separates = (mesh.winding_number(front) == 0) != (mesh.winding_number(back) == 0);
        if !separates {
            for &f in comp {
                keep[f] = false;
            }
        }
    }
    let removed = mesh.remove_facets(&keep);
    if removed != 0 {
        mesh.remove_unreferenced_vertices();
    }
    removed
}

fn remove_small_components(mesh: &mut SurfaceMesh, min_area: f64) -> usize {
    let mut keep = vec![true; mesh.nb_facets()];
    let mut removed_any = false;
    for comp in mesh.connected_components() {
        let area: f64 = comp.iter().map(|&f| mesh.facet_area(f)).sum();
        if area < min_area {
            for &f in &comp {
                keep[f] = false;
            }
            removed_any = true;
        }
    }
    if removed_any { mesh.remove_facets(&keep) } else { 0 }
}

/// Closes border loops whose enclosed area and edge count are both within
/// the maxima. Larger loops are intentional openings and stay open. The
/// patch winds against the border direction so its normals agree with the
/// surrounding surface.
fn fill_holes(mesh: &mut SurfaceMesh, max_area: f64, max_edges: usize) -> usize {
    let mut filled = 0;
    for hole in mesh.boundary_loops() {
        if hole.len() < 3 || hole.len() > max_edges {
            continue;
        }
        let points: Vec<[f64; 3]> = hole.iter().rev().map(|&v| mesh.vertex(v)).collect();
        if polygon_area(&points) > max_area {
            continue;
        }
        let patch: Vec<usize> = hole.iter().rev().copied().collect();
        for t in triangulate_polygon(&points) {
            mesh.add_triangle(patch[t[0]], patch[t[1]], patch[t[2]]);
        }
        filled += 1;
    }
    filled
}

/// Stores `factor`-scaled vertex normals as the anisotropy attribute,
/// optionally Laplacian-smoothing the normal field first.
fn apply_anisotropy(mesh: &mut SurfaceMesh, factor: f64, smooth_iterations: usize) {
    let mut normals = mesh.vertex_normals();
    if smooth_iterations != 0 {
        log::info!("Smoothing normals, {smooth_iterations} iteration(s)");
        let nb = mesh.nb_vertices();
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); nb];
        for f in 0..mesh.nb_facets() {
            let loop_f = mesh.facet(f);
            for i in 0..loop_f.len() {
                let a = loop_f[i];
                let b = loop_f[(i + 1) % loop_f.len()];
                if !neighbors[a].contains(&b) {
                    neighbors[a].push(b);
                }
                if !neighbors[b].contains(&a) {
                    neighbors[b].push(a);
                }
            }
        }
        for _ in 0..smooth_iterations {
            let mut smoothed = normals.clone();
            for v in 0..nb {
                if neighbors[v].is_empty() {
                    continue;
                }
                let mut acc = [0.0; 3];
                for &u in &neighbors[v] {
                    acc[0] += normals[u * 3];
                    acc[1] += normals[u * 3 + 1];
                    acc[2] += normals[u * 3 + 2];
                }
                let n = normalize(acc);
                if n != [0.0; 3] {
                    smoothed[v * 3] = n[0];
                    smoothed[v * 3 + 1] = n[1];
                    smoothed[v * 3 + 2] = n[2];
                }
            }
            normals = smoothed;
        }
    }
    for n in &mut normals {
        *n *= factor;
    }
    mesh.set_anisotropy(normals);
}

fn remove_zero_area_facets(mesh: &mut SurfaceMesh) -> usize {
    let keep: Vec<bool> = (0..mesh.nb_facets())
        .map(|f| mesh.facet_area(f) >= 1e-30)
        .collect();
    mesh.remove_facets(&keep)
}

/// Displaces every border vertex outward by `margin`, along the average of
/// `edge x facet normal` over its border edges. Interior vertices stay put.
fn expand_border(mesh: &mut SurfaceMesh, margin: f64) -> usize {
    let edge_map = mesh.edge_facets();
    let nb = mesh.nb_vertices();
    let mut push = vec![[0.0; 3]; nb];
    let mut on_border = vec![false; nb];
    for f in 0..mesh.nb_facets() {
        let loop_f = mesh.facet(f).to_vec();
        let n = mesh.facet_normal_raw(f);
        for i in 0..loop_f.len() {
            let a = loop_f[i];
            let b = loop_f[(i + 1) % loop_f.len()];
            if edge_map[&edge_key(a, b)].len() != 1 {
                continue;
            }
            let d = cross(sub(mesh.vertex(b), mesh.vertex(a)), n);
            for v in [a, b] {
                on_border[v] = true;
                push[v][0] += d[0];
                push[v][1] += d[1];
                push[v][2] += d[2];
            }
        }
    }
    let mut moved = 0;
    for v in 0..nb {
        if !on_border[v] {
            continue;
        }
        let dir = normalize(push[v]);
        if dir == [0.0; 3] {
            continue;
        }
        let p = mesh.vertex(v);
        mesh.set_vertex(
            v,
            [
                p[0] + margin * dir[0],
                p[1] + margin * dir[1],
                p[2] + margin * dir[2],
            ],
        );
        moved += 1;
    }
    moved
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}
