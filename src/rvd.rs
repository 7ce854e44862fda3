//! Restricted Voronoi diagram over a tetrahedralized domain.
//!
//! Every tetrahedron is processed independently: the generator owning the
//! tetrahedron's centroid seeds a breadth-first walk, each visited
//! generator clips a copy of the tetrahedron by the bisectors of its
//! neighbors, and the surviving bisector faces name the next generators to
//! visit. Within one tetrahedron the walk reaches exactly the generators
//! whose Voronoi cells intersect it. Tetrahedra run in parallel with one
//! clipping scratch per worker.

use rayon::prelude::*;

use crate::bounds::BoundingBox;
use crate::config::EngineConfig;
use crate::convex_cell::{ClipScratch, ConvexCell};
use crate::neighbor_grid::NeighborGrid;
use crate::predicates::{Bisector, Predicates};
use crate::tet_mesh::TetMesh;

/// One restricted cell: the intersection of a generator's Voronoi cell
/// with a single tetrahedron.
#[derive(Clone, Debug)]
pub struct Fragment {
    pub tet: usize,
    pub cell: ConvexCell,
}

/// The computed diagram. Fragments are sorted by `(generator, tet)` and
/// that order is part of the API: consumers may rely on all fragments of a
/// generator forming one contiguous, tet-ordered run.
pub struct RestrictedVoronoi {
    generators: Vec<f64>,
    predicates: Predicates,
    fragments: Vec<Fragment>,
}

#[derive(Default)]
struct TetScratch {
    clip: ClipScratch,
    visited: Vec<bool>,
    queue: Vec<usize>,
    touched: Vec<usize>,
}

impl TetScratch {
    fn begin(&mut self, count: usize) {
        if self.visited.len() != count {
            self.visited = vec![false; count];
        }
    }

    fn enqueue(&mut self, g: usize) {
        if !self.visited[g] {
            self.visited[g] = true;
            self.touched.push(g);
            self.queue.push(g);
        }
    }

    fn reset(&mut self) {
        for &g in &self.touched {
            self.visited[g] = false;
        }
        self.touched.clear();
        self.queue.clear();
    }
}

impl RestrictedVoronoi {
    /// Clips every generator's Voronoi cell against the tetrahedra of
    /// `tet_mesh`. Generators whose cells do not intersect the domain end
    /// up with no fragments.
    pub fn compute(tet_mesh: &TetMesh, generators: Vec<f64>, config: &EngineConfig) -> Self {
        let mut rvd = Self {
            generators,
            predicates: Predicates::new(config.exact_predicates),
            fragments: Vec::new(),
        };
        rvd.rebuild(tet_mesh);
        rvd
    }

    pub fn nb_generators(&self) -> usize {
        self.generators.len() / 3
    }

    pub fn generator_position(&self, g: usize) -> [f64; 3] {
        [
            self.generators[3 * g],
            self.generators[3 * g + 1],
            self.generators[3 * g + 2],
        ]
    }

    /// Fragments sorted by `(generator, tet)`.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// The fragment of `generator` restricted to `tet`, if that cell
    /// reaches into the tetrahedron.
    pub fn find_fragment(&self, generator: usize, tet: usize) -> Option<&Fragment> {
        self.fragments
            .binary_search_by(|f| (f.cell.generator(), f.tet).cmp(&(generator, tet)))
            .ok()
            .map(|i| &self.fragments[i])
    }

    /// Per-generator cell volumes. Together they sum to the domain volume.
    pub fn cell_volumes(&self) -> Vec<f64> {
        let mut volumes = vec![0.0; self.nb_generators()];
        for f in &self.fragments {
            volumes[f.cell.generator()] += f.cell.volume();
        }
        volumes
    }

    pub fn total_volume(&self) -> f64 {
        self.fragments.iter().map(|f| f.cell.volume()).sum()
    }

    /// Volume-weighted centroid of every generator's restricted cell.
    /// Generators with an empty cell keep their current position.
    pub fn centroids(&self) -> Vec<[f64; 3]> {
        let count = self.nb_generators();
        let mut acc = vec![[0.0f64; 4]; count];
        for f in &self.fragments {
            let volume = f.cell.volume();
            let centroid = f.cell.centroid();
            let entry = &mut acc[f.cell.generator()];
            for k in 0..3 {
                entry[k] += volume * centroid[k];
            }
            entry[3] += volume;
        }
        (0..count)
            .map(|g| {
                let [x, y, z, volume] = acc[g];
                if volume > 1e-30 {
                    [x / volume, y / volume, z / volume]
                } else {
                    self.generator_position(g)
                }
            })
            .collect()
    }

    /// One Lloyd step: moves every generator to its restricted cell
    /// centroid and recomputes the diagram.
    pub fn relax(&mut self, tet_mesh: &TetMesh) {
        let centroids = self.centroids();
        self.generators.clear();
        for c in centroids {
            self.generators.extend_from_slice(&c);
        }
        self.rebuild(tet_mesh);
    }

    fn rebuild(&mut self, tet_mesh: &TetMesh) {
        self.fragments.clear();
        let count = self.nb_generators();
        if count == 0 || tet_mesh.nb_tets() == 0 {
            return;
        }

        let generators = &self.generators;
        let predicates = self.predicates;
        let bounds = match BoundingBox::from_points(generators) {
            Some(b) => b,
            None => return,
        };
        let grid = NeighborGrid::new(generators, &bounds);
        let grid = &grid;

        let per_tet: Vec<Vec<Fragment>> = (0..tet_mesh.nb_tets())
            .into_par_iter()
            .map_init(TetScratch::default, |scratch, t| {
                let corners = tet_mesh.corners(t);
                let neighbors = tet_mesh.neighbors(t);
                let mut out = Vec::new();
                let seed = match grid.nearest(tet_mesh.tet_centroid(t), generators) {
                    Some(seed) => seed,
                    None => return out,
                };
                scratch.begin(count);
                scratch.enqueue(seed);

                let TetScratch {
                    clip,
                    visited,
                    queue,
                    touched,
                } = scratch;
                while let Some(g) = queue.pop() {
                    let pos = [generators[3 * g], generators[3 * g + 1], generators[3 * g + 2]];
                    let mut cell = ConvexCell::from_tet(g, pos, corners, neighbors);
                    let mut radius = cell.max_radius_sq();
                    // Exact duplicates: the lowest index keeps the cell.
                    let mut duplicate_of = None;
                    grid.visit_neighbors(generators, g, pos, &mut radius, |j, other, current| {
                        if duplicate_of.is_some() {
                            return current;
                        }
                        let dx = other[0] - pos[0];
                        let dy = other[1] - pos[1];
                        let dz = other[2] - pos[2];
                        let dist_sq = dx * dx + dy * dy + dz * dz;
                        if dist_sq > 4.0 * current {
                            return current;
                        }
                        if dist_sq == 0.0 {
                            if j < g {
                                duplicate_of = Some(j);
                                return 0.0;
                            }
                            return current;
                        }
                        let bisector = Bisector::new(pos, other);
                        if cell.clip(&bisector, j as i32, predicates, clip) {
                            cell.max_radius_sq()
                        } else {
                            current
                        }
                    });
                    if let Some(winner) = duplicate_of {
                        if !visited[winner] {
                            visited[winner] = true;
                            touched.push(winner);
                            queue.push(winner);
                        }
                        continue;
                    }
                    if cell.is_empty() {
                        continue;
                    }
                    for (tag, _) in cell.faces() {
                        if tag >= 0 {
                            let j = tag as usize;
                            if !visited[j] {
                                visited[j] = true;
                                touched.push(j);
                                queue.push(j);
                            }
                        }
                    }
                    out.push(Fragment { tet: t, cell });
                }
                scratch.reset();
                out
            })
            .collect();

        let mut flat: Vec<Fragment> = per_tet.into_iter().flatten().collect();
        flat.sort_unstable_by_key(|f| (f.cell.generator(), f.tet));
        let mut nonempty = 0usize;
        let mut last = usize::MAX;
        for f in &flat {
            if f.cell.generator() != last {
                last = f.cell.generator();
                nonempty += 1;
            }
        }
        log::info!(
            "Restricted Voronoi diagram: {} fragments, {} of {} generators with a non-empty cell",
            flat.len(),
            nonempty,
            count
        );
        self.fragments = flat;
    }
}
