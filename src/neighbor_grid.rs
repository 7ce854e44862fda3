//! Uniform-grid spatial index over the generator set.
//!
//! Bins are walked in precomputed order of minimum possible distance, so a
//! query can stop as soon as the remaining bins are provably too far away.
//! For the clipping loop the cutoff is the security radius: once a cell's
//! farthest vertex is within `r` of its generator, no generator beyond
//! `2 r` can contribute a bisector, so the walk breaks at bins farther
//! than `4 r^2`.

use crate::bounds::BoundingBox;

pub struct NeighborGrid {
    res: [usize; 3],
    scale: [f64; 3],
    limit: [f64; 3],
    min: [f64; 3],
    bins: Vec<Vec<usize>>,
    bin_of: Vec<usize>,
    /// Bin offsets sorted by conservative minimum distance to the origin
    /// bin, each paired with that squared distance.
    search_order: Vec<(isize, isize, isize, f64)>,
}

/// Widest per-axis resolution the precomputed search order tolerates.
const MAX_RES: usize = 64;

impl NeighborGrid {
    /// Builds the index for a fixed flat `[x, y, z, ...]` generator array.
    /// Resolution follows the cbrt(N) heuristic, stretched per axis so bins
    /// stay roughly cubical.
    pub fn new(generators: &[f64], bounds: &BoundingBox) -> Self {
        let count = generators.len() / 3;
        let extents = bounds.extents();
        let res = resolution(count, extents);

        let max_extent = extents[0].max(extents[1]).max(extents[2]).max(f64::MIN_POSITIVE);
        let floor = max_extent * 1e-6;
        let sx = (res[0] as f64) / extents[0].max(floor);
        let sy = (res[1] as f64) / extents[1].max(floor);
        let sz = (res[2] as f64) / extents[2].max(floor);

        let cell_size = [1.0 / sx, 1.0 / sy, 1.0 / sz];
        let mut search_order = Vec::new();
        let rx = res[0] as isize;
        let ry = res[1] as isize;
        let rz = res[2] as isize;
        for z in -rz..=rz {
            for y in -ry..=ry {
                for x in -rx..=rx {
                    let dist_sq = offset_min_dist_sq(x, y, z, cell_size);
                    search_order.push((x, y, z, dist_sq));
                }
            }
        }
        search_order.sort_unstable_by(|a, b| {
            a.3.partial_cmp(&b.3).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut grid = NeighborGrid {
            res,
            scale: [sx, sy, sz],
            limit: [
                res[0] as f64 - 1e-5,
                res[1] as f64 - 1e-5,
                res[2] as f64 - 1e-5,
            ],
            min: [bounds.min_x, bounds.min_y, bounds.min_z],
            bins: vec![Vec::new(); res[0] * res[1] * res[2]],
            bin_of: vec![0; count],
            search_order,
        };
        for i in 0..count {
            let bin = grid.bin_index(
                generators[3 * i],
                generators[3 * i + 1],
                generators[3 * i + 2],
            );
            grid.bins[bin].push(i);
            grid.bin_of[i] = bin;
        }
        grid
    }

    fn bin_index(&self, x: f64, y: f64, z: f64) -> usize {
        let ix = ((x - self.min[0]) * self.scale[0]).clamp(0.0, self.limit[0]) as usize;
        let iy = ((y - self.min[1]) * self.scale[1]).clamp(0.0, self.limit[1]) as usize;
        let iz = ((z - self.min[2]) * self.scale[2]).clamp(0.0, self.limit[2]) as usize;
        ix + iy * self.res[0] + iz * self.res[0] * self.res[1]
    }

    fn bin_coords(&self, bin: usize) -> [usize; 3] {
        let iz = bin / (self.res[0] * self.res[1]);
        let rem = bin % (self.res[0] * self.res[1]);
        [rem % self.res[0], rem / self.res[0], iz]
    }

    /// Index of the generator closest to `pos`, or `None` when the set is
    /// empty.
    pub fn nearest(&self, pos: [f64; 3], generators: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        let origin = self.bin_coords(self.bin_index(pos[0], pos[1], pos[2]));
        for &(dx, dy, dz, min_d2) in &self.search_order {
            if let Some((_, best_d2)) = best {
                if min_d2 > best_d2 {
                    break;
                }
            }
            let bx = origin[0] as isize + dx;
            let by = origin[1] as isize + dy;
            let bz = origin[2] as isize + dz;
            if bx < 0
                || bx >= self.res[0] as isize
                || by < 0
                || by >= self.res[1] as isize
                || bz < 0
                || bz >= self.res[2] as isize
            {
                continue;
            }
            let bin = bx as usize + (by as usize) * self.res[0]
                + (bz as usize) * self.res[0] * self.res[1];
            for &j in &self.bins[bin] {
                let d2 = dist_sq(pos, [
                    generators[3 * j],
                    generators[3 * j + 1],
                    generators[3 * j + 2],
                ]);
                if best.map_or(true, |(_, b)| d2 < b) {
                    best = Some((j, d2));
                }
            }
        }
        best.map(|(j, _)| j)
    }

    /// Visits generators near `generator` in roughly increasing distance.
    /// The visitor receives `(index, position, current max_dist_sq)` and
    /// returns the updated squared security radius; the walk stops once the
    /// remaining bins lie beyond `4 * max_dist_sq`.
    pub fn visit_neighbors<F>(
        &self,
        generators: &[f64],
        generator: usize,
        pos: [f64; 3],
        max_dist_sq: &mut f64,
        mut visitor: F,
    ) where
        F: FnMut(usize, [f64; 3], f64) -> f64,
    {
        let origin = self.bin_coords(self.bin_of[generator]);
        let cell_size = [
            1.0 / self.scale[0],
            1.0 / self.scale[1],
            1.0 / self.scale[2],
        ];
        let rel = [
            (pos[0] - self.min[0]) * self.scale[0] - origin[0] as f64,
            (pos[1] - self.min[1]) * self.scale[1] - origin[1] as f64,
            (pos[2] - self.min[2]) * self.scale[2] - origin[2] as f64,
        ];

        for &(dx, dy, dz, min_d2) in &self.search_order {
            if min_d2 > 4.0 * *max_dist_sq {
                break;
            }
            let bx = origin[0] as isize + dx;
            let by = origin[1] as isize + dy;
            let bz = origin[2] as isize + dz;
            if bx < 0
                || bx >= self.res[0] as isize
                || by < 0
                || by >= self.res[1] as isize
                || bz < 0
                || bz >= self.res[2] as isize
            {
                continue;
            }

            // Tighter bound than the precomputed one: distance from the
            // query position itself to the bin, not bin-origin to bin.
            let gap = |d: isize, rel: f64, size: f64| -> f64 {
                if d > 0 {
                    (d as f64 - rel) * size
                } else if d < 0 {
                    (-(d + 1) as f64 + rel) * size
                } else {
                    0.0
                }
            };
            let gx = gap(dx, rel[0], cell_size[0]).max(0.0);
            let gy = gap(dy, rel[1], cell_size[1]).max(0.0);
            let gz = gap(dz, rel[2], cell_size[2]).max(0.0);
            if gx * gx + gy * gy + gz * gz > 4.0 * *max_dist_sq {
                continue;
            }

            let bin = bx as usize + (by as usize) * self.res[0]
                + (bz as usize) * self.res[0] * self.res[1];
            for &j in &self.bins[bin] {
                if j == generator {
                    continue;
                }
                let other = [
                    generators[3 * j],
                    generators[3 * j + 1],
                    generators[3 * j + 2],
                ];
                *max_dist_sq = visitor(j, other, *max_dist_sq);
            }
        }
    }
}

fn resolution(count: usize, extents: [f64; 3]) -> [usize; 3] {
    let max_extent = extents[0].max(extents[1]).max(extents[2]);
    if max_extent <= 0.0 {
        return [1, 1, 1];
    }
    // Collapsed axes get a floor so the product cannot underflow.
    let floor = max_extent * 1e-6;
    let ex = extents[0].max(floor);
    let ey = extents[1].max(floor);
    let ez = extents[2].max(floor);
    let density = (count.max(1) as f64 / (ex * ey * ez)).cbrt();
    [
        ((ex * density).round() as usize).clamp(1, MAX_RES),
        ((ey * density).round() as usize).clamp(1, MAX_RES),
        ((ez * density).round() as usize).clamp(1, MAX_RES),
    ]
}

/// Conservative squared distance between a bin at `(dx, dy, dz)` offsets
/// and the bin at the origin: one full cell of slack per axis covers any
/// position of the query inside its bin.
fn offset_min_dist_sq(dx: isize, dy: isize, dz: isize, cell_size: [f64; 3]) -> f64 {
    let gap = |d: isize, size: f64| -> f64 {
        if d > 0 {
            (d - 1) as f64 * size
        } else if d < 0 {
            (-d - 1) as f64 * size
        } else {
            0.0
        }
    };
    let mx = gap(dx, cell_size[0]);
    let my = gap(dy, cell_size[1]);
    let mz = gap(dz, cell_size[2]);
    mx * mx + my * my + mz * mz
}

fn dist_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scattered() -> Vec<f64> {
        let mut points = Vec::new();
        for i in 0..20 {
            let t = i as f64;
            points.push((t * 3.7).rem_euclid(10.0));
            points.push((t * 5.3 + 1.0).rem_euclid(8.0));
            points.push((t * 2.9 + 2.0).rem_euclid(6.0));
        }
        points
    }

    fn brute_nearest(pos: [f64; 3], generators: &[f64]) -> usize {
        let mut best = 0;
        let mut best_d2 = f64::INFINITY;
        for j in 0..generators.len() / 3 {
            let d2 = dist_sq(pos, [
                generators[3 * j],
                generators[3 * j + 1],
                generators[3 * j + 2],
            ]);
            if d2 < best_d2 {
                best_d2 = d2;
                best = j;
            }
        }
        best
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points = scattered();
        let bounds = BoundingBox::from_points(&points).unwrap();
        let grid = NeighborGrid::new(&points, &bounds);
        for query in [
            [0.0, 0.0, 0.0],
            [5.0, 4.0, 3.0],
            [9.9, 7.9, 5.9],
            [2.3, 6.1, 0.4],
        ] {
            assert_eq!(
                grid.nearest(query, &points),
                Some(brute_nearest(query, &points))
            );
        }
    }

    #[test]
    fn test_nearest_outside_bounds() {
        let points = scattered();
        let bounds = BoundingBox::from_points(&points).unwrap();
        let grid = NeighborGrid::new(&points, &bounds);
        let query = [-50.0, 100.0, -7.0];
        assert_eq!(
            grid.nearest(query, &points),
            Some(brute_nearest(query, &points))
        );
    }

    #[test]
    fn test_nearest_empty_set() {
        let bounds = BoundingBox::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let grid = NeighborGrid::new(&[], &bounds);
        assert_eq!(grid.nearest([0.5, 0.5, 0.5], &[]), None);
    }

    #[test]
    fn test_visit_covers_all_with_large_radius() {
        let points = scattered();
        let bounds = BoundingBox::from_points(&points).unwrap();
        let grid = NeighborGrid::new(&points, &bounds);
        let mut seen = Vec::new();
        let mut radius = f64::INFINITY;
        grid.visit_neighbors(&points, 4, [points[12], points[13], points[14]], &mut radius, |j, _, r| {
            seen.push(j);
            r
        });
        seen.sort_unstable();
        let expected: Vec<usize> = (0..20).filter(|&j| j != 4).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_visit_security_radius_prunes_far_bins() {
        // Four clustered generators and one far away in a stretched box.
        let points = vec![
            0.1, 0.1, 0.1, //
            0.2, 0.1, 0.1, //
            0.1, 0.2, 0.1, //
            0.1, 0.1, 0.2, //
            100.0, 100.0, 100.0,
        ];
        let bounds = BoundingBox::from_points(&points).unwrap();
        let grid = NeighborGrid::new(&points, &bounds);
        let mut seen = Vec::new();
        let mut radius = 1.0;
        grid.visit_neighbors(&points, 0, [0.1, 0.1, 0.1], &mut radius, |j, _, r| {
            seen.push(j);
            r
        });
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
