//! Convex cell fragments produced by clipping a tetrahedron against
//! bisector half-spaces.
//!
//! A [`ConvexCell`] starts out as one tetrahedron of the background volume
//! mesh and shrinks monotonically as bisectors are clipped against it.
//! Faces live in a flat arena (a count per face plus a shared index pool)
//! and every face carries a tag identifying its origin: the index of the
//! opposing generator for a bisector cut, [`BOUNDARY_TAG`] for a facet of
//! the domain surface, or a wall tag naming the neighboring tetrahedron.

use std::mem;

use crate::predicates::{Bisector, Predicates};
use crate::tet_mesh::TET_FACES;

/// Face tag for a facet lying on the domain surface.
pub const BOUNDARY_TAG: i32 = -1;

/// Face tag for the interior wall shared with tetrahedron `t`.
pub fn wall_tag(t: usize) -> i32 {
    -2 - t as i32
}

/// Tetrahedron index encoded in an interior wall tag.
pub fn wall_tet(tag: i32) -> usize {
    debug_assert!(tag <= -2);
    (-2 - tag) as usize
}

/// Distance band inside which a vertex counts as on the clip plane when
/// adaptive classification is off.
const PLANE_EPS: f64 = 1e-9;

/// Reusable buffers for [`ConvexCell::clip`]. One scratch per worker keeps
/// the face arena allocations out of the clipping loop.
#[derive(Clone, Debug, Default)]
pub struct ClipScratch {
    vertices: Vec<f64>,
    face_counts: Vec<u8>,
    face_indices: Vec<u16>,
    face_tags: Vec<i32>,
    dists: Vec<f64>,
    old_to_new: Vec<Option<u16>>,
    intersection_map: Vec<(u32, u16)>,
    lid_segments: Vec<(u16, u16)>,
    face_buffer: Vec<u16>,
    lid_buffer: Vec<u16>,
    lid_map: Vec<u16>,
}

/// One restricted Voronoi cell fragment: the intersection of a generator's
/// Voronoi cell with a single tetrahedron.
#[derive(Clone, Debug)]
pub struct ConvexCell {
    generator: usize,
    generator_pos: [f64; 3],
    vertices: Vec<f64>,
    face_counts: Vec<u8>,
    face_indices: Vec<u16>,
    face_tags: Vec<i32>,
    max_radius_sq: f64,
}

impl ConvexCell {
    /// Seeds the cell with a full tetrahedron. `neighbors` is the adjacency
    /// row of the tetrahedron; `-1` entries become [`BOUNDARY_TAG`] faces,
    /// the rest interior walls.
    pub fn from_tet(
        generator: usize,
        generator_pos: [f64; 3],
        corners: [[f64; 3]; 4],
        neighbors: [i32; 4],
    ) -> Self {
        let mut vertices = Vec::with_capacity(12);
        for corner in corners {
            vertices.extend_from_slice(&corner);
        }
        let mut face_indices = Vec::with_capacity(12);
        let mut face_tags = Vec::with_capacity(4);
        for (k, face) in TET_FACES.iter().enumerate() {
            for &v in face {
                face_indices.push(v as u16);
            }
            face_tags.push(match neighbors[k] {
                -1 => BOUNDARY_TAG,
                adj => wall_tag(adj as usize),
            });
        }
        let mut max_radius_sq = 0.0f64;
        for corner in corners {
            max_radius_sq = max_radius_sq.max(dist_sq(&corner, &generator_pos));
        }
        Self {
            generator,
            generator_pos,
            vertices,
            face_counts: vec![3; 4],
            face_indices,
            face_tags,
            max_radius_sq,
        }
    }

    pub fn generator(&self) -> usize {
        self.generator
    }

    pub fn generator_pos(&self) -> [f64; 3] {
        self.generator_pos
    }

    pub fn nb_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn nb_faces(&self) -> usize {
        self.face_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, v: usize) -> [f64; 3] {
        [
            self.vertices[3 * v],
            self.vertices[3 * v + 1],
            self.vertices[3 * v + 2],
        ]
    }

    pub fn face_tag(&self, f: usize) -> i32 {
        self.face_tags[f]
    }

    /// Iterates faces as `(tag, vertex indices)` pairs.
    pub fn faces(&self) -> impl Iterator<Item = (i32, &[u16])> + '_ {
        let mut offset = 0;
        self.face_counts.iter().enumerate().map(move |(f, &count)| {
            let start = offset;
            offset += count as usize;
            (self.face_tags[f], &self.face_indices[start..offset])
        })
    }

    /// Largest squared distance from the generator to any cell vertex.
    /// Bisectors of generators farther than twice this radius cannot cut
    /// the cell.
    pub fn max_radius_sq(&self) -> f64 {
        self.max_radius_sq
    }

    pub fn volume(&self) -> f64 {
        let mut volume = 0.0;
        let mut offset = 0;
        for &count in &self.face_counts {
            let count = count as usize;
            let a = self.face_vertex(offset);
            for i in 1..count - 1 {
                let b = self.face_vertex(offset + i);
                let c = self.face_vertex(offset + i + 1);
                volume += det3(a, b, c);
            }
            offset += count;
        }
        (volume / 6.0).abs()
    }

    /// Volume-weighted centroid. Falls back to the generator position when
    /// the cell has degenerated to (near) zero volume, which keeps a
    /// relaxation step from teleporting its generator.
    pub fn centroid(&self) -> [f64; 3] {
        let mut total = 0.0;
        let mut acc = [0.0f64; 3];
        let mut offset = 0;
        for &count in &self.face_counts {
            let count = count as usize;
            let a = self.face_vertex(offset);
            for i in 1..count - 1 {
                let b = self.face_vertex(offset + i);
                let c = self.face_vertex(offset + i + 1);
                let det = det3(a, b, c);
                total += det;
                for k in 0..3 {
                    acc[k] += det * (a[k] + b[k] + c[k]);
                }
            }
            offset += count;
        }
        if total.abs() < 1e-9 {
            return self.generator_pos;
        }
        let scale = 1.0 / (4.0 * total);
        [acc[0] * scale, acc[1] * scale, acc[2] * scale]
    }

    pub fn face_area(&self, f: usize) -> f64 {
        let offset: usize = self.face_counts[..f].iter().map(|&c| c as usize).sum();
        let count = self.face_counts[f] as usize;
        let a = self.face_vertex(offset);
        let mut acc = [0.0f64; 3];
        for i in 1..count - 1 {
            let b = self.face_vertex(offset + i);
            let c = self.face_vertex(offset + i + 1);
            let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            acc[0] += ab[1] * ac[2] - ab[2] * ac[1];
            acc[1] += ab[2] * ac[0] - ab[0] * ac[2];
            acc[2] += ab[0] * ac[1] - ab[1] * ac[0];
        }
        0.5 * (acc[0] * acc[0] + acc[1] * acc[1] + acc[2] * acc[2]).sqrt()
    }

    /// Cuts the cell by the half-space of `bisector` on its `p` side,
    /// tagging the new face with `tag`. Returns whether the cut changed the
    /// cell. On a real cut the scratch arena is swapped into the cell, so
    /// buffers are reused across calls.
    pub fn clip(
        &mut self,
        bisector: &Bisector,
        tag: i32,
        predicates: Predicates,
        scratch: &mut ClipScratch,
    ) -> bool {
        let eps = if predicates.is_exact() { 0.0 } else { PLANE_EPS };
        let nb_vertices = self.nb_vertices();

        scratch.dists.clear();
        let mut all_inside = true;
        let mut all_outside = true;
        for v in 0..nb_vertices {
            let d = bisector.side(&self.vertices[3 * v..3 * v + 3], predicates);
            if d > eps {
                all_inside = false;
            }
            if d < -eps {
                all_outside = false;
            }
            scratch.dists.push(d);
        }

        if all_inside {
            return false;
        }
        if all_outside {
            self.vertices.clear();
            self.face_counts.clear();
            self.face_indices.clear();
            self.face_tags.clear();
            self.max_radius_sq = 0.0;
            return true;
        }

        scratch.vertices.clear();
        scratch.face_counts.clear();
        scratch.face_indices.clear();
        scratch.face_tags.clear();
        scratch.intersection_map.clear();
        scratch.lid_segments.clear();
        scratch.old_to_new.clear();
        scratch.old_to_new.resize(nb_vertices, None);

        let mut offset = 0;
        for f in 0..self.face_counts.len() {
            let count = self.face_counts[f] as usize;
            let face = &self.face_indices[offset..offset + count];
            offset += count;

            scratch.face_buffer.clear();
            let mut cut_entry = None;
            let mut cut_exit = None;

            for i in 0..count {
                let s = face[i] as usize;
                let e = face[(i + 1) % count] as usize;
                let d_s = scratch.dists[s];
                let d_e = scratch.dists[e];
                let s_in = d_s <= eps;
                let e_in = d_e <= eps;

                if s_in {
                    let id = match scratch.old_to_new[s] {
                        Some(id) => id,
                        None => {
                            let id = (scratch.vertices.len() / 3) as u16;
                            scratch
                                .vertices
                                .extend_from_slice(&self.vertices[3 * s..3 * s + 3]);
                            scratch.old_to_new[s] = Some(id);
                            id
                        }
                    };
                    scratch.face_buffer.push(id);
                }
                if s_in != e_in {
                    let key = if s < e {
                        ((s as u32) << 16) | e as u32
                    } else {
                        ((e as u32) << 16) | s as u32
                    };
                    let id = match scratch.intersection_map.iter().find(|&&(k, _)| k == key) {
                        Some(&(_, id)) => id,
                        None => {
                            let t = (d_s / (d_s - d_e)).clamp(0.0, 1.0);
                            let id = (scratch.vertices.len() / 3) as u16;
                            for k in 0..3 {
                                let vs = self.vertices[3 * s + k];
                                let ve = self.vertices[3 * e + k];
                                scratch.vertices.push(vs + t * (ve - vs));
                            }
                            scratch.intersection_map.push((key, id));
                            id
                        }
                    };
                    scratch.face_buffer.push(id);
                    if s_in {
                        cut_exit = Some(id);
                    } else {
                        cut_entry = Some(id);
                    }
                }
            }

            if scratch.face_buffer.len() >= 3 {
                scratch.face_counts.push(scratch.face_buffer.len() as u8);
                scratch.face_indices.extend_from_slice(&scratch.face_buffer);
                scratch.face_tags.push(self.face_tags[f]);
            }
            // The cut face holds the directed edge exit -> entry, so the
            // lid traverses entry -> exit to keep windings opposed.
            if let (Some(entry), Some(exit)) = (cut_entry, cut_exit) {
                scratch.lid_segments.push((entry, exit));
            }
        }

        if !scratch.lid_segments.is_empty() {
            let nb_new = scratch.vertices.len() / 3;
            scratch.lid_map.clear();
            scratch.lid_map.resize(nb_new, u16::MAX);
            for &(entry, exit) in &scratch.lid_segments {
                scratch.lid_map[entry as usize] = exit;
            }
            scratch.lid_buffer.clear();
            let start = scratch.lid_segments[0].0;
            let mut current = start;
            loop {
                scratch.lid_buffer.push(current);
                current = scratch.lid_map[current as usize];
                if current == u16::MAX || current == start {
                    break;
                }
                if scratch.lid_buffer.len() > nb_new {
                    // broken chain
                    break;
                }
            }
            if current == start && scratch.lid_buffer.len() >= 3 {
                scratch.face_counts.push(scratch.lid_buffer.len() as u8);
                scratch.face_indices.extend_from_slice(&scratch.lid_buffer);
                scratch.face_tags.push(tag);
            }
        }

        let mut max_radius_sq = 0.0f64;
        for v in scratch.vertices.chunks_exact(3) {
            max_radius_sq = max_radius_sq.max(dist_sq(v, &self.generator_pos));
        }

        mem::swap(&mut self.vertices, &mut scratch.vertices);
        mem::swap(&mut self.face_counts, &mut scratch.face_counts);
        mem::swap(&mut self.face_indices, &mut scratch.face_indices);
        mem::swap(&mut self.face_tags, &mut scratch.face_tags);
        self.max_radius_sq = max_radius_sq;
        true
    }

    fn face_vertex(&self, slot: usize) -> [f64; 3] {
        self.vertex(self.face_indices[slot] as usize)
    }
}

fn det3(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

fn dist_sq(a: &[f64], b: &[f64]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORNERS: [[f64; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];

    fn unit_tet(generator: [f64; 3]) -> ConvexCell {
        ConvexCell::from_tet(0, generator, CORNERS, [-1, -1, 3, -1])
    }

    #[test]
    fn test_from_tet_volume_and_tags() {
        let cell = unit_tet([0.2, 0.2, 0.2]);
        assert!(!cell.is_empty());
        assert_eq!(cell.nb_vertices(), 4);
        assert_eq!(cell.nb_faces(), 4);
        assert!((cell.volume() - 1.0 / 6.0).abs() < 1e-12);
        let tags: Vec<i32> = cell.faces().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec![BOUNDARY_TAG, BOUNDARY_TAG, wall_tag(3), BOUNDARY_TAG]);
        let c = cell.centroid();
        for k in 0..3 {
            assert!((c[k] - 0.25).abs() < 1e-12);
        }
        // Farthest corner from the generator is (1, 0, 0).
        assert!((cell.max_radius_sq() - 0.72).abs() < 1e-12);
    }

    #[test]
    fn test_clip_cuts_and_builds_lid() {
        let mut cell = unit_tet([0.2, 0.2, 0.2]);
        let mut scratch = ClipScratch::default();
        let pred = Predicates::new(true);
        // Bisector plane x = 0.25; the region beyond it is a scaled copy of
        // the tetrahedron with factor 0.75.
        let bisector = Bisector::new([0.2, 0.2, 0.2], [0.3, 0.2, 0.2]);
        assert!(cell.clip(&bisector, 7, pred, &mut scratch));
        assert_eq!(cell.nb_vertices(), 6);
        assert_eq!(cell.nb_faces(), 5);
        let expected = (1.0 - 0.75f64.powi(3)) / 6.0;
        assert!((cell.volume() - expected).abs() < 1e-12);
        let lid = (0..cell.nb_faces())
            .find(|&f| cell.face_tag(f) == 7)
            .unwrap();
        assert!((cell.face_area(lid) - 0.75 * 0.75 / 2.0).abs() < 1e-12);
        assert!((cell.max_radius_sq() - 0.72).abs() < 1e-12);
    }

    #[test]
    fn test_clip_all_inside_is_noop() {
        let mut cell = unit_tet([0.2, 0.2, 0.2]);
        let mut scratch = ClipScratch::default();
        let before = cell.volume();
        let bisector = Bisector::new([0.2, 0.2, 0.2], [10.0, 0.2, 0.2]);
        assert!(!cell.clip(&bisector, 3, Predicates::new(true), &mut scratch));
        assert_eq!(cell.nb_faces(), 4);
        assert!((cell.volume() - before).abs() < 1e-15);
    }

    #[test]
    fn test_clip_all_outside_empties() {
        let mut cell = unit_tet([10.0, 0.0, 0.0]);
        let mut scratch = ClipScratch::default();
        let bisector = Bisector::new([10.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        assert!(cell.clip(&bisector, 1, Predicates::new(true), &mut scratch));
        assert!(cell.is_empty());
        assert_eq!(cell.max_radius_sq(), 0.0);
    }

    #[test]
    fn test_plain_mode_matches_adaptive() {
        let bisector = Bisector::new([0.21, 0.17, 0.33], [0.91, 0.4, 0.11]);
        let mut scratch = ClipScratch::default();
        let mut exact_cell = unit_tet([0.21, 0.17, 0.33]);
        exact_cell.clip(&bisector, 5, Predicates::new(true), &mut scratch);
        let mut plain_cell = unit_tet([0.21, 0.17, 0.33]);
        plain_cell.clip(&bisector, 5, Predicates::new(false), &mut scratch);
        assert_eq!(exact_cell.nb_faces(), plain_cell.nb_faces());
        assert!((exact_cell.volume() - plain_cell.volume()).abs() < 1e-9);
    }

    #[test]
    fn test_wall_tag_round_trip() {
        assert_eq!(wall_tag(0), -2);
        assert_eq!(wall_tag(41), -43);
        assert_eq!(wall_tet(wall_tag(7)), 7);
        assert!(wall_tag(0) < BOUNDARY_TAG);
    }

    #[test]
    fn test_two_clips_compose() {
        let mut cell = unit_tet([0.1, 0.1, 0.1]);
        let mut scratch = ClipScratch::default();
        let pred = Predicates::new(true);
        // x = 0.5 then y = 0.25.
        cell.clip(&Bisector::new([0.1, 0.1, 0.1], [0.9, 0.1, 0.1]), 1, pred, &mut scratch);
        let after_x = cell.volume();
        cell.clip(&Bisector::new([0.1, 0.1, 0.1], [0.1, 0.4, 0.1]), 2, pred, &mut scratch);
        assert!(cell.volume() < after_x);
        // Both bisector faces survive with their tags.
        let tags: Vec<i32> = cell.faces().map(|(tag, _)| tag).collect();
        assert!(tags.contains(&1));
        assert!(tags.contains(&2));
        assert!(cell.volume() > 0.0);
    }
}
