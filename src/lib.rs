//! # voromesh
//!
//! `voromesh` computes centroidal Voronoi tessellations restricted to a
//! tetrahedralized 3D box domain. It takes a fixed set of generator points,
//! builds and repairs the domain surface, fills it with a conforming
//! tetrahedral mesh, intersects the Voronoi diagram of the generators with
//! that volume and extracts one closed polyhedron per generator.
//!
//! ## Features
//!
//! - **Restricted Voronoi**: cells are clipped against the domain volume, so
//!   every cell is bounded even for generators near or outside the boundary.
//! - **Exact predicates**: plane classifications fall back to adaptive exact
//!   arithmetic on ties, keeping cell topology watertight (on by default).
//! - **Mesh preprocessing**: vertex clustering, intersection resolution,
//!   repair, small-component removal and hole filling run on the domain
//!   surface before the closed-manifold gate.
//! - **Polyhedron extraction**: coplanar facet merging, optional boundary
//!   merging and non-convex tessellation, per-cell shrink and cell ids.
//!
//! ## Main Interface
//!
//! The primary entry point is [`run`], driven by a validated
//! [`PipelineConfig`]. The stages are also exposed individually, from
//! [`build_box_mesh`] through [`extract`]. See `demos/point_check.rs` for an
//! end-to-end driver reading a point file and writing the cells as OBJ.

mod bounds;
mod config;
mod convex_cell;
mod domain;
mod error;
mod extract;
mod geometry;
mod io;
mod neighbor_grid;
mod pipeline;
mod predicates;
mod preprocess;
mod rvd;
mod surface_mesh;
mod tet_mesh;
mod tetrahedralize;

pub use bounds::BoundingBox;
pub use config::EngineConfig;
pub use config::ExtractConfig;
pub use config::FacetSimplification;
pub use config::PipelineConfig;
pub use config::PreprocessConfig;
pub use config::TetrahedralizeConfig;
pub use convex_cell::BOUNDARY_TAG;
pub use convex_cell::ClipScratch;
pub use convex_cell::ConvexCell;
pub use domain::build_box_mesh;
pub use error::ConfigError;
pub use error::PipelineError;
pub use error::PreprocessError;
pub use error::TetrahedralizeError;
pub use extract::extract;
pub use extract::OutputMesh;
pub use io::read_points;
pub use io::write_obj;
pub use io::PointSet;
pub use neighbor_grid::NeighborGrid;
pub use pipeline::run;
pub use pipeline::PipelineOutput;
pub use predicates::Bisector;
pub use predicates::Predicates;
pub use preprocess::preprocess;
pub use preprocess::PreprocessReport;
pub use rvd::Fragment;
pub use rvd::RestrictedVoronoi;
pub use surface_mesh::SurfaceMesh;
pub use tet_mesh::TetMesh;
pub use tetrahedralize::tetrahedralize;
