use crate::error::ConfigError;

/// Settings for the surface preprocessing stages, applied in the fixed order
/// described on [`crate::preprocess::preprocess`].
///
/// Fraction-valued tolerances resolve against mesh-derived references:
/// `epsilon` and `margin` against the bounding-box diagonal, `max_hole_area`
/// and `min_comp_area` against the total surface area. This keeps the
/// settings resolution-independent across differently scaled inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessConfig {
    /// Master switch for the cleanup stages (clustering, intersection,
    /// repair, component removal, hole filling, border expansion).
    /// Anisotropy and zero-area cleanup run regardless of this flag.
    pub enabled: bool,
    /// Merge near-duplicate vertices and fix orientation. Ignored when
    /// `vcluster_bins` or `intersect` select another path.
    pub repair: bool,
    /// Vertex merge tolerance as a fraction of the bounding-box diagonal.
    pub epsilon: f64,
    /// Holes with enclosed area above this fraction of the total surface
    /// area are left open. Zero disables hole filling.
    pub max_hole_area: f64,
    /// Holes with more border edges than this are left open. Zero disables
    /// hole filling.
    pub max_hole_edges: usize,
    /// Vertex-cluster decimation with this many bins along the longest axis.
    /// Zero disables. Mutually exclusive with `intersect`.
    pub vcluster_bins: usize,
    /// Resolve facet self-intersections by re-triangulating crossed facets.
    pub intersect: bool,
    /// After intersection resolution, remove facets enclosed inside the
    /// outer surface. Requires `intersect`.
    pub remove_internal_shells: bool,
    /// Connected facet groups with total area below this fraction of the
    /// surface area are removed. Zero disables.
    pub min_comp_area: f64,
    /// Laplacian smoothing iterations applied to vertex normals before the
    /// anisotropy attribute is stored. Only used when `anisotropy` is
    /// nonzero.
    pub normal_smooth_iterations: usize,
    /// Grow open border loops outward by this fraction of the bounding-box
    /// diagonal. Zero disables.
    pub margin: f64,
    /// Anisotropy strength. Nonzero values store per-vertex normals scaled
    /// by `0.02 * anisotropy` as a mesh attribute. Topology is unchanged.
    pub anisotropy: f64,
    /// Strip facets with area below 1e-30 and report the count.
    pub zero_area_cleanup: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repair: true,
            epsilon: 1e-3,
            max_hole_area: 1e-3,
            max_hole_edges: 2000,
            vcluster_bins: 0,
            intersect: false,
            remove_internal_shells: false,
            min_comp_area: 0.0,
            normal_smooth_iterations: 2,
            margin: 0.0,
            anisotropy: 0.0,
            zero_area_cleanup: true,
        }
    }
}

/// Settings for the volumetric fill.
#[derive(Clone, Debug, PartialEq)]
pub struct TetrahedralizeConfig {
    /// Lattice subdivisions along the longest axis of the surface bounding
    /// box; the other axes scale with their extents. Must be at least 1.
    pub subdivisions: usize,
}

impl Default for TetrahedralizeConfig {
    fn default() -> Self {
        Self { subdivisions: 4 }
    }
}

/// Settings for the restricted Voronoi engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Classify cell vertices against bisector planes with certified
    /// adaptive predicates instead of a plain epsilon test. On by default:
    /// robustness matters more than speed for a one-shot extraction.
    pub exact_predicates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exact_predicates: true,
        }
    }
}

/// How much facet merging the extractor performs per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacetSimplification {
    /// Emit every face of every per-tetrahedron fragment.
    None,
    /// Drop interior tetrahedron walls whose both sides belong to the same
    /// cell.
    InternalWalls,
    /// Additionally merge each cell's coplanar bisector fragments into
    /// single polygons. Implies `InternalWalls`.
    CoplanarFacets,
}

/// Settings for polyhedron extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractConfig {
    pub simplify: FacetSimplification,
    /// Merge domain-boundary faces of a cell when the dihedral angle between
    /// them (degrees) is below this. Zero disables. Requires
    /// `FacetSimplification::CoplanarFacets`.
    pub boundary_angle_threshold: f64,
    /// Split non-convex merged faces into triangles.
    pub tessellate_non_convex_facets: bool,
    /// Move every cell vertex toward the cell's generator by this fraction
    /// in [0, 1]. Zero is an exact no-op; one collapses each cell to a point.
    pub cells_shrink: f64,
    /// Attach per-facet and per-cell generator indices to the output.
    pub generate_ids: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            simplify: FacetSimplification::CoplanarFacets,
            boundary_angle_threshold: 0.0,
            tessellate_non_convex_facets: false,
            cells_shrink: 0.0,
            generate_ids: true,
        }
    }
}

/// Complete pipeline configuration. The defaults reproduce the reference
/// driver: repair-only preprocessing, zero-area cleanup, coplanar facet
/// simplification, robust predicates, no shrink.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub tetrahedralize: TetrahedralizeConfig,
    pub engine: EngineConfig,
    pub extract: ExtractConfig,
}

impl PipelineConfig {
    /// Rejects invalid combinations and ranges. Called by the pipeline
    /// before any geometry runs; library users composing stages by hand
    /// should call it themselves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pre = &self.preprocess;
        if pre.vcluster_bins != 0 && pre.intersect {
            return Err(ConfigError::ClusteringWithIntersection);
        }
        if pre.remove_internal_shells && !pre.intersect {
            return Err(ConfigError::ShellRemovalWithoutIntersection);
        }
        for (name, value) in [
            ("pre.epsilon", pre.epsilon),
            ("pre.max_hole_area", pre.max_hole_area),
            ("pre.min_comp_area", pre.min_comp_area),
            ("pre.margin", pre.margin),
            (
                "extract.boundary_angle_threshold",
                self.extract.boundary_angle_threshold,
            ),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeTolerance { name, value });
            }
        }
        if self.tetrahedralize.subdivisions == 0 {
            return Err(ConfigError::ZeroSubdivisions);
        }
        let ext = &self.extract;
        if !(0.0..=1.0).contains(&ext.cells_shrink) {
            return Err(ConfigError::ShrinkOutOfRange(ext.cells_shrink));
        }
        if ext.boundary_angle_threshold > 0.0
            && ext.simplify != FacetSimplification::CoplanarFacets
        {
            return Err(ConfigError::BoundaryMergeWithoutCoplanar);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_clustering_intersect_conflict() {
        let mut cfg = PipelineConfig::default();
        cfg.preprocess.vcluster_bins = 10;
        cfg.preprocess.intersect = true;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ClusteringWithIntersection)
        );
    }

    #[test]
    fn test_shrink_range() {
        let mut cfg = PipelineConfig::default();
        cfg.extract.cells_shrink = 1.5;
        assert_eq!(cfg.validate(), Err(ConfigError::ShrinkOutOfRange(1.5)));
        cfg.extract.cells_shrink = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_boundary_merge_requires_coplanar() {
        let mut cfg = PipelineConfig::default();
        cfg.extract.boundary_angle_threshold = 45.0;
        assert!(cfg.validate().is_ok());
        cfg.extract.simplify = FacetSimplification::InternalWalls;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BoundaryMergeWithoutCoplanar)
        );
    }

    #[test]
    fn test_shell_removal_requires_intersect() {
        let mut cfg = PipelineConfig::default();
        cfg.preprocess.remove_internal_shells = true;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ShellRemovalWithoutIntersection)
        );
    }
}
