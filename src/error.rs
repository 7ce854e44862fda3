use thiserror::Error;

/// Rejected configuration combinations and ranges, reported by
/// [`crate::PipelineConfig::validate`] before any geometry runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("vertex clustering and self-intersection resolution are mutually exclusive")]
    ClusteringWithIntersection,
    #[error("internal shell removal requires the intersection stage")]
    ShellRemovalWithoutIntersection,
    #[error("cells_shrink must lie in [0, 1], got {0}")]
    ShrinkOutOfRange(f64),
    #[error("{name} must not be negative, got {value}")]
    NegativeTolerance { name: &'static str, value: f64 },
    #[error("boundary facet merging requires coplanar facet simplification")]
    BoundaryMergeWithoutCoplanar,
    #[error("lattice subdivisions must be at least 1")]
    ZeroSubdivisions,
}

/// Failure of an explicit preprocessing stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    #[error("{remaining} facet intersection(s) left after resolution")]
    UnresolvedIntersections { remaining: usize },
}

/// The surface handed to the tetrahedralizer is not a usable closed
/// 2-manifold. These halt the pipeline, unlike preprocessing warnings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TetrahedralizeError {
    #[error("surface mesh has no facets")]
    EmptySurface,
    #[error("surface is not closed: {0} border edge(s)")]
    OpenSurface(usize),
    #[error("surface is not a 2-manifold: {0} edge(s) shared by more than two facets")]
    NonManifold(usize),
    #[error("facet orientations are not globally consistent")]
    InconsistentOrientation,
    #[error("no tetrahedron lies inside the surface")]
    EmptyVolume,
}

/// Any failure that aborts the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("tetrahedralization failed: {0}")]
    Tetrahedralize(#[from] TetrahedralizeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Process exit code for driver binaries. Success is 0; every explicit
    /// pipeline failure maps to 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
