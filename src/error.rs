use thiserror::Error;

/// Top-level error type for pipe-network construction and line tracking.
#[derive(Debug, Error)]
pub enum PipenetError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipe(#[from] PipeError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("zero-length vector")]
    ZeroVector,

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("radius {0} must be positive")]
    NonPositiveRadius(f64),
}

/// Errors raised while building or binding a boolean region expression.
#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("expression references unknown surface {0}")]
    UnknownSurface(i32),

    #[error("cannot parse expression `{input}`: {message}")]
    Parse { input: String, message: String },

    #[error("empty expression")]
    EmptyExpression,

    #[error("surface handle {0} must be positive")]
    InvalidHandle(i32),
}

/// Errors raised by scene lookups and scene-wide queries.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("cell {0} not found in scene")]
    MissingCell(i32),

    #[error("cell {0} already exists in scene")]
    DuplicateCell(i32),

    #[error("surface {0} already exists in scene")]
    DuplicateSurface(i32),

    #[error("index register exhausted while reserving a block for `{0}`")]
    RegisterExhausted(String),

    #[error("track from {start:?} to {end:?} crosses {void_length} of unmodelled space")]
    IncompleteModel {
        start: [f64; 3],
        end: [f64; 3],
        void_length: f64,
    },
}

/// Errors in the layer schedule or polyline handed to a pipe network.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pipe radii must be strictly increasing: {radius} follows {previous}")]
    RadiusOrder { previous: f64, radius: f64 },

    #[error("pipe radius {0} must be positive")]
    NonPositiveRadius(f64),

    #[error("pipe line needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("gap index {index} out of range for {len} gaps")]
    GapIndex { index: usize, len: usize },

    #[error("pipe line has no radius layers")]
    NoRadii,

    #[error("index block of {block_size} cannot hold the handles of {layers} layers")]
    BlockTooSmall { block_size: i32, layers: usize },

    #[error("active mask {mask:#b} on gap {gap} selects none of the {layers} layers")]
    EmptyMask { gap: usize, mask: u32, layers: usize },
}

/// Errors raised while driving pipe segments through their construction steps.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error("pipe segment step out of order: expected state {expected:?}, found {found:?}")]
    OutOfOrder {
        expected: crate::pipe::UnitState,
        found: crate::pipe::UnitState,
    },

    #[error("pipe segment {index} failed: {source}")]
    Segment {
        index: usize,
        #[source]
        source: Box<PipenetError>,
    },
}

/// Convenience type alias for results using [`PipenetError`].
pub type Result<T> = std::result::Result<T, PipenetError>;
