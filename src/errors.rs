use thiserror::Error;

/// Fatal conditions raised by the flow and temperature engines.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("retention curve slope is zero for sand={sand}, clay={clay}")]
    ZeroRetentionSlope { sand: f64, clay: f64 },
    #[error("soil profile depth {profile_depth} cm exceeds the temperature grid depth {max_depth} cm")]
    ProfileTooDeep { profile_depth: f64, max_depth: f64 },
    #[error("expected {expected} layers, got {got}")]
    LayerCount { expected: usize, got: usize },
    #[error("soil temperature at grid node {node} is {temperature} °C, outside the stable range")]
    NumericInstability { node: usize, temperature: f64 },
    #[error("day {day}: {source}")]
    Day {
        day: usize,
        #[source]
        source: Box<FlowError>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl FlowError {
    /// True for errors produced by the temperature stability guard.
    pub fn is_numeric_instability(&self) -> bool {
        match self {
            FlowError::NumericInstability { .. } => true,
            FlowError::Day { source, .. } => source.is_numeric_instability(),
            _ => false,
        }
    }
}

/// Convenience type for `Result<T, FlowError>`.
pub type FlowResult<T> = Result<T, FlowError>;
