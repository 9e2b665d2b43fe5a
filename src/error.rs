use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, NetError>;

/// Every failure the library can report.
#[derive(Debug)]
pub enum NetError {
    /// An invalid or contradictory network or layer specification.
    Configuration { reason: String },
    /// `forward`/`backward` called before the layers were wired.
    NotInitialised,
    /// `forward` called without input values.
    MissingInput,
    /// `backward` called without target values.
    MissingTarget,
    /// A snapshot describes a different number of layers than the live network.
    LayerCountMismatch { expected: usize, got: usize },
    /// A snapshot unit's parameter shape disagrees with the live allocation.
    ShapeMismatch {
        layer: usize,
        unit: usize,
        expected: String,
        got: String,
    },
    /// A dataset record carries neither an `expected` nor an `output` vector.
    DataContract { index: usize },
    /// Training or testing was asked to run over zero records.
    EmptyDataset,
    Io(io::Error),
    Json(serde_json::Error),
}

impl NetError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        NetError::Configuration {
            reason: reason.into(),
        }
    }
}

impl Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Configuration { reason } => write!(f, "Invalid configuration: {reason}"),
            NetError::NotInitialised => {
                write!(f, "The network has not been initialised, its layers are not wired yet")
            }
            NetError::MissingInput => write!(f, "No input was given to the forward pass"),
            NetError::MissingTarget => write!(f, "No target was given to the backward pass"),
            NetError::LayerCountMismatch { expected, got } => write!(
                f,
                "Snapshot has {got} layers but the network has {expected}"
            ),
            NetError::ShapeMismatch {
                layer,
                unit,
                expected,
                got,
            } => write!(
                f,
                "Snapshot shape mismatch at layer {layer}, unit {unit}: expected {expected}, got {got}"
            ),
            NetError::DataContract { index } => write!(
                f,
                "Record {index} has neither an 'expected' nor an 'output' value"
            ),
            NetError::EmptyDataset => write!(f, "The dataset is empty"),
            NetError::Io(e) => write!(f, "I/O error: {e}"),
            NetError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl Error for NetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetError::Io(e) => Some(e),
            NetError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        NetError::Io(e)
    }
}

impl From<serde_json::Error> for NetError {
    fn from(e: serde_json::Error) -> Self {
        NetError::Json(e)
    }
}
