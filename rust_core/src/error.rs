//! Error types shared by the promoter, the table readers and the
//! autocorrelation estimator.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Source weight or bias table does not exist.
    #[error("missing input file {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed cell or ragged row in a delimited numeric table.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Caller-supplied spin count disagrees with the visible layer of the
    /// loaded weight matrix.
    #[error("nspins = {nspins} does not match the {visible} visible units of the weight matrix")]
    SpinCountMismatch { nspins: usize, visible: usize },

    #[error("autocovariance must be normalized to 1 at t=0, got {value}")]
    NotNormalized { value: f64 },

    /// Zero-variance (or non-finite) chain: the lag-0 autocovariance cannot
    /// be used as a normalizer.
    #[error("chain has zero or non-finite variance, autocovariance cannot be normalized")]
    DegenerateChain,

    #[error("chain is empty")]
    EmptyChain,

    #[error("no self-consistent window M >= 4*tau(M) + 1 within {len} lags, the chain is too short")]
    NonConvergentWindow { len: usize },

    #[error("report rendering failed: {0}")]
    Render(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Error for a failed read: a missing file is an input problem, not an
    /// I/O fault.
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::MissingInput { path }
        } else {
            Error::Io { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
