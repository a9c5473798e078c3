use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot parse `{input}` as a real number: {source}")]
    Parse {
        input: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f64),

    #[error("Cannot change tolerance: {live} referenced entries were canonicalized under the current one")]
    ToleranceLocked { live: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
