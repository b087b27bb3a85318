use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported optimizer `{0}` (expected one of sgd, adam, adagrad, adadelta)")]
    UnsupportedOptimizer(String),

    #[error("sentence {row} has length {length} but the batch is only {width} wide")]
    LengthOutOfBounds {
        row: usize,
        length: usize,
        width: usize,
    },

    #[error("probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("vocabulary error: {0}")]
    Vocab(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Torch(#[from] tch::TchError),
}
