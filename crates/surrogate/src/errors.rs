use thiserror::Error;

/// A result type for surrogate evaluation
pub type Result<T> = std::result::Result<T, SurrogateError>;

/// An error raised when assembling or querying a [`KrigingModel`](crate::KrigingModel)
#[derive(Error, Debug)]
pub enum SurrogateError {
    /// When training artifact tables are inconsistent with each other
    #[error("Data shape error: {0}")]
    DataShape(String),
    /// When a fitted constant is outside its admissible range
    #[error("InvalidValue error: {0}")]
    InvalidValue(String),
}
