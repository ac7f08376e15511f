use openconcept_surrogate::SurrogateError;
use thiserror::Error;

/// A result type for engine-deck construction and evaluation
pub type Result<T> = std::result::Result<T, DeckError>;

/// An error when loading or querying an [`EngineDeck`](crate::EngineDeck)
#[derive(Error, Debug)]
pub enum DeckError {
    /// When the packaged deck file is missing, unreadable or malformed.
    /// Fatal: the deck is unusable without its artifact.
    #[error("Model load error: {0}")]
    ModelLoad(String),
    /// When the artifact parses but its tables are inconsistent
    #[error(transparent)]
    Surrogate(#[from] SurrogateError),
    /// When a named operating point misses one of the deck's inputs
    #[error("missing operating-point input `{0}`")]
    MissingInput(String),
}
