use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a layer-flattening operation.
pub type FlattenResult<T> = Result<T, FlattenError>;

/// An error that occurred while flattening a layer stack.
#[derive(pretty_error_debug::Debug, Error)]
pub enum FlattenError {
    /// An entry path normalized to nothing (e.g. `./` or an empty name).
    #[error("empty entry path")]
    EmptyPath,

    /// An entry path escapes the tree root via `..` components.
    #[error("path escapes the tree root: {0}")]
    PathEscapesRoot(String),

    /// An error that occurred while decoding a layer changeset.
    #[error("layer handling error: {layer}: {source}")]
    LayerHandling {
        /// The underlying I/O error.
        source: io::Error,

        /// The layer the error occurred in.
        layer: String,
    },

    /// An I/O error while writing to an output sink.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Custom error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FlattenError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> FlattenError {
        FlattenError::Custom(AnyError {
            error: error.into(),
        })
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `FlattenResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> FlattenResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
