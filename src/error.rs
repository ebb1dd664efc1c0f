use thiserror::Error;

/// Boxed error returned by reporter callbacks.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced through the registry's error sink.
#[derive(Debug, Error)]
pub enum Error {
    /// A typed fetch found an instrument of a different kind stored under
    /// the requested identifier.
    #[error("expected a {expected} at '{id}', found a stored {found}")]
    RegistrationMismatch {
        expected: &'static str,
        found: &'static str,
        id: String,
    },

    /// A reporter failed during a flush cycle; the cycle was aborted at that
    /// point.
    #[error("reporter: {0}")]
    Reporter(#[source] BoxedError),
}
