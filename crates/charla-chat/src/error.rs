//! Error types for the completion boundary.

/// Failures from the completion provider call.
///
/// These never cross the `CompletionClient` boundary as faults: the client
/// recovers each kind into a fixed user-facing string. The enum exists so
/// the recovery (and its logging) can distinguish what actually happened.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The provider answered with a non-success status.
    #[error("provider returned status {status}")]
    Provider { status: u16, body: String },

    /// The request never completed: timeout, connection refused, and such.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body was not the expected JSON shape.
    #[error("malformed response body: {0}")]
    MalformedResponse(String),

    /// A well-formed response with no completion content in it.
    #[error("response contained no completion content")]
    MissingContent,
}
