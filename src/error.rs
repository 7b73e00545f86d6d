/// Error type returned by this crate.
///
/// Service-reported errors are not represented here: when the API answers
/// with a structured error body it arrives as
/// [`ServiceResponse::error`](crate::ServiceResponse::error).
#[derive(Debug, thiserror::Error)]
pub enum PostgrestError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Successful status with a body that is not valid JSON.
    #[error("decode error: {0}")]
    Decode(String),
    /// Request rejected before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Missing or malformed configuration.
    #[error("config error: {0}")]
    Config(String),
}
