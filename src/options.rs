/// Configures per-request behavior of [`PostgrestClient`](crate::PostgrestClient).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds. `None` keeps the `reqwest` default.
    pub timeout_ms: Option<u64>,
    /// Database schema to target instead of the API's default (`public`).
    pub schema: Option<String>,
}
