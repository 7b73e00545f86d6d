use std::fmt;
use std::time::Duration;

use reqwest::{header, RequestBuilder, Url};

use crate::{
    decode::decode_response, ClientOptions, PostgrestError, ProbeConfig, Query, Result, RpcArgs,
    ServiceResponse,
};

/// Formats a project reference into the canonical project URL.
///
/// Example: `"abc123"` → `"https://abc123.supabase.co"`
pub fn project_ref_to_url(project_ref: &str) -> String {
    format!("https://{}.supabase.co", project_ref.trim())
}

#[derive(Clone)]
/// Read-only connection handle for a PostgREST API.
pub struct PostgrestClient {
    http: reqwest::Client,
    rest_url: String,
    api_key: String,
    authorization: String,
    options: ClientOptions,
}

impl fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("rest_url", &self.rest_url)
            .field("api_key", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl PostgrestClient {
    /// Creates a client for the project at `base_url` using `api_key`.
    ///
    /// The key is sent both as `apikey` and as a bearer `Authorization`
    /// value. A trailing `/rest/v1` on `base_url` is accepted.
    pub fn new(base_url: impl AsRef<str>, api_key: impl AsRef<str>) -> Self {
        let api_key = api_key.as_ref().trim();
        Self {
            http: reqwest::Client::new(),
            rest_url: rest_url(base_url.as_ref()),
            api_key: strip_bearer_prefix(api_key).to_owned(),
            authorization: normalize_bearer_authorization(api_key),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from a project reference and an API key.
    ///
    /// ```no_run
    /// use postgrest_probe::PostgrestClient;
    ///
    /// let client = PostgrestClient::from_project_ref("my-project", "anon-key");
    /// ```
    pub fn from_project_ref(project_ref: impl AsRef<str>, api_key: impl AsRef<str>) -> Self {
        Self::new(project_ref_to_url(project_ref.as_ref()), api_key)
    }

    /// Creates a client from loaded configuration, applying its options.
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(&config.base_url, &config.api_key).with_options(ClientOptions {
            timeout_ms: config.timeout_ms,
            schema: config.schema.clone(),
        })
    }

    /// Applies client options such as timeout and schema.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Base URL every request path is appended to (`.../rest/v1`).
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// Invokes a remote procedure with named arguments.
    pub async fn rpc<A: Into<RpcArgs>>(&self, function: &str, args: A) -> Result<ServiceResponse> {
        let function = function.trim();
        if function.is_empty() {
            return Err(PostgrestError::InvalidRequest(
                "procedure name cannot be empty".to_owned(),
            ));
        }
        let args = args.into();
        let url = self.endpoint(&["rpc", function])?;

        let mut request = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&args.to_body());
        if let Some(schema) = &self.options.schema {
            request = request.header("Content-Profile", schema);
        }

        tracing::debug!(function, "sending rpc request");
        self.send(request).await
    }

    /// Reads rows from a collection.
    pub async fn query(&self, query: &Query) -> Result<ServiceResponse> {
        let collection = query.collection.trim();
        if collection.is_empty() {
            return Err(PostgrestError::InvalidRequest(
                "collection name cannot be empty".to_owned(),
            ));
        }
        let url = self.endpoint(&[collection])?;

        let mut request = self.http.get(url).query(&query.query_pairs());
        if let Some(schema) = &self.options.schema {
            request = request.header("Accept-Profile", schema);
        }

        tracing::debug!(collection, filters = query.filters.len(), "sending query request");
        self.send(request).await
    }

    /// Appends `segments` to the REST base, percent-encoding each one so a
    /// name can never change the route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.rest_url).map_err(|err| {
            PostgrestError::InvalidRequest(format!("invalid base url '{}': {err}", self.rest_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                PostgrestError::InvalidRequest(format!(
                    "base url '{}' cannot carry a path",
                    self.rest_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<ServiceResponse> {
        let mut request = request
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::ACCEPT, "application/json");
        if let Some(timeout_ms) = self.options.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }

        let response = request.send().await.map_err(PostgrestError::Transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(PostgrestError::Transport)?;
        decode_response(status, &body)
    }
}

fn rest_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/rest/v1") {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/rest/v1")
    }
}

fn strip_bearer_prefix(token: &str) -> &str {
    match token.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => token[7..].trim_start(),
        _ => token,
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    format!("Bearer {}", strip_bearer_prefix(token.trim()))
}

#[cfg(test)]
mod tests {
    use super::{normalize_bearer_authorization, rest_url, strip_bearer_prefix, PostgrestClient};

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_does_not_double_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "Bearer abc123".to_owned()
        );
        assert_eq!(strip_bearer_prefix("Bearer abc123"), "abc123");
    }

    #[test]
    fn rest_url_appends_path_once() {
        assert_eq!(rest_url("https://x.supabase.co/"), "https://x.supabase.co/rest/v1");
        assert_eq!(
            rest_url("https://x.supabase.co/rest/v1/"),
            "https://x.supabase.co/rest/v1"
        );
    }

    #[test]
    fn project_ref_builds_rest_url() {
        let client = PostgrestClient::from_project_ref(" abc123 ", "key");
        assert_eq!(client.rest_url(), "https://abc123.supabase.co/rest/v1");
    }

    #[test]
    fn endpoint_escapes_reserved_characters() {
        let client = PostgrestClient::new("https://x.supabase.co", "key");
        let url = client
            .endpoint(&["rpc/start_dish_cooking_batch#x?y"])
            .expect("must build url");
        assert_eq!(
            url.as_str(),
            "https://x.supabase.co/rest/v1/rpc%2Fstart_dish_cooking_batch%23x%3Fy"
        );
        assert!(url.fragment().is_none());
        assert!(url.query().is_none());
    }

    #[test]
    fn endpoint_rejects_unparseable_base() {
        let client = PostgrestClient::new("not a url", "key");
        assert!(matches!(
            client.endpoint(&["token_wallets"]),
            Err(crate::PostgrestError::InvalidRequest(_))
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = PostgrestClient::new("https://db.example", "secret-token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
