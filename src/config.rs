use std::{fmt, fs, path::Path};

use serde::Deserialize;

use crate::{client::project_ref_to_url, PostgrestError, Result};

pub(crate) const URL_VAR: &str = "SUPABASE_URL";
pub(crate) const KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub(crate) const SCHEMA_VAR: &str = "SUPABASE_SCHEMA";
pub(crate) const TIMEOUT_VAR: &str = "PROBE_TIMEOUT_MS";

/// Default secrets file looked up by [`ProbeConfig::load`].
pub(crate) const SECRETS_FILE: &str = "secrets.json";

/// Endpoint and credential for a probe run.
#[derive(Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub base_url: String,
    pub api_key: String,
    pub schema: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("schema", &self.schema)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "SUPABASE_URL")]
    url: Option<String>,
    #[serde(rename = "SUPABASE_ANON_KEY")]
    anon_key: Option<String>,
    #[serde(rename = "SUPABASE_SCHEMA")]
    schema: Option<String>,
    #[serde(rename = "PROBE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
}

impl ProbeConfig {
    /// Reads configuration from the environment, falling back to
    /// `secrets.json` in the working directory when a required variable
    /// is missing. Malformed values in the environment are reported as is.
    pub fn load() -> Result<Self> {
        Self::load_with(|name| std::env::var(name).ok(), Path::new(SECRETS_FILE))
    }

    fn load_with<F>(lookup: F, secrets: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let has_required = [URL_VAR, KEY_VAR]
            .iter()
            .all(|name| optional(lookup(name)).is_some());
        if has_required || !secrets.exists() {
            return Self::from_lookup(lookup);
        }
        tracing::debug!(
            "{URL_VAR}/{KEY_VAR} not set, reading {}",
            secrets.display()
        );
        Self::from_secrets_file(secrets)
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional
    /// `SUPABASE_SCHEMA` / `PROBE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the same keys from a JSON file.
    pub fn from_secrets_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            PostgrestError::Config(format!("{} could not be read: {err}", path.display()))
        })?;
        let parsed: SecretsFile = serde_json::from_str(&content).map_err(|err| {
            PostgrestError::Config(format!("{} could not be parsed: {err}", path.display()))
        })?;

        Self::build(
            parsed.url,
            parsed.anon_key,
            parsed.schema,
            parsed.timeout_ms.map(|value| value.to_string()),
        )
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::build(
            lookup(URL_VAR),
            lookup(KEY_VAR),
            lookup(SCHEMA_VAR),
            lookup(TIMEOUT_VAR),
        )
    }

    fn build(
        url: Option<String>,
        key: Option<String>,
        schema: Option<String>,
        timeout_ms: Option<String>,
    ) -> Result<Self> {
        let url = required(URL_VAR, url)?;
        let api_key = required(KEY_VAR, key)?;
        let timeout_ms = optional(timeout_ms)
            .map(|value| {
                value.parse::<u64>().map_err(|err| {
                    PostgrestError::Config(format!("invalid {TIMEOUT_VAR} '{value}': {err}"))
                })
            })
            .transpose()?;

        Ok(Self {
            base_url: normalize_base_url(&url),
            api_key,
            schema: optional(schema),
            timeout_ms,
        })
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value {
        None => Err(PostgrestError::Config(format!("missing {name}"))),
        Some(value) if value.trim().is_empty() => {
            Err(PostgrestError::Config(format!("{name} is set but empty")))
        }
        Some(value) => Ok(value.trim().to_owned()),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// A bare project reference is expanded to its hosted URL.
fn normalize_base_url(url: &str) -> String {
    if url.contains("://") {
        url.trim_end_matches('/').to_owned()
    } else {
        project_ref_to_url(url)
    }
}
