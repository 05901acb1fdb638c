//! [`MetadataProbe`] over a PostgREST endpoint.
//!
//! Each probe is a `GET` with `limit=0`, so no rows come back but the server
//! still resolves the table and column names. Error bodies are PostgREST JSON
//! and carry the structured code the guard classifies on.

use std::time::Duration;

use reqwest::blocking::Client;
use schema_guard_core::{MetadataProbe, ProbeError};
use serde::Deserialize;
use tracing::trace;
use url::Url;

use crate::error::{RestError, Result};

/// Request timeout used by [`RestProbe::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Zero-row probe against a PostgREST endpoint under `{base}/rest/v1/`.
pub struct RestProbe {
    client: Client,
    base: Url,
    api_key: String,
    schema: Option<String>,
}

impl RestProbe {
    /// Creates a probe for the project at `base_url`, authenticating with
    /// `api_key` as both `apikey` and bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::UrlError`] or [`RestError::InvalidUrl`] for an
    /// unusable URL, and [`RestError::ClientError`] if the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(RestError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            base,
            api_key: api_key.into(),
            schema: None,
        })
    }

    /// Queries `schema` instead of the server's default exposed schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

impl MetadataProbe for RestProbe {
    fn query(&self, table: &str, column: Option<&str>) -> std::result::Result<(), ProbeError> {
        let url = probe_url(&self.base, table, column);
        trace!(%url, "Probing");

        let mut request = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if let Some(schema) = &self.schema {
            request = request.header("Accept-Profile", schema);
        }

        let response = request
            .send()
            .map_err(|e| ProbeError::uncoded(format!("request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(error_from_response(status.as_u16(), &body))
    }
}

/// Builds `{base}/rest/v1/{table}?select={column|*}&limit=0`.
///
/// # Examples
///
/// ```
/// use schema_guard_rest::probe_url;
/// use url::Url;
///
/// let base = Url::parse("https://project.example.co").unwrap();
/// let url = probe_url(&base, "courses", Some("status"));
/// assert_eq!(
///     url.as_str(),
///     "https://project.example.co/rest/v1/courses?select=status&limit=0"
/// );
/// ```
pub fn probe_url(base: &Url, table: &str, column: Option<&str>) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(["rest", "v1", table]);
    }
    url.query_pairs_mut()
        .append_pair("select", column.unwrap_or("*"))
        .append_pair("limit", "0");
    url
}

/// Converts a non-2xx response into a [`ProbeError`].
///
/// A PostgREST JSON body supplies the code and message. Otherwise the code is
/// `http_<status>` and the body text (or status) becomes the message.
///
/// # Examples
///
/// ```
/// use schema_guard_rest::error_from_response;
///
/// let err = error_from_response(404, r#"{"code":"PGRST205","message":"Could not find the table 'public.teams' in the schema cache"}"#);
/// assert_eq!(err.code.as_deref(), Some("PGRST205"));
///
/// let err = error_from_response(502, "Bad Gateway");
/// assert_eq!(err.code.as_deref(), Some("http_502"));
/// ```
pub fn error_from_response(status: u16, body: &str) -> ProbeError {
    if let Ok(parsed) = serde_json::from_str::<PostgrestError>(body) {
        if parsed.code.is_some() || parsed.message.is_some() {
            let mut message = parsed.message.unwrap_or_default();
            if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
                message = format!("{message} ({details})");
            }
            return ProbeError {
                code: parsed.code,
                message,
            };
        }
    }

    let text = body.trim();
    let message = if text.is_empty() {
        format!("HTTP {status}")
    } else {
        text.to_string()
    };
    ProbeError::new(format!("http_{status}"), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_guard_core::{Classification, ProbeKind, classify};

    #[test]
    fn test_probe_url_table() {
        let base = Url::parse("https://project.example.co/").unwrap();
        assert_eq!(
            probe_url(&base, "learning_plans", None).as_str(),
            "https://project.example.co/rest/v1/learning_plans?select=*&limit=0"
        );
    }

    #[test]
    fn test_probe_url_keeps_base_path_and_escapes() {
        let base = Url::parse("http://127.0.0.1:54321/proxy?x=1").unwrap();
        let url = probe_url(&base, "weird table", Some("a,b"));
        assert_eq!(url.path(), "/proxy/rest/v1/weird%20table");
        assert_eq!(url.query(), Some("select=a%2Cb&limit=0"));
    }

    #[test]
    fn test_postgrest_error_bodies() {
        let err = error_from_response(
            404,
            r#"{"code":"42P01","details":null,"hint":null,"message":"relation \"public.courses\" does not exist"}"#,
        );
        assert_eq!(err.code.as_deref(), Some("42P01"));
        assert_eq!(classify(ProbeKind::Table, &err), Classification::Missing);

        let err = error_from_response(
            400,
            r#"{"code":"42703","details":null,"hint":null,"message":"column profiles.avatar_url does not exist"}"#,
        );
        assert_eq!(classify(ProbeKind::Column, &err), Classification::Missing);

        let err = error_from_response(
            401,
            r#"{"code":"42501","details":null,"hint":null,"message":"permission denied for table courses"}"#,
        );
        assert_eq!(classify(ProbeKind::Table, &err), Classification::Indeterminate);
    }

    #[test]
    fn test_uncoded_json_falls_back_to_message() {
        let err = error_from_response(401, r#"{"message":"Invalid API key"}"#);
        assert_eq!(err.code, None);
        assert_eq!(err.message, "Invalid API key");
        assert_eq!(classify(ProbeKind::Table, &err), Classification::Indeterminate);
    }

    #[test]
    fn test_details_are_appended() {
        let err = error_from_response(
            400,
            r#"{"code":"PGRST100","message":"failed to parse select","details":"unexpected ','"}"#,
        );
        assert_eq!(err.message, "failed to parse select (unexpected ',')");
    }

    #[test]
    fn test_non_json_body() {
        let err = error_from_response(503, "");
        assert_eq!(err.code.as_deref(), Some("http_503"));
        assert_eq!(err.message, "HTTP 503");
        assert_eq!(classify(ProbeKind::Table, &err), Classification::Indeterminate);
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        assert!(RestProbe::new("not a url", "k").is_err());
        assert!(RestProbe::new("mailto:admin@example.com", "k").is_err());
        assert!(RestProbe::new("ftp://example.com", "k").is_err());
        assert!(RestProbe::new("https://project.example.co", "k").is_ok());
    }
}
