// Async client for stored-procedure endpoints.
//
// Base path: /rest/v1/
// Call:      POST /rest/v1/rpc/{function} with a JSON object of named args
// Auth:      `apikey` header plus `Authorization: Bearer` with the same key

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;

/// One result row: column name → value, in backend column order.
pub type Row = Map<String, Value>;

const REST_PREFIX: &str = "/rest/v1";

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for RPC-style backends.
///
/// Every call is a `POST` of named arguments that returns a JSON array
/// of row objects.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RpcClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `apikey` and `Authorization: Bearer` as default headers,
    /// both marked sensitive so they never appear in debug output.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| Error::Authentication {
            message: format!("invalid API key header value: {e}"),
        };

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key.expose_secret()).map_err(invalid)?;
        key_value.set_sensitive(true);
        headers.insert("apikey", key_value);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(invalid)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Accept either the project root or the `/rest/v1` base, always
    /// ending in a slash so relative joins land under it.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with(REST_PREFIX) {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}{REST_PREFIX}/"));
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn rpc_url(&self, function: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("rpc/{function}"))?)
    }

    // ── Calls ────────────────────────────────────────────────────────

    /// Invoke `function` with named `params` and return its rows.
    pub async fn call(&self, function: &str, params: &Row) -> Result<Vec<Row>, Error> {
        let url = self.rpc_url(function)?;
        debug!("POST {url} args={}", params.len());

        let resp = self.http.post(url).json(params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        Self::parse_rows(body)
    }

    fn parse_rows(body: String) -> Result<Vec<Row>, Error> {
        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(e) => {
                let preview = body.chars().take(200).collect::<String>();
                return Err(Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                });
            }
        };

        let Value::Array(items) = value else {
            return Err(Error::Deserialization {
                message: "expected a JSON array of rows".into(),
                body,
            });
        };

        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(Error::Deserialization {
                    message: format!("row {idx} is not an object: {other}"),
                    body: body.clone(),
                }),
            })
            .collect()
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorResponse>(&raw).ok();

        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            return Error::Authentication {
                message: parsed
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| status.to_string()),
            };
        }

        match parsed {
            Some(err) => {
                let mut message = err.message.unwrap_or_else(|| status.to_string());
                if let Some(details) = err.details.filter(|d| !d.is_empty()) {
                    message = format!("{message} ({details})");
                }
                if let Some(hint) = err.hint.filter(|h| !h.is_empty()) {
                    message = format!("{message}; hint: {hint}");
                }
                Error::Rpc {
                    message,
                    code: err.code,
                    status: status.as_u16(),
                }
            }
            None => Error::Rpc {
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
                status: status.as_u16(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_rest_prefix_once() {
        let client = RpcClient::from_reqwest("https://db.example.com", reqwest::Client::new()).unwrap();
        assert_eq!(client.base_url().as_str(), "https://db.example.com/rest/v1/");

        let client =
            RpcClient::from_reqwest("https://db.example.com/rest/v1/", reqwest::Client::new())
                .unwrap();
        assert_eq!(client.base_url().as_str(), "https://db.example.com/rest/v1/");
        assert_eq!(
            client.rpc_url("sales_by_region").unwrap().as_str(),
            "https://db.example.com/rest/v1/rpc/sales_by_region"
        );
    }

    #[test]
    fn non_array_body_is_rejected() {
        let err = RpcClient::parse_rows(r#"{"total": 3}"#.into()).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));

        let err = RpcClient::parse_rows("[1, 2]".into()).unwrap_err();
        assert!(err.to_string().contains("row 0"));

        let rows = RpcClient::parse_rows(r#"[{"id": 1}]"#.into()).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
