//! HTTP client for the Webnotes API.
//!
//! The agent never holds a cookie jar. The stored session token is attached
//! by hand as the `session_token` cookie on each request.

use log::debug;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;
use webnotes_core::models::IncomingNote;

use crate::{Error, Result};

/// Default API base, matching a locally running server.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

/// Serialized size a single push request aims to stay under.
pub const MAX_BATCH_BYTES: usize = 1024 * 1024;

/// Most notes sent in a single push request.
pub const MAX_BATCH_NOTES: usize = 500;

/// Outcome of a push, as reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
}

/// Split `notes` into runs bounded by [`MAX_BATCH_NOTES`] and, by serialized
/// size, [`MAX_BATCH_BYTES`]. A note larger than the byte bound travels alone.
pub fn batches(notes: &[IncomingNote]) -> Result<Vec<&[IncomingNote]>> {
    let mut out = Vec::new();
    let mut start = 0;
    // Opening bracket.
    let mut bytes = 1;
    for (i, note) in notes.iter().enumerate() {
        // Plus the separating comma or closing bracket.
        let size = serde_json::to_vec(note)?.len() + 1;
        let full = i - start == MAX_BATCH_NOTES || bytes + size > MAX_BATCH_BYTES;
        if i > start && full {
            out.push(&notes[start..i]);
            start = i;
            bytes = 1;
        }
        bytes += size;
    }
    if start < notes.len() {
        out.push(&notes[start..]);
    }
    Ok(out)
}

#[derive(Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    session_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // Fail early on a base that cannot carry paths.
        let parsed = Url::parse(base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(Error::Custom(format!("'{base_url}' is not a usable API URL")));
        }
        Ok(Self {
            http: Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Browser URL that mints an auth code and redirects it to `redirect_uri`.
    pub fn authorize_url(&self, redirect_uri: &str) -> Result<Url> {
        Ok(Url::parse_with_params(
            &self.endpoint("accounts/authorize"),
            &[("redirect_uri", redirect_uri)],
        )?)
    }

    /// Trade an auth code for a long-lived session token.
    pub async fn exchange_auth_code(&self, code: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.endpoint("accounts/exchangeAuthCode"))
            .json(&json!({ "code": code }))
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(api_error(resp).await);
        }
        let body: ExchangeResponse = resp.json().await?;
        body.session_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Custom("exchange response carried no session token".into()))
    }

    /// Push notes to the sync ingress, one request per bounded batch.
    ///
    /// Stops at the first failing request; batches sent before it stay
    /// applied on the server and match as updates on the next push.
    pub async fn push_notes(&self, token: &str, notes: &[IncomingNote]) -> Result<SyncReport> {
        let batches = batches(notes)?;
        let mut total = SyncReport::default();
        for (i, batch) in batches.iter().enumerate() {
            let report = self.push_batch(token, batch).await?;
            debug!(
                "batch {}/{}: {} notes ({} new, {} updated)",
                i + 1,
                batches.len(),
                batch.len(),
                report.inserted,
                report.updated
            );
            total.inserted += report.inserted;
            total.updated += report.updated;
        }
        Ok(total)
    }

    async fn push_batch(&self, token: &str, notes: &[IncomingNote]) -> Result<SyncReport> {
        let resp = self
            .http
            .post(self.endpoint("notes/list"))
            .header(COOKIE, format!("session_token={token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(notes)
            .send()
            .await?;
        if resp.status() != StatusCode::CREATED {
            return Err(api_error(resp).await);
        }
        Ok(resp.json().await?)
    }
}

async fn api_error(resp: Response) -> Error {
    let status = resp.status();
    let message = match resp.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(msg) }) => msg,
        _ => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    };
    Error::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn note() -> IncomingNote {
        IncomingNote {
            source: "directory".into(),
            source_identifier: "inbox.md".into(),
            title: "Inbox".into(),
            body: "buy milk".into(),
            created_at: None,
            updated_at: None,
            slug: None,
        }
    }

    #[test]
    fn authorize_url_escapes_redirect() {
        let client = ApiClient::new("http://localhost:8080/api/v1/").unwrap();
        let url = client
            .authorize_url("http://127.0.0.1:5555/callback")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/accounts/authorize?redirect_uri=http%3A%2F%2F127.0.0.1%3A5555%2Fcallback"
        );
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:someone@example.com").is_err());
    }

    #[tokio::test]
    async fn push_sends_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notes/list"))
            .and(header("cookie", "session_token=tok"))
            .and(body_json(json!([note()])))
            .respond_with(ResponseTemplate::new(201).set_body_json(
                json!({ "error": null, "inserted": 1, "updated": 0 }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/api/v1", server.uri())).unwrap();
        let report = client.push_notes("tok", &[note()]).await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                inserted: 1,
                updated: 0
            }
        );
    }

    fn bulky(id: usize, body_len: usize) -> IncomingNote {
        IncomingNote {
            source_identifier: format!("n{id}"),
            body: "x".repeat(body_len),
            ..note()
        }
    }

    #[test]
    fn batches_respect_count_and_size_bounds() {
        let many: Vec<_> = (0..MAX_BATCH_NOTES + 1).map(|i| bulky(i, 10)).collect();
        let split = batches(&many).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].len(), MAX_BATCH_NOTES);
        assert_eq!(split[1].len(), 1);

        let large: Vec<_> = (0..8).map(|i| bulky(i, 300 * 1024)).collect();
        let split = batches(&large).unwrap();
        assert_eq!(split.iter().map(|b| b.len()).collect::<Vec<_>>(), [3, 3, 2]);
        for batch in &split {
            assert!(serde_json::to_vec(batch).unwrap().len() <= MAX_BATCH_BYTES);
        }

        // Oversized notes still go out, one per request.
        let huge: Vec<_> = (0..2).map(|i| bulky(i, MAX_BATCH_BYTES)).collect();
        assert_eq!(batches(&huge).unwrap().len(), 2);
        assert!(batches(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn large_push_is_split_and_reports_summed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notes/list"))
            .respond_with(ResponseTemplate::new(201).set_body_json(
                json!({ "error": null, "inserted": 2, "updated": 1 }),
            ))
            .expect(3)
            .mount(&server)
            .await;

        let notes: Vec<_> = (0..8).map(|i| bulky(i, 300 * 1024)).collect();
        let client = ApiClient::new(&server.uri()).unwrap();
        let report = client.push_notes("tok", &notes).await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                inserted: 6,
                updated: 3
            }
        );
    }

    #[tokio::test]
    async fn api_errors_carry_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notes/list"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "error": "you must be logged in" })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let err = client.push_notes("stale", &[note()]).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("you must be logged in"));
    }

    #[tokio::test]
    async fn exchange_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/exchangeAuthCode"))
            .and(body_json(json!({ "code": "abc" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "error": null, "session_token": "long-lived" }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/accounts/exchangeAuthCode"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid code" })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        assert_eq!(client.exchange_auth_code("abc").await.unwrap(), "long-lived");
        let err = client.exchange_auth_code("zzz").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 401, .. }));
    }
}
