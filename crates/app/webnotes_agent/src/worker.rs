//! Periodic extract-then-push cycle.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::time::MissedTickBehavior;

use crate::client::{ApiClient, SyncReport};
use crate::source::NoteSource;
use crate::{Error, Result};

/// Wake interval of the background worker.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(250);

pub struct SyncWorker {
    client: ApiClient,
    token: String,
    source: Arc<dyn NoteSource>,
}

impl SyncWorker {
    pub fn new(client: ApiClient, token: String, source: Arc<dyn NoteSource>) -> Self {
        Self {
            client,
            token,
            source,
        }
    }

    /// One cycle. `None` when the source had nothing to push.
    pub async fn sync_once(&self) -> Result<Option<SyncReport>> {
        let source = Arc::clone(&self.source);
        let notes = tokio::task::spawn_blocking(move || source.extract())
            .await
            .map_err(|e| Error::Extraction(format!("extraction task failed: {e}")))??;
        info!("extracted {} notes from {}", notes.len(), self.source.tag());
        // The server rejects empty batches.
        if notes.is_empty() {
            return Ok(None);
        }
        let report = self.client.push_notes(&self.token, &notes).await?;
        info!(
            "pushed {} notes ({} new, {} updated)",
            notes.len(),
            report.inserted,
            report.updated
        );
        Ok(Some(report))
    }

    /// Sync every `interval` until Ctrl-C. Failed cycles are logged and
    /// retried on the next tick.
    pub async fn run(&self, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("sync worker started, interval {}s", interval.as_secs());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sync_once().await {
                        Ok(_) => {}
                        Err(e) if e.is_unauthorized() => {
                            error!("{e}; re-run `webnotes-agent authorize`");
                        }
                        Err(e) => warn!("sync failed: {e}"),
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("sync worker stopping");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use webnotes_core::models::IncomingNote;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixed(Vec<IncomingNote>);

    impl NoteSource for Fixed {
        fn tag(&self) -> &'static str {
            "fixed"
        }

        fn extract(&self) -> Result<Vec<IncomingNote>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl NoteSource for Broken {
        fn tag(&self) -> &'static str {
            "broken"
        }

        fn extract(&self) -> Result<Vec<IncomingNote>> {
            Err(Error::Extraction("permission denied".into()))
        }
    }

    fn note(id: &str) -> IncomingNote {
        IncomingNote {
            source: "fixed".into(),
            source_identifier: id.into(),
            title: id.into(),
            body: "body".into(),
            created_at: None,
            updated_at: None,
            slug: None,
        }
    }

    async fn worker(server: &MockServer, source: impl NoteSource + 'static) -> SyncWorker {
        let client = ApiClient::new(&server.uri()).unwrap();
        SyncWorker::new(client, "tok".into(), Arc::new(source))
    }

    #[tokio::test]
    async fn empty_extraction_skips_push() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let report = worker(&server, Fixed(vec![])).await.sync_once().await.unwrap();
        assert_eq!(report, None);
    }

    #[tokio::test]
    async fn pushes_extracted_notes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notes/list"))
            .respond_with(ResponseTemplate::new(201).set_body_json(
                json!({ "error": null, "inserted": 2, "updated": 0 }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let report = worker(&server, Fixed(vec![note("a"), note("b")]))
            .await
            .sync_once()
            .await
            .unwrap();
        assert_eq!(
            report,
            Some(SyncReport {
                inserted: 2,
                updated: 0
            })
        );
    }

    #[tokio::test]
    async fn extraction_errors_surface() {
        let server = MockServer::start().await;
        let err = worker(&server, Broken).await.sync_once().await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
