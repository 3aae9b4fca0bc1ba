//! Local callback listener for the browser authorization hand-off.
//!
//! The agent binds a loopback port, sends the user's browser to the API's
//! authorize page with this listener as the redirect target, and waits for
//! the single request that carries `?code=`.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use log::{debug, info};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use crate::{Error, Result};

pub const CALLBACK_PATH: &str = "/callback";

/// A received code plus the channel that answers the waiting browser.
struct Callback {
    code: String,
    reply: oneshot::Sender<std::result::Result<(), String>>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

async fn callback(
    State(tx): State<mpsc::Sender<Callback>>,
    Query(query): Query<CallbackQuery>,
) -> (StatusCode, String) {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            "missing code query parameter".into(),
        );
    };
    let (reply, outcome) = oneshot::channel();
    if tx.send(Callback { code, reply }).await.is_err() {
        return (StatusCode::GONE, "authorization already finished".into());
    }
    match outcome.await {
        Ok(Ok(())) => (
            StatusCode::OK,
            "Webnotes agent authorized. You can close this window.".into(),
        ),
        Ok(Err(message)) => (
            StatusCode::BAD_GATEWAY,
            format!("authorization failed: {message}"),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "authorization was interrupted".into(),
        ),
    }
}

pub struct CallbackListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackListener {
    /// Bind an ephemeral port on 127.0.0.1.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        debug!("callback listener bound on {addr}");
        Ok(Self { listener, addr })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}{CALLBACK_PATH}", self.addr)
    }

    /// Serve until one request delivers a code, run `handle` on it, answer
    /// the browser with the outcome and shut down.
    ///
    /// Requests without a code are answered with 400 and do not end the wait.
    pub async fn receive<F, Fut, T>(self, handle: F) -> Result<T>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (tx, mut rx) = mpsc::channel::<Callback>(1);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let app = Router::new()
            .route(CALLBACK_PATH, get(callback))
            .with_state(tx);

        let server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async move {
                    stop_rx.await.ok();
                })
                .await
        });

        info!("waiting for the browser to complete authorization");
        let callback = rx
            .recv()
            .await
            .ok_or_else(|| Error::Custom("callback listener stopped".into()))?;
        let outcome = handle(callback.code).await;
        let answer = match &outcome {
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        };
        callback.reply.send(answer).ok();

        drop(rx);
        stop_tx.send(()).ok();
        server
            .await
            .map_err(|e| Error::Custom(format!("callback listener task failed: {e}")))??;
        outcome
    }
}
