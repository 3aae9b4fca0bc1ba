//! # webnotes_agent
//!
//! Background agent that authorizes itself against a Webnotes server through
//! the browser hand-off, then periodically pushes notes from a local source.

pub use self::error::{Error, Result};

pub mod authorize;
pub mod client;
pub mod credentials;
mod error;
pub mod launchd;
pub mod logging;
pub mod source;
pub mod worker;

use log::info;

use crate::authorize::CallbackListener;
use crate::client::ApiClient;
use crate::credentials::CredentialStore;

/// Run the browser hand-off and persist the resulting session token.
///
/// `open_browser` receives the authorize URL; the wait ends when the local
/// listener gets its callback.
pub async fn authorize(
    client: &ApiClient,
    credentials: &CredentialStore,
    open_browser: impl FnOnce(&str),
) -> Result<()> {
    let listener = CallbackListener::bind().await?;
    let url = client.authorize_url(&listener.redirect_uri())?;
    open_browser(url.as_str());

    listener
        .receive(|code| async move {
            let token = client.exchange_auth_code(&code).await?;
            credentials.save(&token)?;
            Ok(())
        })
        .await?;
    info!("session token stored in {}", credentials.path().display());
    Ok(())
}
